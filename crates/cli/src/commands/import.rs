//! Working-copy import with conflict reporting.

use std::path::Path;

use anyhow::{Context, Result};
use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};

use geovc_core::repository::Repository;
use geovc_core::workingcopy::WorkingCopy;

use super::{short_id, style, truncate};

/// Import a working copy file (JSON) as a new commit.
///
/// Conflicts are not a failure: they are listed for the user to resolve
/// and re-import, while any cleanly applied features have already been
/// committed.
pub async fn run_import(
    repo: &Repository,
    file: &Path,
    branch: &str,
    message: &str,
    author: &str,
    email: &str,
    update: bool,
) -> Result<()> {
    let contents = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read working copy '{}'", file.display()))?;
    let working_copy: WorkingCopy =
        serde_json::from_str(&contents).context("failed to parse working copy JSON")?;

    println!(
        "Importing {} feature(s) into '{}' on branch '{}'...",
        working_copy.features.len(),
        working_copy.tree,
        branch
    );

    let result = repo
        .import_working_copy(&working_copy, branch, message, author, email, update)
        .await
        .context("import failed")?;

    println!();
    match &result.commit_id {
        Some(id) => println!(
            "{}",
            style::success(&format!(
                "Created commit {} ({} imported, +{} -{} ~{})",
                short_id(id),
                result.imported,
                result.added,
                result.removed,
                result.modified
            ))
        ),
        None => println!("{}", style::warn("No commit created")),
    }

    if result.has_conflicts() {
        println!();
        println!(
            "{}",
            style::warn(&format!(
                "{} feature(s) conflict with changes already on '{}':",
                result.conflicts.len(),
                branch
            ))
        );
        println!();

        let mut table = Table::new();
        table.load_preset(UTF8_FULL);
        table.set_content_arrangement(ContentArrangement::Dynamic);
        table.set_header(vec!["Feature", "Ancestor state", "Local state"]);
        for conflict in &result.conflicts {
            let local = match &conflict.local {
                None => style::dim("deleted locally"),
                Some(data) => truncate(&serde_json::to_string(data).unwrap_or_default(), 40),
            };
            table.add_row(vec![
                Cell::new(&conflict.path),
                Cell::new(short_id(&conflict.origin)),
                Cell::new(local),
            ]);
        }
        println!("{}", table);

        println!();
        println!("Resolve these features locally and re-import.");
    }

    Ok(())
}
