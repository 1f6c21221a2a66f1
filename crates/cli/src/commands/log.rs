//! Formatted commit history listing.

use anyhow::{Context, Result};
use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};

use geovc_core::repository::Repository;

use super::{short_id, style, truncate};

/// Display the commit log, newest first.
pub async fn run_log(
    repo: &Repository,
    until: Option<&str>,
    limit: Option<u32>,
    path: Option<&str>,
) -> Result<()> {
    let log = repo
        .log(until, limit, path)
        .await
        .context("failed to fetch log")?;

    if log.is_empty() {
        println!("No commits found.");
        return Ok(());
    }

    println!();
    println!("{}", style::header(&format!("History ({})", repo.url())));
    println!();

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Commit", "Message", "Author", "When", "+", "-", "~"]);

    for commit in &log {
        table.add_row(vec![
            Cell::new(short_id(&commit.id)),
            Cell::new(truncate(&commit.message, 50)),
            Cell::new(&commit.author_name),
            Cell::new(commit.committer_pretty_date()),
            Cell::new(commit.added),
            Cell::new(commit.removed),
            Cell::new(commit.modified),
        ]);
    }

    println!("{}", table);
    println!();
    println!("{} commit(s) shown", log.len());

    Ok(())
}
