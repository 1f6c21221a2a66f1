//! Diff, blame and feature inspection.

use anyhow::{Context, Result};
use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};

use geovc_core::repository::Repository;

use super::{short_id, style};

/// Display the feature-level differences between two revisions.
pub async fn run_diff(
    repo: &Repository,
    from: &str,
    to: &str,
    path: Option<&str>,
) -> Result<()> {
    let diff = repo
        .diff(from, to, path)
        .await
        .context("failed to compute diff")?;

    if diff.is_empty() {
        println!("No differences.");
        return Ok(());
    }

    println!();
    println!(
        "{}",
        style::header(&format!("Diff {} .. {}", short_id(from), short_id(to)))
    );
    println!();

    for entry in &diff {
        println!("  {}  {}", style::change_kind(entry.kind), entry.path);
        if let Some(payload) = &entry.feature_diff {
            for attr in &payload.attributes {
                println!(
                    "      {} : {} -> {}",
                    attr.name,
                    render_value(attr.old.as_ref()),
                    render_value(attr.new.as_ref()),
                );
            }
            if let Some(geometry) = &payload.geometry {
                println!(
                    "      geometry : {} -> {}",
                    geometry.old_wkt.as_deref().unwrap_or("—"),
                    geometry.new_wkt.as_deref().unwrap_or("—"),
                );
            }
        }
    }

    println!();
    println!("{} change(s)", diff.len());

    Ok(())
}

/// Display per-feature last-modifying-commit attribution.
pub async fn run_blame(repo: &Repository, path: &str) -> Result<()> {
    let blame = repo.blame(path).await.context("failed to fetch blame")?;

    if blame.is_empty() {
        println!("No features under '{}'.", path);
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Feature", "Last commit"]);
    for (feature, commit) in &blame {
        table.add_row(vec![Cell::new(feature), Cell::new(short_id(commit))]);
    }

    println!("{}", table);
    Ok(())
}

/// Display one feature's attributes at a revision.
pub async fn run_feature(repo: &Repository, path: &str, refspec: &str) -> Result<()> {
    let feature = repo
        .feature(path, refspec)
        .await
        .context("failed to fetch feature")?;

    println!();
    println!("{}", style::header(&format!("{} @ {}", path, refspec)));
    println!();
    for (name, value) in &feature {
        println!("  {:<16} {}", name, render_value(Some(value)));
    }
    println!();

    Ok(())
}

fn render_value(value: Option<&serde_json::Value>) -> String {
    match value {
        None => "—".to_string(),
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}
