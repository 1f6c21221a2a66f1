//! Snapshot and diff exports to local files.

use std::path::Path;

use anyhow::{Context, Result};

use geovc_core::repository::Repository;

use super::style;

/// Download a full tree snapshot at a revision.
pub async fn run_checkout(
    repo: &Repository,
    tree: &str,
    refspec: &str,
    output: &Path,
) -> Result<()> {
    repo.export_tree(tree, refspec, output)
        .await
        .context("failed to export tree")?;
    println!(
        "{}",
        style::success(&format!(
            "Exported '{}' @ {} to {}",
            tree,
            refspec,
            output.display()
        ))
    );
    Ok(())
}

/// Download the from/to feature sets of a tree between two revisions.
pub async fn run_export_diff(
    repo: &Repository,
    tree: &str,
    from: &str,
    to: &str,
    output: &Path,
) -> Result<()> {
    repo.export_diff(tree, from, to, output)
        .await
        .context("failed to export diff")?;
    println!(
        "{}",
        style::success(&format!(
            "Exported diff of '{}' ({} .. {}) to {}",
            tree,
            from,
            to,
            output.display()
        ))
    );
    Ok(())
}
