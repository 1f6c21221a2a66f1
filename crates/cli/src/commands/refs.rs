//! Branch, tag and tree listings and mutations.

use anyhow::{Context, Result};
use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};

use geovc_core::repository::Repository;

use super::{short_id, style};

/// List branches with the commits they point at.
pub async fn run_branches(repo: &Repository) -> Result<()> {
    let branches = repo.branches().await.context("failed to list branches")?;
    print_ref_table("Branches", branches.iter());
    Ok(())
}

/// List tags with the commits they point at.
pub async fn run_tags(repo: &Repository) -> Result<()> {
    let tags = repo.tags().await.context("failed to list tags")?;
    if tags.is_empty() {
        println!("No tags found.");
        return Ok(());
    }
    print_ref_table("Tags", tags.iter());
    Ok(())
}

/// List the feature trees (layers) present at a commit.
pub async fn run_trees(repo: &Repository, commit: Option<&str>) -> Result<()> {
    let trees = repo.trees(commit).await.context("failed to list trees")?;
    if trees.is_empty() {
        println!("No feature trees found.");
        return Ok(());
    }
    for tree in &trees {
        println!("  {}", tree);
    }
    println!();
    println!("{} tree(s)", trees.len());
    Ok(())
}

pub async fn run_branch_create(repo: &Repository, from_ref: &str, name: &str) -> Result<()> {
    repo.create_branch(from_ref, name)
        .await
        .context("failed to create branch")?;
    println!(
        "{}",
        style::success(&format!("Branch '{}' created at {}", name, from_ref))
    );
    Ok(())
}

pub async fn run_branch_delete(repo: &Repository, name: &str) -> Result<()> {
    repo.delete_branch(name)
        .await
        .context("failed to delete branch")?;
    println!("{}", style::success(&format!("Branch '{}' deleted", name)));
    Ok(())
}

pub async fn run_tag_create(repo: &Repository, from_ref: &str, name: &str) -> Result<()> {
    repo.create_tag(from_ref, name)
        .await
        .context("failed to create tag")?;
    println!(
        "{}",
        style::success(&format!("Tag '{}' created at {}", name, from_ref))
    );
    Ok(())
}

pub async fn run_tag_delete(repo: &Repository, name: &str) -> Result<()> {
    repo.delete_tag(name)
        .await
        .context("failed to delete tag")?;
    println!("{}", style::success(&format!("Tag '{}' deleted", name)));
    Ok(())
}

fn print_ref_table<'a>(title: &str, refs: impl Iterator<Item = (&'a String, &'a String)>) {
    println!();
    println!("{}", style::header(title));
    println!();

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Name", "Commit"]);
    for (name, id) in refs {
        table.add_row(vec![Cell::new(name), Cell::new(short_id(id))]);
    }

    println!("{}", table);
    println!();
}
