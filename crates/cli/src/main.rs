//! GeoVC command-line client.
//!
//! Provides subcommands for inspecting repository history, branches,
//! tags, trees and diffs, importing working-copy edits as new commits
//! (with conflict reporting), and generating / validating configuration
//! files.

mod commands;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use geovc_core::cache::CommitCache;
use geovc_core::config::ClientConfig;
use geovc_core::repository::{Repository, HEAD};
use geovc_core::webapi::WebApiClient;

// ---------------------------------------------------------------------------
// CLI argument definitions
// ---------------------------------------------------------------------------

/// GeoVC command-line client.
#[derive(Parser, Debug)]
#[command(
    name = "geovc",
    version,
    about = "Inspect and update a geospatial version-control repository"
)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, global = true, default_value = "~/.config/geovc/config.toml")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show commit history, newest first.
    Log {
        /// Ref to start from (default HEAD).
        #[arg(long)]
        until: Option<String>,

        /// Maximum number of commits.
        #[arg(short, long)]
        limit: Option<u32>,

        /// Restrict to commits touching this tree or feature path.
        #[arg(short, long)]
        path: Option<String>,
    },

    /// List branches.
    Branches,

    /// List tags.
    Tags,

    /// List feature trees (layers) at a commit.
    Trees {
        /// Commit to inspect (default HEAD).
        #[arg(long)]
        commit: Option<String>,
    },

    /// Manage branches.
    Branch {
        #[command(subcommand)]
        action: RefAction,
    },

    /// Manage tags.
    Tag {
        #[command(subcommand)]
        action: RefAction,
    },

    /// Show feature-level differences between two revisions.
    Diff {
        /// Older revision.
        from: String,

        /// Newer revision.
        to: String,

        /// Restrict to a tree or feature path.
        #[arg(short, long)]
        path: Option<String>,
    },

    /// Show per-feature last-modifying-commit attribution.
    Blame {
        /// Tree or feature path.
        path: String,
    },

    /// Show one feature's attributes at a revision.
    Feature {
        /// Feature path, e.g. points/fid-12ab.
        path: String,

        /// Revision to inspect.
        #[arg(long, default_value = HEAD)]
        rev: String,
    },

    /// Import a working copy file as a new commit.
    Import {
        /// Working copy JSON file.
        file: PathBuf,

        /// Target branch.
        #[arg(short, long, default_value = "master")]
        branch: String,

        /// Commit message.
        #[arg(short, long)]
        message: String,

        /// Author name.
        #[arg(long)]
        author: String,

        /// Author email.
        #[arg(long)]
        email: String,

        /// Treat the working copy as an update of an existing tree
        /// (three-way checked against each feature's origin commit).
        #[arg(long)]
        update: bool,
    },

    /// Download a full tree snapshot to a file.
    Checkout {
        /// Feature tree (layer) name.
        tree: String,

        /// Revision to export.
        #[arg(long, default_value = HEAD)]
        rev: String,

        /// Output file.
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Download the from/to feature sets of a tree between two revisions.
    ExportDiff {
        /// Feature tree (layer) name.
        tree: String,

        /// Older revision.
        from: String,

        /// Newer revision.
        to: String,

        /// Output file.
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Generate a default configuration file.
    Init {
        /// Output path for the generated config file.
        #[arg(short, long, default_value = "./geovc.toml")]
        output: PathBuf,
    },

    /// Validate a configuration file.
    Validate,
}

#[derive(Subcommand, Debug)]
enum RefAction {
    /// Create a new ref.
    Create {
        /// Ref name to create.
        name: String,

        /// Where the new ref points (default HEAD).
        #[arg(long, default_value = HEAD)]
        from: String,
    },
    /// Delete an existing ref.
    Delete {
        /// Ref name to delete.
        name: String,
    },
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Init { output } => {
            init_logging("warn");
            cmd_init(&output)
        }
        Commands::Validate => {
            init_logging("warn");
            cmd_validate(&cli.config)
        }
        command => {
            let config = load_config(&cli.config)?;
            init_logging(&config.log.level);
            let repo = build_repository(&config);

            match command {
                Commands::Log { until, limit, path } => {
                    commands::log::run_log(&repo, until.as_deref(), limit, path.as_deref()).await
                }
                Commands::Branches => commands::refs::run_branches(&repo).await,
                Commands::Tags => commands::refs::run_tags(&repo).await,
                Commands::Trees { commit } => {
                    commands::refs::run_trees(&repo, commit.as_deref()).await
                }
                Commands::Branch { action } => match action {
                    RefAction::Create { name, from } => {
                        commands::refs::run_branch_create(&repo, &from, &name).await
                    }
                    RefAction::Delete { name } => {
                        commands::refs::run_branch_delete(&repo, &name).await
                    }
                },
                Commands::Tag { action } => match action {
                    RefAction::Create { name, from } => {
                        commands::refs::run_tag_create(&repo, &from, &name).await
                    }
                    RefAction::Delete { name } => {
                        commands::refs::run_tag_delete(&repo, &name).await
                    }
                },
                Commands::Diff { from, to, path } => {
                    commands::diff::run_diff(&repo, &from, &to, path.as_deref()).await
                }
                Commands::Blame { path } => commands::diff::run_blame(&repo, &path).await,
                Commands::Feature { path, rev } => {
                    commands::diff::run_feature(&repo, &path, &rev).await
                }
                Commands::Import {
                    file,
                    branch,
                    message,
                    author,
                    email,
                    update,
                } => {
                    commands::import::run_import(
                        &repo, &file, &branch, &message, &author, &email, update,
                    )
                    .await
                }
                Commands::Checkout { tree, rev, output } => {
                    commands::export::run_checkout(&repo, &tree, &rev, &output).await
                }
                Commands::ExportDiff {
                    tree,
                    from,
                    to,
                    output,
                } => commands::export::run_export_diff(&repo, &tree, &from, &to, &output).await,
                Commands::Init { .. } | Commands::Validate => unreachable!(),
            }
        }
    }
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();
}

// ---------------------------------------------------------------------------
// Config helpers
// ---------------------------------------------------------------------------

fn load_config(path: &str) -> Result<ClientConfig> {
    let resolved = expand_tilde(path);
    let mut config = ClientConfig::load_from_file(&resolved)
        .context("failed to load configuration file")?;
    config
        .resolve_env_vars()
        .context("failed to resolve environment variables")?;
    config.validate().context("invalid configuration")?;
    Ok(config)
}

fn expand_tilde(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest).display().to_string();
        }
    }
    path.to_string()
}

fn build_repository(config: &ClientConfig) -> Repository {
    let api = WebApiClient::with_credentials(
        config.server.url.clone(),
        config.server.username.clone(),
        config.server.password.clone(),
    );
    Repository::with_cache(api, Arc::new(CommitCache::new(config.cache.capacity)))
}

// ---------------------------------------------------------------------------
// Config subcommands
// ---------------------------------------------------------------------------

fn cmd_init(output: &Path) -> Result<()> {
    let default_config = r#"# GeoVC client configuration

[server]
url = "http://localhost:8182/repos/myrepo"
# username = "me"
# password_env = "GEOVC_PASSWORD"

[cache]
capacity = 1024

[log]
level = "info"
"#;

    if output.exists() {
        anyhow::bail!(
            "file already exists: {}. Use a different path or remove the existing file.",
            output.display()
        );
    }

    std::fs::write(output, default_config).context("failed to write config file")?;

    println!("Default configuration written to {}", output.display());
    println!();
    println!("Next steps:");
    println!("  1. Edit the config file with your repository URL");
    println!("  2. Set the password environment variable if the server needs credentials");
    println!("  3. Validate with: geovc validate --config {}", output.display());

    Ok(())
}

fn cmd_validate(config_path: &str) -> Result<()> {
    let resolved = expand_tilde(config_path);
    println!("Validating configuration: {}", resolved);
    println!();

    let mut config =
        ClientConfig::load_from_file(&resolved).context("failed to parse configuration")?;
    println!("  [OK] TOML structure is valid");

    let _ = config.resolve_env_vars();
    println!("  [OK] Environment variable references processed");

    match config.validate() {
        Ok(()) => {
            println!("  [OK] All required fields are valid");
        }
        Err(e) => {
            println!("  [FAIL] Validation error: {}", e);
            anyhow::bail!("configuration validation failed");
        }
    }

    println!();
    println!("Configuration summary:");
    println!("  Server URL    : {}", config.server.url);
    println!(
        "  Username      : {}",
        config.server.username.as_deref().unwrap_or("(none)")
    );
    println!(
        "  Password      : {}",
        if config.server.password.is_some() {
            "set"
        } else {
            "not set"
        }
    );
    println!("  Cache capacity: {}", config.cache.capacity);
    println!("  Log level     : {}", config.log.level);
    println!();
    println!("Configuration is valid.");

    Ok(())
}
