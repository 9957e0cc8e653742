//! # wiki-mirror CLI (`wmir`)
//!
//! The `wmir` binary drives exports of a wiki tree into a Drive-style
//! remote space. It is thin glue: configuration and tree loading, client
//! construction, one call into the export core, exit code.
//!
//! ## Usage
//!
//! ```bash
//! wmir --config ./config/wmir.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `wmir export <tree.toml>` | Reconcile the remote space against a tree file |
//! | `wmir tree <tree.toml>` | Validate a tree file and print the page hierarchy |
//! | `wmir check` | Verify remote credentials with one harmless query |
//!
//! ## Examples
//!
//! ```bash
//! # Validate the tree description first
//! wmir tree ./config/wiki.toml
//!
//! # Mirror it; a second run issues zero creations
//! wmir export ./config/wiki.toml
//!
//! # Machine-readable progress on stderr
//! wmir export ./config/wiki.toml    # with [progress] format = "json"
//! ```
//!
//! Exits 0 on success, non-zero on unrecoverable failure. Progress goes to
//! stderr; the final summary goes to stdout.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use wiki_mirror::config::{self, Config};
use wiki_mirror::export::Exporter;
use wiki_mirror::models::{PageKind, PageNode};
use wiki_mirror::progress::{JsonReporter, Reporter, StderrReporter};
use wiki_mirror::remote_drive::DriveRemote;
use wiki_mirror::render::HtmlRenderer;
use wiki_mirror::tree::{self, SourceTree};

const DEFAULT_CONFIG_PATH: &str = "./config/wmir.toml";

/// wiki-mirror CLI — mirror a hierarchical wiki tree into a Drive-style
/// remote folder space, idempotently.
#[derive(Parser)]
#[command(
    name = "wmir",
    about = "wiki-mirror — idempotent export of a wiki tree into a Drive-style remote space",
    version,
    long_about = "wiki-mirror reconciles a remote folder space against a locally described wiki \
    tree: folders and dump files are created only where a query proves them absent, attachments \
    are uploaded per page, and linked documents are moved under their resolved parent. Repeated \
    runs over an unchanged tree issue zero mutations, so interrupted exports are repaired by \
    simply re-running."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// When omitted, `./config/wmir.toml` is used if present, otherwise
    /// built-in defaults (credentials still come from the environment).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Reconcile the remote space against a tree file.
    ///
    /// Resolves the root folder, then walks the tree pre-order: each
    /// folder-backed page gets a folder, a rendered dump file, and its
    /// attachments; each linked document is moved under its resolved
    /// parent. Only missing things are created.
    Export {
        /// Path to the tree file (TOML).
        tree: PathBuf,
    },

    /// Validate a tree file and print the page hierarchy.
    ///
    /// Performs the same validation as `export` (non-empty names, unique
    /// siblings, remote ids on linked kinds) without touching the remote.
    Tree {
        /// Path to the tree file (TOML).
        tree: PathBuf,
    },

    /// Verify remote credentials and connectivity.
    ///
    /// Reads credentials from the environment and issues one harmless
    /// listing query.
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let cfg = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Export { tree } => {
            let source = tree::load_tree(&tree)?;
            run_export(&cfg, &source).await?;
        }
        Commands::Tree { tree } => {
            let source = tree::load_tree(&tree)?;
            print_tree(&source);
        }
        Commands::Check => {
            let remote = DriveRemote::connect(&cfg.remote).await?;
            remote.probe().await?;
            println!("remote space reachable");
        }
    }

    Ok(())
}

/// Load config from the explicit path, or fall back to the default path
/// when present, or built-in defaults otherwise. An explicit path that
/// fails to load is an error; a missing default path is not.
fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => config::load_config(path),
        None => {
            let default = Path::new(DEFAULT_CONFIG_PATH);
            if default.exists() {
                config::load_config(default)
            } else {
                Ok(Config::default())
            }
        }
    }
}

async fn run_export(cfg: &Config, source: &SourceTree) -> Result<()> {
    let remote = DriveRemote::connect(&cfg.remote).await?;
    let renderer = HtmlRenderer;
    let reporter = make_reporter(&cfg.progress.format);
    let exporter = Exporter::new(
        &remote,
        &renderer,
        reporter.as_ref(),
        &cfg.content.attachments_root,
    );

    let summary = exporter.export(&source.root_folder, &source.pages).await?;

    println!("export {}", source.root_folder);
    println!("  pages processed: {}", summary.pages);
    println!("  folders created: {}", summary.folders_created);
    println!("  dumps uploaded: {}", summary.dumps_created);
    println!("  attachments uploaded: {}", summary.attachments_created);
    println!("  documents moved: {}", summary.documents_moved);
    println!("ok");
    Ok(())
}

fn make_reporter(format: &str) -> Box<dyn Reporter> {
    match format {
        "human" => Box::new(StderrReporter),
        "json" => Box::new(JsonReporter),
        // "auto": human on a tty, JSON when piped.
        _ => {
            if atty::is(atty::Stream::Stderr) {
                Box::new(StderrReporter)
            } else {
                Box::new(JsonReporter)
            }
        }
    }
}

fn print_tree(source: &SourceTree) {
    println!("{}", source.root_folder);
    let mut stack: Vec<(&PageNode, usize)> = source.pages.iter().rev().map(|p| (p, 1)).collect();
    while let Some((page, depth)) = stack.pop() {
        let indent = "  ".repeat(depth);
        let label = match &page.kind {
            PageKind::Standard => String::new(),
            PageKind::Linked { remote_id, .. } => format!("  [linked: {remote_id}]"),
        };
        println!("{indent}{}{label}", page.name);
        for attachment in &page.attachments {
            println!("{indent}  + {}", attachment.filename);
        }
        for child in page.children.iter().rev() {
            stack.push((child, depth + 1));
        }
    }
}
