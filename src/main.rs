//! # Spec Harness CLI (`spx`)
//!
//! ## Usage
//!
//! ```bash
//! spx --config ./config/spx.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `spx init` | Create the SQLite database and run schema migrations |
//! | `spx parse <file>` | Parse one file and print the result; no database |
//! | `spx ingest <path>` | Parse and store one file or a directory of files |
//! | `spx show <doc-ref>` | Print a stored document's section tree |
//! | `spx stats` | Database size and per-document counts |
//! | `spx reindex` | Rebuild the full-text search sidecar |
//! | `spx card add` | Upsert a knowledge card |
//! | `spx verify` | Check stored cards against their content hashes |
//!
//! Logs go to stderr and are filtered by `RUST_LOG` (default `warn`);
//! `--verbose` raises the default to `debug`.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use spec_harness::cards::{self, CardArgs};
use spec_harness::config;
use spec_harness::ingest::{self, IngestOptions};
use spec_harness::{migrate, parse, reindex, show, stats, verify};

/// Spec Harness CLI — parse markdown specifications into sections,
/// conformance clauses, and cross-references, and store them in SQLite.
#[derive(Parser)]
#[command(
    name = "spx",
    about = "Spec Harness — markdown specification parser and idempotent SQLite ingester",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/spx.toml`. `spx parse` falls back to built-in
    /// defaults when the file does not exist.
    #[arg(long, global = true, default_value = "./config/spx.toml")]
    config: PathBuf,

    /// Log at debug level unless `RUST_LOG` says otherwise.
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file, all tables, and the FTS5 search
    /// sidecar when the SQLite build supports it. Safe to run repeatedly.
    Init,

    /// Parse one file and print a summary, or the full result as JSON.
    Parse {
        /// Markdown file to parse.
        path: PathBuf,

        /// Document reference (defaults to the file stem).
        #[arg(long)]
        doc_ref: Option<String>,

        /// Print the parse result as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Parse and store one file or every matching file under a directory.
    ///
    /// Re-ingesting a document reference replaces its section tree in
    /// place; nothing is duplicated.
    Ingest {
        /// File or directory.
        path: PathBuf,

        /// Document reference for a single file (defaults to the file stem).
        #[arg(long)]
        doc_ref: Option<String>,

        /// Title for a single file (defaults to the first `#` heading).
        #[arg(long)]
        title: Option<String>,

        /// Version override (defaults to the version found in the text).
        #[arg(long)]
        version: Option<String>,

        /// Parse and report without writing to the database.
        #[arg(long)]
        dry_run: bool,
    },

    /// Print a stored document's section tree.
    Show {
        /// Document reference.
        doc_ref: String,

        /// Also list clauses.
        #[arg(long)]
        clauses: bool,

        /// Also list cross-references.
        #[arg(long)]
        xrefs: bool,
    },

    /// Show database size and per-document counts.
    Stats,

    /// Rebuild the full-text search sidecar from the stored rows.
    Reindex,

    /// Manage knowledge cards.
    Card {
        #[command(subcommand)]
        action: CardAction,
    },

    /// Recompute stored card hashes; exit status 1 on any mismatch.
    Verify,
}

#[derive(Subcommand)]
enum CardAction {
    /// Insert a card, or update the label/level of an identical one.
    Add {
        /// Card kind reference.
        #[arg(long)]
        kind: String,

        /// Context the card belongs to.
        #[arg(long)]
        context: String,

        /// Entity the card describes.
        #[arg(long)]
        entity: String,

        /// Card content.
        #[arg(long, conflicts_with = "file")]
        content: Option<String>,

        /// Read card content from a file.
        #[arg(long)]
        file: Option<PathBuf>,

        #[arg(long)]
        label: Option<String>,

        #[arg(long)]
        level: Option<String>,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    // Parsing needs no database, so a missing config file is fine.
    if let Commands::Parse {
        path,
        doc_ref,
        json,
    } = &cli.command
    {
        let cfg = if cli.config.exists() {
            config::load_config(&cli.config)?
        } else {
            config::Config::minimal()
        };
        parse::run_parse(&cfg, path, doc_ref.as_deref(), *json)?;
        return Ok(());
    }

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            let report = migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
            if report.fts_available {
                println!("  full-text search: available");
            } else {
                println!("  full-text search: unavailable (SQLite built without FTS5)");
            }
        }
        Commands::Parse { .. } => {
            // Handled above (before config loading)
            unreachable!()
        }
        Commands::Ingest {
            path,
            doc_ref,
            title,
            version,
            dry_run,
        } => {
            let options = IngestOptions {
                doc_ref,
                title,
                version,
                dry_run,
            };
            ingest::run_ingest(&cfg, &path, &options).await?;
        }
        Commands::Show {
            doc_ref,
            clauses,
            xrefs,
        } => {
            show::run_show(&cfg, &doc_ref, clauses, xrefs).await?;
        }
        Commands::Stats => {
            stats::run_stats(&cfg).await?;
        }
        Commands::Reindex => {
            reindex::run_reindex(&cfg).await?;
        }
        Commands::Card { action } => match action {
            CardAction::Add {
                kind,
                context,
                entity,
                content,
                file,
                label,
                level,
            } => {
                let args = CardArgs {
                    kind,
                    context,
                    entity,
                    content,
                    file,
                    label,
                    level,
                };
                cards::run_card_add(&cfg, args).await?;
            }
        },
        Commands::Verify => {
            verify::run_verify(&cfg).await?;
        }
    }

    Ok(())
}
