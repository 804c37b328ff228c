use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{info, warn};

use file_organizer::commands::organize_pipeline::{self, OrganizeProgress};
use file_organizer::config::{OrganizerConfig, API_KEY_ENV};
use file_organizer::error::AppError;
use file_organizer::logging;
use file_organizer::services::duplicate_service;
use file_organizer::services::groq_oracle::GroqOracle;
use file_organizer::services::report_service;
use file_organizer::services::rules_oracle::RulesOracle;
use file_organizer::services::undo_service::{Ledger, LedgerStore};
use file_organizer::state::OrganizeSession;

#[derive(Parser)]
#[command(name = "file-organizer", version, about = "Organize a folder with backups and undo")]
struct Cli {
    /// JSON config file; missing keys use defaults
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run an organize pass and print the summary as JSON
    Organize {
        root: PathBuf,
        /// Ledger database path
        #[arg(long)]
        ledger: Option<PathBuf>,
        /// Keep the ledger in memory only
        #[arg(long)]
        no_persist: bool,
        /// Use the built-in category rules even when an API key is set
        #[arg(long)]
        rules: bool,
    },
    /// Revert the persisted moves and renames for ROOT
    Undo {
        root: PathBuf,
        #[arg(long)]
        ledger: Option<PathBuf>,
    },
    /// List files whose content duplicates an earlier file
    Duplicates { root: PathBuf },
    /// Classify files under ROOT and print category counts
    Report { root: PathBuf },
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init_logger();
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => OrganizerConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => OrganizerConfig::from_env(),
    };

    match cli.command {
        Command::Organize {
            root,
            ledger,
            no_persist,
            rules,
        } => {
            let root = canonical_root(&root)?;
            if ledger.is_some() {
                config.ledger_path = ledger;
            }
            let ledger = if no_persist {
                Ledger::default()
            } else {
                open_ledger(&config, &root)?
            };

            let mut session = OrganizeSession::new(&root, config).with_ledger(ledger);
            let cancel = session.cancel_handle();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("Interrupt received; finishing the current file");
                    cancel.store(true, Ordering::Relaxed);
                }
            });

            let model_oracle = if rules {
                None
            } else {
                GroqOracle::from_config(&session.config)?
            };
            let summary = match model_oracle {
                Some(oracle) => {
                    info!("Asking {} for suggestions", oracle.model());
                    organize_pipeline::organize_folder(&mut session, &oracle, log_progress).await
                }
                None => {
                    info!("No {API_KEY_ENV} set or --rules given; using category rules");
                    let oracle = RulesOracle::new(&root);
                    organize_pipeline::organize_folder(&mut session, &oracle, log_progress).await
                }
            };
            if summary.cancelled {
                warn!("{}", AppError::Cancelled);
            }
            print_json(&summary)
        }
        Command::Undo { root, ledger } => {
            let root = canonical_root(&root)?;
            if ledger.is_some() {
                config.ledger_path = ledger;
            }
            let ledger = open_ledger(&config, &root)?;
            if ledger.is_empty() {
                info!("Nothing to undo for {}", root.display());
            }
            let mut session = OrganizeSession::new(&root, config).with_ledger(ledger);
            let summary = organize_pipeline::undo_changes(&mut session);
            print_json(&summary)
        }
        Command::Duplicates { root } => {
            let root = canonical_root(&root)?;
            let files = organize_pipeline::discover_files(&root);
            let pairs = duplicate_service::find_duplicates(files.iter().map(PathBuf::as_path));
            print_json(&pairs)
        }
        Command::Report { root } => {
            let root = canonical_root(&root)?;
            let mut session = OrganizeSession::new(&root, config);
            for file in organize_pipeline::discover_files(&root) {
                session.tracked.track(file);
            }
            print_json(&report_service::build_report(&session))
        }
    }
}

fn canonical_root(root: &Path) -> Result<PathBuf> {
    let root = root
        .canonicalize()
        .with_context(|| format!("cannot open {}", root.display()))?;
    if !root.is_dir() {
        bail!("{} is not a directory", root.display());
    }
    Ok(root)
}

fn open_ledger(config: &OrganizerConfig, root: &Path) -> Result<Ledger> {
    let db_path = config.resolved_ledger_path()?;
    let store = LedgerStore::open(&db_path, root)
        .with_context(|| format!("failed to open ledger {}", db_path.display()))?;
    Ok(Ledger::load(store)?)
}

fn log_progress(progress: &OrganizeProgress) {
    info!(
        "[{}/{} {}%] {}",
        progress.processed,
        progress.total,
        progress.percent(),
        progress.message
    );
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
