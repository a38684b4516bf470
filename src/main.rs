//! Binary entrypoint for the questlog CLI.
//!
//! Commands:
//! - `init` - write a starter `config.toml` and an empty catalog if none exists
//! - `status [QUEST]` - one quest with its blockers, or every quest
//! - `complete QUEST [--no-prereqs]` - mark Done, pulling in prerequisites
//! - `fail QUEST` / `reset QUEST` - mark Failed / forget stored status
//! - `objective [QUEST INDEX] [--id ID] [--undo]` - toggle an objective flag
//! - `reconcile` - re-map stored progress onto the current catalog
//! - `summary` - per status, per trader and Kappa counts
//! - `validate` - report catalog data-quality warnings
//!
//! See the library crate docs for module-level details: `questlog::quests`.
use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use log::{info, warn};

use questlog::config::Config;
use questlog::quests::{
    load_catalog_from_json, ChangeSet, ProgressDb, QuestStatus, QuestTracker,
};

#[derive(Parser)]
#[command(name = "questlog")]
#[command(about = "Quest dependency and status tracker")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (can be used before or after subcommand)
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: String,

    /// Verbose logging (-v, -vv for more; may appear before or after subcommand)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    Init,
    /// Show the status of one quest, or of every quest
    Status {
        /// Quest id, name, or external id
        quest: Option<String>,
    },
    /// Mark a quest Done
    Complete {
        quest: String,
        /// Do not complete unmet prerequisites
        #[arg(long)]
        no_prereqs: bool,
    },
    /// Mark a quest Failed
    Fail { quest: String },
    /// Forget the stored status of a quest
    Reset { quest: String },
    /// Mark an objective complete (or incomplete with --undo)
    Objective {
        quest: Option<String>,
        /// Zero-based objective index
        index: Option<usize>,
        /// Address the objective by catalog objective id instead
        #[arg(long)]
        id: Option<String>,
        #[arg(long)]
        undo: bool,
    },
    /// Re-map stored progress onto the current catalog
    Reconcile,
    /// Summarize progress
    Summary,
    /// Report catalog data-quality warnings
    Validate,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Commands::Init = cli.command {
        init_logging(&None, cli.verbose);
        return init(&cli.config).await;
    }

    let config = Config::load(&cli.config).await?;
    init_logging(&Some(config.clone()), cli.verbose);
    info!("questlog v{}", env!("CARGO_PKG_VERSION"));

    let mut tracker = open_tracker(&config).await?;

    match cli.command {
        Commands::Init => unreachable!("handled above"),
        Commands::Status { quest: Some(quest) } => {
            let record = tracker.find(&quest)?;
            let status = tracker.status(&quest)?;
            println!("{} ({}): {}", record.name, record.primary_id(), status);
            for blocker in tracker.blockers(&quest)? {
                println!("  blocked by {:?}", blocker);
            }
            let done = tracker.completed_objectives(&quest)?;
            for (index, objective) in record.objectives.iter().enumerate() {
                let mark = if done.contains(&index) { "x" } else { " " };
                println!("  [{}] {}: {}", mark, index, objective.description);
            }
        }
        Commands::Status { quest: None } => {
            for (record, status) in tracker.status_all() {
                println!("{:<13}{} ({})", status.label(), record.name, record.primary_id());
            }
        }
        Commands::Complete { quest, no_prereqs } => {
            let changes = tracker.complete(&quest, !no_prereqs)?;
            report_changes(&tracker, &quest, &changes);
        }
        Commands::Fail { quest } => {
            let changes = tracker.fail(&quest)?;
            report_changes(&tracker, &quest, &changes);
        }
        Commands::Reset { quest } => {
            let changes = tracker.reset(&quest)?;
            report_changes(&tracker, &quest, &changes);
        }
        Commands::Objective {
            quest,
            index,
            id,
            undo,
        } => {
            let changed = match (id, quest, index) {
                (Some(id), _, _) => tracker.set_objective_by_id(&id, !undo),
                (None, Some(quest), Some(index)) => tracker.set_objective(&quest, index, !undo)?,
                _ => return Err(anyhow!("objective needs QUEST INDEX or --id ID")),
            };
            println!("{}", if changed { "Objective updated" } else { "No change" });
        }
        Commands::Reconcile => {
            let report = tracker.reconcile().clone();
            println!(
                "{} entries examined, {} rebound, {} merged, {} orphaned",
                report.examined,
                report.rebound,
                report.merged,
                report.orphans.len()
            );
            for orphan in &report.orphans {
                println!("  orphan: {}", orphan);
            }
        }
        Commands::Summary => {
            print!("{}", tracker.summary());
        }
        Commands::Validate => {
            let warnings = tracker.validate();
            if warnings.is_empty() {
                println!("Catalog OK ({} quests)", tracker.catalog().len());
            }
            for warning in warnings {
                println!("warning: {}", warning);
            }
        }
    }

    tracker.shutdown().await?;
    Ok(())
}

async fn init(config_path: &str) -> Result<()> {
    info!("Initializing questlog configuration");
    let cfg = Config::default();
    Config::create_default(config_path).await?;
    info!("Configuration file created at {}", config_path);

    tokio::fs::create_dir_all(&cfg.storage.data_dir).await?;
    let catalog = Path::new(&cfg.catalog.path);
    if !catalog.exists() {
        if let Some(parent) = catalog.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(catalog, "[]\n").await?;
        info!("Empty catalog created at {}", cfg.catalog.path);
    }
    Ok(())
}

async fn open_tracker(config: &Config) -> Result<QuestTracker> {
    let records = load_catalog_from_json(&config.catalog.path)
        .map_err(|e| anyhow!("Failed to load catalog {}: {}", config.catalog.path, e))?;
    let db = ProgressDb::open(&config.storage.data_dir)
        .map_err(|e| anyhow!("Failed to open progress store {}: {}", config.storage.data_dir, e))?;
    let tracker = QuestTracker::open(
        records,
        Arc::new(db),
        config.player.clone(),
        config.storage.writer_config(),
    )
    .await?;

    let duplicates = tracker.catalog().duplicate_keys();
    if duplicates > 0 {
        warn!("{} duplicate catalog keys ignored; run `questlog validate`", duplicates);
    }
    Ok(tracker)
}

fn report_changes(tracker: &QuestTracker, quest: &str, changes: &ChangeSet) {
    if changes.is_empty() {
        println!("No change");
        return;
    }
    for entry in &changes.saved {
        println!("{:?}: {}", entry.status, entry.key);
    }
    for key in &changes.deleted {
        println!("removed: {}", key);
    }
    if let Ok(status) = tracker.status(quest) {
        if status != QuestStatus::Done {
            println!("now {}", status);
        }
    }
}

fn init_logging(config: &Option<Config>, verbosity: u8) {
    use std::io::Write;
    let mut builder = env_logger::Builder::new();
    // CLI verbosity overrides the configured level
    let configured = config
        .as_ref()
        .and_then(|cfg| cfg.logging.level.parse::<log::LevelFilter>().ok())
        .unwrap_or(log::LevelFilter::Info);
    let base_level = match verbosity {
        0 => configured,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    builder.filter_level(base_level);

    let log_file = config
        .as_ref()
        .and_then(|cfg| cfg.logging.file.as_ref())
        .and_then(|file| {
            std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(file)
                .ok()
        });

    if let Some(f) = log_file {
        let write_mutex = std::sync::Arc::new(std::sync::Mutex::new(f));
        // Mirror to the console only when attached to a terminal
        let is_tty = atty::is(atty::Stream::Stdout);
        builder.format(move |fmt, record| {
            let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
            let line = format!("{} [{}] {}", ts, record.level(), record.args());
            if let Ok(mut guard) = write_mutex.lock() {
                let _ = writeln!(guard, "{}", line);
            }
            if is_tty {
                writeln!(fmt, "{}", line)
            } else {
                Ok(())
            }
        });
    } else {
        builder.format(|fmt, record| {
            writeln!(
                fmt,
                "{} [{}] {}",
                chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ"),
                record.level(),
                record.args()
            )
        });
    }
    let _ = builder.try_init();
}
