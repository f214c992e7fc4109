//! # tvgrid CLI
//!
//! ## Usage
//!
//! ```bash
//! tvgrid --config ./config/tvgrid.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `tvgrid init` | Create the SQLite database and run schema migrations |
//! | `tvgrid sync` | Fetch the grid, show pages, and episode listings |
//! | `tvgrid index` | List indexed shows |
//! | `tvgrid upcoming` | List episodes that have not aired yet |

use std::path::PathBuf;

use anyhow::Result;
use chrono::Utc;
use clap::{Parser, Subcommand};

use tvgrid::collector::{Collector, GridOutcome, SyncOptions};
use tvgrid::config;
use tvgrid::fetch::HttpFetcher;
use tvgrid::logging::init_logging;
use tvgrid::sqlite_store::SqliteStore;
use tvgrid::{db, migrate, report};
use tvgrid_core::store::Store;
use tvgrid_core::temporal::resolve_zone;

/// tvgrid: weekly TV grid and episode listings in your own timezone.
#[derive(Parser)]
#[command(name = "tvgrid", version)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/tvgrid.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema. Safe to run more than once.
    Init,

    /// Run one sync pass.
    ///
    /// Shows whose pages have not changed since the last pass are skipped.
    Sync {
        /// Drop every stored record before syncing.
        #[arg(long)]
        reset: bool,

        /// Revisit every stored show, not only those on the current grid.
        #[arg(long)]
        full_resync: bool,
    },

    /// List indexed shows.
    Index,

    /// List upcoming episodes, soonest first.
    Upcoming,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;
    init_logging(&cfg.logging.level);

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Sync { reset, full_resync } => {
            run_sync(&cfg, reset, full_resync).await?;
        }
        Commands::Index => {
            report::run_index(&cfg).await?;
        }
        Commands::Upcoming => {
            report::run_upcoming(&cfg).await?;
        }
    }

    Ok(())
}

async fn run_sync(cfg: &config::Config, reset: bool, full_resync: bool) -> Result<()> {
    let pool = db::connect(cfg).await?;
    migrate::apply(&pool).await?;
    let store = SqliteStore::new(pool);

    if reset {
        store.clear().await?;
        tracing::warn!("store cleared");
    }

    let fetcher = HttpFetcher::new(cfg.sync.timeout_secs)?;
    let collector = Collector::new(cfg, &store, &fetcher)?;

    let zone = resolve_zone(&cfg.time.target_zone)?;
    let now = Utc::now().with_timezone(&zone);
    let report = collector.run(now, &SyncOptions { full_resync }).await?;

    let grid = match report.grid {
        GridOutcome::Updated => "updated",
        GridOutcome::Latest => "latest",
        GridOutcome::Failed => "failed",
    };
    println!("sync grid");
    println!("  grid: {}", grid);
    println!("  placements: {}", report.placements);
    println!("  shows updated: {}", report.processed);
    println!("  shows latest: {}", report.skipped);
    println!("  shows failed: {}", report.failed);
    println!("ok");

    store.pool().close().await;
    Ok(())
}
