mod commands;
mod logging;
mod output;

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use retail_sim_shared::config::{PoolConfig, ReplenishConfig, DEFAULT_WORKERS};
use retail_sim_store::SqlitePool;

use crate::logging::LogLevel;

#[derive(Parser)]
#[command(name = "retail-sim", about = "Retail purchase-event simulator")]
struct Cli {
    /// Path to the SQLite database file
    #[arg(long, env = "RETAIL_SIM_DB", default_value = "retail.db", global = true)]
    db: PathBuf,
    /// Maximum number of pooled connections
    #[arg(long, default_value_t = DEFAULT_WORKERS, global = true)]
    pool_size: usize,
    #[arg(long, value_enum, default_value = "info", global = true)]
    log_level: LogLevel,
    /// Append log lines to this file instead of stderr
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the tables
    Schema {
        /// Drop and recreate every table
        #[arg(long)]
        reset: bool,
    },
    /// Load reference data
    Seed {
        #[command(subcommand)]
        target: SeedTarget,
    },
    /// Generate receipts for a past date range
    Backfill {
        /// First day to generate (default 2024-03-25)
        #[arg(long)]
        start: Option<NaiveDate>,
        /// Day after the last one to generate
        #[arg(long, conflicts_with = "days")]
        end: Option<NaiveDate>,
        /// Number of days from the start; without --end or --days runs up to today
        #[arg(long)]
        days: Option<u64>,
        /// Number of parallel workers
        #[arg(long, default_value_t = DEFAULT_WORKERS)]
        workers: usize,
        /// Baseline daily purchase probability per customer
        #[arg(long)]
        probability: Option<f64>,
        /// Pause after each persisted day, in seconds
        #[arg(long)]
        pacing_secs: Option<f64>,
        /// Attempts per day before giving up
        #[arg(long)]
        retries: Option<u32>,
        #[arg(long, default_value = "0")]
        seed: u64,
        /// Drop and recreate the receipt tables first
        #[arg(long)]
        reset_schema: bool,
    },
    /// Generate receipts in real time until stopped
    Stream {
        /// Baseline purchase probability per customer and day
        #[arg(long)]
        probability: Option<f64>,
        /// Snapshot refresh cadence, in seconds
        #[arg(long)]
        refresh_secs: Option<u64>,
        /// Stop after this many events
        #[arg(long)]
        max_events: Option<u64>,
        #[arg(long, default_value = "0")]
        seed: u64,
    },
    /// Add one generated customer every 1 to 50 seconds
    StreamCustomers {
        #[command(flatten)]
        pacing: PacingArgs,
    },
    /// Add the held-back half of the catalog, one product every 5000 to 10000 seconds
    StreamProducts {
        #[arg(long)]
        csv: PathBuf,
        /// Seed used to price the catalog; match the one given to `seed products`
        #[arg(long, default_value = "0")]
        catalog_seed: u64,
        #[command(flatten)]
        pacing: PacingArgs,
    },
    /// Rescale a random product's price to 80-150% every 500 to 1000 seconds
    DriftPrices {
        #[command(flatten)]
        pacing: PacingArgs,
    },
}

#[derive(clap::Args)]
struct PacingArgs {
    /// Stop after this many steps
    #[arg(long)]
    max_steps: Option<u64>,
    #[arg(long, default_value = "0")]
    seed: u64,
}

impl PacingArgs {
    fn apply(&self, defaults: ReplenishConfig) -> ReplenishConfig {
        ReplenishConfig {
            max_steps: self.max_steps,
            seed: self.seed,
            ..defaults
        }
    }
}

#[derive(Subcommand)]
enum SeedTarget {
    /// Insert the static size list
    Sizes,
    /// Insert customers with generated names
    Customers {
        #[arg(long)]
        count: usize,
        #[arg(long)]
        batch_size: Option<usize>,
        #[arg(long, default_value = "0")]
        seed: u64,
    },
    /// Import apparel products from a styles CSV
    Products {
        #[arg(long)]
        csv: PathBuf,
        #[arg(long, default_value = "0")]
        seed: u64,
    },
}

fn open_pool(cli: &Cli, min_size: usize) -> anyhow::Result<SqlitePool> {
    let mut config = PoolConfig::new(&cli.db);
    config.max_size = cli.pool_size.max(min_size);
    Ok(SqlitePool::open(config)?)
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(cli.log_level, cli.log_file.as_deref())?;

    match &cli.command {
        Commands::Schema { reset } => commands::schema::run(&open_pool(&cli, 1)?, *reset),
        Commands::Seed { target } => {
            let pool = open_pool(&cli, 1)?;
            match target {
                SeedTarget::Sizes => commands::seed::sizes(&pool),
                SeedTarget::Customers {
                    count,
                    batch_size,
                    seed,
                } => commands::seed::customers(&pool, *count, *batch_size, *seed),
                SeedTarget::Products { csv, seed } => commands::seed::products(&pool, csv, *seed),
            }
        }
        Commands::Backfill {
            start,
            end,
            days,
            workers,
            probability,
            pacing_secs,
            retries,
            seed,
            reset_schema,
        } => {
            let args = commands::backfill::BackfillArgs {
                start: *start,
                end: *end,
                days: *days,
                workers: *workers,
                probability: *probability,
                pacing_secs: *pacing_secs,
                retries: *retries,
                seed: *seed,
                reset_schema: *reset_schema,
            };
            commands::backfill::run(&open_pool(&cli, *workers)?, args)
        }
        Commands::Stream {
            probability,
            refresh_secs,
            max_events,
            seed,
        } => {
            let args = commands::stream::StreamArgs {
                probability: *probability,
                refresh_secs: *refresh_secs,
                max_events: *max_events,
                seed: *seed,
            };
            commands::stream::run(&open_pool(&cli, 1)?, args)
        }
        Commands::StreamCustomers { pacing } => commands::replenish::customers(
            &open_pool(&cli, 1)?,
            pacing.apply(ReplenishConfig::customers()),
        ),
        Commands::StreamProducts {
            csv,
            catalog_seed,
            pacing,
        } => commands::replenish::products(
            &open_pool(&cli, 1)?,
            csv,
            *catalog_seed,
            pacing.apply(ReplenishConfig::products()),
        ),
        Commands::DriftPrices { pacing } => commands::replenish::prices(
            &open_pool(&cli, 1)?,
            pacing.apply(ReplenishConfig::prices()),
        ),
    }
}
