use std::time::{Duration, Instant};

use chrono::{Days, NaiveDate};
use retail_sim_engine::{run_historical, CancellationToken, SystemClock};
use retail_sim_shared::config::{HistoricalConfig, RetryPolicy};
use retail_sim_shared::result::RunStatus;
use retail_sim_store::schema::Table;
use retail_sim_store::{SessionFactory, SqlitePool};

use crate::output;

pub struct BackfillArgs {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub days: Option<u64>,
    pub workers: usize,
    pub probability: Option<f64>,
    pub pacing_secs: Option<f64>,
    pub retries: Option<u32>,
    pub seed: u64,
    pub reset_schema: bool,
}

impl BackfillArgs {
    fn into_config(self) -> anyhow::Result<HistoricalConfig> {
        let defaults = HistoricalConfig::default();
        let start = self.start.unwrap_or(defaults.start);
        let end = match (self.end, self.days) {
            (Some(end), _) => Some(end),
            (None, Some(days)) => Some(
                start
                    .checked_add_days(Days::new(days))
                    .ok_or_else(|| anyhow::anyhow!("--days {days} overflows the calendar"))?,
            ),
            (None, None) => None,
        };
        let pacing_delay = match self.pacing_secs {
            Some(secs) => Duration::try_from_secs_f64(secs)
                .map_err(|e| anyhow::anyhow!("Invalid --pacing-secs {secs}: {e}"))?,
            None => defaults.pacing_delay,
        };
        let retry = match self.retries {
            Some(attempts) => RetryPolicy {
                max_attempts: attempts.max(1),
                ..RetryPolicy::default()
            },
            None => defaults.retry.clone(),
        };
        Ok(HistoricalConfig {
            start,
            end,
            purchase_probability: self.probability.unwrap_or(defaults.purchase_probability),
            workers: self.workers,
            pacing_delay,
            retry,
            reset_schema: self.reset_schema,
            seed: self.seed,
            ..defaults
        })
    }
}

pub fn run(pool: &SqlitePool, args: BackfillArgs) -> anyhow::Result<()> {
    let config = args.into_config()?;
    println!(
        "Backfilling from {} to {} with {} workers...",
        config.start,
        config
            .end
            .map_or_else(|| "today".to_string(), |end| end.to_string()),
        config.workers,
    );

    let start = Instant::now();
    let report = run_historical(pool, &config, &SystemClock, &CancellationToken::new())?;
    let elapsed = start.elapsed();

    let mut session = pool.acquire()?;
    let rows = (
        session.count_rows(Table::Receipt)?,
        session.count_rows(Table::ReceiptItem)?,
    );
    output::print_backfill(&report, elapsed, rows);

    match report.status() {
        RunStatus::Done => Ok(()),
        RunStatus::PartialFailure => anyhow::bail!(
            "{} of {} days were not persisted",
            report.failures().count(),
            report.n_partitions()
        ),
    }
}
