use std::sync::Arc;
use std::time::Instant;

use chrono::NaiveDate;
use rayon::prelude::*;
use retail_sim_shared::config::HistoricalConfig;
use retail_sim_shared::model::{ReceiptBatch, ReferenceSnapshot, ReferenceTable};
use retail_sim_shared::result::{HistoricalReport, PartitionOutcome, PartitionResult, RunStatus};
use retail_sim_store::{PersistSummary, Persister, SchemaSetup, Session, SessionFactory, StoreError};
use tracing::{error, info, info_span, warn};

use crate::cancel::CancellationToken;
use crate::clock::Clock;
use crate::error::SimError;
use crate::generator::ReceiptGenerator;
use crate::retry::with_retry;
use crate::snapshot::{capture_snapshot, total_customers};
use crate::volume::DailyVolume;

/// One simulated day, handled by a single task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayWindow {
    pub index: usize,
    pub day: NaiveDate,
}

/// Consecutive one-day windows covering `[start, end)`.
pub fn partition_days(start: NaiveDate, end: NaiveDate) -> Vec<DayWindow> {
    start
        .iter_days()
        .take_while(|day| *day < end)
        .enumerate()
        .map(|(index, day)| DayWindow { index, day })
        .collect()
}

/// Backfills receipts for every day in the configured range.
///
/// Schema and snapshot failures abort before any task is dispatched. After
/// that, each day succeeds or fails on its own and the report carries the
/// per-day outcomes.
pub fn run_historical<F, C>(
    factory: &F,
    config: &HistoricalConfig,
    clock: &C,
    cancel: &CancellationToken,
) -> Result<HistoricalReport, SimError>
where
    F: SessionFactory,
    C: Clock + ?Sized,
{
    if config.workers == 0 {
        return Err(SimError::Config("worker pool width must be positive".into()));
    }
    let started = Instant::now();
    let volume = DailyVolume::new(config)?;

    // The init session is released before dispatch so workers can use its slot.
    let (snapshot, total_customers) = {
        let mut session = factory.acquire()?;
        session.prepare_receipt_tables(config.reset_schema)?;
        let snapshot = capture_snapshot(&mut session, clock.now())?;
        let total = total_customers(&mut session, &snapshot)?;
        (Arc::new(snapshot), total)
    };
    if snapshot.customer_ids().is_empty() {
        return Err(SimError::EmptySnapshot(ReferenceTable::Customer));
    }

    let end = config.end.unwrap_or_else(|| clock.now().date());
    let windows = partition_days(config.start, end);
    info!(
        start = %config.start,
        end = %end,
        days = windows.len(),
        workers = config.workers,
        total_customers,
        "Starting backfill"
    );

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.workers)
        .build()
        .map_err(|e| SimError::WorkerPool(e.to_string()))?;

    let task = PartitionTask {
        factory,
        config,
        snapshot: &snapshot,
        total_customers,
        volume: &volume,
        clock,
        cancel,
    };
    let results: Vec<PartitionResult> = pool.install(|| {
        windows
            .par_iter()
            .with_max_len(1)
            .map(|window| task.run(window))
            .collect()
    });

    let report = HistoricalReport::from_results(results);
    for failed in report.failures() {
        warn!(day = %failed.day, outcome = ?failed.outcome, "Partition not persisted");
    }
    match report.status() {
        RunStatus::Done => info!(
            receipts = report.total_receipts,
            items = report.total_items,
            elapsed = ?started.elapsed(),
            "Backfill done"
        ),
        RunStatus::PartialFailure => error!(
            failed = report.failures().count(),
            partitions = report.n_partitions(),
            elapsed = ?started.elapsed(),
            "Backfill finished with failures"
        ),
    }
    Ok(report)
}

struct PartitionTask<'a, F, C: ?Sized> {
    factory: &'a F,
    config: &'a HistoricalConfig,
    snapshot: &'a ReferenceSnapshot,
    total_customers: u64,
    volume: &'a DailyVolume,
    clock: &'a C,
    cancel: &'a CancellationToken,
}

impl<F, C> PartitionTask<'_, F, C>
where
    F: SessionFactory,
    C: Clock + ?Sized,
{
    fn run(&self, window: &DayWindow) -> PartitionResult {
        let span = info_span!("partition", day = %window.day);
        let _enter = span.enter();

        let mut result = PartitionResult {
            day: window.day,
            receipts: 0,
            items: 0,
            attempts: 0,
            outcome: PartitionOutcome::Cancelled,
        };
        if self.cancel.is_cancelled() {
            return result;
        }

        let batch = match self.generate(window) {
            Ok(batch) => batch,
            Err(e) => {
                error!("Error generating receipts: {e}");
                result.outcome = PartitionOutcome::Failed(e.to_string());
                return result;
            }
        };
        result.receipts = batch.receipts.len();
        result.items = batch.items.len();

        let (persisted, attempts) = self.persist(&batch);
        result.attempts = attempts;
        match persisted {
            Ok(summary) => {
                info!("receipt: {} rows inserted", summary.receipts_inserted);
                info!("receipt_item: {} rows inserted", summary.items_inserted);
                result.outcome = PartitionOutcome::Persisted;
                self.clock.sleep(self.config.pacing_delay);
            }
            Err(e) => {
                error!(attempts, "Error inserting receipts: {e}");
                result.outcome = PartitionOutcome::Failed(e.to_string());
            }
        }
        result
    }

    fn generate(&self, window: &DayWindow) -> Result<ReceiptBatch, SimError> {
        let seed = self.config.seed.wrapping_add(window.index as u64);
        let mut generator = ReceiptGenerator::new(self.config.generator.clone(), seed)?;
        generator.generate_day(self.snapshot, window.day, self.total_customers, self.volume)
    }

    /// The session lives for the whole task and is replaced after any error.
    fn persist(&self, batch: &ReceiptBatch) -> (Result<PersistSummary, StoreError>, u32) {
        let mut session: Option<F::Session> = None;
        with_retry(
            &self.config.retry,
            self.clock,
            StoreError::is_transient,
            |_| {
                let active = match session.as_mut() {
                    Some(active) => active,
                    None => session.insert(self.factory.acquire()?),
                };
                let persisted = active.persist(&batch.receipts, &batch.items);
                if persisted.is_err() {
                    if let Some(mut broken) = session.take() {
                        broken.discard();
                    }
                }
                persisted
            },
        )
    }
}
