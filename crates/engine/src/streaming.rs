use std::time::Duration;

use chrono::NaiveDateTime;
use retail_sim_shared::config::StreamingConfig;
use retail_sim_shared::model::ReferenceSnapshot;
use retail_sim_shared::result::StreamingStats;
use retail_sim_store::{PersistSummary, Session, StoreError};
use tracing::{debug, error, info, info_span};

use crate::cancel::CancellationToken;
use crate::clock::Clock;
use crate::error::SimError;
use crate::generator::ReceiptGenerator;
use crate::intensity::{DayProfile, IntensityModel};
use crate::retry::with_retry;
use crate::snapshot::{capture_snapshot, total_customers};

/// Real-time simulator: one receipt at a time, paced by [`IntensityModel`].
///
/// Loops are nested day > refresh window > event. The day loop samples a
/// [`DayProfile`], the refresh loop replaces the snapshot, and the event loop
/// generates, persists and sleeps. Errors inside the loops are logged and
/// never end the run.
pub struct StreamingSimulator<S, C> {
    session: S,
    clock: C,
    config: StreamingConfig,
    generator: ReceiptGenerator,
    intensity: IntensityModel,
    current: Option<(ReferenceSnapshot, u64)>,
    stats: StreamingStats,
}

impl<S: Session, C: Clock> StreamingSimulator<S, C> {
    pub fn new(session: S, clock: C, config: StreamingConfig) -> Result<Self, SimError> {
        if config.refresh_interval.is_zero() {
            return Err(SimError::Config("refresh interval must be positive".into()));
        }
        let p = config.base_purchase_probability;
        if !(p.is_finite() && p > 0.0 && p <= 1.0) {
            return Err(SimError::Config(format!(
                "purchase probability {p} is outside (0, 1]"
            )));
        }
        let generator = ReceiptGenerator::new(config.generator.clone(), config.seed)?;
        let intensity =
            IntensityModel::new(config.base_purchase_probability, config.seed.wrapping_add(1));
        Ok(Self {
            session,
            clock,
            config,
            generator,
            intensity,
            current: None,
            stats: StreamingStats::default(),
        })
    }

    pub fn stats(&self) -> &StreamingStats {
        &self.stats
    }

    /// Runs until `cancel` fires or the configured event limit is reached.
    pub fn run(&mut self, cancel: &CancellationToken) -> StreamingStats {
        info!("Streaming started");
        while !self.should_stop(cancel) {
            let today = self.clock.now().date();
            let profile = self.intensity.sample_day(today);
            self.stats.days += 1;

            let span = info_span!("day", date = %today);
            let _enter = span.enter();
            info!(
                day_coefficient = profile.day_coefficient,
                base_hour = profile.base_hour,
                "Day profile sampled"
            );

            while self.clock.now().date() == today && !self.should_stop(cancel) {
                let window_end = self.window_end();
                let Some(total) = self.refresh() else {
                    self.clock.sleep(self.config.snapshot_retry_delay);
                    continue;
                };
                while self.clock.now() < window_end
                    && self.clock.now().date() == today
                    && !self.should_stop(cancel)
                {
                    self.step(&profile, total);
                }
            }
        }
        info!(
            events = self.stats.events,
            persisted = self.stats.persisted,
            errors = self.stats.errors,
            "Streaming stopped"
        );
        self.stats.clone()
    }

    fn window_end(&self) -> NaiveDateTime {
        let now = self.clock.now();
        chrono::Duration::from_std(self.config.refresh_interval)
            .ok()
            .and_then(|step| now.checked_add_signed(step))
            .unwrap_or(NaiveDateTime::MAX)
    }

    fn should_stop(&self, cancel: &CancellationToken) -> bool {
        cancel.is_cancelled()
            || self
                .config
                .max_events
                .is_some_and(|max| self.stats.events >= max)
    }

    /// Replaces the snapshot. On failure the previous one stays in use;
    /// `None` means there is nothing to generate from yet.
    fn refresh(&mut self) -> Option<u64> {
        self.stats.refreshes += 1;
        let now = self.clock.now();
        let refreshed = capture_snapshot(&mut self.session, now).and_then(|snapshot| {
            let total = total_customers(&mut self.session, &snapshot)?;
            Ok((snapshot, total))
        });
        match refreshed {
            Ok((snapshot, total)) => {
                debug!(total_customers = total, "Snapshot refreshed");
                self.current = Some((snapshot, total));
            }
            Err(e) => {
                self.stats.errors += 1;
                error!("Error refreshing snapshot: {e}");
            }
        }
        self.current.as_ref().map(|(_, total)| *total)
    }

    fn step(&mut self, profile: &DayProfile, total: u64) {
        self.stats.events += 1;
        match self.emit(self.clock.now()) {
            Ok(summary) => {
                self.stats.persisted += 1;
                info!("receipt: {} rows inserted", summary.receipts_inserted);
                info!("receipt_item: {} rows inserted", summary.items_inserted);
            }
            Err(e) => {
                self.stats.errors += 1;
                error!("Error: {e}");
            }
        }

        let now = self.clock.now();
        let interval = match self.intensity.expected_interval(now, total, profile) {
            Ok(secs) => secs,
            Err(e) => {
                self.stats.errors += 1;
                error!("Error computing interval: {e}");
                self.config.snapshot_retry_delay.as_secs_f64()
            }
        };
        info!("Current datetime: {now}, Interval: {interval:.3}");
        self.clock
            .sleep(Duration::try_from_secs_f64(interval).unwrap_or(Duration::MAX));
    }

    fn emit(&mut self, now: NaiveDateTime) -> Result<PersistSummary, SimError> {
        let Some((snapshot, _)) = self.current.as_ref() else {
            return Err(StoreError::Snapshot("no snapshot captured".into()).into());
        };
        let (receipt, items) = self.generator.generate_receipt(snapshot, now)?;
        let receipts = [receipt];
        let session = &mut self.session;
        let (persisted, _) = with_retry(
            &self.config.retry,
            &self.clock,
            StoreError::is_transient,
            |_| session.persist(&receipts, &items),
        );
        Ok(persisted?)
    }
}
