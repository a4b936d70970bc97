use std::path::PathBuf;
use std::time::Duration;

use chrono::{NaiveDate, NaiveTime};

// Baseline simulation parameters
pub const BASE_PURCHASE_PROBABILITY: f64 = 0.01;
pub const ITEM_GAMMA_SHAPE: f64 = 2.0;
pub const ITEM_GAMMA_SCALE: f64 = 0.55;
pub const HISTORICAL_MAX_ITEMS: u32 = 20;
pub const HISTORICAL_MAX_QUANTITY: u32 = 50;
pub const WEEKDAY_MEAN_HOUR: u32 = 20;
pub const WEEKEND_MEAN_HOUR: u32 = 15;
pub const RECEIPT_TIME_STD_DEV_HOURS: f64 = 2.0;
pub const DEFAULT_WORKERS: usize = 32;
pub const DEFAULT_BACKFILL_DAYS: i64 = 60;
pub const PACING_DELAY: Duration = Duration::from_secs(5);
pub const SNAPSHOT_REFRESH_INTERVAL: Duration = Duration::from_secs(60);
pub const SNAPSHOT_RETRY_DELAY: Duration = Duration::from_secs(5);
pub const PRODUCT_PRICE_GAMMA_SHAPE: f64 = 3.0;
pub const PRODUCT_PRICE_GAMMA_SCALE: f64 = 30.0;
pub const CUSTOMER_BATCH_SIZE: usize = 100_000;
pub const CUSTOMER_ADD_INTERVAL_SECS: (u64, u64) = (1, 50);
pub const PRODUCT_ADD_INTERVAL_SECS: (u64, u64) = (5_000, 10_000);
pub const PRICE_DRIFT_INTERVAL_SECS: (u64, u64) = (500, 1_000);
/// New price as a percentage of the old one, inclusive.
pub const PRICE_DRIFT_PERCENT: (u32, u32) = (80, 150);

/// Shape of the item-count and quantity distributions, plus optional caps.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratorConfig {
    pub gamma_shape: f64,
    pub gamma_scale: f64,
    pub max_items: Option<u32>,
    pub max_quantity: Option<u32>,
}

impl GeneratorConfig {
    pub fn historical() -> Self {
        Self {
            max_items: Some(HISTORICAL_MAX_ITEMS),
            max_quantity: Some(HISTORICAL_MAX_QUANTITY),
            ..Self::streaming()
        }
    }

    pub fn streaming() -> Self {
        Self {
            gamma_shape: ITEM_GAMMA_SHAPE,
            gamma_scale: ITEM_GAMMA_SCALE,
            max_items: None,
            max_quantity: None,
        }
    }
}

/// Caller-owned retry policy with capped exponential backoff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let shift = attempt.min(31);
        let base_ms = duration_to_u64_ms(self.base_delay);
        let max_ms = duration_to_u64_ms(self.max_delay);
        let raw = base_ms.saturating_mul(1_u64 << shift);
        Duration::from_millis(raw.min(max_ms))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
        }
    }
}

fn duration_to_u64_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

#[derive(Debug, Clone)]
pub struct HistoricalConfig {
    pub start: NaiveDate,
    /// Exclusive end of the range; `None` runs up to the current day.
    pub end: Option<NaiveDate>,
    pub purchase_probability: f64,
    pub weekday_mean_time: NaiveTime,
    pub weekend_mean_time: NaiveTime,
    pub std_dev_hours: f64,
    pub workers: usize,
    pub pacing_delay: Duration,
    pub retry: RetryPolicy,
    pub generator: GeneratorConfig,
    pub reset_schema: bool,
    pub seed: u64,
}

impl Default for HistoricalConfig {
    fn default() -> Self {
        let start = NaiveDate::from_ymd_opt(2024, 3, 25).unwrap_or_default();
        Self {
            start,
            end: start.checked_add_days(chrono::Days::new(DEFAULT_BACKFILL_DAYS as u64)),
            purchase_probability: BASE_PURCHASE_PROBABILITY,
            weekday_mean_time: NaiveTime::from_hms_opt(WEEKDAY_MEAN_HOUR, 0, 0).unwrap_or_default(),
            weekend_mean_time: NaiveTime::from_hms_opt(WEEKEND_MEAN_HOUR, 0, 0).unwrap_or_default(),
            std_dev_hours: RECEIPT_TIME_STD_DEV_HOURS,
            workers: DEFAULT_WORKERS,
            pacing_delay: PACING_DELAY,
            retry: RetryPolicy::default(),
            generator: GeneratorConfig::historical(),
            reset_schema: false,
            seed: 0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct StreamingConfig {
    pub base_purchase_probability: f64,
    pub refresh_interval: Duration,
    pub snapshot_retry_delay: Duration,
    pub retry: RetryPolicy,
    pub generator: GeneratorConfig,
    /// Stop after this many events; `None` runs until cancelled.
    pub max_events: Option<u64>,
    pub seed: u64,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            base_purchase_probability: BASE_PURCHASE_PROBABILITY,
            refresh_interval: SNAPSHOT_REFRESH_INTERVAL,
            snapshot_retry_delay: SNAPSHOT_RETRY_DELAY,
            retry: RetryPolicy::none(),
            generator: GeneratorConfig::streaming(),
            max_events: None,
            seed: 0,
        }
    }
}

/// Pacing for one of the reference-data replenishment loops.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplenishConfig {
    /// Pause after each step, drawn uniformly in whole seconds (inclusive).
    pub min_interval_secs: u64,
    pub max_interval_secs: u64,
    /// Stop after this many steps; `None` runs until cancelled.
    pub max_steps: Option<u64>,
    pub seed: u64,
}

impl ReplenishConfig {
    fn with_interval((min, max): (u64, u64)) -> Self {
        Self {
            min_interval_secs: min,
            max_interval_secs: max,
            max_steps: None,
            seed: 0,
        }
    }

    pub fn customers() -> Self {
        Self::with_interval(CUSTOMER_ADD_INTERVAL_SECS)
    }

    pub fn products() -> Self {
        Self::with_interval(PRODUCT_ADD_INTERVAL_SECS)
    }

    pub fn prices() -> Self {
        Self::with_interval(PRICE_DRIFT_INTERVAL_SECS)
    }
}

#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub path: PathBuf,
    pub max_size: usize,
    pub busy_timeout: Duration,
    pub acquire_timeout: Duration,
}

impl PoolConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            max_size: DEFAULT_WORKERS,
            busy_timeout: Duration::from_secs(30),
            acquire_timeout: Duration::from_secs(120),
        }
    }
}
