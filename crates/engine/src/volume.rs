use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime};
use rand::Rng;
use rand_distr::{Binomial, Distribution, Normal};
use retail_sim_shared::config::HistoricalConfig;
use retail_sim_shared::time::{truncate_to_millis, SECONDS_PER_HOUR};

use crate::error::SimError;
use crate::intensity::{day_coefficient, DayKind};

/// Purchase probability for one day, scaled by a fresh day coefficient.
pub fn daily_purchase_probability<R: Rng + ?Sized>(
    base_probability: f64,
    date: NaiveDate,
    rng: &mut R,
) -> f64 {
    (base_probability * day_coefficient(date.weekday(), rng)).clamp(0.0, 1.0)
}

/// Historical volume strategy: binomial daily count around a day-kind mean time.
#[derive(Debug, Clone)]
pub struct DailyVolume {
    purchase_probability: f64,
    weekday_mean_time: NaiveTime,
    weekend_mean_time: NaiveTime,
    jitter: Normal<f64>,
}

impl DailyVolume {
    pub fn new(config: &HistoricalConfig) -> Result<Self, SimError> {
        if !(0.0..=1.0).contains(&config.purchase_probability) {
            return Err(SimError::Config(format!(
                "purchase probability {} outside [0, 1]",
                config.purchase_probability
            )));
        }
        let jitter = Normal::new(0.0, config.std_dev_hours * SECONDS_PER_HOUR)
            .map_err(|e| SimError::Distribution(e.to_string()))?;
        Ok(Self {
            purchase_probability: config.purchase_probability,
            weekday_mean_time: config.weekday_mean_time,
            weekend_mean_time: config.weekend_mean_time,
            jitter,
        })
    }

    pub fn purchase_count<R: Rng + ?Sized>(
        &self,
        date: NaiveDate,
        total_customers: u64,
        rng: &mut R,
    ) -> Result<u64, SimError> {
        let p = daily_purchase_probability(self.purchase_probability, date, rng);
        let binomial =
            Binomial::new(total_customers, p).map_err(|e| SimError::Distribution(e.to_string()))?;
        Ok(binomial.sample(rng))
    }

    /// The jitter may push a receipt into a neighbouring day.
    pub fn receipt_time<R: Rng + ?Sized>(&self, date: NaiveDate, rng: &mut R) -> NaiveDateTime {
        let mean_time = match DayKind::of(date.weekday()) {
            DayKind::Weekday => self.weekday_mean_time,
            DayKind::Weekend => self.weekend_mean_time,
        };
        let offset_ms = (self.jitter.sample(rng) * 1_000.0).round() as i64;
        let ts = date.and_time(mean_time);
        let ts = ts
            .checked_add_signed(chrono::Duration::milliseconds(offset_ms))
            .unwrap_or(ts);
        truncate_to_millis(ts)
    }
}
