use std::ops::RangeInclusive;

use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike, Weekday};
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use rand_pcg::Pcg64;
use retail_sim_shared::model::ReferenceTable;
use retail_sim_shared::time::SECONDS_PER_DAY;

use crate::error::SimError;

/// Lower bound on a pacing interval, in seconds.
pub const MIN_INTERVAL_SECS: f64 = 0.001;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayKind {
    Weekday,
    Weekend,
}

impl DayKind {
    pub fn of(weekday: Weekday) -> Self {
        match weekday {
            Weekday::Sat | Weekday::Sun => DayKind::Weekend,
            _ => DayKind::Weekday,
        }
    }

    /// Bounds of both the day coefficient and the time coefficient.
    pub fn coefficient_range(self) -> (f64, f64) {
        match self {
            DayKind::Weekday => (0.5, 1.5),
            DayKind::Weekend => (1.5, 3.0),
        }
    }

    pub fn base_hour_range(self) -> RangeInclusive<u32> {
        match self {
            DayKind::Weekday => 18..=20,
            DayKind::Weekend => 12..=18,
        }
    }

    /// Interval standard deviation as a multiple of its mean.
    pub fn interval_spread(self) -> f64 {
        match self {
            DayKind::Weekday => 0.5,
            DayKind::Weekend => 2.0,
        }
    }
}

pub fn day_coefficient<R: Rng + ?Sized>(weekday: Weekday, rng: &mut R) -> f64 {
    let (lo, hi) = DayKind::of(weekday).coefficient_range();
    rng.gen_range(lo..=hi)
}

/// Peaks at `base_hour` and decays with the cube of the circular hour distance.
pub fn time_coefficient(hour: u32, base_hour: u32, min: f64, max: f64) -> f64 {
    let diff = (hour % 24).abs_diff(base_hour % 24);
    let dist = diff.min(24 - diff) as f64;
    min + (max - min) * (1.0 - (dist / 12.0).powi(3))
}

/// Intensity parameters held fixed for one simulated day.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DayProfile {
    pub date: NaiveDate,
    pub kind: DayKind,
    pub day_coefficient: f64,
    pub base_hour: u32,
    pub min_coefficient: f64,
    pub max_coefficient: f64,
}

impl DayProfile {
    pub fn sample<R: Rng + ?Sized>(date: NaiveDate, rng: &mut R) -> Self {
        let kind = DayKind::of(date.weekday());
        let (min_coefficient, max_coefficient) = kind.coefficient_range();
        Self {
            date,
            kind,
            day_coefficient: day_coefficient(date.weekday(), rng),
            base_hour: rng.gen_range(kind.base_hour_range()),
            min_coefficient,
            max_coefficient,
        }
    }

    pub fn effective_coefficient(&self, hour: u32) -> f64 {
        self.day_coefficient
            * time_coefficient(
                hour,
                self.base_hour,
                self.min_coefficient,
                self.max_coefficient,
            )
    }
}

/// Mean seconds between purchases at `hour` for the given day.
pub fn mean_interval(
    hour: u32,
    total_customers: u64,
    profile: &DayProfile,
    base_probability: f64,
) -> Result<f64, SimError> {
    if total_customers == 0 {
        return Err(SimError::EmptySnapshot(ReferenceTable::Customer));
    }
    let probability = base_probability * profile.effective_coefficient(hour);
    if !(probability > 0.0 && probability.is_finite()) {
        return Err(SimError::Config(format!(
            "purchase probability must be positive, got {probability}"
        )));
    }
    Ok(SECONDS_PER_DAY / (total_customers as f64 * probability))
}

/// Draws the pause before the next event: a normal sample around the mean,
/// folded to its absolute value and floored at [`MIN_INTERVAL_SECS`].
pub fn expected_interval<R: Rng + ?Sized>(
    rng: &mut R,
    now: NaiveDateTime,
    total_customers: u64,
    profile: &DayProfile,
    base_probability: f64,
) -> Result<f64, SimError> {
    let mean = mean_interval(now.hour(), total_customers, profile, base_probability)?;
    let spread = DayKind::of(now.weekday()).interval_spread();
    let normal =
        Normal::new(mean, mean * spread).map_err(|e| SimError::Distribution(e.to_string()))?;
    Ok(normal.sample(rng).abs().max(MIN_INTERVAL_SECS))
}

/// Streaming intensity strategy with its own random stream.
pub struct IntensityModel {
    base_probability: f64,
    rng: Pcg64,
}

impl IntensityModel {
    pub fn new(base_probability: f64, seed: u64) -> Self {
        Self {
            base_probability,
            rng: Pcg64::seed_from_u64(seed),
        }
    }

    pub fn sample_day(&mut self, date: NaiveDate) -> DayProfile {
        DayProfile::sample(date, &mut self.rng)
    }

    pub fn expected_interval(
        &mut self,
        now: NaiveDateTime,
        total_customers: u64,
        profile: &DayProfile,
    ) -> Result<f64, SimError> {
        expected_interval(
            &mut self.rng,
            now,
            total_customers,
            profile,
            self.base_probability,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 25).unwrap()
    }

    #[test]
    fn test_day_coefficient_ranges() {
        let mut rng = Pcg64::seed_from_u64(42);
        for _ in 0..1_000 {
            for wd in [Weekday::Mon, Weekday::Tue, Weekday::Wed, Weekday::Thu, Weekday::Fri] {
                let c = day_coefficient(wd, &mut rng);
                assert!((0.5..=1.5).contains(&c), "{wd}: {c}");
            }
            for wd in [Weekday::Sat, Weekday::Sun] {
                let c = day_coefficient(wd, &mut rng);
                assert!((1.5..=3.0).contains(&c), "{wd}: {c}");
            }
        }
    }

    #[test]
    fn test_time_coefficient_peak_and_trough() {
        assert_eq!(time_coefficient(20, 20, 0.5, 1.5), 1.5);
        assert_eq!(time_coefficient(8, 20, 0.5, 1.5), 0.5);
        // circular: 23 and 1 are two hours apart
        assert_eq!(
            time_coefficient(23, 1, 0.5, 1.5),
            time_coefficient(3, 1, 0.5, 1.5)
        );
    }

    #[test]
    fn test_time_coefficient_symmetric_around_base() {
        for base in 0..24 {
            for hour in 0..24 {
                let mirrored = (2 * base + 24 - hour) % 24;
                let a = time_coefficient(hour, base, 1.5, 3.0);
                let b = time_coefficient(mirrored, base, 1.5, 3.0);
                assert!((a - b).abs() < 1e-12, "base={base} hour={hour}");
                assert!((1.5..=3.0).contains(&a));
            }
        }
    }

    #[test]
    fn test_day_profile_matches_day_kind() {
        let mut rng = Pcg64::seed_from_u64(7);
        for offset in 0..14 {
            let date = monday() + chrono::Days::new(offset);
            let profile = DayProfile::sample(date, &mut rng);
            assert!(profile.kind.base_hour_range().contains(&profile.base_hour));
            match profile.kind {
                DayKind::Weekday => assert_eq!(profile.max_coefficient, 1.5),
                DayKind::Weekend => {
                    assert!(offset % 7 >= 5);
                    assert_eq!(profile.min_coefficient, 1.5);
                }
            }
        }
    }

    #[test]
    fn test_mean_interval_formula() {
        let profile = DayProfile {
            date: monday(),
            kind: DayKind::Weekday,
            day_coefficient: 1.0,
            base_hour: 20,
            min_coefficient: 0.5,
            max_coefficient: 1.5,
        };
        // 86400 / (1000 * 0.01 * 1.5)
        let mean = mean_interval(20, 1_000, &profile, 0.01).unwrap();
        assert!((mean - 5760.0).abs() < 1e-9);
    }

    #[test]
    fn test_expected_interval_always_positive() {
        let mut model = IntensityModel::new(0.01, 3);
        for offset in 0..7 {
            let date = monday() + chrono::Days::new(offset);
            let profile = model.sample_day(date);
            for hour in 0..24 {
                let now = date.and_hms_opt(hour, 30, 0).unwrap();
                for customers in [1, 3, 1_000, 5_000_000] {
                    let interval = model.expected_interval(now, customers, &profile).unwrap();
                    assert!(interval >= MIN_INTERVAL_SECS, "{now} {customers}: {interval}");
                    assert!(interval.is_finite());
                }
            }
        }
    }

    #[test]
    fn test_weekend_intervals_spread_wider() {
        // rms / mean is sqrt(1 + spread^2): 1.118 on weekdays, 2.236 on weekends
        let rms_ratio = |date: NaiveDate| {
            let mut rng = Pcg64::seed_from_u64(17);
            let profile = DayProfile::sample(date, &mut rng);
            let now = date.and_hms_opt(14, 0, 0).unwrap();
            let mean = mean_interval(14, 10_000, &profile, 0.01).unwrap();
            let n = 20_000;
            let sum_sq: f64 = (0..n)
                .map(|_| expected_interval(&mut rng, now, 10_000, &profile, 0.01).unwrap())
                .map(|x| (x / mean).powi(2))
                .sum();
            (sum_sq / n as f64).sqrt()
        };
        let weekday = rms_ratio(monday());
        let weekend = rms_ratio(NaiveDate::from_ymd_opt(2024, 3, 30).unwrap());
        assert!((weekday - 1.118).abs() < 0.03, "weekday {weekday}");
        assert!((weekend - 2.236).abs() < 0.08, "weekend {weekend}");
    }

    #[test]
    fn test_expected_interval_rejects_no_customers() {
        let mut model = IntensityModel::new(0.01, 3);
        let profile = model.sample_day(monday());
        let now = monday().and_hms_opt(12, 0, 0).unwrap();
        assert!(matches!(
            model.expected_interval(now, 0, &profile),
            Err(SimError::EmptySnapshot(ReferenceTable::Customer))
        ));
    }
}
