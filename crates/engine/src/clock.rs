use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{Local, NaiveDateTime};

/// Source of wall-clock time and the only place the simulator blocks.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
    fn sleep(&self, duration: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }

    fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            std::thread::sleep(duration);
        }
    }
}

impl<T: Clock + ?Sized> Clock for &T {
    fn now(&self) -> NaiveDateTime {
        (**self).now()
    }

    fn sleep(&self, duration: Duration) {
        (**self).sleep(duration)
    }
}

impl<T: Clock + ?Sized> Clock for Arc<T> {
    fn now(&self) -> NaiveDateTime {
        (**self).now()
    }

    fn sleep(&self, duration: Duration) {
        (**self).sleep(duration)
    }
}

/// Simulated clock: sleeping advances time instantly.
#[derive(Debug)]
pub struct ManualClock {
    state: Mutex<ManualState>,
}

#[derive(Debug)]
struct ManualState {
    now: NaiveDateTime,
    sleeps: u64,
    slept: Duration,
}

impl ManualClock {
    pub fn new(start: NaiveDateTime) -> Self {
        Self {
            state: Mutex::new(ManualState {
                now: start,
                sleeps: 0,
                slept: Duration::ZERO,
            }),
        }
    }

    pub fn sleeps(&self) -> u64 {
        self.state.lock().map(|s| s.sleeps).unwrap_or_default()
    }

    pub fn total_slept(&self) -> Duration {
        self.state.lock().map(|s| s.slept).unwrap_or_default()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> NaiveDateTime {
        match self.state.lock() {
            Ok(state) => state.now,
            Err(poisoned) => poisoned.into_inner().now,
        }
    }

    fn sleep(&self, duration: Duration) {
        let mut state = match self.state.lock() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(next) = chrono::Duration::from_std(duration)
            .ok()
            .and_then(|step| state.now.checked_add_signed(step))
        {
            state.now = next;
        }
        state.sleeps += 1;
        state.slept = state.slept.saturating_add(duration);
    }
}
