pub mod cancel;
pub mod clock;
pub mod error;
pub mod generator;
pub mod historical;
pub mod intensity;
pub mod replenish;
pub mod retry;
pub mod seed;
pub mod snapshot;
pub mod streaming;
pub mod volume;

#[cfg(test)]
mod testing;

pub use cancel::CancellationToken;
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::SimError;
pub use generator::ReceiptGenerator;
pub use historical::{partition_days, run_historical, DayWindow};
pub use intensity::{DayProfile, IntensityModel};
pub use streaming::StreamingSimulator;
pub use volume::DailyVolume;
