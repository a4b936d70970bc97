use std::time::Duration;

use retail_sim_engine::{CancellationToken, StreamingSimulator, SystemClock};
use retail_sim_shared::config::StreamingConfig;
use retail_sim_store::{SchemaSetup, SessionFactory, SqlitePool};

use crate::output;

pub struct StreamArgs {
    pub probability: Option<f64>,
    pub refresh_secs: Option<u64>,
    pub max_events: Option<u64>,
    pub seed: u64,
}

pub fn run(pool: &SqlitePool, args: StreamArgs) -> anyhow::Result<()> {
    let defaults = StreamingConfig::default();
    let config = StreamingConfig {
        base_purchase_probability: args
            .probability
            .unwrap_or(defaults.base_purchase_probability),
        refresh_interval: args
            .refresh_secs
            .map_or(defaults.refresh_interval, Duration::from_secs),
        max_events: args.max_events,
        seed: args.seed,
        ..defaults
    };

    let mut session = pool.acquire()?;
    session.prepare_receipt_tables(false)?;
    let mut simulator = StreamingSimulator::new(session, SystemClock, config)?;
    // Only the event limit ends the loop; otherwise it runs until the process is killed.
    let stats = simulator.run(&CancellationToken::new());
    output::print_stream(&stats);
    Ok(())
}
