use std::fs::File;
use std::path::Path;

use anyhow::Context;
use rand::SeedableRng;
use rand_pcg::Pcg64;
use retail_sim_engine::replenish::{drift_prices, stream_customers, stream_products};
use retail_sim_engine::seed::{price_catalog, read_apparel_catalog};
use retail_sim_engine::{CancellationToken, SystemClock};
use retail_sim_shared::config::ReplenishConfig;
use retail_sim_store::{SessionFactory, SqlitePool};

use crate::output;

pub fn customers(pool: &SqlitePool, config: ReplenishConfig) -> anyhow::Result<()> {
    let mut session = pool.acquire()?;
    let stats = stream_customers(&mut session, &SystemClock, &config, &CancellationToken::new())?;
    output::print_replenish("Customers", &stats);
    Ok(())
}

/// `catalog_seed` must match the one given to `seed products` for the
/// already-stored half to line up with the same prices.
pub fn products(
    pool: &SqlitePool,
    csv: &Path,
    catalog_seed: u64,
    config: ReplenishConfig,
) -> anyhow::Result<()> {
    let file = File::open(csv).with_context(|| format!("Failed to open {}", csv.display()))?;
    let mut rng = Pcg64::seed_from_u64(catalog_seed);
    let catalog = price_catalog(read_apparel_catalog(file)?, &mut rng)?;
    let mut session = pool.acquire()?;
    let stats = stream_products(
        &mut session,
        &catalog,
        &SystemClock,
        &config,
        &CancellationToken::new(),
    )?;
    output::print_replenish("Products", &stats);
    Ok(())
}

pub fn prices(pool: &SqlitePool, config: ReplenishConfig) -> anyhow::Result<()> {
    let mut session = pool.acquire()?;
    let stats = drift_prices(&mut session, &SystemClock, &config, &CancellationToken::new())?;
    output::print_replenish("Price changes", &stats);
    Ok(())
}
