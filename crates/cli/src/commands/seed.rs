use std::fs::File;
use std::path::Path;

use anyhow::Context;
use rand::SeedableRng;
use rand_pcg::Pcg64;
use retail_sim_engine::seed::{fake_customers, initial_products, price_catalog, read_apparel_catalog};
use retail_sim_engine::{Clock, SystemClock};
use retail_sim_shared::config::CUSTOMER_BATCH_SIZE;
use retail_sim_shared::model::SIZES;
use retail_sim_store::{SessionFactory, SqlitePool};

pub fn sizes(pool: &SqlitePool) -> anyhow::Result<()> {
    let inserted = pool.acquire()?.insert_sizes(&SIZES)?;
    println!("Inserted {inserted} sizes");
    Ok(())
}

/// Each batch is generated and committed on its own.
pub fn customers(
    pool: &SqlitePool,
    count: usize,
    batch_size: Option<usize>,
    seed: u64,
) -> anyhow::Result<()> {
    let batch_size = batch_size.unwrap_or(CUSTOMER_BATCH_SIZE).max(1);
    let today = SystemClock.now().date();
    let mut rng = Pcg64::seed_from_u64(seed);
    let mut session = pool.acquire()?;
    let mut inserted = 0;
    while inserted < count {
        let n = batch_size.min(count - inserted);
        let batch = fake_customers(n, today, &mut rng);
        session.insert_customers(&batch)?;
        inserted += n;
    }
    println!("Inserted {inserted} customers");
    Ok(())
}

pub fn products(pool: &SqlitePool, csv: &Path, seed: u64) -> anyhow::Result<()> {
    let file = File::open(csv).with_context(|| format!("Failed to open {}", csv.display()))?;
    let catalog = read_apparel_catalog(file)?;
    let mut rng = Pcg64::seed_from_u64(seed);
    let products = initial_products(price_catalog(catalog, &mut rng)?);
    let inserted = pool.acquire()?.insert_products(&products)?;
    println!("Inserted {inserted} products");
    Ok(())
}
