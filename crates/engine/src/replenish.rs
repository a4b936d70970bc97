//! Paced loops that keep the reference tables moving while receipts stream:
//! new customers, the held-back half of the product catalog, and price drift.

use std::time::Duration;

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;
use retail_sim_shared::config::{ReplenishConfig, PRICE_DRIFT_PERCENT};
use retail_sim_shared::model::{NewProduct, ReferenceTable};
use retail_sim_shared::result::ReplenishStats;
use retail_sim_store::ReferenceWriter;
use tracing::{error, info};

use crate::cancel::CancellationToken;
use crate::clock::Clock;
use crate::error::SimError;
use crate::seed::fake_customer;

enum Step {
    Applied,
    /// Applied, and there is nothing left to do afterwards.
    Last,
    /// Nothing to act on yet; wait and try again.
    Skipped,
    Exhausted,
}

/// Inserts one generated customer per step.
pub fn stream_customers<W, C>(
    writer: &mut W,
    clock: &C,
    config: &ReplenishConfig,
    cancel: &CancellationToken,
) -> Result<ReplenishStats, SimError>
where
    W: ReferenceWriter + ?Sized,
    C: Clock + ?Sized,
{
    run_paced("customer", clock, config, cancel, |rng| {
        let customer = fake_customer(clock.now().date(), rng);
        let id = writer.insert_customer(&customer)?;
        info!(
            id,
            "Added customer: {} {} {}",
            customer.first_name,
            customer.last_name,
            customer.birth_dt
        );
        Ok(Step::Applied)
    })
}

/// Inserts `catalog` one product per step, continuing after the products
/// already stored. Returns once the catalog is used up.
pub fn stream_products<W, C>(
    writer: &mut W,
    catalog: &[NewProduct],
    clock: &C,
    config: &ReplenishConfig,
    cancel: &CancellationToken,
) -> Result<ReplenishStats, SimError>
where
    W: ReferenceWriter + ?Sized,
    C: Clock + ?Sized,
{
    let mut next = writer.ids(ReferenceTable::Product)?.len();
    info!(stored = next, catalog = catalog.len(), "Resuming product catalog");
    run_paced("product", clock, config, cancel, |_| {
        let Some(product) = catalog.get(next) else {
            return Ok(Step::Exhausted);
        };
        let id = writer.insert_product(product)?;
        next += 1;
        info!(id, price = product.price, "Added product: {}", product.name);
        Ok(if next < catalog.len() {
            Step::Applied
        } else {
            Step::Last
        })
    })
}

/// Rescales the price of one random product per step.
pub fn drift_prices<W, C>(
    writer: &mut W,
    clock: &C,
    config: &ReplenishConfig,
    cancel: &CancellationToken,
) -> Result<ReplenishStats, SimError>
where
    W: ReferenceWriter + ?Sized,
    C: Clock + ?Sized,
{
    run_paced("price", clock, config, cancel, |rng| {
        let ids = writer.ids(ReferenceTable::Product)?;
        let Some(&id) = ids.choose(rng) else {
            return Ok(Step::Skipped);
        };
        let Some(price) = writer.product_price(id)? else {
            return Ok(Step::Skipped);
        };
        let new_price = drifted_price(price, rng);
        writer.set_product_price(id, new_price)?;
        info!("product id {id} changed price from {price} to {new_price}");
        Ok(Step::Applied)
    })
}

/// `price` scaled by a whole percentage in [`PRICE_DRIFT_PERCENT`], in cents.
pub fn drifted_price<R: Rng + ?Sized>(price: f64, rng: &mut R) -> f64 {
    let (low, high) = PRICE_DRIFT_PERCENT;
    let percent = rng.gen_range(low..=high);
    (price * f64::from(percent)).round() / 100.0
}

fn run_paced<C, F>(
    name: &'static str,
    clock: &C,
    config: &ReplenishConfig,
    cancel: &CancellationToken,
    mut step: F,
) -> Result<ReplenishStats, SimError>
where
    C: Clock + ?Sized,
    F: FnMut(&mut Pcg64) -> Result<Step, SimError>,
{
    if config.min_interval_secs > config.max_interval_secs {
        return Err(SimError::Config(format!(
            "{name} interval {}..{} is empty",
            config.min_interval_secs, config.max_interval_secs
        )));
    }
    let mut rng = Pcg64::seed_from_u64(config.seed);
    let mut stats = ReplenishStats::default();

    info!("Replenishing {name} started");
    while !cancel.is_cancelled() && !config.max_steps.is_some_and(|max| stats.steps >= max) {
        stats.steps += 1;
        match step(&mut rng) {
            Ok(Step::Applied) => stats.applied += 1,
            Ok(Step::Last) => {
                stats.applied += 1;
                break;
            }
            Ok(Step::Skipped) => {}
            Ok(Step::Exhausted) => break,
            Err(e) => {
                stats.errors += 1;
                error!("Error replenishing {name}: {e}");
            }
        }
        let secs = rng.gen_range(config.min_interval_secs..=config.max_interval_secs);
        clock.sleep(Duration::from_secs(secs));
    }
    info!(
        applied = stats.applied,
        errors = stats.errors,
        "Replenishing {name} stopped"
    );
    Ok(stats)
}
