use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime};
use rand::SeedableRng;
use rand_pcg::Pcg64;
use retail_sim_engine::replenish::{drift_prices, stream_customers, stream_products};
use retail_sim_engine::seed::{fake_customers, initial_products, price_catalog, CatalogEntry};
use retail_sim_engine::{
    run_historical, CancellationToken, Clock, ManualClock, StreamingSimulator,
};
use retail_sim_shared::config::{
    HistoricalConfig, PoolConfig, ReplenishConfig, RetryPolicy, StreamingConfig,
};
use retail_sim_shared::model::SIZES;
use retail_sim_shared::result::RunStatus;
use retail_sim_store::schema::Table;
use retail_sim_store::{ReferenceWriter, SchemaSetup, SessionFactory, SqlitePool};

fn noon(y: i32, m: u32, d: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap()
}

fn catalog() -> Vec<CatalogEntry> {
    (0..40)
        .map(|i| CatalogEntry {
            name: format!("Style {i}"),
            category: Some("Tshirts".into()),
        })
        .collect()
}

fn seeded_store(dir: &tempfile::TempDir, customers: usize) -> SqlitePool {
    let mut config = PoolConfig::new(dir.path().join("retail.db"));
    config.max_size = 4;
    let pool = SqlitePool::open(config).unwrap();
    let mut session = pool.acquire().unwrap();
    session.prepare_reference_tables(true).unwrap();

    let mut rng = Pcg64::seed_from_u64(1);
    let today = NaiveDate::from_ymd_opt(2024, 3, 25).unwrap();
    session
        .insert_customers(&fake_customers(customers, today, &mut rng))
        .unwrap();
    let products = initial_products(price_catalog(catalog(), &mut rng).unwrap());
    session.insert_products(&products).unwrap();
    session.insert_sizes(&SIZES).unwrap();
    pool
}

#[test]
fn test_backfill_into_sqlite() {
    let dir = tempfile::tempdir().unwrap();
    let pool = seeded_store(&dir, 3_000);
    let config = HistoricalConfig {
        start: NaiveDate::from_ymd_opt(2024, 3, 25).unwrap(),
        end: NaiveDate::from_ymd_opt(2024, 4, 1),
        workers: 4,
        pacing_delay: Duration::ZERO,
        retry: RetryPolicy::none(),
        reset_schema: true,
        seed: 5,
        ..HistoricalConfig::default()
    };
    let clock = ManualClock::new(noon(2024, 6, 1));
    let report = run_historical(&pool, &config, &clock, &CancellationToken::new()).unwrap();

    assert_eq!(report.status(), RunStatus::Done);
    assert_eq!(report.n_partitions(), 7);
    let mut session = pool.acquire().unwrap();
    assert_eq!(
        session.count_rows(Table::Receipt).unwrap() as usize,
        report.total_receipts
    );
    assert_eq!(
        session.count_rows(Table::ReceiptItem).unwrap() as usize,
        report.total_items
    );
    // 3000 customers at 1% over five weekdays and a weekend
    assert!(report.total_receipts > 150, "{}", report.total_receipts);
}

#[test]
fn test_stream_into_sqlite() {
    let dir = tempfile::tempdir().unwrap();
    let pool = seeded_store(&dir, 20_000);
    let mut session = pool.acquire().unwrap();
    session.prepare_receipt_tables(true).unwrap();

    let clock = Arc::new(ManualClock::new(noon(2024, 3, 30)));
    let config = StreamingConfig {
        max_events: Some(25),
        seed: 2,
        ..StreamingConfig::default()
    };
    let mut sim = StreamingSimulator::new(session, clock.clone(), config).unwrap();
    let stats = sim.run(&CancellationToken::new());

    assert_eq!(stats.events, 25);
    assert_eq!(stats.persisted, 25);
    assert!(clock.now() > noon(2024, 3, 30));
    drop(sim);

    let mut session = pool.acquire().unwrap();
    assert_eq!(session.count_rows(Table::Receipt).unwrap(), 25);
}

#[test]
fn test_replenish_reference_tables() {
    let dir = tempfile::tempdir().unwrap();
    let pool = seeded_store(&dir, 100);
    let mut session = pool.acquire().unwrap();
    let clock = ManualClock::new(noon(2024, 3, 25));
    let cancel = CancellationToken::new();
    let limit = |config: ReplenishConfig, steps| ReplenishConfig {
        max_steps: Some(steps),
        ..config
    };

    let stats =
        stream_customers(&mut session, &clock, &limit(ReplenishConfig::customers(), 5), &cancel)
            .unwrap();
    assert_eq!(stats.applied, 5);
    assert_eq!(session.count_rows(Table::Customer).unwrap(), 105);

    // same seed as the initial load, so the stored half keeps its prices
    let mut rng = Pcg64::seed_from_u64(1);
    fake_customers(100, NaiveDate::from_ymd_opt(2024, 3, 25).unwrap(), &mut rng);
    let full = price_catalog(catalog(), &mut rng).unwrap();
    let stats = stream_products(
        &mut session,
        &full,
        &clock,
        &ReplenishConfig::products(),
        &cancel,
    )
    .unwrap();
    assert_eq!(stats.applied, 20);
    assert_eq!(session.count_rows(Table::Product).unwrap(), 40);
    assert_eq!(session.product_price(40).unwrap(), Some(full[39].price));

    let stats =
        drift_prices(&mut session, &clock, &limit(ReplenishConfig::prices(), 10), &cancel).unwrap();
    assert_eq!(stats.applied, 10);
    assert_eq!(session.count_rows(Table::Product).unwrap(), 40);
}
