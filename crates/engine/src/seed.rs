use std::collections::HashSet;
use std::io;

use chrono::{Days, Months, NaiveDate};
use fake::faker::name::en::{FirstName, LastName};
use fake::Fake;
use rand::Rng;
use rand_distr::{Distribution, Gamma};
use retail_sim_shared::config::{PRODUCT_PRICE_GAMMA_SCALE, PRODUCT_PRICE_GAMMA_SHAPE};
use retail_sim_shared::model::{NewCustomer, NewProduct};
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::SimError;

pub const MIN_CUSTOMER_AGE: u32 = 18;
pub const MAX_CUSTOMER_AGE: u32 = 60;
const APPAREL: &str = "Apparel";

/// Customers with fake names, aged 18 to 60 on `today`.
pub fn fake_customers<R: Rng + ?Sized>(
    count: usize,
    today: NaiveDate,
    rng: &mut R,
) -> Vec<NewCustomer> {
    (0..count).map(|_| fake_customer(today, rng)).collect()
}

pub fn fake_customer<R: Rng + ?Sized>(today: NaiveDate, rng: &mut R) -> NewCustomer {
    let (earliest, latest) = birth_date_range(today);
    let span = (latest - earliest).num_days().max(0) as u64;
    NewCustomer {
        first_name: FirstName().fake_with_rng(rng),
        last_name: LastName().fake_with_rng(rng),
        birth_dt: earliest + Days::new(rng.gen_range(0..=span)),
    }
}

/// Inclusive birth-date bounds for the configured age range.
fn birth_date_range(today: NaiveDate) -> (NaiveDate, NaiveDate) {
    let latest = today
        .checked_sub_months(Months::new(MIN_CUSTOMER_AGE * 12))
        .unwrap_or(today);
    let earliest = today
        .checked_sub_months(Months::new((MAX_CUSTOMER_AGE + 1) * 12))
        .and_then(|d| d.checked_add_days(Days::new(1)))
        .unwrap_or(latest);
    (earliest, latest)
}

#[derive(Debug, Deserialize)]
struct StyleRecord {
    #[serde(rename = "masterCategory")]
    master_category: String,
    #[serde(rename = "articleType", default)]
    article_type: Option<String>,
    #[serde(rename = "productDisplayName", default)]
    product_display_name: Option<String>,
}

/// An apparel entry from the styles catalog, before pricing.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CatalogEntry {
    pub name: String,
    pub category: Option<String>,
}

/// Reads apparel rows from a styles CSV, skipping malformed lines and
/// duplicate `(name, category)` pairs.
pub fn read_apparel_catalog<R: io::Read>(reader: R) -> Result<Vec<CatalogEntry>, SimError> {
    let mut csv = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers = csv.headers()?.clone();
    let mut seen = HashSet::new();
    let mut entries = Vec::new();
    let mut skipped = 0usize;
    for row in csv.records() {
        let row = match row {
            Ok(row) => row,
            Err(e) if e.is_io_error() => return Err(e.into()),
            Err(e) => {
                debug!("Skipping catalog line: {e}");
                skipped += 1;
                continue;
            }
        };
        // unquoted commas shift the columns
        if row.len() != headers.len() {
            skipped += 1;
            continue;
        }
        let record: StyleRecord = match row.deserialize(Some(&headers)) {
            Ok(record) => record,
            Err(e) => {
                debug!("Skipping catalog line: {e}");
                skipped += 1;
                continue;
            }
        };
        if record.master_category != APPAREL {
            continue;
        }
        let Some(name) = record.product_display_name.filter(|n| !n.trim().is_empty()) else {
            skipped += 1;
            continue;
        };
        let entry = CatalogEntry {
            name,
            category: record.article_type.filter(|c| !c.is_empty()),
        };
        if seen.insert(entry.clone()) {
            entries.push(entry);
        }
    }
    info!(entries = entries.len(), skipped, "Apparel catalog read");
    Ok(entries)
}

/// Prices each entry from Gamma(3, 30), rounded to cents.
pub fn price_catalog<R: Rng + ?Sized>(
    entries: Vec<CatalogEntry>,
    rng: &mut R,
) -> Result<Vec<NewProduct>, SimError> {
    let gamma = Gamma::new(PRODUCT_PRICE_GAMMA_SHAPE, PRODUCT_PRICE_GAMMA_SCALE)
        .map_err(|e| SimError::Distribution(e.to_string()))?;
    Ok(entries
        .into_iter()
        .map(|entry| NewProduct {
            name: entry.name,
            category: entry.category,
            price: (gamma.sample(rng) * 100.0).round() / 100.0,
        })
        .collect())
}

/// The first half of the catalog goes in now; the rest is held back for
/// [`crate::replenish::stream_products`].
pub fn initial_products(mut products: Vec<NewProduct>) -> Vec<NewProduct> {
    products.truncate(products.len() / 2);
    products
}
