use chrono::NaiveDateTime;
use retail_sim_shared::model::{ReferenceSnapshot, ReferenceTable};
use retail_sim_store::ReferenceSource;
use tracing::debug;

use crate::error::SimError;

pub fn capture_snapshot<S: ReferenceSource + ?Sized>(
    source: &mut S,
    taken_at: NaiveDateTime,
) -> Result<ReferenceSnapshot, SimError> {
    let customers = source.ids(ReferenceTable::Customer)?;
    let products = source.ids(ReferenceTable::Product)?;
    let sizes = source.ids(ReferenceTable::Size)?;
    let snapshot = ReferenceSnapshot::new(customers, products, sizes, taken_at);
    debug!(
        customers = snapshot.customer_ids().len(),
        products = snapshot.product_ids().len(),
        sizes = snapshot.size_ids().len(),
        "reference snapshot captured"
    );
    Ok(snapshot)
}

/// Population used for volume and pacing: the highest customer id, or the
/// snapshot size when the store reports none.
pub fn total_customers<S: ReferenceSource + ?Sized>(
    source: &mut S,
    snapshot: &ReferenceSnapshot,
) -> Result<u64, SimError> {
    let max_id = source.max_id(ReferenceTable::Customer)?;
    Ok(match max_id {
        Some(id) if id > 0 => id as u64,
        _ => snapshot.customer_ids().len() as u64,
    })
}
