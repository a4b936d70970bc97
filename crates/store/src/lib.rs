pub mod error;
pub mod pool;
pub mod schema;
pub mod sqlite;

use retail_sim_shared::model::{NewCustomer, NewProduct, Receipt, ReceiptItem, ReferenceTable};

pub use error::StoreError;
pub use pool::{PoolStatus, PooledConnection, SqlitePool};
pub use sqlite::SqliteSession;

/// Read side used to capture reference snapshots.
pub trait ReferenceSource {
    /// `None` when the table is empty.
    fn max_id(&mut self, table: ReferenceTable) -> Result<Option<i64>, StoreError>;
    fn ids(&mut self, table: ReferenceTable) -> Result<Vec<i64>, StoreError>;
}

/// Single-row writes that keep the reference tables growing while receipts
/// stream in. Each call commits on its own.
pub trait ReferenceWriter: ReferenceSource {
    /// Returns the new customer id.
    fn insert_customer(&mut self, customer: &NewCustomer) -> Result<i64, StoreError>;
    /// Returns the new product id.
    fn insert_product(&mut self, product: &NewProduct) -> Result<i64, StoreError>;
    fn product_price(&mut self, id: i64) -> Result<Option<f64>, StoreError>;
    /// Sets the price and stamps `record_dttm` with the store's current time.
    fn set_product_price(&mut self, id: i64, price: f64) -> Result<(), StoreError>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PersistSummary {
    pub receipts_inserted: usize,
    /// Receipts already present from an earlier attempt, skipped with their items.
    pub receipts_skipped: usize,
    pub items_inserted: usize,
}

/// Writes receipts and their items in one transaction.
///
/// Either everything in the call is committed or nothing is. Retrying is the
/// caller's decision.
pub trait Persister {
    fn persist(
        &mut self,
        receipts: &[Receipt],
        items: &[ReceiptItem],
    ) -> Result<PersistSummary, StoreError>;
}

pub trait SchemaSetup {
    fn prepare_receipt_tables(&mut self, reset: bool) -> Result<(), StoreError>;
}

/// One unit-of-work handle onto the store.
pub trait Session: ReferenceSource + Persister + SchemaSetup + Send {
    /// Marks the session as unusable so it is not reused after an error.
    fn discard(&mut self) {}
}

/// Hands out isolated sessions, one per worker.
pub trait SessionFactory: Sync {
    type Session: Session;

    fn acquire(&self) -> Result<Self::Session, StoreError>;
}

impl SessionFactory for SqlitePool {
    type Session = SqliteSession;

    fn acquire(&self) -> Result<SqliteSession, StoreError> {
        Ok(SqliteSession::new(self.get()?))
    }
}

/// Every item must belong to a receipt in the same call.
pub fn check_batch(receipts: &[Receipt], items: &[ReceiptItem]) -> Result<(), StoreError> {
    let ids: std::collections::HashSet<_> = receipts.iter().map(|r| r.id).collect();
    match items.iter().find(|item| !ids.contains(&item.receipt_id)) {
        Some(orphan) => Err(StoreError::Transaction(format!(
            "item references receipt {} outside this batch",
            orphan.receipt_id
        ))),
        None => Ok(()),
    }
}
