//! In-memory store used by the scheduler tests.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::NaiveDate;
use retail_sim_shared::model::{Receipt, ReceiptItem, ReferenceTable};
use retail_sim_store::{
    check_batch, PersistSummary, Persister, ReferenceSource, SchemaSetup, Session,
    SessionFactory, StoreError,
};
use uuid::Uuid;

#[derive(Debug, Default)]
pub struct MemoryState {
    pub customers: Vec<i64>,
    pub products: Vec<i64>,
    pub sizes: Vec<i64>,
    pub max_customer_id: Option<i64>,
    pub receipts: HashMap<Uuid, Receipt>,
    pub items: Vec<ReceiptItem>,
    /// Batches whose earliest receipt falls on one of these days are rejected.
    pub fail_days: HashSet<NaiveDate>,
    /// Number of upcoming persist calls that fail with a transient error.
    pub transient_failures: u32,
    /// Number of upcoming `ids` calls that fail.
    pub snapshot_failures: u32,
    pub fail_schema: bool,
    pub persist_calls: u32,
    pub discarded: u32,
    pub schema_resets: u32,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn with_reference(customers: i64, products: i64, sizes: i64) -> Self {
        let store = Self::default();
        {
            let mut state = store.state();
            state.customers = (1..=customers).collect();
            state.products = (1..=products).map(|i| 10 + i).collect();
            state.sizes = (1..=sizes).map(|i| 100 + i).collect();
            state.max_customer_id = (customers > 0).then_some(customers);
        }
        store
    }

    pub fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap()
    }

    pub fn session(&self) -> MemorySession {
        MemorySession {
            state: self.state.clone(),
        }
    }
}

impl SessionFactory for MemoryStore {
    type Session = MemorySession;

    fn acquire(&self) -> Result<MemorySession, StoreError> {
        Ok(self.session())
    }
}

pub struct MemorySession {
    state: Arc<Mutex<MemoryState>>,
}

impl ReferenceSource for MemorySession {
    fn max_id(&mut self, table: ReferenceTable) -> Result<Option<i64>, StoreError> {
        let state = self.state.lock().unwrap();
        Ok(match table {
            ReferenceTable::Customer => state.max_customer_id,
            ReferenceTable::Product => state.products.iter().max().copied(),
            ReferenceTable::Size => state.sizes.iter().max().copied(),
        })
    }

    fn ids(&mut self, table: ReferenceTable) -> Result<Vec<i64>, StoreError> {
        let mut state = self.state.lock().unwrap();
        if state.snapshot_failures > 0 {
            state.snapshot_failures -= 1;
            return Err(StoreError::Snapshot(format!("{table}: connection reset")));
        }
        Ok(match table {
            ReferenceTable::Customer => state.customers.clone(),
            ReferenceTable::Product => state.products.clone(),
            ReferenceTable::Size => state.sizes.clone(),
        })
    }
}

impl Persister for MemorySession {
    fn persist(
        &mut self,
        receipts: &[Receipt],
        items: &[ReceiptItem],
    ) -> Result<PersistSummary, StoreError> {
        check_batch(receipts, items)?;
        let mut state = self.state.lock().unwrap();
        state.persist_calls += 1;
        if state.transient_failures > 0 {
            state.transient_failures -= 1;
            return Err(StoreError::Transaction("deadlock detected".into()));
        }
        let first_day = receipts.iter().map(|r| r.receipt_dttm.date()).min();
        if first_day.is_some_and(|day| state.fail_days.contains(&day)) {
            return Err(StoreError::Transaction("disk full".into()));
        }

        let mut summary = PersistSummary::default();
        let mut skipped = HashSet::new();
        for receipt in receipts {
            if state.receipts.contains_key(&receipt.id) {
                skipped.insert(receipt.id);
                summary.receipts_skipped += 1;
            } else {
                state.receipts.insert(receipt.id, receipt.clone());
                summary.receipts_inserted += 1;
            }
        }
        for item in items.iter().filter(|i| !skipped.contains(&i.receipt_id)) {
            state.items.push(item.clone());
            summary.items_inserted += 1;
        }
        Ok(summary)
    }
}

impl SchemaSetup for MemorySession {
    fn prepare_receipt_tables(&mut self, reset: bool) -> Result<(), StoreError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_schema {
            return Err(StoreError::Schema("permission denied".into()));
        }
        if reset {
            state.schema_resets += 1;
            state.receipts.clear();
            state.items.clear();
        }
        Ok(())
    }
}

impl Session for MemorySession {
    fn discard(&mut self) {
        self.state.lock().unwrap().discarded += 1;
    }
}
