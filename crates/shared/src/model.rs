use chrono::{NaiveDate, NaiveDateTime};
use uuid::Uuid;

/// Tables that hold reference ids sampled by the generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceTable {
    Customer,
    Product,
    Size,
}

impl ReferenceTable {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReferenceTable::Customer => "customer",
            ReferenceTable::Product => "product",
            ReferenceTable::Size => "size",
        }
    }
}

impl std::fmt::Display for ReferenceTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub id: Uuid,
    pub customer_id: i64,
    pub receipt_dttm: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiptItem {
    pub receipt_id: Uuid,
    pub product_id: i64,
    pub size_id: i64,
    pub quantity: i64,
}

/// Receipts and their line items, always written together.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReceiptBatch {
    pub receipts: Vec<Receipt>,
    pub items: Vec<ReceiptItem>,
}

impl ReceiptBatch {
    pub fn with_capacity(receipts: usize) -> Self {
        Self {
            receipts: Vec::with_capacity(receipts),
            items: Vec::with_capacity(receipts * 2),
        }
    }

    pub fn push(&mut self, receipt: Receipt, items: Vec<ReceiptItem>) {
        self.receipts.push(receipt);
        self.items.extend(items);
    }

    pub fn is_empty(&self) -> bool {
        self.receipts.is_empty()
    }
}

/// Point-in-time copy of the foreign keys a receipt may reference.
///
/// Ids are sorted and deduplicated on construction. A snapshot is never
/// patched: refreshing means capturing a new one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceSnapshot {
    customer_ids: Vec<i64>,
    product_ids: Vec<i64>,
    size_ids: Vec<i64>,
    pub taken_at: NaiveDateTime,
}

impl ReferenceSnapshot {
    pub fn new(
        customer_ids: Vec<i64>,
        product_ids: Vec<i64>,
        size_ids: Vec<i64>,
        taken_at: NaiveDateTime,
    ) -> Self {
        Self {
            customer_ids: normalize(customer_ids),
            product_ids: normalize(product_ids),
            size_ids: normalize(size_ids),
            taken_at,
        }
    }

    pub fn customer_ids(&self) -> &[i64] {
        &self.customer_ids
    }

    pub fn product_ids(&self) -> &[i64] {
        &self.product_ids
    }

    pub fn size_ids(&self) -> &[i64] {
        &self.size_ids
    }
}

fn normalize(mut ids: Vec<i64>) -> Vec<i64> {
    ids.sort_unstable();
    ids.dedup();
    ids
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCustomer {
    pub first_name: String,
    pub last_name: String,
    pub birth_dt: NaiveDate,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewProduct {
    pub name: String,
    pub category: Option<String>,
    pub price: f64,
}

pub const SIZES: [&str; 7] = ["XS", "S", "M", "L", "XL", "XXL", "3XL"];
