use rusqlite::Connection;

use crate::error::StoreError;

/// Every table the workspace reads or writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    Customer,
    Product,
    Size,
    Receipt,
    ReceiptItem,
}

impl Table {
    pub fn as_str(&self) -> &'static str {
        match self {
            Table::Customer => "customer",
            Table::Product => "product",
            Table::Size => "size",
            Table::Receipt => "receipt",
            Table::ReceiptItem => "receipt_item",
        }
    }
}

impl From<retail_sim_shared::model::ReferenceTable> for Table {
    fn from(table: retail_sim_shared::model::ReferenceTable) -> Self {
        use retail_sim_shared::model::ReferenceTable;
        match table {
            ReferenceTable::Customer => Table::Customer,
            ReferenceTable::Product => Table::Product,
            ReferenceTable::Size => Table::Size,
        }
    }
}

pub(crate) const NOW_MILLIS: &str = "(strftime('%Y-%m-%d %H:%M:%f', 'now'))";

fn reference_ddl() -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS customer (
            id INTEGER PRIMARY KEY,
            first_name VARCHAR(100) DEFAULT NULL,
            last_name VARCHAR(100) DEFAULT NULL,
            birth_dt DATE DEFAULT NULL,
            record_dttm TIMESTAMP(3) NOT NULL DEFAULT {NOW_MILLIS}
        );
        CREATE TABLE IF NOT EXISTS product (
            id INTEGER PRIMARY KEY,
            name VARCHAR(100) NOT NULL,
            category VARCHAR(20) DEFAULT NULL,
            price NUMERIC(10, 2) NOT NULL DEFAULT 0,
            record_dttm TIMESTAMP(3) NOT NULL DEFAULT {NOW_MILLIS}
        );
        CREATE TABLE IF NOT EXISTS size (
            id INTEGER PRIMARY KEY,
            size VARCHAR(5) DEFAULT NULL,
            record_dttm TIMESTAMP(3) NOT NULL DEFAULT {NOW_MILLIS}
        );"
    )
}

fn receipt_ddl() -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS receipt (
            id CHAR(36) PRIMARY KEY,
            customer_id INTEGER NOT NULL REFERENCES customer(id),
            receipt_dttm TIMESTAMP(3) NOT NULL,
            record_dttm TIMESTAMP(3) NOT NULL DEFAULT {NOW_MILLIS}
        );
        CREATE TABLE IF NOT EXISTS receipt_item (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            receipt_id CHAR(36) NOT NULL REFERENCES receipt(id),
            product_id INTEGER NOT NULL REFERENCES product(id),
            size_id INTEGER NOT NULL REFERENCES size(id),
            quantity INTEGER NOT NULL CHECK (quantity >= 1),
            record_dttm TIMESTAMP(3) NOT NULL DEFAULT {NOW_MILLIS}
        );"
    )
}

const DROP_RECEIPT_TABLES: &str = "DROP TABLE IF EXISTS receipt_item; DROP TABLE IF EXISTS receipt;";
const DROP_REFERENCE_TABLES: &str =
    "DROP TABLE IF EXISTS customer; DROP TABLE IF EXISTS product; DROP TABLE IF EXISTS size;";

/// Creates `customer`, `product` and `size`.
///
/// With `reset` the receipt tables are dropped as well, since they reference
/// the tables being recreated; call [`create_receipt_tables`] afterwards.
pub fn create_reference_tables(conn: &Connection, reset: bool) -> Result<(), StoreError> {
    if reset {
        conn.execute_batch(DROP_RECEIPT_TABLES)
            .map_err(StoreError::schema)?;
        conn.execute_batch(DROP_REFERENCE_TABLES)
            .map_err(StoreError::schema)?;
    }
    conn.execute_batch(&reference_ddl())
        .map_err(StoreError::schema)
}

pub fn create_receipt_tables(conn: &Connection, reset: bool) -> Result<(), StoreError> {
    if reset {
        conn.execute_batch(DROP_RECEIPT_TABLES)
            .map_err(StoreError::schema)?;
    }
    conn.execute_batch(&receipt_ddl()).map_err(StoreError::schema)
}
