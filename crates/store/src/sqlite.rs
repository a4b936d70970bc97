use std::collections::HashSet;

use retail_sim_shared::model::{NewCustomer, NewProduct, Receipt, ReceiptItem, ReferenceTable};
use retail_sim_shared::time::{format_store_timestamp, parse_store_timestamp};
use rusqlite::{params, OptionalExtension};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::StoreError;
use crate::pool::PooledConnection;
use crate::schema::{self, Table};
use crate::{
    check_batch, PersistSummary, Persister, ReferenceSource, ReferenceWriter, SchemaSetup, Session,
};

const INSERT_RECEIPT: &str = "INSERT INTO receipt (id, customer_id, receipt_dttm) VALUES (?1, ?2, ?3)
     ON CONFLICT (id) DO NOTHING";
const INSERT_RECEIPT_ITEM: &str =
    "INSERT INTO receipt_item (receipt_id, product_id, size_id, quantity) VALUES (?1, ?2, ?3, ?4)";

pub struct SqliteSession {
    conn: PooledConnection,
}

impl SqliteSession {
    pub fn new(conn: PooledConnection) -> Self {
        Self { conn }
    }

    pub fn prepare_reference_tables(&mut self, reset: bool) -> Result<(), StoreError> {
        schema::create_reference_tables(&self.conn, reset)
    }

    pub fn count_rows(&mut self, table: Table) -> Result<i64, StoreError> {
        self.conn
            .query_row(&format!("SELECT COUNT(*) FROM {}", table.as_str()), [], |row| {
                row.get(0)
            })
            .map_err(StoreError::snapshot)
    }

    /// Reads a receipt and its items back by id.
    pub fn receipt(&mut self, id: Uuid) -> Result<Option<(Receipt, Vec<ReceiptItem>)>, StoreError> {
        let key = id.hyphenated().to_string();
        let header = self
            .conn
            .query_row(
                "SELECT customer_id, receipt_dttm FROM receipt WHERE id = ?1",
                [&key],
                |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)),
            )
            .optional()
            .map_err(StoreError::snapshot)?;
        let Some((customer_id, dttm)) = header else {
            return Ok(None);
        };
        let receipt = Receipt {
            id,
            customer_id,
            receipt_dttm: parse_store_timestamp(&dttm).map_err(StoreError::snapshot)?,
        };

        let mut stmt = self
            .conn
            .prepare("SELECT product_id, size_id, quantity FROM receipt_item WHERE receipt_id = ?1 ORDER BY id")
            .map_err(StoreError::snapshot)?;
        let items = stmt
            .query_map([&key], |row| {
                Ok(ReceiptItem {
                    receipt_id: id,
                    product_id: row.get(0)?,
                    size_id: row.get(1)?,
                    quantity: row.get(2)?,
                })
            })
            .map_err(StoreError::snapshot)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(StoreError::snapshot)?;
        Ok(Some((receipt, items)))
    }

    pub fn insert_sizes(&mut self, sizes: &[&str]) -> Result<usize, StoreError> {
        let tx = self.conn.transaction().map_err(StoreError::transaction)?;
        {
            let mut stmt = tx
                .prepare_cached("INSERT INTO size (size) VALUES (?1)")
                .map_err(StoreError::transaction)?;
            for size in sizes {
                stmt.execute([size]).map_err(StoreError::transaction)?;
            }
        }
        tx.commit().map_err(StoreError::transaction)?;
        info!("size: {} rows inserted", sizes.len());
        Ok(sizes.len())
    }

    pub fn insert_customers(&mut self, customers: &[NewCustomer]) -> Result<usize, StoreError> {
        let tx = self.conn.transaction().map_err(StoreError::transaction)?;
        {
            let mut stmt = tx
                .prepare_cached("INSERT INTO customer (first_name, last_name, birth_dt) VALUES (?1, ?2, ?3)")
                .map_err(StoreError::transaction)?;
            for customer in customers {
                stmt.execute(params![
                    customer.first_name,
                    customer.last_name,
                    customer.birth_dt.format("%Y-%m-%d").to_string(),
                ])
                .map_err(StoreError::transaction)?;
            }
        }
        tx.commit().map_err(StoreError::transaction)?;
        info!("customer: {} rows inserted", customers.len());
        Ok(customers.len())
    }

    pub fn insert_products(&mut self, products: &[NewProduct]) -> Result<usize, StoreError> {
        let tx = self.conn.transaction().map_err(StoreError::transaction)?;
        {
            let mut stmt = tx
                .prepare_cached("INSERT INTO product (name, category, price) VALUES (?1, ?2, ?3)")
                .map_err(StoreError::transaction)?;
            for product in products {
                stmt.execute(params![product.name, product.category, product.price])
                    .map_err(StoreError::transaction)?;
            }
        }
        tx.commit().map_err(StoreError::transaction)?;
        info!("product: {} rows inserted", products.len());
        Ok(products.len())
    }
}

impl ReferenceSource for SqliteSession {
    fn max_id(&mut self, table: ReferenceTable) -> Result<Option<i64>, StoreError> {
        self.conn
            .query_row(
                &format!("SELECT MAX(id) FROM {}", Table::from(table).as_str()),
                [],
                |row| row.get::<_, Option<i64>>(0),
            )
            .map_err(StoreError::snapshot)
    }

    fn ids(&mut self, table: ReferenceTable) -> Result<Vec<i64>, StoreError> {
        let mut stmt = self
            .conn
            .prepare(&format!(
                "SELECT id FROM {} ORDER BY id",
                Table::from(table).as_str()
            ))
            .map_err(StoreError::snapshot)?;
        let ids = stmt
            .query_map([], |row| row.get::<_, i64>(0))
            .map_err(StoreError::snapshot)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(StoreError::snapshot)?;
        Ok(ids)
    }
}

impl ReferenceWriter for SqliteSession {
    fn insert_customer(&mut self, customer: &NewCustomer) -> Result<i64, StoreError> {
        self.conn
            .execute(
                "INSERT INTO customer (first_name, last_name, birth_dt) VALUES (?1, ?2, ?3)",
                params![
                    customer.first_name,
                    customer.last_name,
                    customer.birth_dt.format("%Y-%m-%d").to_string(),
                ],
            )
            .map_err(StoreError::transaction)?;
        Ok(self.conn.last_insert_rowid())
    }

    fn insert_product(&mut self, product: &NewProduct) -> Result<i64, StoreError> {
        self.conn
            .execute(
                "INSERT INTO product (name, category, price) VALUES (?1, ?2, ?3)",
                params![product.name, product.category, product.price],
            )
            .map_err(StoreError::transaction)?;
        Ok(self.conn.last_insert_rowid())
    }

    fn product_price(&mut self, id: i64) -> Result<Option<f64>, StoreError> {
        self.conn
            .query_row("SELECT price FROM product WHERE id = ?1", [id], |row| {
                row.get::<_, f64>(0)
            })
            .optional()
            .map_err(StoreError::snapshot)
    }

    fn set_product_price(&mut self, id: i64, price: f64) -> Result<(), StoreError> {
        let updated = self
            .conn
            .execute(
                &format!(
                    "UPDATE product SET price = ?1, record_dttm = {} WHERE id = ?2",
                    schema::NOW_MILLIS
                ),
                params![price, id],
            )
            .map_err(StoreError::transaction)?;
        if updated == 0 {
            return Err(StoreError::Transaction(format!("product {id} not found")));
        }
        Ok(())
    }
}

impl Persister for SqliteSession {
    fn persist(
        &mut self,
        receipts: &[Receipt],
        items: &[ReceiptItem],
    ) -> Result<PersistSummary, StoreError> {
        check_batch(receipts, items)?;
        let mut summary = PersistSummary::default();
        let mut skipped = HashSet::new();

        let tx = self.conn.transaction().map_err(StoreError::transaction)?;
        {
            let mut stmt = tx
                .prepare_cached(INSERT_RECEIPT)
                .map_err(StoreError::transaction)?;
            for receipt in receipts {
                let changed = stmt
                    .execute(params![
                        receipt.id.hyphenated().to_string(),
                        receipt.customer_id,
                        format_store_timestamp(receipt.receipt_dttm),
                    ])
                    .map_err(StoreError::transaction)?;
                if changed == 0 {
                    skipped.insert(receipt.id);
                    summary.receipts_skipped += 1;
                } else {
                    summary.receipts_inserted += 1;
                }
            }

            let mut stmt = tx
                .prepare_cached(INSERT_RECEIPT_ITEM)
                .map_err(StoreError::transaction)?;
            for item in items.iter().filter(|item| !skipped.contains(&item.receipt_id)) {
                stmt.execute(params![
                    item.receipt_id.hyphenated().to_string(),
                    item.product_id,
                    item.size_id,
                    item.quantity,
                ])
                .map_err(StoreError::transaction)?;
                summary.items_inserted += 1;
            }
        }
        tx.commit().map_err(StoreError::transaction)?;

        if summary.receipts_skipped > 0 {
            debug!(
                "skipped {} receipts already in the store",
                summary.receipts_skipped
            );
        }
        Ok(summary)
    }
}

impl SchemaSetup for SqliteSession {
    fn prepare_receipt_tables(&mut self, reset: bool) -> Result<(), StoreError> {
        schema::create_receipt_tables(&self.conn, reset)
    }
}

impl Session for SqliteSession {
    fn discard(&mut self) {
        self.conn.discard();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use retail_sim_shared::config::PoolConfig;

    use crate::{SessionFactory, SqlitePool};

    fn seeded_pool(dir: &tempfile::TempDir) -> SqlitePool {
        let pool = SqlitePool::open(PoolConfig::new(dir.path().join("store.db"))).unwrap();
        let mut session = pool.acquire().unwrap();
        session.prepare_reference_tables(true).unwrap();
        session.prepare_receipt_tables(true).unwrap();
        session
            .insert_customers(&[
                NewCustomer {
                    first_name: "Ann".into(),
                    last_name: "Lee".into(),
                    birth_dt: NaiveDate::from_ymd_opt(1990, 1, 2).unwrap(),
                },
                NewCustomer {
                    first_name: "Bob".into(),
                    last_name: "Ray".into(),
                    birth_dt: NaiveDate::from_ymd_opt(1985, 6, 7).unwrap(),
                },
            ])
            .unwrap();
        session
            .insert_products(&[NewProduct {
                name: "Red Tee".into(),
                category: Some("Tshirts".into()),
                price: 19.99,
            }])
            .unwrap();
        session.insert_sizes(&["S", "M"]).unwrap();
        pool
    }

    fn receipt(customer_id: i64, seed: u8) -> Receipt {
        Receipt {
            id: Uuid::from_bytes([seed; 16]),
            customer_id,
            receipt_dttm: NaiveDate::from_ymd_opt(2024, 3, 25)
                .unwrap()
                .and_hms_milli_opt(20, 0, 0, 123)
                .unwrap(),
        }
    }

    fn item(receipt: &Receipt, quantity: i64) -> ReceiptItem {
        ReceiptItem {
            receipt_id: receipt.id,
            product_id: 1,
            size_id: 2,
            quantity,
        }
    }

    #[test]
    fn test_reference_ids_and_max_id() {
        let dir = tempfile::tempdir().unwrap();
        let pool = seeded_pool(&dir);
        let mut session = pool.acquire().unwrap();
        assert_eq!(session.max_id(ReferenceTable::Customer).unwrap(), Some(2));
        assert_eq!(session.ids(ReferenceTable::Size).unwrap(), vec![1, 2]);
        assert_eq!(session.ids(ReferenceTable::Product).unwrap(), vec![1]);
    }

    #[test]
    fn test_single_row_reference_writes() {
        let dir = tempfile::tempdir().unwrap();
        let pool = seeded_pool(&dir);
        let mut session = pool.acquire().unwrap();

        let id = session
            .insert_customer(&NewCustomer {
                first_name: "Cy".into(),
                last_name: "Fox".into(),
                birth_dt: NaiveDate::from_ymd_opt(2000, 2, 29).unwrap(),
            })
            .unwrap();
        assert_eq!(id, 3);
        assert_eq!(session.max_id(ReferenceTable::Customer).unwrap(), Some(3));

        let id = session
            .insert_product(&NewProduct {
                name: "Blue Jeans".into(),
                category: None,
                price: 49.5,
            })
            .unwrap();
        assert_eq!(id, 2);
        session.set_product_price(id, 54.45).unwrap();
        assert_eq!(session.product_price(id).unwrap(), Some(54.45));
        assert_eq!(session.product_price(99).unwrap(), None);
        assert!(session.set_product_price(99, 1.0).is_err());
    }

    #[test]
    fn test_max_id_of_empty_table_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let pool = SqlitePool::open(PoolConfig::new(dir.path().join("empty.db"))).unwrap();
        let mut session = pool.acquire().unwrap();
        session.prepare_reference_tables(false).unwrap();
        assert_eq!(session.max_id(ReferenceTable::Customer).unwrap(), None);
    }

    #[test]
    fn test_persist_then_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let pool = seeded_pool(&dir);
        let mut session = pool.acquire().unwrap();

        let first = receipt(1, 1);
        let second = receipt(2, 2);
        let items = vec![item(&first, 1), item(&first, 3), item(&second, 2)];
        let summary = session
            .persist(&[first.clone(), second.clone()], &items)
            .unwrap();
        assert_eq!(summary.receipts_inserted, 2);
        assert_eq!(summary.items_inserted, 3);

        let (stored, stored_items) = session.receipt(first.id).unwrap().unwrap();
        assert_eq!(stored, first);
        assert_eq!(stored_items, items[..2].to_vec());
        let (stored, stored_items) = session.receipt(second.id).unwrap().unwrap();
        assert_eq!(stored, second);
        assert_eq!(stored_items, vec![items[2].clone()]);
        assert!(session.receipt(Uuid::nil()).unwrap().is_none());
    }

    #[test]
    fn test_repeated_persist_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let pool = seeded_pool(&dir);
        let mut session = pool.acquire().unwrap();
        let r = receipt(1, 7);
        let items = vec![item(&r, 2)];

        session.persist(&[r.clone()], &items).unwrap();
        let again = session.persist(&[r.clone()], &items).unwrap();
        assert_eq!(again.receipts_skipped, 1);
        assert_eq!(again.items_inserted, 0);
        assert_eq!(session.count_rows(Table::Receipt).unwrap(), 1);
        assert_eq!(session.count_rows(Table::ReceiptItem).unwrap(), 1);
    }

    #[test]
    fn test_failed_item_rolls_back_receipts() {
        let dir = tempfile::tempdir().unwrap();
        let pool = seeded_pool(&dir);
        let mut session = pool.acquire().unwrap();
        let r = receipt(1, 3);
        let bad = ReceiptItem {
            receipt_id: r.id,
            product_id: 999,
            size_id: 1,
            quantity: 1,
        };

        let err = session.persist(&[r.clone()], &[item(&r, 1), bad]).unwrap_err();
        assert!(matches!(err, StoreError::Transaction(_)));
        assert_eq!(session.count_rows(Table::Receipt).unwrap(), 0);
        assert_eq!(session.count_rows(Table::ReceiptItem).unwrap(), 0);
    }

    #[test]
    fn test_orphan_items_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let pool = seeded_pool(&dir);
        let mut session = pool.acquire().unwrap();
        let r = receipt(1, 4);
        let stray = receipt(1, 5);

        let err = session.persist(&[r], &[item(&stray, 1)]).unwrap_err();
        assert!(err.to_string().contains("outside this batch"));
        assert_eq!(session.count_rows(Table::Receipt).unwrap(), 0);
    }

    #[test]
    fn test_zero_quantity_violates_schema() {
        let dir = tempfile::tempdir().unwrap();
        let pool = seeded_pool(&dir);
        let mut session = pool.acquire().unwrap();
        let r = receipt(1, 6);
        assert!(session.persist(&[r.clone()], &[item(&r, 0)]).is_err());
    }
}
