use chrono::{NaiveDate, NaiveDateTime};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Gamma};
use rand_pcg::Pcg64;
use retail_sim_shared::config::GeneratorConfig;
use retail_sim_shared::model::{
    Receipt, ReceiptBatch, ReceiptItem, ReferenceSnapshot, ReferenceTable,
};
use retail_sim_shared::time::truncate_to_millis;
use uuid::Uuid;

use crate::error::SimError;
use crate::volume::DailyVolume;

/// Produces receipts with skewed item counts and quantities.
pub struct ReceiptGenerator {
    rng: Pcg64,
    gamma: Gamma<f64>,
    config: GeneratorConfig,
}

impl ReceiptGenerator {
    pub fn new(config: GeneratorConfig, seed: u64) -> Result<Self, SimError> {
        let gamma = Gamma::new(config.gamma_shape, config.gamma_scale)
            .map_err(|e| SimError::Distribution(e.to_string()))?;
        Ok(Self {
            rng: Pcg64::seed_from_u64(seed),
            gamma,
            config,
        })
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    pub fn generate_receipt(
        &mut self,
        snapshot: &ReferenceSnapshot,
        timestamp: NaiveDateTime,
    ) -> Result<(Receipt, Vec<ReceiptItem>), SimError> {
        let customer_id = *snapshot
            .customer_ids()
            .choose(&mut self.rng)
            .ok_or(SimError::EmptySnapshot(ReferenceTable::Customer))?;
        let receipt = Receipt {
            id: self.next_id(),
            customer_id,
            receipt_dttm: truncate_to_millis(timestamp),
        };

        let n_items = self.sample_count(self.config.max_items);
        let mut items = Vec::with_capacity(n_items as usize);
        for _ in 0..n_items {
            let (Some(&product_id), Some(&size_id)) = (
                snapshot.product_ids().choose(&mut self.rng),
                snapshot.size_ids().choose(&mut self.rng),
            ) else {
                break;
            };
            let quantity = self.sample_count(self.config.max_quantity).max(1);
            items.push(ReceiptItem {
                receipt_id: receipt.id,
                product_id,
                size_id,
                quantity: i64::from(quantity),
            });
        }
        Ok((receipt, items))
    }

    /// All receipts for one simulated day.
    pub fn generate_day(
        &mut self,
        snapshot: &ReferenceSnapshot,
        date: NaiveDate,
        total_customers: u64,
        volume: &DailyVolume,
    ) -> Result<ReceiptBatch, SimError> {
        let n = volume.purchase_count(date, total_customers, &mut self.rng)?;
        let mut batch = ReceiptBatch::with_capacity(n as usize);
        for _ in 0..n {
            let ts = volume.receipt_time(date, &mut self.rng);
            let (receipt, items) = self.generate_receipt(snapshot, ts)?;
            batch.push(receipt, items);
        }
        Ok(batch)
    }

    fn sample_count(&mut self, cap: Option<u32>) -> u32 {
        let n = self.gamma.sample(&mut self.rng).ceil() as u32;
        cap.map_or(n, |cap| n.min(cap))
    }

    /// Random v4 id drawn from the seeded stream.
    fn next_id(&mut self) -> Uuid {
        uuid::Builder::from_random_bytes(self.rng.gen()).into_uuid()
    }
}
