use chrono::NaiveDate;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartitionOutcome {
    Persisted,
    Failed(String),
    Cancelled,
}

#[derive(Debug, Clone)]
pub struct PartitionResult {
    pub day: NaiveDate,
    pub receipts: usize,
    pub items: usize,
    pub attempts: u32,
    pub outcome: PartitionOutcome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Done,
    PartialFailure,
}

#[derive(Debug, Clone)]
pub struct HistoricalReport {
    pub results: Vec<PartitionResult>,
    pub total_receipts: usize,
    pub total_items: usize,
}

impl HistoricalReport {
    pub fn from_results(mut results: Vec<PartitionResult>) -> Self {
        results.sort_by_key(|r| r.day);
        let persisted = results
            .iter()
            .filter(|r| r.outcome == PartitionOutcome::Persisted);
        let (total_receipts, total_items) =
            persisted.fold((0, 0), |(rc, ic), r| (rc + r.receipts, ic + r.items));
        Self {
            results,
            total_receipts,
            total_items,
        }
    }

    pub fn n_partitions(&self) -> usize {
        self.results.len()
    }

    pub fn failures(&self) -> impl Iterator<Item = &PartitionResult> {
        self.results
            .iter()
            .filter(|r| r.outcome != PartitionOutcome::Persisted)
    }

    pub fn status(&self) -> RunStatus {
        if self.failures().next().is_none() {
            RunStatus::Done
        } else {
            RunStatus::PartialFailure
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamingStats {
    pub days: u64,
    pub refreshes: u64,
    pub events: u64,
    pub persisted: u64,
    pub errors: u64,
}

/// Counters for a replenishment loop.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplenishStats {
    pub steps: u64,
    pub applied: u64,
    pub errors: u64,
}
