use retail_sim_shared::model::ReferenceTable;
use retail_sim_store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum SimError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("Reference snapshot has no {0} ids")]
    EmptySnapshot(ReferenceTable),
    #[error("Invalid distribution parameters: {0}")]
    Distribution(String),
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("Worker pool failed: {0}")]
    WorkerPool(String),
    #[error("Catalog read failed: {0}")]
    Catalog(#[from] csv::Error),
}

impl SimError {
    /// Snapshot-family failures abort a historical run before dispatch.
    pub fn is_snapshot(&self) -> bool {
        matches!(
            self,
            SimError::EmptySnapshot(_) | SimError::Store(StoreError::Snapshot(_))
        )
    }
}
