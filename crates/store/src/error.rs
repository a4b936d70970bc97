#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Connection failed: {0}")]
    Connection(String),
    #[error("Transaction failed: {0}")]
    Transaction(String),
    #[error("Snapshot query failed: {0}")]
    Snapshot(String),
    #[error("Schema setup failed: {0}")]
    Schema(String),
}

impl StoreError {
    pub(crate) fn connection(err: impl std::fmt::Display) -> Self {
        StoreError::Connection(err.to_string())
    }

    pub(crate) fn transaction(err: impl std::fmt::Display) -> Self {
        StoreError::Transaction(err.to_string())
    }

    pub(crate) fn snapshot(err: impl std::fmt::Display) -> Self {
        StoreError::Snapshot(err.to_string())
    }

    pub(crate) fn schema(err: impl std::fmt::Display) -> Self {
        StoreError::Schema(err.to_string())
    }

    /// Errors a caller may retry with a fresh session.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Connection(_) | StoreError::Transaction(_))
    }
}
