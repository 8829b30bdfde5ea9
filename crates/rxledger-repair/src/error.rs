use rxledger_store::StoreError;

/// Errors from repair runs.
#[derive(Debug, thiserror::Error)]
pub enum RepairError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("checkpoint I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("checkpoint serialization error: {0}")]
    Serialization(String),
}

/// Result alias for repair operations.
pub type RepairResult<T> = Result<T, RepairError>;
