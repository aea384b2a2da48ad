use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Catalog error: {0}")]
    Catalog(#[from] core_catalog::CatalogError),

    #[error("Bridge error: {0}")]
    Bridge(#[from] bridge_traits::BridgeError),

    #[error("State serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid sync phase: {0}")]
    InvalidPhase(String),

    #[error("Sync cancelled")]
    Cancelled,
}

impl SyncError {
    /// Whether this error is a cooperative cancellation rather than a
    /// failure.
    pub fn is_cancelled(&self) -> bool {
        matches!(
            self,
            SyncError::Cancelled | SyncError::Catalog(core_catalog::CatalogError::Cancelled)
        )
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
