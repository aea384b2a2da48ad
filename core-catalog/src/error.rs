use crate::models::Section;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Upstream catalog error: {0}")]
    Source(#[from] bridge_traits::BridgeError),

    #[error("Section {0} is not a sync target")]
    NotSyncTarget(Section),

    #[error("Unknown section: {0}")]
    UnknownSection(String),

    #[error("Unknown content type: {0}")]
    UnknownContentType(String),

    #[error("Pager is stale: the account cache was cleared after it was created")]
    StalePager,

    #[error("Indexing cancelled")]
    Cancelled,

    #[error("Invalid input for {field}: {message}")]
    InvalidInput { field: String, message: String },
}

pub type Result<T> = std::result::Result<T, CatalogError>;
