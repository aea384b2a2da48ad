//! Playback error types.

use thiserror::Error;

/// Errors from the playback-continuity layer.
#[derive(Error, Debug)]
pub enum PlaybackError {
    /// The host player adapter rejected an operation.
    #[error("Player error: {0}")]
    Player(#[from] bridge_traits::BridgeError),

    /// A controller method was called before a queue was attached.
    #[error("No playback queue attached")]
    QueueNotAttached,

    /// Invalid input to a queue builder.
    #[error("Invalid input for {field}: {message}")]
    InvalidInput { field: String, message: String },
}

pub type Result<T> = std::result::Result<T, PlaybackError>;
