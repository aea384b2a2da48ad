//! Error types for the Xtream provider.

use thiserror::Error;

/// Xtream provider errors.
#[derive(Error, Debug)]
pub enum XtreamError {
    /// Network or protocol failure.
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("Xtream API error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// The server's JSON did not match the expected shape.
    #[error("Failed to parse API response for {action}: {message}")]
    Parse { action: String, message: String },
}

/// Result type for Xtream operations.
pub type Result<T> = std::result::Result<T, XtreamError>;

impl From<XtreamError> for bridge_traits::error::BridgeError {
    fn from(error: XtreamError) -> Self {
        match error {
            XtreamError::Http(e) => {
                bridge_traits::error::BridgeError::Upstream(format!("Request failed: {e}"))
            }
            XtreamError::Api { status, message } => bridge_traits::error::BridgeError::Upstream(
                format!("API error (status {status}): {message}"),
            ),
            XtreamError::Parse { action, message } => bridge_traits::error::BridgeError::Decode(
                format!("Bad response for {action}: {message}"),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = XtreamError::Api {
            status: 403,
            message: "Forbidden".to_string(),
        };
        assert_eq!(error.to_string(), "Xtream API error (status 403): Forbidden");
    }

    #[test]
    fn test_conversion_to_bridge_error() {
        let error = XtreamError::Parse {
            action: "get_series_info".to_string(),
            message: "missing episodes".to_string(),
        };
        let bridge: bridge_traits::error::BridgeError = error.into();
        assert!(matches!(
            bridge,
            bridge_traits::error::BridgeError::Decode(_)
        ));
    }
}
