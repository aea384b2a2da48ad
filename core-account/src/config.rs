//! Playlist configuration and the account partition key.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors raised while constructing account configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid playlist config: {field} must not be empty")]
    EmptyField { field: &'static str },

    #[error("Invalid base URL: {0}")]
    InvalidBaseUrl(String),
}

/// Opaque configuration identifying one remote playlist.
///
/// Carried by value into the catalog source, the candidate resolver, and the
/// index store. The core never inspects the password beyond embedding it in
/// stream/API URLs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistConfig {
    /// Server base URL, scheme and optional port included, no trailing slash.
    pub base_url: String,
    /// Account username.
    pub username: String,
    /// Account password.
    pub password: String,
    /// Display name of the playlist; part of the partition key so two
    /// playlists on the same server/account cache independently.
    pub list_name: String,
}

impl PlaylistConfig {
    /// Create a new playlist configuration.
    ///
    /// Trailing slashes on the base URL are stripped so URL construction
    /// stays uniform.
    pub fn new(
        base_url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
        list_name: impl Into<String>,
    ) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            username: username.into(),
            password: password.into(),
            list_name: list_name.into(),
        }
    }

    /// Validate that all identifying fields are present.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first empty field, or a malformed base URL.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.base_url.is_empty() {
            return Err(ConfigError::EmptyField { field: "base_url" });
        }
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(ConfigError::InvalidBaseUrl(self.base_url.clone()));
        }
        if self.username.is_empty() {
            return Err(ConfigError::EmptyField { field: "username" });
        }
        if self.list_name.is_empty() {
            return Err(ConfigError::EmptyField { field: "list_name" });
        }
        Ok(())
    }

    /// Derive the cache/checkpoint partition key for this playlist.
    pub fn account_key(&self) -> AccountKey {
        AccountKey(format!(
            "{}|{}|{}",
            self.base_url, self.username, self.list_name
        ))
    }
}

/// Partition key for all per-account state: `"{base_url}|{username}|{list_name}"`.
///
/// The password is deliberately excluded so a password change does not orphan
/// cached catalog data.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountKey(String);

impl AccountKey {
    /// Borrow the key as a string slice (database bind parameter form).
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&PlaylistConfig> for AccountKey {
    fn from(config: &PlaylistConfig) -> Self {
        config.account_key()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> PlaylistConfig {
        PlaylistConfig::new("http://tv.example.com:8080", "alice", "pw", "Main")
    }

    #[test]
    fn test_account_key_format() {
        assert_eq!(
            config().account_key().as_str(),
            "http://tv.example.com:8080|alice|Main"
        );
    }

    #[test]
    fn test_account_key_excludes_password() {
        let a = config();
        let mut b = config();
        b.password = "rotated".to_string();
        assert_eq!(a.account_key(), b.account_key());
    }

    #[test]
    fn test_trailing_slash_stripped() {
        let config = PlaylistConfig::new("http://tv.example.com/", "u", "p", "L");
        assert_eq!(config.base_url, "http://tv.example.com");
    }

    #[test]
    fn test_validate_rejects_empty_fields() {
        let mut config = config();
        config.username.clear();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::EmptyField { field: "username" })
        ));
    }

    #[test]
    fn test_validate_rejects_bad_scheme() {
        let config = PlaylistConfig::new("ftp://tv.example.com", "u", "p", "L");
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidBaseUrl(_))
        ));
    }
}
