//! Key-Value Settings Storage
//!
//! Abstracts the host's preferences store (SharedPreferences/DataStore on
//! Android TV, config files on desktop). The core uses it for one thing:
//! persisting serialized sync state between process restarts so a full
//! index survives a relaunch without re-running fast start.

use crate::error::Result;
use async_trait::async_trait;

/// Key-value settings storage trait.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Store a string value.
    async fn set_string(&self, key: &str, value: &str) -> Result<()>;

    /// Retrieve a string value. Returns `Ok(None)` if the key is absent.
    async fn get_string(&self, key: &str) -> Result<Option<String>>;

    /// Delete a setting.
    async fn delete(&self, key: &str) -> Result<()>;

    /// Check if a setting exists.
    async fn has_key(&self, key: &str) -> Result<bool> {
        Ok(self.get_string(key).await?.is_some())
    }

    /// Clear all settings.
    async fn clear_all(&self) -> Result<()>;
}
