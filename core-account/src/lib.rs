//! # Account Configuration
//!
//! Opaque playlist/account configuration shared across the core crates.
//!
//! ## Overview
//!
//! The core treats credentials as an opaque value: it never validates,
//! refreshes, or stores them. A [`PlaylistConfig`] identifies one remote
//! playlist on one server for one user, and the derived [`AccountKey`]
//! partitions every cache, checkpoint, and sync job in the workspace.
//!
//! ## Usage
//!
//! ```rust
//! use core_account::PlaylistConfig;
//!
//! let config = PlaylistConfig::new("http://tv.example.com:8080", "user", "secret", "Main");
//! assert_eq!(config.account_key().as_str(), "http://tv.example.com:8080|user|Main");
//! ```

pub mod config;

pub use config::{AccountKey, ConfigError, PlaylistConfig};
