//! # Host Bridge Traits
//!
//! Collaborator contracts between the IPTV platform core and the host
//! application. Each trait represents a capability the core requires but
//! does not own: the upstream catalog API, the media player, the device's
//! decoder capabilities, the preferences store, and the user-notice
//! surface.
//!
//! ## Traits
//!
//! - [`CatalogSource`](catalog::CatalogSource) - paged upstream catalog
//!   listing plus on-demand detail loads
//! - [`PlayerAdapter`](player::PlayerAdapter) - queue control of the host
//!   media player
//! - [`DecoderCapabilities`](player::DecoderCapabilities) - device decode
//!   capability probing (HEVC)
//! - [`SettingsStore`](storage::SettingsStore) - key-value persistence for
//!   restored sync state
//! - [`NoticeSink`](notice::NoticeSink) - transient user-visible messages
//!
//! ## Error Handling
//!
//! All bridge traits use [`BridgeError`](error::BridgeError). Host
//! implementations convert their native errors into it and keep messages
//! actionable; the core classifies and recovers, it does not parse.
//!
//! ## Thread Safety
//!
//! All traits are `Send + Sync`: the sync coordinator and the resilience
//! controller call them from spawned tasks.

pub mod catalog;
pub mod error;
pub mod notice;
pub mod player;
pub mod storage;

pub use error::BridgeError;

// Re-export commonly used types
pub use catalog::{
    CatalogCategory, CatalogEntry, CatalogPage, CatalogSource, ContentType, MovieDetail, NowNext,
    SeriesDetail, SeriesEpisode, SeriesSeason,
};
pub use notice::{NoticeSink, NullNoticeSink};
pub use player::{
    DecoderCapabilities, FailingFormat, PlayerAdapter, PlayerErrorEvent, PlayerMediaItem,
    PlayerTransition,
};
pub use storage::SettingsStore;
