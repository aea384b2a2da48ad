//! # Xtream Provider
//!
//! Implements [`CatalogSource`](bridge_traits::catalog::CatalogSource) for
//! Xtream-Codes panels over the `player_api.php` endpoint family.
//!
//! ## Overview
//!
//! This crate provides:
//! - Category and stream listing for live, VOD, and series content
//! - Client-side page windowing over the panel's complete listings
//! - On-demand VOD/series detail and short-EPG loads
//! - Tolerant JSON decoding for the panel ecosystem's loose typing
//!   (quoted numbers, base64 EPG titles, empty-string nulls)

pub mod client;
pub mod error;
pub mod types;

pub use client::XtreamClient;
pub use error::{Result, XtreamError};
