//! Catalog Source Abstraction
//!
//! Contract between the core and an upstream catalog API (live channels,
//! movies, series). The indexing pipeline only ever sees this trait; the
//! concrete transport (Xtream player API, M3U playlist, test fixture) lives
//! behind it.
//!
//! Paging is expressed as `(offset, limit)` windows over a stable upstream
//! ordering. A source that can only return complete lists windows them
//! client-side; the core does not care, it just follows `next_offset` until
//! it is `None`.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Kind of playable content an upstream catalog serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    /// Live channel.
    Live,
    /// Video-on-demand movie.
    Movie,
    /// Series container or episode.
    Series,
}

impl ContentType {
    /// String form used in database columns and media ids.
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Live => "live",
            ContentType::Movie => "movie",
            ContentType::Series => "series",
        }
    }

    /// Uppercase plural form used in player-facing media ids
    /// (`"MOVIES:42"`).
    pub fn media_id_prefix(&self) -> &'static str {
        match self {
            ContentType::Live => "LIVE",
            ContentType::Movie => "MOVIES",
            ContentType::Series => "SERIES",
        }
    }

    /// Parse the database column form.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "live" => Some(ContentType::Live),
            "movie" => Some(ContentType::Movie),
            "series" => Some(ContentType::Series),
            _ => None,
        }
    }
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One catalog entry as reported by the upstream, prior to indexing.
///
/// `container_extension` is `None` for series container nodes; a concrete
/// value marks a directly playable item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub content_type: ContentType,
    /// Upstream identity within the content type.
    pub id: i64,
    /// Stream identity used to build playback URLs. Usually equals `id`;
    /// differs for series episodes.
    pub stream_id: i64,
    pub name: String,
    pub category_id: Option<String>,
    pub icon_url: Option<String>,
    pub container_extension: Option<String>,
    /// Unix timestamp the upstream first listed the entry, when known.
    pub added_at: Option<i64>,
}

/// One catalog category as reported by the upstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogCategory {
    pub content_type: ContentType,
    pub id: String,
    pub name: String,
    pub thumbnail_url: Option<String>,
}

/// One window of catalog entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogPage {
    pub entries: Vec<CatalogEntry>,
    /// Offset of the first entry in this page within the upstream ordering.
    pub offset: u64,
    /// Offset to request next, or `None` when the listing is exhausted.
    pub next_offset: Option<u64>,
    /// Total entry count when the upstream reports one.
    pub total: Option<u64>,
}

/// Detailed movie metadata, loaded on demand.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MovieDetail {
    pub stream_id: i64,
    pub name: String,
    pub plot: Option<String>,
    pub genre: Option<String>,
    pub director: Option<String>,
    pub cast: Option<String>,
    pub release_date: Option<String>,
    pub rating: Option<String>,
    pub duration_secs: Option<u64>,
    pub container_extension: Option<String>,
    pub cover_url: Option<String>,
}

/// One episode within a series season.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesEpisode {
    /// Stream identity used to build the playback URL.
    pub id: i64,
    pub title: String,
    pub season: u32,
    pub episode_num: u32,
    pub container_extension: String,
    pub plot: Option<String>,
    pub duration_secs: Option<u64>,
}

/// One season of a series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesSeason {
    pub season: u32,
    pub name: Option<String>,
    pub episodes: Vec<SeriesEpisode>,
}

/// Detailed series metadata including the season/episode tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeriesDetail {
    pub series_id: i64,
    pub name: String,
    pub plot: Option<String>,
    pub genre: Option<String>,
    pub cast: Option<String>,
    pub rating: Option<String>,
    pub cover_url: Option<String>,
    pub seasons: Vec<SeriesSeason>,
}

/// Current and upcoming programme for a live channel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NowNext {
    pub now_title: Option<String>,
    pub now_start: Option<i64>,
    pub now_end: Option<i64>,
    pub next_title: Option<String>,
    pub next_start: Option<i64>,
}

/// Upstream catalog API.
///
/// Implementations must be cheap to call repeatedly: `fetch_page` with the
/// same offset may be issued again after a cancelled or failed indexing
/// pass, and the result must be deterministic for a stable upstream.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// List the categories of one content type.
    async fn fetch_categories(&self, content_type: ContentType) -> Result<Vec<CatalogCategory>>;

    /// Fetch one window of the full listing for a content type.
    ///
    /// `offset` is an item offset, not a page number. Implementations
    /// return fewer than `limit` entries only on the final window.
    async fn fetch_page(
        &self,
        content_type: ContentType,
        offset: u64,
        limit: u64,
    ) -> Result<CatalogPage>;

    /// Load detailed movie metadata.
    async fn fetch_movie_detail(&self, stream_id: i64) -> Result<MovieDetail>;

    /// Load detailed series metadata including seasons and episodes.
    async fn fetch_series_detail(&self, series_id: i64) -> Result<SeriesDetail>;

    /// Load the short EPG (current/next programme) for a live channel.
    async fn fetch_now_next(&self, stream_id: i64) -> Result<NowNext>;
}
