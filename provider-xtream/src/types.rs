//! Wire types for the Xtream player API.
//!
//! Xtream panels are notoriously loose with JSON: numeric fields arrive as
//! numbers or strings depending on panel version, ids are sometimes
//! quoted, EPG titles are base64. Every DTO here deserializes both forms
//! through the `flex` helpers and converts into the strict
//! `bridge-traits` catalog types afterwards.

use base64::Engine;
use bridge_traits::catalog::{
    CatalogCategory, CatalogEntry, ContentType, MovieDetail, NowNext, SeriesDetail, SeriesEpisode,
    SeriesSeason,
};
use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;

// ============================================================================
// Flexible scalar parsing
// ============================================================================

/// Deserialize an `i64` that may arrive as a number or a quoted string.
pub(crate) fn flex_i64<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Int(i64),
        Float(f64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Int(v) => Ok(v),
        Raw::Float(v) => Ok(v as i64),
        Raw::Text(s) => s
            .trim()
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("not an integer: {s:?}"))),
    }
}

/// Like [`flex_i64`], tolerating absent/null/empty values.
pub(crate) fn flex_opt_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Int(i64),
        Float(f64),
        Text(String),
        None,
    }

    match Option::<Raw>::deserialize(deserializer)? {
        None | Some(Raw::None) => Ok(None),
        Some(Raw::Int(v)) => Ok(Some(v)),
        Some(Raw::Float(v)) => Ok(Some(v as i64)),
        Some(Raw::Text(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                Ok(None)
            } else {
                Ok(trimmed.parse().ok())
            }
        }
    }
}

/// Deserialize a category id that may arrive as a number or a string.
pub(crate) fn flex_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Int(i64),
        Text(String),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Int(v) => v.to_string(),
        Raw::Text(s) => s,
    })
}

pub(crate) fn flex_opt_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Int(i64),
        Text(String),
        None,
    }

    Ok(match Option::<Raw>::deserialize(deserializer)? {
        None | Some(Raw::None) => None,
        Some(Raw::Int(v)) => Some(v.to_string()),
        Some(Raw::Text(s)) => (!s.is_empty()).then_some(s),
    })
}

/// Decode a possibly-base64 EPG title; panels that send plain text pass
/// through unchanged.
pub(crate) fn decode_epg_text(raw: &str) -> String {
    match base64::engine::general_purpose::STANDARD.decode(raw) {
        Ok(bytes) => match String::from_utf8(bytes) {
            Ok(text) => text,
            Err(_) => raw.to_string(),
        },
        Err(_) => raw.to_string(),
    }
}

// ============================================================================
// Listing DTOs
// ============================================================================

/// One category row from `get_*_categories`.
#[derive(Debug, Clone, Deserialize)]
pub struct XtreamCategory {
    #[serde(deserialize_with = "flex_string")]
    pub category_id: String,
    pub category_name: String,
}

impl XtreamCategory {
    pub fn into_category(self, content_type: ContentType) -> CatalogCategory {
        CatalogCategory {
            content_type,
            id: self.category_id,
            name: self.category_name,
            thumbnail_url: None,
        }
    }
}

/// One row from `get_live_streams`.
#[derive(Debug, Clone, Deserialize)]
pub struct XtreamLiveStream {
    #[serde(deserialize_with = "flex_i64")]
    pub stream_id: i64,
    pub name: String,
    #[serde(default, deserialize_with = "flex_opt_string")]
    pub category_id: Option<String>,
    #[serde(default, deserialize_with = "flex_opt_string")]
    pub stream_icon: Option<String>,
    #[serde(default, deserialize_with = "flex_opt_i64")]
    pub added: Option<i64>,
}

impl XtreamLiveStream {
    pub fn into_entry(self) -> CatalogEntry {
        CatalogEntry {
            content_type: ContentType::Live,
            id: self.stream_id,
            stream_id: self.stream_id,
            name: self.name,
            category_id: self.category_id,
            icon_url: self.stream_icon,
            container_extension: None,
            added_at: self.added,
        }
    }
}

/// One row from `get_vod_streams`.
#[derive(Debug, Clone, Deserialize)]
pub struct XtreamVodStream {
    #[serde(deserialize_with = "flex_i64")]
    pub stream_id: i64,
    pub name: String,
    #[serde(default, deserialize_with = "flex_opt_string")]
    pub category_id: Option<String>,
    #[serde(default, deserialize_with = "flex_opt_string")]
    pub stream_icon: Option<String>,
    #[serde(default, deserialize_with = "flex_opt_string")]
    pub container_extension: Option<String>,
    #[serde(default, deserialize_with = "flex_opt_i64")]
    pub added: Option<i64>,
}

impl XtreamVodStream {
    pub fn into_entry(self) -> CatalogEntry {
        CatalogEntry {
            content_type: ContentType::Movie,
            id: self.stream_id,
            stream_id: self.stream_id,
            name: self.name,
            category_id: self.category_id,
            icon_url: self.stream_icon,
            container_extension: self.container_extension,
            added_at: self.added,
        }
    }
}

/// One row from `get_series`.
#[derive(Debug, Clone, Deserialize)]
pub struct XtreamSeriesItem {
    #[serde(deserialize_with = "flex_i64")]
    pub series_id: i64,
    pub name: String,
    #[serde(default, deserialize_with = "flex_opt_string")]
    pub category_id: Option<String>,
    #[serde(default, deserialize_with = "flex_opt_string")]
    pub cover: Option<String>,
}

impl XtreamSeriesItem {
    pub fn into_entry(self) -> CatalogEntry {
        // Series rows are container nodes: no extension until an episode
        // is resolved.
        CatalogEntry {
            content_type: ContentType::Series,
            id: self.series_id,
            stream_id: self.series_id,
            name: self.name,
            category_id: self.category_id,
            icon_url: self.cover,
            container_extension: None,
            added_at: None,
        }
    }
}

// ============================================================================
// Detail DTOs
// ============================================================================

/// `get_vod_info` response.
#[derive(Debug, Clone, Deserialize)]
pub struct XtreamVodInfoResponse {
    #[serde(default)]
    pub info: XtreamVodInfo,
    pub movie_data: XtreamVodMovieData,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct XtreamVodInfo {
    #[serde(default, deserialize_with = "flex_opt_string")]
    pub plot: Option<String>,
    #[serde(default, deserialize_with = "flex_opt_string")]
    pub genre: Option<String>,
    #[serde(default, deserialize_with = "flex_opt_string")]
    pub director: Option<String>,
    #[serde(default, deserialize_with = "flex_opt_string")]
    pub cast: Option<String>,
    #[serde(default, deserialize_with = "flex_opt_string")]
    pub releasedate: Option<String>,
    #[serde(default, deserialize_with = "flex_opt_string")]
    pub rating: Option<String>,
    #[serde(default, deserialize_with = "flex_opt_i64")]
    pub duration_secs: Option<i64>,
    #[serde(default, deserialize_with = "flex_opt_string")]
    pub movie_image: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct XtreamVodMovieData {
    #[serde(deserialize_with = "flex_i64")]
    pub stream_id: i64,
    pub name: String,
    #[serde(default, deserialize_with = "flex_opt_string")]
    pub container_extension: Option<String>,
}

impl XtreamVodInfoResponse {
    pub fn into_detail(self) -> MovieDetail {
        MovieDetail {
            stream_id: self.movie_data.stream_id,
            name: self.movie_data.name,
            plot: self.info.plot,
            genre: self.info.genre,
            director: self.info.director,
            cast: self.info.cast,
            release_date: self.info.releasedate,
            rating: self.info.rating,
            duration_secs: self.info.duration_secs.map(|d| d.max(0) as u64),
            container_extension: self.movie_data.container_extension,
            cover_url: self.info.movie_image,
        }
    }
}

/// `get_series_info` response. Episodes arrive keyed by season number
/// string.
#[derive(Debug, Clone, Deserialize)]
pub struct XtreamSeriesInfoResponse {
    #[serde(default)]
    pub info: XtreamSeriesInfo,
    #[serde(default)]
    pub episodes: BTreeMap<String, Vec<XtreamEpisode>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct XtreamSeriesInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "flex_opt_string")]
    pub plot: Option<String>,
    #[serde(default, deserialize_with = "flex_opt_string")]
    pub genre: Option<String>,
    #[serde(default, deserialize_with = "flex_opt_string")]
    pub cast: Option<String>,
    #[serde(default, deserialize_with = "flex_opt_string")]
    pub rating: Option<String>,
    #[serde(default, deserialize_with = "flex_opt_string")]
    pub cover: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct XtreamEpisode {
    /// Episode stream id; panels quote this one almost universally.
    #[serde(deserialize_with = "flex_i64")]
    pub id: i64,
    pub title: String,
    #[serde(default, deserialize_with = "flex_opt_i64")]
    pub episode_num: Option<i64>,
    #[serde(default, deserialize_with = "flex_opt_i64")]
    pub season: Option<i64>,
    #[serde(default, deserialize_with = "flex_opt_string")]
    pub container_extension: Option<String>,
    #[serde(default)]
    pub info: XtreamEpisodeInfo,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct XtreamEpisodeInfo {
    #[serde(default, deserialize_with = "flex_opt_string")]
    pub plot: Option<String>,
    #[serde(default, deserialize_with = "flex_opt_i64")]
    pub duration_secs: Option<i64>,
}

impl XtreamSeriesInfoResponse {
    pub fn into_detail(self, series_id: i64) -> SeriesDetail {
        let mut seasons: Vec<SeriesSeason> = Vec::with_capacity(self.episodes.len());
        for (season_key, episodes) in self.episodes {
            let season_num = season_key.trim().parse::<u32>().unwrap_or(0);
            let mut converted: Vec<SeriesEpisode> = episodes
                .into_iter()
                .map(|ep| SeriesEpisode {
                    id: ep.id,
                    title: ep.title,
                    season: ep.season.map(|s| s.max(0) as u32).unwrap_or(season_num),
                    episode_num: ep.episode_num.map(|e| e.max(0) as u32).unwrap_or(0),
                    container_extension: ep
                        .container_extension
                        .unwrap_or_else(|| "mp4".to_string()),
                    plot: ep.info.plot,
                    duration_secs: ep.info.duration_secs.map(|d| d.max(0) as u64),
                })
                .collect();
            converted.sort_by_key(|ep| ep.episode_num);
            seasons.push(SeriesSeason {
                season: season_num,
                name: None,
                episodes: converted,
            });
        }
        seasons.sort_by_key(|s| s.season);

        SeriesDetail {
            series_id,
            name: self.info.name,
            plot: self.info.plot,
            genre: self.info.genre,
            cast: self.info.cast,
            rating: self.info.rating,
            cover_url: self.info.cover,
            seasons,
        }
    }
}

/// `get_short_epg` response.
#[derive(Debug, Clone, Deserialize)]
pub struct XtreamShortEpgResponse {
    #[serde(default)]
    pub epg_listings: Vec<XtreamEpgListing>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct XtreamEpgListing {
    #[serde(default)]
    pub title: String,
    #[serde(default, deserialize_with = "flex_opt_i64")]
    pub start_timestamp: Option<i64>,
    #[serde(default, deserialize_with = "flex_opt_i64")]
    pub stop_timestamp: Option<i64>,
}

impl XtreamShortEpgResponse {
    pub fn into_now_next(self) -> NowNext {
        let mut listings = self.epg_listings.into_iter();
        let now = listings.next();
        let next = listings.next();
        NowNext {
            now_title: now.as_ref().map(|l| decode_epg_text(&l.title)),
            now_start: now.as_ref().and_then(|l| l.start_timestamp),
            now_end: now.as_ref().and_then(|l| l.stop_timestamp),
            next_title: next.as_ref().map(|l| decode_epg_text(&l.title)),
            next_start: next.as_ref().and_then(|l| l.start_timestamp),
        }
    }
}
