//! # Catalog Domain Models
//!
//! Sections, cached content items, categories, and section sync
//! checkpoints. Content items are owned by the index store; everything
//! else in the workspace holds references or clones and never mutates
//! them in place.

use crate::error::{CatalogError, Result};
use bridge_traits::catalog::{CatalogCategory, CatalogEntry, ContentType};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Sections
// ============================================================================

/// Catalog partitions the UI navigates between.
///
/// Only [`SYNC_SECTIONS`] are indexed from the upstream; the rest are views
/// over cached data or purely local surfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    All,
    ContinueWatching,
    Favorites,
    Movies,
    Series,
    Live,
    Categories,
    LocalFiles,
    Settings,
}

/// Sections indexed from the upstream catalog, in the fixed order the
/// background full sync processes them.
pub const SYNC_SECTIONS: [Section; 3] = [Section::Movies, Section::Series, Section::Live];

impl Section {
    /// String form used in database columns, events, and persisted state.
    pub fn as_str(&self) -> &'static str {
        match self {
            Section::All => "all",
            Section::ContinueWatching => "continue_watching",
            Section::Favorites => "favorites",
            Section::Movies => "movies",
            Section::Series => "series",
            Section::Live => "live",
            Section::Categories => "categories",
            Section::LocalFiles => "local_files",
            Section::Settings => "settings",
        }
    }

    /// Whether this section is indexed from the upstream.
    pub fn is_sync_target(&self) -> bool {
        matches!(self, Section::Movies | Section::Series | Section::Live)
    }

    /// The content type a sync-target section indexes.
    pub fn content_type(&self) -> Option<ContentType> {
        match self {
            Section::Movies => Some(ContentType::Movie),
            Section::Series => Some(ContentType::Series),
            Section::Live => Some(ContentType::Live),
            _ => None,
        }
    }

    /// The section a content type is indexed under.
    pub fn for_content_type(content_type: ContentType) -> Section {
        match content_type {
            ContentType::Movie => Section::Movies,
            ContentType::Series => Section::Series,
            ContentType::Live => Section::Live,
        }
    }
}

impl FromStr for Section {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "all" => Ok(Section::All),
            "continue_watching" => Ok(Section::ContinueWatching),
            "favorites" => Ok(Section::Favorites),
            "movies" => Ok(Section::Movies),
            "series" => Ok(Section::Series),
            "live" => Ok(Section::Live),
            "categories" => Ok(Section::Categories),
            "local_files" => Ok(Section::LocalFiles),
            "settings" => Ok(Section::Settings),
            _ => Err(CatalogError::UnknownSection(s.to_string())),
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Content Items
// ============================================================================

/// One cached catalog item.
///
/// Identity is `(content_type, id)`. A series item with no
/// `container_extension` is a container node (the series itself); episodes
/// resolved from series metadata carry a concrete extension and their own
/// stream id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentItem {
    pub content_type: ContentType,
    pub id: i64,
    /// Stream identity used to build playback URLs.
    pub stream_id: i64,
    pub name: String,
    pub category_id: Option<String>,
    pub icon_url: Option<String>,
    pub container_extension: Option<String>,
    /// Unix timestamp the upstream first listed the item, when known.
    pub added_at: Option<i64>,
}

impl ContentItem {
    /// Whether the item can be handed to the playback queue directly.
    ///
    /// Live channels and movies always play; a series item only when it
    /// resolves to a concrete episode with a known container extension.
    pub fn is_playable(&self) -> bool {
        match self.content_type {
            ContentType::Live | ContentType::Movie => true,
            ContentType::Series => self.container_extension.is_some(),
        }
    }

    /// Build a cached item from an upstream catalog entry.
    pub fn from_entry(entry: CatalogEntry) -> Self {
        Self {
            content_type: entry.content_type,
            id: entry.id,
            stream_id: entry.stream_id,
            name: entry.name,
            category_id: entry.category_id,
            icon_url: entry.icon_url,
            container_extension: entry.container_extension,
            added_at: entry.added_at,
        }
    }
}

// ============================================================================
// Categories
// ============================================================================

/// One cached catalog category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub content_type: ContentType,
    pub id: String,
    pub name: String,
    pub thumbnail_url: Option<String>,
}

impl Category {
    /// Build a cached category from an upstream category.
    pub fn from_upstream(category: CatalogCategory) -> Self {
        Self {
            content_type: category.content_type,
            id: category.id,
            name: category.name,
            thumbnail_url: category.thumbnail_url,
        }
    }
}

// ============================================================================
// Section Sync Checkpoints
// ============================================================================

/// Persisted progress marker for one section's indexing.
///
/// Created on the first sync attempt, advanced per committed page, flipped
/// complete on the final page. Never rewound except by an explicit forced
/// resync, which deletes the row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionSyncCheckpoint {
    pub section: Section,
    /// Item offset the next page fetch starts from.
    pub cursor: u64,
    /// Items committed so far. Strictly increasing.
    pub items_indexed: u64,
    /// Upstream-reported total, when known.
    pub total_estimate: Option<u64>,
    pub is_complete: bool,
    /// Unix timestamp of the last advance.
    pub updated_at: i64,
}

impl SectionSyncCheckpoint {
    /// Best-effort completion estimate in `[0, 1]`.
    ///
    /// Returns `1.0` only for a complete checkpoint; with an unknown total
    /// the estimate saturates just below completion.
    pub fn progress(&self) -> f32 {
        if self.is_complete {
            return 1.0;
        }
        match self.total_estimate {
            Some(total) if total > 0 => {
                ((self.items_indexed as f64 / total as f64) as f32).min(0.99)
            }
            _ => {
                if self.items_indexed > 0 {
                    0.5
                } else {
                    0.0
                }
            }
        }
    }
}

// ============================================================================
// Search Normalization
// ============================================================================

/// Normalize a display name for LIKE-based search: lowercase, punctuation
/// stripped to spaces, whitespace collapsed.
pub fn normalize_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut last_space = true;
    for c in name.chars() {
        let mapped = if c.is_alphanumeric() {
            Some(c.to_lowercase().next().unwrap_or(c))
        } else if c.is_whitespace() || c.is_ascii_punctuation() {
            None
        } else {
            Some(c)
        };
        match mapped {
            Some(c) => {
                out.push(c);
                last_space = false;
            }
            None => {
                if !last_space {
                    out.push(' ');
                    last_space = true;
                }
            }
        }
    }
    out.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_sections_order() {
        assert_eq!(
            SYNC_SECTIONS,
            [Section::Movies, Section::Series, Section::Live]
        );
        assert!(SYNC_SECTIONS.iter().all(Section::is_sync_target));
    }

    #[test]
    fn test_section_roundtrip() {
        for section in [
            Section::All,
            Section::ContinueWatching,
            Section::Favorites,
            Section::Movies,
            Section::Series,
            Section::Live,
            Section::Categories,
            Section::LocalFiles,
            Section::Settings,
        ] {
            assert_eq!(section.as_str().parse::<Section>().unwrap(), section);
        }
        assert!("radio".parse::<Section>().is_err());
    }

    #[test]
    fn test_content_type_mapping() {
        assert_eq!(Section::Movies.content_type(), Some(ContentType::Movie));
        assert_eq!(Section::Favorites.content_type(), None);
        assert_eq!(Section::for_content_type(ContentType::Live), Section::Live);
    }

    #[test]
    fn test_series_node_not_playable_without_extension() {
        let mut item = ContentItem {
            content_type: ContentType::Series,
            id: 7,
            stream_id: 7,
            name: "Some Show".to_string(),
            category_id: None,
            icon_url: None,
            container_extension: None,
            added_at: None,
        };
        assert!(!item.is_playable());

        item.container_extension = Some("mkv".to_string());
        assert!(item.is_playable());
    }

    #[test]
    fn test_checkpoint_progress_never_one_before_complete() {
        let mut cp = SectionSyncCheckpoint {
            section: Section::Movies,
            cursor: 1000,
            items_indexed: 1000,
            total_estimate: Some(1000),
            is_complete: false,
            updated_at: 0,
        };
        assert!(cp.progress() < 1.0);

        cp.is_complete = true;
        assert_eq!(cp.progress(), 1.0);
    }

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("The  Office (US)"), "the office us");
        assert_eq!(normalize_name("  S.W.A.T. "), "s w a t");
        assert_eq!(normalize_name("NCIS: LA"), "ncis la");
    }
}
