//! # Playback Queue Construction
//!
//! Builds the queue handed to the host player from a list of selectable
//! content items plus the item the user picked. Every entry carries its
//! full ordered candidate list in `fallback_uris` so the resilience
//! controller can rotate encodings without re-resolving anything
//! mid-playback.

use crate::candidates::{resolve_candidates, StreamKey};
use bridge_traits::player::PlayerMediaItem;
use core_account::PlaylistConfig;
use core_catalog::ContentItem;
use std::collections::HashMap;

/// One queue entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackQueueItem {
    /// Remote stream identity; `None` for local files.
    pub key: Option<StreamKey>,
    /// Player-facing identity (`"MOVIES:42"`, `"local:file:///…"`).
    pub media_id: String,
    pub title: String,
    /// Primary playback URI - always the first fallback candidate.
    pub uri: String,
}

/// An ordered playback queue with per-item fallback candidates.
///
/// Invariants:
/// - `start_index` indexes into `items`
/// - every `fallback_uris` key belongs to an item in `items`
/// - the first candidate for a key equals that item's primary `uri`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackQueue {
    pub items: Vec<PlaybackQueueItem>,
    pub start_index: usize,
    pub fallback_uris: HashMap<StreamKey, Vec<String>>,
}

impl PlaybackQueue {
    /// The entries in the shape the host player consumes.
    pub fn player_items(&self) -> Vec<PlayerMediaItem> {
        self.items
            .iter()
            .map(|item| PlayerMediaItem {
                media_id: item.media_id.clone(),
                title: item.title.clone(),
                uri: item.uri.clone(),
            })
            .collect()
    }

    /// Ordered candidate URIs for one item, empty when the item has no
    /// alternates (local files).
    pub fn candidates_for(&self, key: &StreamKey) -> &[String] {
        self.fallback_uris
            .get(key)
            .map(|c| c.as_slice())
            .unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Build a playback queue from selectable items and the selected one.
///
/// 1. Keep the playable items: live and movies always, series only when
///    resolved to a concrete episode with a known container extension.
/// 2. Append the selected item when the filter (or the caller) left it
///    out, so the queue always contains it.
/// 3. `start_index` is the selected item's position by `(type, id)`
///    identity, defaulting to 0 only if identity lookup fails.
/// 4. Resolve every item's ordered candidates; the primary URI is the
///    first candidate.
pub fn build_playback_queue(
    items: &[ContentItem],
    selected: &ContentItem,
    config: &PlaylistConfig,
) -> PlaybackQueue {
    let mut playable: Vec<&ContentItem> = items.iter().filter(|i| i.is_playable()).collect();
    if !playable
        .iter()
        .any(|i| i.content_type == selected.content_type && i.id == selected.id)
    {
        playable.push(selected);
    }

    let start_index = playable
        .iter()
        .position(|i| i.content_type == selected.content_type && i.id == selected.id)
        .unwrap_or(0);

    let mut queue_items = Vec::with_capacity(playable.len());
    let mut fallback_uris = HashMap::with_capacity(playable.len());
    for item in playable {
        let key = StreamKey::new(item.content_type, item.id);
        let candidates = resolve_candidates(
            config,
            item.content_type,
            item.stream_id,
            item.container_extension.as_deref(),
        );
        queue_items.push(PlaybackQueueItem {
            key: Some(key),
            media_id: key.media_id(),
            title: item.name.clone(),
            uri: candidates[0].clone(),
        });
        fallback_uris.insert(key, candidates);
    }

    PlaybackQueue {
        items: queue_items,
        start_index,
        fallback_uris,
    }
}

/// A local media file to queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFile {
    pub uri: String,
    pub title: String,
}

/// Build a queue over local files: one entry per file, no fallback
/// alternates.
pub fn build_local_queue(files: &[LocalFile], start_index: usize) -> PlaybackQueue {
    let items: Vec<PlaybackQueueItem> = files
        .iter()
        .map(|file| PlaybackQueueItem {
            key: None,
            media_id: format!("local:{}", file.uri),
            title: file.title.clone(),
            uri: file.uri.clone(),
        })
        .collect();
    let start_index = if items.is_empty() {
        0
    } else {
        start_index.min(items.len() - 1)
    };

    PlaybackQueue {
        items,
        start_index,
        fallback_uris: HashMap::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::catalog::ContentType;

    fn config() -> PlaylistConfig {
        PlaylistConfig::new("http://s", "u", "p", "Main")
    }

    fn item(content_type: ContentType, id: i64, ext: Option<&str>) -> ContentItem {
        ContentItem {
            content_type,
            id,
            stream_id: id,
            name: format!("item {id}"),
            category_id: None,
            icon_url: None,
            container_extension: ext.map(str::to_string),
            added_at: None,
        }
    }

    #[test]
    fn test_series_container_nodes_filtered_out() {
        let items = vec![
            item(ContentType::Series, 1, None),        // container node
            item(ContentType::Series, 2, Some("mkv")), // concrete episode
        ];
        let queue = build_playback_queue(&items, &items[1], &config());

        assert_eq!(queue.len(), 1);
        assert_eq!(queue.items[0].media_id, "SERIES:2");
        assert_eq!(queue.start_index, 0);
    }

    #[test]
    fn test_selected_item_appended_when_absent() {
        let listed = vec![item(ContentType::Movie, 1, Some("mp4"))];
        let selected = item(ContentType::Movie, 99, Some("mp4"));
        let queue = build_playback_queue(&listed, &selected, &config());

        assert_eq!(queue.len(), 2);
        assert_eq!(queue.start_index, 1);
        assert_eq!(queue.items[1].media_id, "MOVIES:99");
    }

    #[test]
    fn test_start_index_found_by_identity() {
        let items = vec![
            item(ContentType::Movie, 1, Some("mp4")),
            item(ContentType::Movie, 2, Some("mp4")),
            item(ContentType::Movie, 3, Some("mp4")),
        ];
        let queue = build_playback_queue(&items, &items[1], &config());
        assert_eq!(queue.start_index, 1);
    }

    #[test]
    fn test_fallback_invariants_hold() {
        let items = vec![
            item(ContentType::Movie, 1, Some("mkv")),
            item(ContentType::Live, 1, None),
        ];
        let queue = build_playback_queue(&items, &items[0], &config());

        assert!(queue.start_index < queue.len());
        for entry in &queue.items {
            let key = entry.key.expect("remote items carry a key");
            let candidates = queue.candidates_for(&key);
            assert!(!candidates.is_empty());
            assert_eq!(candidates[0], entry.uri);
        }
        // ids overlap across types without colliding
        assert_eq!(queue.fallback_uris.len(), 2);
    }

    #[test]
    fn test_local_queue_has_no_fallbacks() {
        let files = vec![
            LocalFile {
                uri: "file:///a.mkv".to_string(),
                title: "A".to_string(),
            },
            LocalFile {
                uri: "file:///b.mkv".to_string(),
                title: "B".to_string(),
            },
        ];
        let queue = build_local_queue(&files, 1);

        assert_eq!(queue.len(), 2);
        assert_eq!(queue.start_index, 1);
        assert!(queue.fallback_uris.is_empty());
        assert_eq!(queue.items[0].media_id, "local:file:///a.mkv");
    }

    #[test]
    fn test_local_queue_clamps_start_index() {
        let files = vec![LocalFile {
            uri: "file:///a.mkv".to_string(),
            title: "A".to_string(),
        }];
        let queue = build_local_queue(&files, 10);
        assert_eq!(queue.start_index, 0);
    }
}
