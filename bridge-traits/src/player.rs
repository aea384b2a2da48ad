//! Playback Engine Abstraction
//!
//! Contract between the core's playback-continuity logic and the host's
//! media player. The core never decodes media; it hands the player a queue
//! of URIs and reacts to the error/state signals the host forwards back.
//!
//! The direction of each half matters:
//!
//! - [`PlayerAdapter`] is **core → host**: queue control, source swapping,
//!   prepare/play.
//! - [`PlayerErrorEvent`] / [`PlayerTransition`] are **host → core**: the
//!   host's player listener translates its native callbacks into these and
//!   feeds them to the resilience controller.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One entry handed to the player's queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerMediaItem {
    /// Stable identity of the item (`"MOVIES:42"`, `"local:file:///…"`).
    pub media_id: String,
    pub title: String,
    pub uri: String,
}

/// Queue control surface of the host media player.
#[async_trait]
pub trait PlayerAdapter: Send + Sync {
    /// Replace the player's queue and move to `start_index` without
    /// starting playback.
    async fn set_queue(&self, items: Vec<PlayerMediaItem>, start_index: usize) -> Result<()>;

    /// Swap the URI of the *current* queue position in place, preserving
    /// the rest of the queue. Used for fallback rotation.
    async fn set_current_source(&self, uri: &str) -> Result<()>;

    /// (Re-)prepare the current source. Used by live reconnect.
    async fn prepare(&self) -> Result<()>;

    /// Start or resume playback.
    async fn play(&self) -> Result<()>;

    /// Pause playback.
    async fn pause(&self) -> Result<()>;

    /// Index of the current queue item.
    async fn current_index(&self) -> usize;

    /// Whether the player would progress if given media.
    async fn is_playing(&self) -> bool;
}

/// Codec information of the format that failed to play, as far as the host
/// player can report it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailingFormat {
    /// RFC 6381 codec string (`"hvc1.1.6.L120"`, `"avc1.64001f"`, …).
    pub codecs: Option<String>,
    /// Container or sample MIME type (`"video/hevc"`, …).
    pub mime_type: Option<String>,
}

/// A playback error event forwarded from the host player.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerErrorEvent {
    /// Top-level error message.
    pub message: String,
    /// Messages of the error's cause chain, outermost first.
    pub cause_messages: Vec<String>,
    /// Format that was being decoded when the error occurred, if known.
    pub failing_format: Option<FailingFormat>,
}

impl PlayerErrorEvent {
    /// Iterate over the top-level message and every cause message.
    pub fn messages(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.message.as_str())
            .chain(self.cause_messages.iter().map(|s| s.as_str()))
    }
}

/// Player state transitions the core reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayerTransition {
    /// The player buffered enough to start or resume rendering.
    Ready,
    /// The player advanced to another queue item.
    MediaItemChanged,
    /// Playback reached the end of the queue.
    Ended,
}

/// Decode capabilities of the host device.
///
/// Queried synchronously; hosts should probe once at startup and cache.
pub trait DecoderCapabilities: Send + Sync {
    /// Whether the device has a working HEVC/H.265 video decoder.
    fn supports_hevc(&self) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_event_messages_includes_causes() {
        let event = PlayerErrorEvent {
            message: "Source error".to_string(),
            cause_messages: vec!["Decoder init failed".to_string(), "hevc".to_string()],
            failing_format: None,
        };
        let all: Vec<&str> = event.messages().collect();
        assert_eq!(all, vec!["Source error", "Decoder init failed", "hevc"]);
    }
}
