//! # Event Bus System
//!
//! Event-driven communication between the core modules, built on
//! `tokio::sync::broadcast`. The sync coordinator, the content index store,
//! and the playback resilience controller publish typed events; hosts and
//! other modules subscribe independently.
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{CoreEvent, EventBus, SyncEvent};
//!
//! let event_bus = EventBus::new(100);
//! let event = CoreEvent::Sync(SyncEvent::Paused {
//!     account: "server|user|Main".to_string(),
//!     for_playback: false,
//! });
//! event_bus.emit(event).ok();
//! ```
//!
//! ## Error Handling
//!
//! `tokio::sync::broadcast` yields two receiver errors:
//!
//! - `RecvError::Lagged(n)` - the subscriber missed `n` events. Non-fatal;
//!   keep receiving.
//! - `RecvError::Closed` - all senders dropped; treat as shutdown.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

// Re-export commonly used types
pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
///
/// Subscribers that fall behind by more than this receive
/// `RecvError::Lagged`.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event enum encompassing all event categories.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Progressive sync lifecycle and progress events
    Sync(SyncEvent),
    /// Playback recovery events
    Playback(PlaybackEvent),
    /// Catalog cache events
    Catalog(CatalogEvent),
}

impl CoreEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Sync(e) => e.description(),
            CoreEvent::Playback(e) => e.description(),
            CoreEvent::Catalog(e) => e.description(),
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Sync(SyncEvent::Failed { .. }) => EventSeverity::Error,
            CoreEvent::Playback(PlaybackEvent::FallbackExhausted { .. }) => EventSeverity::Error,
            CoreEvent::Playback(PlaybackEvent::UnsupportedCodec { .. }) => EventSeverity::Warning,
            CoreEvent::Sync(SyncEvent::Completed { .. }) => EventSeverity::Info,
            CoreEvent::Catalog(CatalogEvent::CacheCleared { .. }) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    /// Debug-level events (verbose)
    Debug,
    /// Informational events
    Info,
    /// Warning events
    Warning,
    /// Error events
    Error,
}

// ============================================================================
// Sync Events
// ============================================================================

/// Events emitted by the progressive sync coordinator.
///
/// `section` fields carry the section's string form (`"movies"`,
/// `"series"`, `"live"`) so this crate stays below the catalog crate in the
/// dependency graph.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event")]
pub enum SyncEvent {
    /// A sync phase started running.
    Started {
        /// Unique identifier of this coordinator run.
        run_id: String,
        /// Account partition key.
        account: String,
        /// Phase name (`"fast_start"`, `"background_full"`, `"boost"`).
        phase: String,
    },
    /// One indexed page committed.
    Progress {
        run_id: String,
        section: String,
        /// Items indexed for this section so far. Strictly increasing.
        items_indexed: u64,
        /// Best-effort completion estimate in `[0, 1]`; `1.0` only when
        /// the section checkpoint is complete.
        progress: f32,
    },
    /// One section finished indexing.
    SectionCompleted {
        run_id: String,
        section: String,
        items_indexed: u64,
    },
    /// Every sync-target section is complete.
    Completed { run_id: String, account: String },
    /// The running phase failed; checkpoints are intact.
    Failed {
        run_id: String,
        message: String,
        /// Whether resuming will make further progress.
        recoverable: bool,
    },
    /// Background work paused (explicitly or for playback).
    Paused { account: String, for_playback: bool },
    /// Background work resumed from checkpoints.
    Resumed { account: String, phase: String },
}

impl SyncEvent {
    fn description(&self) -> &str {
        match self {
            SyncEvent::Started { .. } => "Sync phase started",
            SyncEvent::Progress { .. } => "Sync in progress",
            SyncEvent::SectionCompleted { .. } => "Section indexed",
            SyncEvent::Completed { .. } => "Full index complete",
            SyncEvent::Failed { .. } => "Sync failed",
            SyncEvent::Paused { .. } => "Sync paused",
            SyncEvent::Resumed { .. } => "Sync resumed",
        }
    }
}

// ============================================================================
// Playback Events
// ============================================================================

/// Events emitted by the playback resilience controller.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event")]
pub enum PlaybackEvent {
    /// A live stream dropped; a delayed reconnect was scheduled.
    ReconnectScheduled {
        media_id: String,
        /// 1-based reconnect attempt number.
        attempt: u32,
        delay_ms: u64,
    },
    /// The current item was swapped to its next candidate URI.
    FallbackSwitched {
        media_id: String,
        /// 1-based index of the candidate now playing.
        attempt: usize,
        uri: String,
    },
    /// No candidate URIs remain for the item.
    FallbackExhausted { media_id: String, title: String },
    /// The failing format needs a decoder the device lacks.
    UnsupportedCodec { media_id: String, codec: String },
    /// The player advanced to another queue item.
    TrackChanged {
        media_id: String,
        title: String,
        index: usize,
    },
    /// Live playback recovered; reconnect state was reset.
    ReconnectCleared { media_id: String },
}

impl PlaybackEvent {
    fn description(&self) -> &str {
        match self {
            PlaybackEvent::ReconnectScheduled { .. } => "Live reconnect scheduled",
            PlaybackEvent::FallbackSwitched { .. } => "Switched to fallback stream",
            PlaybackEvent::FallbackExhausted { .. } => "No more stream candidates",
            PlaybackEvent::UnsupportedCodec { .. } => "Unsupported codec",
            PlaybackEvent::TrackChanged { .. } => "Queue item changed",
            PlaybackEvent::ReconnectCleared { .. } => "Live stream recovered",
        }
    }
}

// ============================================================================
// Catalog Events
// ============================================================================

/// Events emitted by the content index store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event")]
pub enum CatalogEvent {
    /// All cached content for an account was wiped (account switch or
    /// sign-out). Outstanding pagers for the account are now stale.
    CacheCleared { account: String },
    /// Checkpoints for a section were invalidated by a forced refresh.
    CheckpointInvalidated { account: String, section: String },
}

impl CatalogEvent {
    fn description(&self) -> &str {
        match self {
            CatalogEvent::CacheCleared { .. } => "Catalog cache cleared",
            CatalogEvent::CheckpointInvalidated { .. } => "Section checkpoint invalidated",
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central broadcast channel for publishing [`CoreEvent`]s.
///
/// Cloning is cheap; clones share the same channel.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a new event bus with the specified buffer size.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event, or an
    /// error when there are none. Callers that do not care whether anyone
    /// is listening use `.ok()`.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Creates a new subscriber to receive future events.
    ///
    /// Past events are not replayed.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    /// Returns the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_emit_and_receive() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        let event = CoreEvent::Sync(SyncEvent::SectionCompleted {
            run_id: "run-1".to_string(),
            section: "movies".to_string(),
            items_indexed: 120,
        });
        bus.emit(event.clone()).unwrap();

        assert_eq!(rx.recv().await.unwrap(), event);
    }

    #[tokio::test]
    async fn test_emit_without_subscribers_errors() {
        let bus = EventBus::new(16);
        let event = CoreEvent::Catalog(CatalogEvent::CacheCleared {
            account: "a".to_string(),
        });
        assert!(bus.emit(event).is_err());
    }

    #[test]
    fn test_severity_classification() {
        let failed = CoreEvent::Sync(SyncEvent::Failed {
            run_id: "r".to_string(),
            message: "network".to_string(),
            recoverable: true,
        });
        assert_eq!(failed.severity(), EventSeverity::Error);

        let codec = CoreEvent::Playback(PlaybackEvent::UnsupportedCodec {
            media_id: "MOVIES:1".to_string(),
            codec: "hevc".to_string(),
        });
        assert_eq!(codec.severity(), EventSeverity::Warning);
    }

    #[test]
    fn test_event_serialization_roundtrip() {
        let event = CoreEvent::Playback(PlaybackEvent::FallbackSwitched {
            media_id: "MOVIES:42".to_string(),
            attempt: 1,
            uri: "http://s/movie/u/p/42.mkv".to_string(),
        });
        let json = serde_json::to_string(&event).unwrap();
        let back: CoreEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }
}
