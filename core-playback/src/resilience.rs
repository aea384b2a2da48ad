//! # Playback Resilience Controller
//!
//! Keeps playback moving forward across transient stream failures without
//! user intervention when possible, and leaves manual next/previous
//! navigation working when not.
//!
//! The host's player listener forwards three signals:
//!
//! - **errors** → bounded live reconnect first, then HEVC classification,
//!   then fallback-URI rotation, then a terminal per-item notice
//! - **ready** → live reconnect state resets, pending reconnects cancel
//! - **media transitions** → displayed metadata refreshes with an
//!   index-bounds clamp (queue drift is logged, never fatal)
//!
//! Both recovery loops are bounded by counters, not wall-clock timeouts:
//! live reconnects by [`ResilienceTuning::live_reconnect_max`], fallback
//! rotation by the item's candidate count.

use crate::capability::{failing_codec_label, is_hevc_failure};
use crate::candidates::StreamKey;
use crate::error::{PlaybackError, Result};
use crate::queue::PlaybackQueue;
use bridge_traits::catalog::ContentType;
use bridge_traits::notice::NoticeSink;
use bridge_traits::player::{DecoderCapabilities, PlayerAdapter, PlayerErrorEvent};
use core_runtime::events::{CoreEvent, EventBus, PlaybackEvent};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Recovery tuning knobs.
#[derive(Debug, Clone)]
pub struct ResilienceTuning {
    /// Maximum automatic reconnects per live failure burst.
    pub live_reconnect_max: u32,
    /// Delay before each reconnect attempt, so a dead stream is not
    /// hammered.
    pub live_reconnect_delay: Duration,
}

impl Default for ResilienceTuning {
    fn default() -> Self {
        Self {
            live_reconnect_max: 3,
            live_reconnect_delay: Duration::from_secs(4),
        }
    }
}

struct ControllerInner {
    queue: Option<PlaybackQueue>,
    /// Candidate index currently in use per item. Lives for the queue's
    /// lifetime; never exceeds `candidates.len() - 1`.
    fallback_attempts: HashMap<StreamKey, usize>,
    /// Reconnects attempted in the current live failure burst.
    reconnect_attempts: u32,
    pending_reconnect: Option<CancellationToken>,
    current_title: Option<String>,
}

/// Runtime recovery driver for one playback session.
pub struct ResilienceController {
    player: Arc<dyn PlayerAdapter>,
    capabilities: Arc<dyn DecoderCapabilities>,
    notices: Arc<dyn NoticeSink>,
    events: EventBus,
    tuning: ResilienceTuning,
    inner: Mutex<ControllerInner>,
}

impl ResilienceController {
    pub fn new(
        player: Arc<dyn PlayerAdapter>,
        capabilities: Arc<dyn DecoderCapabilities>,
        notices: Arc<dyn NoticeSink>,
        events: EventBus,
        tuning: ResilienceTuning,
    ) -> Arc<Self> {
        Arc::new(Self {
            player,
            capabilities,
            notices,
            events,
            tuning,
            inner: Mutex::new(ControllerInner {
                queue: None,
                fallback_attempts: HashMap::new(),
                reconnect_attempts: 0,
                pending_reconnect: None,
                current_title: None,
            }),
        })
    }

    /// Hand a freshly built queue to the player and reset all recovery
    /// state.
    #[instrument(skip(self, queue), fields(items = queue.len(), start = queue.start_index))]
    pub async fn attach_queue(&self, queue: PlaybackQueue) -> Result<()> {
        if queue.is_empty() {
            return Err(PlaybackError::InvalidInput {
                field: "queue".to_string(),
                message: "cannot attach an empty queue".to_string(),
            });
        }
        self.player
            .set_queue(queue.player_items(), queue.start_index)
            .await?;

        let mut inner = self.inner.lock();
        if let Some(pending) = inner.pending_reconnect.take() {
            pending.cancel();
        }
        inner.fallback_attempts.clear();
        inner.reconnect_attempts = 0;
        inner.current_title = queue.items.get(queue.start_index).map(|i| i.title.clone());
        inner.queue = Some(queue);
        Ok(())
    }

    /// Title of the item currently playing, as last observed.
    pub fn current_title(&self) -> Option<String> {
        self.inner.lock().current_title.clone()
    }

    /// Candidate index currently in use for an item.
    pub fn fallback_attempt(&self, key: &StreamKey) -> usize {
        self.inner
            .lock()
            .fallback_attempts
            .get(key)
            .copied()
            .unwrap_or(0)
    }

    /// Reconnects attempted in the current live failure burst.
    pub fn reconnect_attempts(&self) -> u32 {
        self.inner.lock().reconnect_attempts
    }

    // ========================================================================
    // Signal handlers
    // ========================================================================

    /// React to a player error event.
    #[instrument(skip(self, event), fields(message = %event.message))]
    pub async fn on_player_error(&self, event: PlayerErrorEvent) -> Result<()> {
        let item = self.current_item().await?;
        let is_live = item
            .key
            .is_some_and(|k| k.content_type == ContentType::Live);

        // Live streams get the bounded delayed reconnect before any
        // fallback-URI logic.
        if is_live {
            if let Some(attempt) = self.try_schedule_reconnect() {
                self.notices.notify(&format!(
                    "Live stream interrupted, reconnecting ({attempt}/{max})",
                    max = self.tuning.live_reconnect_max
                ));
                self.events
                    .emit(CoreEvent::Playback(PlaybackEvent::ReconnectScheduled {
                        media_id: item.media_id.clone(),
                        attempt,
                        delay_ms: self.tuning.live_reconnect_delay.as_millis() as u64,
                    }))
                    .ok();
                return Ok(());
            }
            debug!(media_id = %item.media_id, "live reconnect cap reached, trying fallbacks");
        }

        // Decode failures on HEVC content a device cannot decode get a
        // distinct actionable notice. Fallback candidates, when present,
        // are still worth trying: an alternate encoding may be AVC.
        if is_hevc_failure(&event) && !self.capabilities.supports_hevc() {
            let codec = failing_codec_label(&event);
            self.notices.notify(&format!(
                "This stream uses {codec}, which this device cannot decode"
            ));
            self.events
                .emit(CoreEvent::Playback(PlaybackEvent::UnsupportedCodec {
                    media_id: item.media_id.clone(),
                    codec,
                }))
                .ok();
        }

        let next = item.key.and_then(|key| self.claim_next_candidate(&key));
        match next {
            Some((attempt, uri)) => {
                info!(media_id = %item.media_id, attempt, "switching to fallback candidate");
                self.player.set_current_source(&uri).await?;
                self.player.prepare().await?;
                self.player.play().await?;
                self.events
                    .emit(CoreEvent::Playback(PlaybackEvent::FallbackSwitched {
                        media_id: item.media_id,
                        attempt,
                        uri,
                    }))
                    .ok();
            }
            None => {
                // Terminal for this item only; queue navigation still works.
                self.notices
                    .notify(&format!("Playback failed: {}", item.title));
                self.events
                    .emit(CoreEvent::Playback(PlaybackEvent::FallbackExhausted {
                        media_id: item.media_id,
                        title: item.title,
                    }))
                    .ok();
            }
        }
        Ok(())
    }

    /// React to the player reaching a ready state.
    pub async fn on_player_ready(&self) -> Result<()> {
        let item = self.current_item().await?;
        if !item
            .key
            .is_some_and(|k| k.content_type == ContentType::Live)
        {
            return Ok(());
        }

        let recovered = {
            let mut inner = self.inner.lock();
            let had_state =
                inner.reconnect_attempts > 0 || inner.pending_reconnect.is_some();
            if let Some(pending) = inner.pending_reconnect.take() {
                pending.cancel();
            }
            inner.reconnect_attempts = 0;
            had_state
        };
        if recovered {
            debug!(media_id = %item.media_id, "live stream recovered");
            self.events
                .emit(CoreEvent::Playback(PlaybackEvent::ReconnectCleared {
                    media_id: item.media_id,
                }))
                .ok();
        }
        Ok(())
    }

    /// React to the player advancing to another queue item.
    ///
    /// Fallback attempts are intentionally kept: they track candidate
    /// choice per item for the life of the queue. The reconnect burst
    /// counter resets on every channel switch.
    pub async fn on_media_transition(&self) -> Result<()> {
        let reported = self.player.current_index().await;
        let (item, index) = {
            let mut inner = self.inner.lock();
            let queue = inner.queue.as_ref().ok_or(PlaybackError::QueueNotAttached)?;
            let index = if reported >= queue.len() {
                warn!(
                    reported,
                    len = queue.len(),
                    "player index outside queue bounds, clamping"
                );
                queue.len() - 1
            } else {
                reported
            };
            let item = queue.items[index].clone();
            inner.current_title = Some(item.title.clone());
            if let Some(pending) = inner.pending_reconnect.take() {
                pending.cancel();
            }
            inner.reconnect_attempts = 0;
            (item, index)
        };

        self.events
            .emit(CoreEvent::Playback(PlaybackEvent::TrackChanged {
                media_id: item.media_id,
                title: item.title,
                index,
            }))
            .ok();
        Ok(())
    }

    // ========================================================================
    // Internals
    // ========================================================================

    async fn current_item(&self) -> Result<crate::queue::PlaybackQueueItem> {
        let reported = self.player.current_index().await;
        let inner = self.inner.lock();
        let queue = inner.queue.as_ref().ok_or(PlaybackError::QueueNotAttached)?;
        let index = reported.min(queue.len().saturating_sub(1));
        Ok(queue.items[index].clone())
    }

    /// Claim a reconnect slot and spawn the delayed re-prepare, or return
    /// `None` when the cap is reached.
    fn try_schedule_reconnect(&self) -> Option<u32> {
        let (attempt, token) = {
            let mut inner = self.inner.lock();
            if inner.reconnect_attempts >= self.tuning.live_reconnect_max {
                return None;
            }
            inner.reconnect_attempts += 1;
            if let Some(stale) = inner.pending_reconnect.take() {
                stale.cancel();
            }
            let token = CancellationToken::new();
            inner.pending_reconnect = Some(token.clone());
            (inner.reconnect_attempts, token)
        };

        let player = Arc::clone(&self.player);
        let delay = self.tuning.live_reconnect_delay;
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(delay) => {
                    if let Err(e) = player.prepare().await {
                        warn!(error = %e, "live reconnect prepare failed");
                        return;
                    }
                    if let Err(e) = player.play().await {
                        warn!(error = %e, "live reconnect play failed");
                    }
                }
            }
        });
        Some(attempt)
    }

    /// Advance an item's candidate index, bounded by its candidate count.
    fn claim_next_candidate(&self, key: &StreamKey) -> Option<(usize, String)> {
        let mut inner = self.inner.lock();
        let queue = inner.queue.as_ref()?;
        let candidates = queue.candidates_for(key);
        let attempt = inner.fallback_attempts.get(key).copied().unwrap_or(0);
        let next = attempt + 1;
        if next >= candidates.len() {
            return None;
        }
        let uri = candidates[next].clone();
        inner.fallback_attempts.insert(*key, next);
        Some((next, uri))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::{build_local_queue, build_playback_queue, LocalFile};
    use async_trait::async_trait;
    use bridge_traits::player::{FailingFormat, PlayerMediaItem};
    use core_account::PlaylistConfig;
    use core_catalog::ContentItem;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex as StdMutex;

    /// Player adapter that records every call.
    struct MockPlayer {
        ops: StdMutex<Vec<String>>,
        index: AtomicUsize,
    }

    impl MockPlayer {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                ops: StdMutex::new(Vec::new()),
                index: AtomicUsize::new(0),
            })
        }

        fn ops(&self) -> Vec<String> {
            self.ops.lock().unwrap().clone()
        }

        fn record(&self, op: String) {
            self.ops.lock().unwrap().push(op);
        }
    }

    #[async_trait]
    impl PlayerAdapter for MockPlayer {
        async fn set_queue(
            &self,
            items: Vec<PlayerMediaItem>,
            start_index: usize,
        ) -> bridge_traits::error::Result<()> {
            self.record(format!("set_queue:{}:{}", items.len(), start_index));
            Ok(())
        }

        async fn set_current_source(&self, uri: &str) -> bridge_traits::error::Result<()> {
            self.record(format!("set_source:{uri}"));
            Ok(())
        }

        async fn prepare(&self) -> bridge_traits::error::Result<()> {
            self.record("prepare".to_string());
            Ok(())
        }

        async fn play(&self) -> bridge_traits::error::Result<()> {
            self.record("play".to_string());
            Ok(())
        }

        async fn pause(&self) -> bridge_traits::error::Result<()> {
            self.record("pause".to_string());
            Ok(())
        }

        async fn current_index(&self) -> usize {
            self.index.load(Ordering::SeqCst)
        }

        async fn is_playing(&self) -> bool {
            true
        }
    }

    struct FixedCaps {
        hevc: bool,
    }

    impl DecoderCapabilities for FixedCaps {
        fn supports_hevc(&self) -> bool {
            self.hevc
        }
    }

    #[derive(Default)]
    struct RecordingNotices {
        messages: StdMutex<Vec<String>>,
    }

    impl NoticeSink for RecordingNotices {
        fn notify(&self, message: &str) {
            self.messages.lock().unwrap().push(message.to_string());
        }
    }

    fn config() -> PlaylistConfig {
        PlaylistConfig::new("http://s", "u", "p", "Main")
    }

    fn movie(id: i64) -> ContentItem {
        ContentItem {
            content_type: ContentType::Movie,
            id,
            stream_id: id,
            name: format!("Movie {id}"),
            category_id: None,
            icon_url: None,
            container_extension: Some("mp4".to_string()),
            added_at: None,
        }
    }

    fn live(id: i64) -> ContentItem {
        ContentItem {
            content_type: ContentType::Live,
            id,
            stream_id: id,
            name: format!("Channel {id}"),
            category_id: None,
            icon_url: None,
            container_extension: None,
            added_at: None,
        }
    }

    struct Fixture {
        controller: Arc<ResilienceController>,
        player: Arc<MockPlayer>,
        notices: Arc<RecordingNotices>,
    }

    fn fixture(hevc: bool, tuning: ResilienceTuning) -> Fixture {
        let player = MockPlayer::new();
        let notices = Arc::new(RecordingNotices::default());
        let controller = ResilienceController::new(
            Arc::clone(&player) as Arc<dyn PlayerAdapter>,
            Arc::new(FixedCaps { hevc }),
            Arc::clone(&notices) as Arc<dyn NoticeSink>,
            EventBus::new(64),
            tuning,
        );
        Fixture {
            controller,
            player,
            notices,
        }
    }

    fn fast_tuning() -> ResilienceTuning {
        ResilienceTuning {
            live_reconnect_max: 3,
            live_reconnect_delay: Duration::from_millis(5),
        }
    }

    fn plain_error() -> PlayerErrorEvent {
        PlayerErrorEvent {
            message: "Source error".to_string(),
            cause_messages: vec!["connection reset".to_string()],
            failing_format: None,
        }
    }

    #[tokio::test]
    async fn test_fallback_walk_to_exhaustion() {
        let fx = fixture(true, fast_tuning());
        let items = vec![movie(42)];
        let queue = build_playback_queue(&items, &items[0], &config());
        let key = StreamKey::new(ContentType::Movie, 42);
        assert_eq!(queue.candidates_for(&key).len(), 3);

        fx.controller.attach_queue(queue).await.unwrap();

        // First error: swap to candidate 1
        fx.controller.on_player_error(plain_error()).await.unwrap();
        assert_eq!(fx.controller.fallback_attempt(&key), 1);
        assert!(fx
            .player
            .ops()
            .iter()
            .any(|op| op == "set_source:http://s/movie/u/p/42.mkv"));

        // Second error: swap to candidate 2
        fx.controller.on_player_error(plain_error()).await.unwrap();
        assert_eq!(fx.controller.fallback_attempt(&key), 2);
        assert!(fx
            .player
            .ops()
            .iter()
            .any(|op| op == "set_source:http://s/movie/u/p/42.avi"));

        // Third error: exhausted, terminal notice, no further swap
        let swaps_before = swap_count(&fx.player);
        fx.controller.on_player_error(plain_error()).await.unwrap();
        assert_eq!(swap_count(&fx.player), swaps_before);
        assert_eq!(fx.controller.fallback_attempt(&key), 2);
        assert!(fx
            .notices
            .messages
            .lock()
            .unwrap()
            .iter()
            .any(|m| m.contains("Playback failed")));
    }

    fn swap_count(player: &MockPlayer) -> usize {
        player
            .ops()
            .iter()
            .filter(|op| op.starts_with("set_source:"))
            .count()
    }

    #[tokio::test]
    async fn test_fallback_attempt_never_exceeds_candidate_bound() {
        let fx = fixture(true, fast_tuning());
        let items = vec![movie(1)];
        let queue = build_playback_queue(&items, &items[0], &config());
        let key = StreamKey::new(ContentType::Movie, 1);
        let bound = queue.candidates_for(&key).len() - 1;

        fx.controller.attach_queue(queue).await.unwrap();
        for _ in 0..10 {
            fx.controller.on_player_error(plain_error()).await.unwrap();
            assert!(fx.controller.fallback_attempt(&key) <= bound);
        }
    }

    #[tokio::test]
    async fn test_live_reconnect_capped_then_falls_through_to_fallback() {
        let fx = fixture(true, fast_tuning());
        let items = vec![live(7)];
        let queue = build_playback_queue(&items, &items[0], &config());
        fx.controller.attach_queue(queue).await.unwrap();

        // Three failures schedule three delayed reconnects
        for expected in 1..=3 {
            fx.controller.on_player_error(plain_error()).await.unwrap();
            assert_eq!(fx.controller.reconnect_attempts(), expected);
        }
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert!(fx.player.ops().iter().any(|op| op == "prepare"));

        // Fourth failure: no reconnect, falls through to the HLS fallback
        fx.controller.on_player_error(plain_error()).await.unwrap();
        assert_eq!(fx.controller.reconnect_attempts(), 3);
        assert!(fx
            .player
            .ops()
            .iter()
            .any(|op| op == "set_source:http://s/live/u/p/7.m3u8"));
    }

    #[tokio::test]
    async fn test_ready_resets_reconnect_state() {
        let fx = fixture(true, fast_tuning());
        let items = vec![live(7)];
        let queue = build_playback_queue(&items, &items[0], &config());
        fx.controller.attach_queue(queue).await.unwrap();

        fx.controller.on_player_error(plain_error()).await.unwrap();
        fx.controller.on_player_error(plain_error()).await.unwrap();
        assert_eq!(fx.controller.reconnect_attempts(), 2);

        fx.controller.on_player_ready().await.unwrap();
        assert_eq!(fx.controller.reconnect_attempts(), 0);

        // A later failure starts a fresh burst from 1
        fx.controller.on_player_error(plain_error()).await.unwrap();
        assert_eq!(fx.controller.reconnect_attempts(), 1);
    }

    #[tokio::test]
    async fn test_media_transition_resets_reconnect_and_clamps_index() {
        let fx = fixture(true, fast_tuning());
        let items = vec![live(1), live(2)];
        let queue = build_playback_queue(&items, &items[0], &config());
        fx.controller.attach_queue(queue).await.unwrap();

        fx.controller.on_player_error(plain_error()).await.unwrap();
        assert_eq!(fx.controller.reconnect_attempts(), 1);

        // Player reports an index past the queue end (drifted item list)
        fx.player.index.store(9, Ordering::SeqCst);
        fx.controller.on_media_transition().await.unwrap();

        assert_eq!(fx.controller.reconnect_attempts(), 0);
        assert_eq!(fx.controller.current_title(), Some("Channel 2".to_string()));
    }

    #[tokio::test]
    async fn test_hevc_notice_on_incapable_device() {
        let fx = fixture(false, fast_tuning());
        let items = vec![movie(5)];
        let queue = build_playback_queue(&items, &items[0], &config());
        fx.controller.attach_queue(queue).await.unwrap();

        let event = PlayerErrorEvent {
            message: "Decoder init failed".to_string(),
            cause_messages: vec![],
            failing_format: Some(FailingFormat {
                codecs: Some("hvc1.1.6.L120".to_string()),
                mime_type: None,
            }),
        };
        fx.controller.on_player_error(event).await.unwrap();

        let messages = fx.notices.messages.lock().unwrap().clone();
        assert!(messages.iter().any(|m| m.contains("cannot decode")));
        // Fallback candidates are still tried: the alternate may be AVC
        assert_eq!(swap_count(&fx.player), 1);
    }

    #[tokio::test]
    async fn test_hevc_capable_device_skips_codec_notice() {
        let fx = fixture(true, fast_tuning());
        let items = vec![movie(5)];
        let queue = build_playback_queue(&items, &items[0], &config());
        fx.controller.attach_queue(queue).await.unwrap();

        let event = PlayerErrorEvent {
            message: "Decoder init failed".to_string(),
            cause_messages: vec![],
            failing_format: Some(FailingFormat {
                codecs: Some("hvc1.1.6.L120".to_string()),
                mime_type: None,
            }),
        };
        fx.controller.on_player_error(event).await.unwrap();

        let messages = fx.notices.messages.lock().unwrap().clone();
        assert!(!messages.iter().any(|m| m.contains("cannot decode")));
    }

    #[tokio::test]
    async fn test_local_items_fail_terminally_without_fallback() {
        let fx = fixture(true, fast_tuning());
        let files = vec![LocalFile {
            uri: "file:///a.mkv".to_string(),
            title: "A".to_string(),
        }];
        fx.controller
            .attach_queue(build_local_queue(&files, 0))
            .await
            .unwrap();

        fx.controller.on_player_error(plain_error()).await.unwrap();
        assert_eq!(swap_count(&fx.player), 0);
        assert!(fx
            .notices
            .messages
            .lock()
            .unwrap()
            .iter()
            .any(|m| m.contains("Playback failed")));
    }

    #[tokio::test]
    async fn test_attach_queue_resets_recovery_state() {
        let fx = fixture(true, fast_tuning());
        let items = vec![movie(1)];
        let queue = build_playback_queue(&items, &items[0], &config());
        let key = StreamKey::new(ContentType::Movie, 1);

        fx.controller.attach_queue(queue.clone()).await.unwrap();
        fx.controller.on_player_error(plain_error()).await.unwrap();
        assert_eq!(fx.controller.fallback_attempt(&key), 1);

        // A new queue starts from the primary candidates again
        fx.controller.attach_queue(queue).await.unwrap();
        assert_eq!(fx.controller.fallback_attempt(&key), 0);
    }

    #[tokio::test]
    async fn test_error_without_queue_is_rejected() {
        let fx = fixture(true, fast_tuning());
        let result = fx.controller.on_player_error(plain_error()).await;
        assert!(matches!(result, Err(PlaybackError::QueueNotAttached)));
    }
}
