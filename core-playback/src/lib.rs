//! # Playback Continuity
//!
//! Queue construction and runtime recovery for the IPTV platform core.
//!
//! ## Components
//!
//! - **Candidates** (`candidates`): ordered stream-URI resolution and the
//!   structured [`StreamKey`] fallback-map key
//! - **Queue** (`queue`): playback queue construction from catalog items
//!   or local files
//! - **Capability** (`capability`): HEVC decode-failure classification
//! - **Resilience** (`resilience`): live reconnect, fallback rotation,
//!   and user-facing recovery notices
//!
//! The crate never decodes media. It talks to the host player through
//! [`PlayerAdapter`](bridge_traits::player::PlayerAdapter) and reacts to
//! the error/state signals the host forwards back.

pub mod candidates;
pub mod capability;
pub mod error;
pub mod queue;
pub mod resilience;

pub use candidates::{resolve_candidates, StreamKey};
pub use capability::{failing_codec_label, is_hevc_failure};
pub use error::{PlaybackError, Result};
pub use queue::{
    build_local_queue, build_playback_queue, LocalFile, PlaybackQueue, PlaybackQueueItem,
};
pub use resilience::{ResilienceController, ResilienceTuning};
