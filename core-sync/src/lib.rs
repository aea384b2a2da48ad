//! # Progressive Sync
//!
//! Phased, resumable catalog indexing for the IPTV platform core.
//!
//! ## Components
//!
//! - **State record** (`state`): the versioned [`ProgressiveSyncState`]
//!   snapshot published on a watch channel
//! - **Coordinator** (`coordinator`): fast-start / background-full /
//!   on-demand-boost orchestration with checkpoint resume, explicit
//!   cancellation, and generation-tokened supersession
//!
//! The coordinator writes through the
//! [`ContentIndexStore`](core_catalog::ContentIndexStore); it owns no
//! persistence of its own beyond the serialized state record it hands to
//! the host's settings store.

pub mod coordinator;
pub mod error;
pub mod state;

pub use coordinator::{ProgressiveSyncCoordinator, SyncTuning};
pub use error::{Result, SyncError};
pub use state::{ProgressiveSyncState, SectionProgress, SyncPhase};
