//! # Progressive Sync State
//!
//! The versioned state record owned by the coordinator. One instance per
//! account; every mutation happens under the coordinator's lock and is
//! published as a whole snapshot on a watch channel, so observers never
//! see a half-updated record.
//!
//! The record is serde-serializable: hosts persist it through their
//! settings store and hand it back at startup via
//! [`restore_state`](crate::ProgressiveSyncCoordinator::restore_state),
//! which is how a completed full index skips fast start entirely after a
//! process restart.

use crate::error::SyncError;
use core_catalog::{Section, SectionSyncCheckpoint};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// The phase the coordinator is in. Exactly one phase is active per
/// account at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncPhase {
    /// Indexing the minimal cross-section slice.
    FastStart,
    /// Full index pass over the sync-target sections in fixed order.
    BackgroundFull,
    /// A single section jumped the queue at the UI's request.
    OnDemandBoost,
    /// Background work suspended; `resume_phase` records where to go back.
    Paused,
    /// Every sync-target section is complete.
    Complete,
}

impl SyncPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncPhase::FastStart => "fast_start",
            SyncPhase::BackgroundFull => "background_full",
            SyncPhase::OnDemandBoost => "boost",
            SyncPhase::Paused => "paused",
            SyncPhase::Complete => "complete",
        }
    }

    /// Whether the phase runs an indexing task.
    pub fn is_running(&self) -> bool {
        matches!(
            self,
            SyncPhase::FastStart | SyncPhase::BackgroundFull | SyncPhase::OnDemandBoost
        )
    }
}

impl FromStr for SyncPhase {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, SyncError> {
        match s {
            "fast_start" => Ok(SyncPhase::FastStart),
            "background_full" => Ok(SyncPhase::BackgroundFull),
            "boost" => Ok(SyncPhase::OnDemandBoost),
            "paused" => Ok(SyncPhase::Paused),
            "complete" => Ok(SyncPhase::Complete),
            _ => Err(SyncError::InvalidPhase(s.to_string())),
        }
    }
}

impl fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Per-section progress snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SectionProgress {
    /// Best-effort completion estimate in `[0, 1]`; `1.0` only once the
    /// section checkpoint is complete.
    pub progress: f32,
    /// Items indexed so far. Strictly increasing per section.
    pub items_indexed: u64,
}

/// The coordinator's full state record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressiveSyncState {
    pub phase: SyncPhase,
    /// A minimal cross-section index exists; browsing and search work.
    pub fast_start_ready: bool,
    /// Every sync-target section has a complete checkpoint.
    pub full_index_complete: bool,
    /// Explicit user-triggered pause (playback-triggered pauses do not
    /// set this).
    pub is_paused: bool,
    /// Section currently being indexed, if any.
    pub current_section: Option<Section>,
    pub section_progress: HashMap<Section, SectionProgress>,
    /// Unix timestamp of the last committed page.
    pub last_sync_timestamp: Option<i64>,
    /// Phase to re-enter when leaving [`SyncPhase::Paused`].
    pub resume_phase: Option<SyncPhase>,
}

impl ProgressiveSyncState {
    /// Initial state for an account with no history.
    pub fn idle() -> Self {
        Self {
            phase: SyncPhase::FastStart,
            fast_start_ready: false,
            full_index_complete: false,
            is_paused: false,
            current_section: None,
            section_progress: HashMap::new(),
            last_sync_timestamp: None,
            resume_phase: None,
        }
    }

    /// State representing a finished full index.
    pub fn complete() -> Self {
        Self {
            phase: SyncPhase::Complete,
            fast_start_ready: true,
            full_index_complete: true,
            is_paused: false,
            current_section: None,
            section_progress: HashMap::new(),
            last_sync_timestamp: None,
            resume_phase: None,
        }
    }

    /// Fold one committed checkpoint into the record.
    pub fn apply_checkpoint(&mut self, section: Section, checkpoint: &SectionSyncCheckpoint) {
        self.current_section = Some(section);
        self.section_progress.insert(
            section,
            SectionProgress {
                progress: checkpoint.progress(),
                items_indexed: checkpoint.items_indexed,
            },
        );
        self.last_sync_timestamp = Some(checkpoint.updated_at);
    }

    /// Normalize a restored record: a persisted full index always lands in
    /// `Complete` with fast start ready, whatever phase the process died
    /// in.
    pub fn normalized(mut self) -> Self {
        if self.full_index_complete {
            self.phase = SyncPhase::Complete;
            self.fast_start_ready = true;
            self.is_paused = false;
            self.current_section = None;
            self.resume_phase = None;
        }
        self
    }
}

impl Default for ProgressiveSyncState {
    fn default() -> Self {
        Self::idle()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_roundtrip() {
        for phase in [
            SyncPhase::FastStart,
            SyncPhase::BackgroundFull,
            SyncPhase::OnDemandBoost,
            SyncPhase::Paused,
            SyncPhase::Complete,
        ] {
            assert_eq!(phase.as_str().parse::<SyncPhase>().unwrap(), phase);
        }
        assert!("turbo".parse::<SyncPhase>().is_err());
    }

    #[test]
    fn test_normalized_promotes_full_index_to_complete() {
        let state = ProgressiveSyncState {
            phase: SyncPhase::Paused,
            full_index_complete: true,
            fast_start_ready: false,
            is_paused: true,
            resume_phase: Some(SyncPhase::BackgroundFull),
            ..ProgressiveSyncState::idle()
        }
        .normalized();

        assert_eq!(state.phase, SyncPhase::Complete);
        assert!(state.fast_start_ready);
        assert!(!state.is_paused);
        assert_eq!(state.resume_phase, None);
    }

    #[test]
    fn test_apply_checkpoint_updates_progress_map() {
        let mut state = ProgressiveSyncState::idle();
        let checkpoint = SectionSyncCheckpoint {
            section: Section::Movies,
            cursor: 40,
            items_indexed: 40,
            total_estimate: Some(100),
            is_complete: false,
            updated_at: 1_700_000_000,
        };
        state.apply_checkpoint(Section::Movies, &checkpoint);

        assert_eq!(state.current_section, Some(Section::Movies));
        let progress = state.section_progress[&Section::Movies];
        assert_eq!(progress.items_indexed, 40);
        assert!(progress.progress < 1.0);
        assert_eq!(state.last_sync_timestamp, Some(1_700_000_000));
    }

    #[test]
    fn test_state_serde_roundtrip() {
        let mut state = ProgressiveSyncState::idle();
        state.fast_start_ready = true;
        state.section_progress.insert(
            Section::Live,
            SectionProgress {
                progress: 0.25,
                items_indexed: 50,
            },
        );

        let json = serde_json::to_string(&state).unwrap();
        let back: ProgressiveSyncState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, state);
    }
}
