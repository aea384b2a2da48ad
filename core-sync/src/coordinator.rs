//! # Progressive Sync Coordinator
//!
//! Drives catalog indexing to completion across the sync-target sections
//! without blocking the UI, resumable across process restarts, and
//! reentrant-safe: every `start_*` entry point may be called repeatedly,
//! only one effective indexing task runs per account.
//!
//! ## Phases
//!
//! 1. **Fast start** - index the first page of every sync-target section
//!    so browsing and search work immediately.
//! 2. **Background full** - after a grace delay, page every section to
//!    completion in fixed order, committing a checkpoint per page.
//! 3. **On-demand boost** - the UI asked for a section that is not
//!    complete; that section jumps the queue, then control returns to the
//!    background pass.
//!
//! Pausing - explicit or playback-triggered - cancels the in-flight task
//! through its `CancellationToken` but never touches checkpoints; resuming
//! issues a fresh task that picks up from the last committed page.
//!
//! ## Supersession
//!
//! Starting a new phase cancels the previous task and bumps a generation
//! counter. Progress and completion reports carry the generation they were
//! issued under; a late report from a superseded task no longer matches
//! and is discarded instead of corrupting the state record.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let coordinator = ProgressiveSyncCoordinator::new(
//!     store, settings, event_bus, SyncTuning::default(),
//! );
//! coordinator.restore_from_store().await?;
//! coordinator.start_fast_start_sync().await?;
//!
//! let mut state = coordinator.subscribe_state();
//! while state.changed().await.is_ok() {
//!     println!("phase: {}", state.borrow().phase);
//! }
//! ```

use crate::error::{Result, SyncError};
use crate::state::{ProgressiveSyncState, SyncPhase};
use bridge_traits::SettingsStore;
use chrono::Utc;
use core_account::AccountKey;
use core_catalog::{ContentIndexStore, Section, SectionSyncCheckpoint, SYNC_SECTIONS};
use core_runtime::events::{CoreEvent, EventBus, SyncEvent};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

/// Coordinator tuning knobs.
#[derive(Debug, Clone)]
pub struct SyncTuning {
    /// Delay between fast-start completion and entering the background
    /// full pass, so the two phases do not thrash right after startup.
    pub background_grace: Duration,
}

impl Default for SyncTuning {
    fn default() -> Self {
        Self {
            background_grace: Duration::from_millis(2000),
        }
    }
}

/// The one task currently authorized to index.
struct ActiveTask {
    generation: u64,
    phase: SyncPhase,
    /// Boosted section, when `phase` is `OnDemandBoost`.
    section: Option<Section>,
    cancel: CancellationToken,
}

struct Inner {
    state: ProgressiveSyncState,
    /// Generation of the currently authorized task. Bumped on every spawn
    /// and every cancellation; reports from other generations are stale.
    generation: u64,
    active: Option<ActiveTask>,
    /// Playback is in progress; background work stays off until it stops.
    paused_for_playback: bool,
}

/// Per-account coordinator for progressive catalog indexing.
pub struct ProgressiveSyncCoordinator {
    store: Arc<ContentIndexStore>,
    settings: Arc<dyn SettingsStore>,
    events: EventBus,
    tuning: SyncTuning,
    inner: Mutex<Inner>,
    state_tx: watch::Sender<ProgressiveSyncState>,
}

enum FollowUp {
    /// Fast start finished: complete a tiny catalog outright, otherwise
    /// schedule the background pass after the grace delay.
    AfterFastStart,
    /// Boost finished: hand control back to the background pass.
    AfterBoost,
    /// The background pass finished every section.
    Completed,
}

impl ProgressiveSyncCoordinator {
    /// Create a coordinator for the account the store is partitioned to.
    pub fn new(
        store: Arc<ContentIndexStore>,
        settings: Arc<dyn SettingsStore>,
        events: EventBus,
        tuning: SyncTuning,
    ) -> Arc<Self> {
        let state = ProgressiveSyncState::idle();
        let (state_tx, _) = watch::channel(state.clone());
        Arc::new(Self {
            store,
            settings,
            events,
            tuning,
            inner: Mutex::new(Inner {
                state,
                generation: 0,
                active: None,
                paused_for_playback: false,
            }),
            state_tx,
        })
    }

    /// The account this coordinator syncs.
    pub fn account(&self) -> &AccountKey {
        self.store.account()
    }

    /// Read-only stream of state snapshots for status rendering.
    pub fn subscribe_state(&self) -> watch::Receiver<ProgressiveSyncState> {
        self.state_tx.subscribe()
    }

    /// Current state snapshot.
    pub fn state(&self) -> ProgressiveSyncState {
        self.inner.lock().expect("coordinator lock").state.clone()
    }

    // ========================================================================
    // Restore
    // ========================================================================

    /// Hydrate from a persisted state record without performing I/O.
    ///
    /// A record with `full_index_complete` lands directly in
    /// [`SyncPhase::Complete`] with `fast_start_ready` set, so startup
    /// never re-runs fast start over an existing full index.
    pub fn restore_state(&self, state: ProgressiveSyncState) {
        let mut inner = self.inner.lock().expect("coordinator lock");
        inner.state = state.normalized();
        self.state_tx.send_replace(inner.state.clone());
    }

    /// Load the persisted state record from the settings store, if any,
    /// and restore from it. Returns whether a record was found.
    pub async fn restore_from_store(&self) -> Result<bool> {
        let key = self.persist_key();
        match self.settings.get_string(&key).await? {
            Some(json) => {
                let state: ProgressiveSyncState = serde_json::from_str(&json)?;
                self.restore_state(state);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    // ========================================================================
    // Entry points
    // ========================================================================

    /// Index the minimal cross-section slice. Valid only while no full
    /// index exists; a no-op when one does, when a task is already
    /// running, or while paused.
    #[instrument(skip(self), fields(account = %self.account()))]
    pub async fn start_fast_start_sync(self: &Arc<Self>) -> Result<()> {
        if self.store.has_full_index().await? {
            self.mark_complete().await;
            return Ok(());
        }

        let run_id = new_run_id();
        {
            let mut inner = self.inner.lock().expect("coordinator lock");
            if inner.state.full_index_complete {
                return Ok(());
            }
            if inner.state.is_paused || inner.paused_for_playback {
                inner.state.resume_phase = Some(SyncPhase::FastStart);
                self.state_tx.send_replace(inner.state.clone());
                return Ok(());
            }
            if inner.active.is_some() {
                debug!("fast start requested while a task is active; ignoring");
                return Ok(());
            }
            self.spawn_task(&mut inner, SyncPhase::FastStart, None, &run_id);
        }
        Ok(())
    }

    /// Page every sync-target section to completion, resuming from
    /// checkpoints. Safe to call redundantly.
    #[instrument(skip(self), fields(account = %self.account()))]
    pub async fn start_background_full_sync(self: &Arc<Self>) -> Result<()> {
        if self.store.has_full_index().await? {
            self.mark_complete().await;
            return Ok(());
        }

        let run_id = new_run_id();
        {
            let mut inner = self.inner.lock().expect("coordinator lock");
            if inner.state.is_paused || inner.paused_for_playback {
                inner.state.resume_phase = Some(SyncPhase::BackgroundFull);
                self.state_tx.send_replace(inner.state.clone());
                return Ok(());
            }
            match inner.active.as_ref().map(|a| a.phase) {
                Some(SyncPhase::BackgroundFull) => return Ok(()),
                Some(SyncPhase::OnDemandBoost) => {
                    // The boost has priority; it hands control back when done.
                    inner.state.resume_phase = Some(SyncPhase::BackgroundFull);
                    return Ok(());
                }
                Some(_) => cancel_active(&mut inner),
                None => {}
            }
            self.spawn_task(&mut inner, SyncPhase::BackgroundFull, None, &run_id);
        }
        Ok(())
    }

    /// Jump the queue for one section the UI needs now. A no-op when the
    /// section's checkpoint is already complete. The interrupted
    /// background pass resumes from its checkpoints afterwards.
    #[instrument(skip(self), fields(account = %self.account(), section = %section))]
    pub async fn boost_section(self: &Arc<Self>, section: Section) -> Result<()> {
        if !section.is_sync_target() {
            return Err(SyncError::Catalog(
                core_catalog::CatalogError::NotSyncTarget(section),
            ));
        }
        if let Some(cp) = self.store.section_sync_checkpoint(section).await? {
            if cp.is_complete {
                debug!("boost short-circuited: section already complete");
                return Ok(());
            }
        }

        let run_id = new_run_id();
        {
            let mut inner = self.inner.lock().expect("coordinator lock");
            if inner.state.is_paused || inner.paused_for_playback {
                inner.state.resume_phase = Some(SyncPhase::BackgroundFull);
                self.state_tx.send_replace(inner.state.clone());
                return Ok(());
            }
            if let Some(active) = &inner.active {
                if active.phase == SyncPhase::OnDemandBoost && active.section == Some(section) {
                    return Ok(());
                }
            }
            if inner.active.is_some() {
                cancel_active(&mut inner);
            }
            self.spawn_task(&mut inner, SyncPhase::OnDemandBoost, Some(section), &run_id);
        }
        Ok(())
    }

    // ========================================================================
    // Pause / resume
    // ========================================================================

    /// Explicit user-triggered pause. Idempotent; checkpoints are kept and
    /// resuming continues from the exact last committed page.
    #[instrument(skip(self), fields(account = %self.account()))]
    pub async fn pause_background_sync(&self) -> Result<()> {
        let snapshot = {
            let mut inner = self.inner.lock().expect("coordinator lock");
            if inner.state.is_paused {
                return Ok(());
            }
            if inner.state.phase == SyncPhase::Complete {
                return Ok(());
            }
            let resume = resume_target(&inner);
            cancel_active(&mut inner);
            inner.paused_for_playback = false;
            inner.state.is_paused = true;
            inner.state.phase = SyncPhase::Paused;
            inner.state.resume_phase = Some(resume);
            self.state_tx.send_replace(inner.state.clone());
            self.events
                .emit(CoreEvent::Sync(SyncEvent::Paused {
                    account: self.account().to_string(),
                    for_playback: false,
                }))
                .ok();
            inner.state.clone()
        };
        self.persist(&snapshot).await;
        Ok(())
    }

    /// Leave an explicit pause and re-enter the recorded phase from its
    /// checkpoints. After a failed run (not paused), this retries the
    /// background pass instead.
    #[instrument(skip(self), fields(account = %self.account()))]
    pub async fn resume_background_sync(self: &Arc<Self>) -> Result<()> {
        let target = {
            let mut inner = self.inner.lock().expect("coordinator lock");
            if inner.state.phase == SyncPhase::Complete {
                return Ok(());
            }
            if !inner.state.is_paused {
                // Not paused: treat as a retry of the background pass.
                Some(SyncPhase::BackgroundFull)
            } else {
                inner.state.is_paused = false;
                let target = inner
                    .state
                    .resume_phase
                    .take()
                    .unwrap_or(SyncPhase::BackgroundFull);
                self.events
                    .emit(CoreEvent::Sync(SyncEvent::Resumed {
                        account: self.account().to_string(),
                        phase: target.as_str().to_string(),
                    }))
                    .ok();
                Some(target)
            }
        };
        match target {
            Some(SyncPhase::FastStart) => self.start_fast_start_sync().await,
            Some(_) => self.start_background_full_sync().await,
            None => Ok(()),
        }
    }

    // ========================================================================
    // Playback coupling
    // ========================================================================

    /// Playback started: cancel any in-flight indexing, keep checkpoints.
    ///
    /// This is the explicit playback-activity message; the host's player
    /// integration calls it instead of reaching for pause/resume directly.
    #[instrument(skip(self), fields(account = %self.account()))]
    pub fn on_playback_started(&self) {
        let mut inner = self.inner.lock().expect("coordinator lock");
        if inner.paused_for_playback {
            return;
        }
        inner.paused_for_playback = true;
        if inner.state.is_paused || inner.state.phase == SyncPhase::Complete {
            return;
        }
        if inner.active.is_some() {
            let resume = resume_target(&inner);
            cancel_active(&mut inner);
            inner.state.phase = SyncPhase::Paused;
            inner.state.resume_phase = Some(resume);
            self.state_tx.send_replace(inner.state.clone());
            self.events
                .emit(CoreEvent::Sync(SyncEvent::Paused {
                    account: self.account().to_string(),
                    for_playback: true,
                }))
                .ok();
        }
    }

    /// Playback stopped: re-enter the phase that was active before, from
    /// its checkpoints. Explicit pause wins over playback resume.
    #[instrument(skip(self), fields(account = %self.account()))]
    pub async fn on_playback_stopped(self: &Arc<Self>) -> Result<()> {
        let target = {
            let mut inner = self.inner.lock().expect("coordinator lock");
            if !inner.paused_for_playback {
                return Ok(());
            }
            inner.paused_for_playback = false;
            if inner.state.is_paused {
                return Ok(());
            }
            inner.state.resume_phase.take()
        };
        if let Some(phase) = target {
            self.events
                .emit(CoreEvent::Sync(SyncEvent::Resumed {
                    account: self.account().to_string(),
                    phase: phase.as_str().to_string(),
                }))
                .ok();
            return match phase {
                SyncPhase::FastStart => self.start_fast_start_sync().await,
                _ => self.start_background_full_sync().await,
            };
        }
        Ok(())
    }

    // ========================================================================
    // Task plumbing
    // ========================================================================

    /// Spawn the indexing task for a phase. Caller holds the lock.
    fn spawn_task(
        self: &Arc<Self>,
        inner: &mut Inner,
        phase: SyncPhase,
        section: Option<Section>,
        run_id: &str,
    ) {
        inner.generation += 1;
        let generation = inner.generation;
        let cancel = CancellationToken::new();
        inner.active = Some(ActiveTask {
            generation,
            phase,
            section,
            cancel: cancel.clone(),
        });
        inner.state.phase = phase;
        if phase == SyncPhase::OnDemandBoost {
            inner.state.current_section = section;
        }
        self.state_tx.send_replace(inner.state.clone());
        self.events
            .emit(CoreEvent::Sync(SyncEvent::Started {
                run_id: run_id.to_string(),
                account: self.account().to_string(),
                phase: phase.as_str().to_string(),
            }))
            .ok();

        info!(%phase, generation, run_id, "spawning indexing task");
        let this = Arc::clone(self);
        let run_id = run_id.to_string();
        tokio::spawn(async move {
            let result = this
                .run_phase(phase, section, generation, &cancel, &run_id)
                .await;
            this.finish_task(generation, phase, &run_id, result).await;
        });
    }

    async fn run_phase(
        self: &Arc<Self>,
        phase: SyncPhase,
        section: Option<Section>,
        generation: u64,
        cancel: &CancellationToken,
        run_id: &str,
    ) -> Result<()> {
        let progress = {
            let this = Arc::clone(self);
            let run_id = run_id.to_string();
            move |section: Section, cp: &SectionSyncCheckpoint| {
                this.apply_progress(generation, &run_id, section, cp);
            }
        };

        match phase {
            SyncPhase::FastStart => {
                self.store.sync_fast_slice(cancel, &progress).await?;
                Ok(())
            }
            SyncPhase::BackgroundFull => {
                for section in SYNC_SECTIONS {
                    if cancel.is_cancelled() {
                        return Err(SyncError::Cancelled);
                    }
                    let outcome = self
                        .store
                        .sync_section(section, false, cancel, &progress)
                        .await?;
                    if outcome.completed {
                        self.events
                            .emit(CoreEvent::Sync(SyncEvent::SectionCompleted {
                                run_id: run_id.to_string(),
                                section: section.as_str().to_string(),
                                items_indexed: outcome.items_indexed,
                            }))
                            .ok();
                    }
                }
                Ok(())
            }
            SyncPhase::OnDemandBoost => {
                let section = section.ok_or_else(|| {
                    SyncError::InvalidPhase("boost task without a section".to_string())
                })?;
                let outcome = self
                    .store
                    .sync_section(section, false, cancel, &progress)
                    .await?;
                if outcome.completed {
                    self.events
                        .emit(CoreEvent::Sync(SyncEvent::SectionCompleted {
                            run_id: run_id.to_string(),
                            section: section.as_str().to_string(),
                            items_indexed: outcome.items_indexed,
                        }))
                        .ok();
                }
                Ok(())
            }
            SyncPhase::Paused | SyncPhase::Complete => Ok(()),
        }
    }

    /// Fold a committed page into the state record, unless the reporting
    /// task has been superseded.
    fn apply_progress(
        &self,
        generation: u64,
        run_id: &str,
        section: Section,
        checkpoint: &SectionSyncCheckpoint,
    ) {
        let mut inner = self.inner.lock().expect("coordinator lock");
        if inner.generation != generation {
            debug!(
                generation,
                current = inner.generation,
                "discarding progress from superseded task"
            );
            return;
        }
        inner.state.apply_checkpoint(section, checkpoint);
        self.state_tx.send_replace(inner.state.clone());
        self.events
            .emit(CoreEvent::Sync(SyncEvent::Progress {
                run_id: run_id.to_string(),
                section: section.as_str().to_string(),
                items_indexed: checkpoint.items_indexed,
                progress: checkpoint.progress(),
            }))
            .ok();
    }

    async fn finish_task(
        self: &Arc<Self>,
        generation: u64,
        phase: SyncPhase,
        run_id: &str,
        result: Result<()>,
    ) {
        let follow_up = {
            let mut inner = self.inner.lock().expect("coordinator lock");
            if inner.generation != generation {
                debug!(
                    generation,
                    current = inner.generation,
                    "discarding completion from superseded task"
                );
                return;
            }
            inner.active = None;

            match &result {
                Ok(()) => match phase {
                    SyncPhase::FastStart => {
                        inner.state.fast_start_ready = true;
                        self.state_tx.send_replace(inner.state.clone());
                        Some(FollowUp::AfterFastStart)
                    }
                    SyncPhase::BackgroundFull => Some(FollowUp::Completed),
                    SyncPhase::OnDemandBoost => Some(FollowUp::AfterBoost),
                    _ => None,
                },
                Err(e) if e.is_cancelled() => {
                    // Pause or supersession already recorded the state.
                    debug!(%phase, "indexing task cancelled");
                    None
                }
                Err(e) => {
                    error!(%phase, error = %e, "indexing task failed");
                    self.events
                        .emit(CoreEvent::Sync(SyncEvent::Failed {
                            run_id: run_id.to_string(),
                            message: e.to_string(),
                            recoverable: true,
                        }))
                        .ok();
                    None
                }
            }
        };

        match follow_up {
            Some(FollowUp::AfterFastStart) => {
                // A catalog small enough to finish inside the fast slice is
                // already complete; otherwise the full pass starts after the
                // grace delay.
                match self.store.has_full_index().await {
                    Ok(true) => self.mark_complete().await,
                    Ok(false) => {
                        let snapshot = self.state();
                        self.persist(&snapshot).await;
                        let this = Arc::clone(self);
                        let grace = self.tuning.background_grace;
                        tokio::spawn(async move {
                            tokio::time::sleep(grace).await;
                            if let Err(e) = this.start_background_full_sync().await {
                                warn!(error = %e, "deferred background start failed");
                            }
                        });
                    }
                    Err(e) => warn!(error = %e, "post-fast-start index check failed"),
                }
            }
            Some(FollowUp::AfterBoost) => {
                // Hand control back to the interrupted background pass; the
                // entry point resumes it from checkpoints (or completes).
                if let Err(e) = self.start_background_full_sync().await {
                    warn!(error = %e, "background re-entry after boost failed");
                }
            }
            Some(FollowUp::Completed) => self.mark_complete().await,
            None => {}
        }
    }

    /// Record full-index completion, publish, and persist.
    async fn mark_complete(&self) {
        let snapshot = {
            let mut inner = self.inner.lock().expect("coordinator lock");
            if inner.state.phase == SyncPhase::Complete {
                return;
            }
            inner.state.full_index_complete = true;
            inner.state.fast_start_ready = true;
            inner.state.is_paused = false;
            inner.state.phase = SyncPhase::Complete;
            inner.state.current_section = None;
            inner.state.resume_phase = None;
            inner.state.last_sync_timestamp = Some(Utc::now().timestamp());
            self.state_tx.send_replace(inner.state.clone());
            self.events
                .emit(CoreEvent::Sync(SyncEvent::Completed {
                    run_id: new_run_id(),
                    account: self.account().to_string(),
                }))
                .ok();
            inner.state.clone()
        };
        info!(account = %self.account(), "full index complete");
        self.persist(&snapshot).await;
    }

    fn persist_key(&self) -> String {
        format!("sync_state:{}", self.account())
    }

    async fn persist(&self, state: &ProgressiveSyncState) {
        let json = match serde_json::to_string(state) {
            Ok(json) => json,
            Err(e) => {
                warn!(error = %e, "failed to serialize sync state");
                return;
            }
        };
        if let Err(e) = self.settings.set_string(&self.persist_key(), &json).await {
            warn!(error = %e, "failed to persist sync state");
        }
    }
}

/// Cancel the active task, if any, and invalidate its generation so late
/// reports are discarded.
fn cancel_active(inner: &mut Inner) {
    if let Some(active) = inner.active.take() {
        active.cancel.cancel();
        inner.generation += 1;
        debug!(
            phase = %active.phase,
            generation = active.generation,
            "cancelled active indexing task"
        );
    }
}

/// Phase to re-enter after the current activity is interrupted.
fn resume_target(inner: &Inner) -> SyncPhase {
    match inner.active.as_ref().map(|a| a.phase) {
        Some(SyncPhase::FastStart) => SyncPhase::FastStart,
        // A boosted section's progress is in its checkpoint; the background
        // pass covers it on re-entry.
        Some(_) => SyncPhase::BackgroundFull,
        None => inner
            .state
            .resume_phase
            .unwrap_or(SyncPhase::BackgroundFull),
    }
}

fn new_run_id() -> String {
    Uuid::new_v4().to_string()
}
