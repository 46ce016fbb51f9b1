//! # Scan Controller
//!
//! The single controller the presentation layer drives. It owns the batch,
//! the location selection and the camera session, and talks to the three
//! collaborators.
//!
//! ## Operation Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        ScanController                                   │
//! │                                                                         │
//! │  CAMERA                                                                │
//! │  ──────                                                                │
//! │  start_scanning ──► decoder.start() ──► Armed | Unavailable            │
//! │  run_decoder(rx) ─► handle_decode ───► Locked ──► decoder.stop()       │
//! │                                          │                             │
//! │                     commit_detection ◄───┤ (or auto after the delay)   │
//! │                     scan_again ◄─────────┘                             │
//! │                                                                         │
//! │  BATCH                                                                 │
//! │  ─────                                                                 │
//! │  add_code / handle_key / remove_code / reset                           │
//! │  submit ──► BatchManager::submit ──► backend.submit_batch ──► reconcile│
//! │                                                                         │
//! │  Every change is reported through the ScanEventEmitter.                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Locking
//! State sits behind one `tokio::sync::Mutex`. It is never held across a
//! collaborator call, so a second `submit` or `start_scanning` sees the
//! in-flight flag and is rejected immediately instead of queueing.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};
use ts_rs::TS;

use scanstation_core::{
    AcceptedDetection, BatchItem, BatchManager, BatchSummary, CoreError, CoreResult, DecodeEvent,
    DetectionDebouncer, Key, KeystrokeBuffer, Location, LocationCatalog, LocationSelection,
    Reconciliation, ScanEvent, SessionState, UpdateOutcome,
};

use crate::collaborators::{DecodingEngine, LocationSource, RelocationBackend};
use crate::config::ScanConfig;
use crate::emitter::{NoOpEmitter, ScanEventEmitter};
use crate::error::{SessionError, SessionResult};

const FALLBACK_WARNING: &str = "Could not load locations from the server; using fallback locations";

const AUTO_COMMIT_DEFERRED_WARNING: &str =
    "A submission is in progress; use the detected code once it finishes";

// =============================================================================
// Snapshot
// =============================================================================

/// Everything the page needs to render, taken under one lock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ScanSnapshot {
    pub items: Vec<BatchItem>,
    pub summary: BatchSummary,
    pub session: SessionState,
    pub unavailable_reason: Option<String>,
    pub pending_detection: Option<AcceptedDetection>,
    pub locations: Vec<Location>,
    pub selection: LocationSelection,
    pub submitting: bool,
    /// Keyboard-wedge text typed but not yet entered.
    pub typed: String,
}

// =============================================================================
// Controller State
// =============================================================================

struct ControllerState {
    debouncer: DetectionDebouncer,
    batch: BatchManager,
    catalog: LocationCatalog,
    selection: LocationSelection,
    keystrokes: KeystrokeBuffer,

    /// A decoder start is outstanding.
    starting: bool,

    /// The session was closed while starting; release the decoder once the
    /// start resolves.
    abandon_start: bool,

    /// Bumped on every accepted detection so a delayed auto-commit only
    /// applies to the detection it was scheduled for.
    detection_seq: u64,
}

struct Shared {
    config: ScanConfig,
    decoder: Arc<dyn DecodingEngine>,
    locations: Arc<dyn LocationSource>,
    backend: Arc<dyn RelocationBackend>,
    emitter: Arc<dyn ScanEventEmitter>,
    state: Mutex<ControllerState>,
}

/// Cloneable handle to the scan session; clones share state.
#[derive(Clone)]
pub struct ScanController {
    shared: Arc<Shared>,
}

impl ScanController {
    /// Creates a controller that emits nothing.
    pub fn new(
        config: ScanConfig,
        decoder: Arc<dyn DecodingEngine>,
        locations: Arc<dyn LocationSource>,
        backend: Arc<dyn RelocationBackend>,
    ) -> Self {
        Self::with_emitter(config, decoder, locations, backend, Arc::new(NoOpEmitter))
    }

    /// Creates a controller that reports to `emitter`.
    pub fn with_emitter(
        config: ScanConfig,
        decoder: Arc<dyn DecodingEngine>,
        locations: Arc<dyn LocationSource>,
        backend: Arc<dyn RelocationBackend>,
        emitter: Arc<dyn ScanEventEmitter>,
    ) -> Self {
        let state = ControllerState {
            debouncer: DetectionDebouncer::new(config.debounce),
            batch: config.new_batch(),
            catalog: LocationCatalog::default(),
            selection: LocationSelection::default(),
            keystrokes: KeystrokeBuffer::new(),
            starting: false,
            abandon_start: false,
            detection_seq: 0,
        };

        ScanController {
            shared: Arc::new(Shared {
                config,
                decoder,
                locations,
                backend,
                emitter,
                state: Mutex::new(state),
            }),
        }
    }

    pub fn config(&self) -> &ScanConfig {
        &self.shared.config
    }

    fn emit(&self, event: ScanEvent) {
        debug!(kind = event.kind(), "Emitting scan event");
        self.shared.emitter.emit(&event);
    }

    fn emit_session(&self, state: SessionState, reason: Option<String>) {
        self.emit(ScanEvent::SessionChanged { state, reason });
    }

    // =========================================================================
    // Locations
    // =========================================================================

    /// Loads the catalog, substituting the fallback catalog when the source
    /// fails or returns nothing. Clears the current selection.
    pub async fn load_locations(&self) -> LocationCatalog {
        let (catalog, fallback) = match self.shared.locations.fetch_locations().await {
            Ok(catalog) if !catalog.is_empty() => (catalog, false),
            Ok(_) => {
                warn!("Location source returned no locations, using fallback catalog");
                (LocationCatalog::fallback(), true)
            }
            Err(e) => {
                warn!(error = %e, "Failed to load locations, using fallback catalog");
                (LocationCatalog::fallback(), true)
            }
        };

        {
            let mut state = self.shared.state.lock().await;
            state.catalog = catalog.clone();
            state.selection.clear();
        }

        info!(count = catalog.len(), fallback, "Locations loaded");
        self.emit(ScanEvent::LocationsLoaded {
            count: catalog.len(),
            fallback,
        });
        if fallback {
            self.emit(ScanEvent::warning(FALLBACK_WARNING));
        }

        catalog
    }

    pub async fn catalog(&self) -> LocationCatalog {
        self.shared.state.lock().await.catalog.clone()
    }

    /// Chooses a location. Returns false (selection cleared) if the id is
    /// not in the catalog.
    pub async fn select_location(&self, id: &str) -> bool {
        let (found, selection) = {
            let mut guard = self.shared.state.lock().await;
            let state = &mut *guard;
            let found = state.selection.select_location(&state.catalog, id);
            (found, state.selection.clone())
        };

        if !found {
            debug!(location_id = id, "Unknown location, selection cleared");
        }
        self.emit(ScanEvent::SelectionChanged(selection));
        found
    }

    /// Chooses a sublocation of the current location; empty clears it.
    pub async fn select_sublocation(&self, id: &str) -> SessionResult<()> {
        let selection = {
            let mut state = self.shared.state.lock().await;
            state.selection.select_sublocation(id)?;
            state.selection.clone()
        };

        self.emit(ScanEvent::SelectionChanged(selection));
        Ok(())
    }

    pub async fn selection(&self) -> LocationSelection {
        self.shared.state.lock().await.selection.clone()
    }

    // =========================================================================
    // Camera Session
    // =========================================================================

    /// Starts the decoder and arms the session.
    ///
    /// ## Errors
    /// - `StartInProgress` while another start is outstanding
    /// - `DetectionPending` while a detection waits for commit or scan-again
    /// - `DecoderUnavailable` if the decoder fails or does not start within
    ///   the configured timeout; the session is then `Unavailable`
    pub async fn start_scanning(&self) -> SessionResult<()> {
        {
            let mut state = self.shared.state.lock().await;
            if state.starting {
                return Err(SessionError::StartInProgress);
            }
            match state.debouncer.state() {
                SessionState::Armed => return Ok(()),
                SessionState::Locked => return Err(SessionError::DetectionPending),
                SessionState::Idle | SessionState::Unavailable => {}
            }
            state.starting = true;
            state.abandon_start = false;
        }

        debug!("Starting decoder");
        let timeout = self.shared.config.decoder_start_timeout();
        let result = match tokio::time::timeout(timeout, self.shared.decoder.start()).await {
            Ok(result) => result,
            Err(_) => Err(SessionError::Timeout(timeout.as_secs())),
        };

        let timed_out = matches!(result, Err(SessionError::Timeout(_)));
        let failure = result.err().map(|e| match e {
            SessionError::DecoderUnavailable(reason) => reason,
            other => other.to_string(),
        });

        let abandoned = {
            let mut state = self.shared.state.lock().await;
            state.starting = false;
            let abandoned = std::mem::take(&mut state.abandon_start);
            if !abandoned {
                match &failure {
                    None => {
                        state.debouncer.arm();
                    }
                    Some(reason) => state.debouncer.mark_unavailable(reason.as_str()),
                }
            }
            abandoned
        };

        if abandoned || timed_out {
            self.shared.decoder.stop().await;
        }

        if abandoned {
            debug!("Scan session closed while the decoder was starting");
            return Ok(());
        }

        match failure {
            None => {
                info!("Decoder started, session armed");
                self.emit_session(SessionState::Armed, None);
                Ok(())
            }
            Some(reason) => {
                warn!(reason = %reason, "Decoder unavailable, manual entry only");
                self.emit_session(SessionState::Unavailable, Some(reason.clone()));
                Err(SessionError::DecoderUnavailable(reason))
            }
        }
    }

    /// Feeds one decode event to the debouncer. Returns the detection if
    /// this event locked the session.
    pub async fn handle_decode(&self, event: DecodeEvent) -> Option<AcceptedDetection> {
        self.observe(&event).await.map(|(detection, _)| detection)
    }

    async fn observe(&self, event: &DecodeEvent) -> Option<(AcceptedDetection, u64)> {
        let (detection, seq) = {
            let mut state = self.shared.state.lock().await;
            let detection = state.debouncer.observe(event)?;
            state.detection_seq += 1;
            (detection, state.detection_seq)
        };

        info!(
            code = %detection.code,
            confidence = detection.confidence,
            "Detection accepted"
        );
        self.shared.decoder.stop().await;

        self.emit_session(SessionState::Locked, None);
        self.emit(ScanEvent::DetectionAccepted(detection.clone()));
        Some((detection, seq))
    }

    /// Adds the pending detection to the batch and returns the session to
    /// `Idle`.
    ///
    /// A rejected code (duplicate) still ends the session; only
    /// `SubmissionInProgress` keeps the detection pending.
    pub async fn commit_detection(&self) -> SessionResult<usize> {
        let added = {
            let mut state = self.shared.state.lock().await;
            Self::take_detection(&mut state)?
        };
        self.finish_commit(added)
    }

    fn take_detection(state: &mut ControllerState) -> SessionResult<CoreResult<(usize, String)>> {
        let code = state
            .debouncer
            .accepted()
            .map(|d| d.code.clone())
            .ok_or(SessionError::NoPendingDetection)?;

        let added = add_to_batch(&mut state.batch, &code);
        if let Err(CoreError::SubmissionInProgress) = added {
            return Err(CoreError::SubmissionInProgress.into());
        }

        state.debouncer.reset();
        Ok(added)
    }

    fn finish_commit(&self, added: CoreResult<(usize, String)>) -> SessionResult<usize> {
        self.emit_session(SessionState::Idle, None);
        self.report_add(added)
    }

    async fn auto_commit(&self, seq: u64) {
        let taken = {
            let mut state = self.shared.state.lock().await;
            if state.detection_seq != seq || state.debouncer.state() != SessionState::Locked {
                return;
            }
            Self::take_detection(&mut state)
        };

        match taken {
            Ok(added) => {
                debug!("Auto-committing detection");
                // Rejections were already reported as warnings
                let _ = self.finish_commit(added);
            }
            Err(SessionError::Core(CoreError::SubmissionInProgress)) => {
                warn!("Auto-commit deferred, submission in progress");
                self.emit(ScanEvent::warning(AUTO_COMMIT_DEFERRED_WARNING));
            }
            Err(e) => debug!(error = %e, "Auto-commit skipped"),
        }
    }

    /// Discards the pending detection and restarts the decoder.
    ///
    /// From `Armed` the running decoder is stopped before it is started
    /// again, so the camera is never held twice.
    pub async fn scan_again(&self) -> SessionResult<()> {
        let was_armed = {
            let mut state = self.shared.state.lock().await;
            if state.starting {
                return Err(SessionError::StartInProgress);
            }
            let was_armed = state.debouncer.state() == SessionState::Armed;
            state.debouncer.reset();
            was_armed
        };

        if was_armed {
            self.shared.decoder.stop().await;
        }
        debug!("Detection discarded, scanning again");
        self.emit_session(SessionState::Idle, None);
        self.start_scanning().await
    }

    /// Closes the camera session.
    pub async fn stop_scanning(&self) {
        {
            let mut state = self.shared.state.lock().await;
            if state.starting {
                state.abandon_start = true;
            }
            state.debouncer.reset();
        }

        self.shared.decoder.stop().await;
        info!("Scan session closed");
        self.emit_session(SessionState::Idle, None);
    }

    /// Drives the session from a channel of decode events until the sender
    /// is dropped.
    ///
    /// When an auto-commit delay is configured, a detection still pending
    /// after the delay is added to the batch.
    pub async fn run_decoder(&self, mut events: mpsc::Receiver<DecodeEvent>) {
        info!("Decode loop started");

        while let Some(event) = events.recv().await {
            let Some((_, seq)) = self.observe(&event).await else {
                continue;
            };

            if let Some(delay) = self.shared.config.auto_commit_delay() {
                let controller = self.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    controller.auto_commit(seq).await;
                });
            }
        }

        info!("Decode loop stopped");
    }

    // =========================================================================
    // Batch
    // =========================================================================

    /// Adds a manually entered code. Returns its position.
    pub async fn add_code(&self, raw: &str) -> SessionResult<usize> {
        let added = {
            let mut state = self.shared.state.lock().await;
            add_to_batch(&mut state.batch, raw)
        };
        self.report_add(added)
    }

    /// Feeds one key from a keyboard-wedge scanner. Returns the add result
    /// when the key was Enter.
    pub async fn handle_key(&self, key: Key) -> Option<SessionResult<usize>> {
        let text = {
            let mut state = self.shared.state.lock().await;
            state.keystrokes.push(key)?
        };
        Some(self.add_code(&text).await)
    }

    fn report_add(&self, added: CoreResult<(usize, String)>) -> SessionResult<usize> {
        match added {
            Ok((position, code)) => {
                info!(code = %code, position, "Code added to batch");
                self.emit(ScanEvent::ItemAdded { code, position });
                Ok(position)
            }
            Err(e) => {
                warn!(error = %e, "Code rejected");
                self.emit(ScanEvent::warning(e.to_string()));
                Err(e.into())
            }
        }
    }

    /// Removes a code. Returns whether it was present.
    pub async fn remove_code(&self, code: &str) -> SessionResult<bool> {
        let removed = self.shared.state.lock().await.batch.remove(code)?;

        if removed {
            debug!(code, "Code removed from batch");
            self.emit(ScanEvent::ItemRemoved {
                code: code.to_string(),
            });
        }
        Ok(removed)
    }

    /// Clears the batch, the selection and any pending detection.
    ///
    /// Allowed during a submission; that submission's outcome is then
    /// discarded.
    pub async fn reset(&self) {
        let dropped_detection = {
            let mut state = self.shared.state.lock().await;
            state.batch.reset();
            state.selection.clear();
            state.keystrokes.clear();

            let locked = state.debouncer.state() == SessionState::Locked;
            if locked {
                state.debouncer.reset();
            }
            locked
        };

        info!("Batch reset");
        if dropped_detection {
            self.emit_session(SessionState::Idle, None);
        }
        self.emit(ScanEvent::BatchCleared);
    }

    // =========================================================================
    // Submission
    // =========================================================================

    /// Submits the batch to the current selection and reconciles the
    /// backend's answer.
    ///
    /// Precondition failures (`SubmissionInProgress`, `EmptyBatch`,
    /// `NoLocation`) return immediately without calling the backend. A
    /// transport failure is reconciled as an `Error` outcome, so the call
    /// still returns `Ok` and the batch can be submitted again.
    pub async fn submit(&self) -> SessionResult<Reconciliation> {
        let request = {
            let mut guard = self.shared.state.lock().await;
            let state = &mut *guard;
            let (location_id, sublocation_id) = state.selection.target();
            state.batch.submit(location_id, sublocation_id)?
        };

        info!(
            submission_id = %request.id,
            count = request.codes.len(),
            location_id = %request.location_id,
            sublocation_id = ?request.sublocation_id,
            "Submitting batch"
        );
        self.emit(ScanEvent::SubmissionStarted {
            id: request.id.clone(),
            count: request.codes.len(),
        });

        let outcome = match self.shared.backend.submit_batch(&request).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(submission_id = %request.id, error = %e, "Submission failed");
                UpdateOutcome::error(e.to_string())
            }
        };

        let reconciliation = self
            .shared
            .state
            .lock()
            .await
            .batch
            .reconcile(&request.id, outcome)?;

        match &reconciliation.outcome {
            UpdateOutcome::Success { message } => {
                info!(submission_id = %request.id, message = %message, "Batch relocated")
            }
            UpdateOutcome::Partial { message, failed, .. } => warn!(
                submission_id = %request.id,
                failed = failed.len(),
                message = %message,
                "Batch partially relocated"
            ),
            UpdateOutcome::Error { message } => {
                warn!(submission_id = %request.id, message = %message, "Batch not relocated")
            }
        }
        if reconciliation.discarded {
            info!(submission_id = %request.id, "Batch was reset during submission, outcome discarded");
        }

        self.emit(ScanEvent::OutcomeReconciled(reconciliation.clone()));
        Ok(reconciliation)
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub async fn snapshot(&self) -> ScanSnapshot {
        let state = self.shared.state.lock().await;

        ScanSnapshot {
            items: state.batch.items().to_vec(),
            summary: state.batch.summary(),
            session: state.debouncer.state(),
            unavailable_reason: state.debouncer.unavailable_reason().map(str::to_string),
            pending_detection: state.debouncer.accepted().cloned(),
            locations: state.catalog.locations().to_vec(),
            selection: state.selection.clone(),
            submitting: state.batch.is_submitting(),
            typed: state.keystrokes.pending().to_string(),
        }
    }
}

/// Adds `raw` and returns the position with the stored (trimmed) code.
fn add_to_batch(batch: &mut BatchManager, raw: &str) -> CoreResult<(usize, String)> {
    let position = batch.add(raw)?;
    let code = batch
        .items()
        .get(position)
        .map(|item| item.code.clone())
        .unwrap_or_else(|| raw.trim().to_string());
    Ok((position, code))
}
