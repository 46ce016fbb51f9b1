//! # Presentation Events
//!
//! One-way notifications from the scan-session controller to whatever
//! renders it. The presentation layer never mutates core state; it reacts to
//! these and calls controller operations.
//!
//! ## Wire Format
//! Serialized as adjacently tagged JSON, the same shape the page consumes:
//! ```json
//! { "type": "ItemAdded", "payload": { "code": "SAMPLE-1", "position": 0 } }
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::batch::Reconciliation;
use crate::location::LocationSelection;
use crate::types::{AcceptedDetection, SessionState};

/// A state change the presentation layer may render.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "type", content = "payload")]
pub enum ScanEvent {
    // =========================================================================
    // Batch
    // =========================================================================
    /// A code joined the batch at `position`.
    ItemAdded { code: String, position: usize },

    /// A code left the batch.
    ItemRemoved { code: String },

    /// The batch and selection were reset.
    BatchCleared,

    // =========================================================================
    // Scan session
    // =========================================================================
    /// Session moved to `state`; `reason` is set for `Unavailable`.
    SessionChanged {
        state: SessionState,
        reason: Option<String>,
    },

    /// The debouncer accepted a detection.
    DetectionAccepted(AcceptedDetection),

    // =========================================================================
    // Locations
    // =========================================================================
    /// The catalog is ready.
    LocationsLoaded { count: usize, fallback: bool },

    /// Location or sublocation choice changed.
    SelectionChanged(LocationSelection),

    // =========================================================================
    // Submission
    // =========================================================================
    /// A submission of `count` codes was handed to the backend.
    SubmissionStarted { id: String, count: usize },

    /// The backend's verdict was merged into the batch.
    OutcomeReconciled(Reconciliation),

    /// Recoverable problem worth showing (duplicate scan, fallback catalog).
    Warning { message: String },
}

impl ScanEvent {
    /// Short name used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ScanEvent::ItemAdded { .. } => "item_added",
            ScanEvent::ItemRemoved { .. } => "item_removed",
            ScanEvent::BatchCleared => "batch_cleared",
            ScanEvent::SessionChanged { .. } => "session_changed",
            ScanEvent::DetectionAccepted(_) => "detection_accepted",
            ScanEvent::LocationsLoaded { .. } => "locations_loaded",
            ScanEvent::SelectionChanged(_) => "selection_changed",
            ScanEvent::SubmissionStarted { .. } => "submission_started",
            ScanEvent::OutcomeReconciled(_) => "outcome_reconciled",
            ScanEvent::Warning { .. } => "warning",
        }
    }

    /// Creates a warning event.
    pub fn warning(message: impl Into<String>) -> Self {
        ScanEvent::Warning {
            message: message.into(),
        }
    }

    /// Serializes to the JSON shape the page consumes.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
