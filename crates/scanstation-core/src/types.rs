//! # Domain Types
//!
//! Core domain types used throughout Scan Station.
//!
//! ## Type Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │  DecodeEvent    │   │   BatchItem     │   │ UpdateOutcome   │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  code           │   │  code (unique)  │   │  Success        │       │
//! │  │  confidence     │   │  status         │   │  Partial        │       │
//! │  │  timestamp      │   │  added_at       │   │  Error          │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │  SessionState   │   │   ItemStatus    │   │SubmissionRequest│       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  Idle           │   │  Pending        │   │  id (UUID)      │       │
//! │  │  Armed          │   │  Accepted       │   │  codes          │       │
//! │  │  Locked         │   │  Failed(reason) │   │  location_id    │       │
//! │  │  Unavailable    │   └─────────────────┘   │  sublocation_id │       │
//! │  └─────────────────┘                         └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

// =============================================================================
// Decode Event
// =============================================================================

/// One raw recognition attempt from the external decoding engine.
///
/// Ephemeral: evaluated by the debouncer and then dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecodeEvent {
    /// Decoded text.
    pub code: String,

    /// Decoder confidence, clamped to `[0, 1]`.
    pub confidence: f64,

    /// When the frame was decoded.
    pub timestamp: DateTime<Utc>,
}

impl DecodeEvent {
    /// Creates an event stamped with the current time.
    pub fn new(code: impl Into<String>, confidence: f64) -> Self {
        Self::at(code, confidence, Utc::now())
    }

    /// Creates an event with an explicit timestamp.
    pub fn at(code: impl Into<String>, confidence: f64, timestamp: DateTime<Utc>) -> Self {
        DecodeEvent {
            code: code.into(),
            confidence: clamp_confidence(confidence),
            timestamp,
        }
    }
}

fn clamp_confidence(confidence: f64) -> f64 {
    if confidence.is_nan() {
        0.0
    } else {
        confidence.clamp(0.0, 1.0)
    }
}

// =============================================================================
// Scan Session
// =============================================================================

/// Lifecycle state of the scanning session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// No decoder running.
    #[default]
    Idle,

    /// Decoder running, waiting for a stable read.
    Armed,

    /// A detection was accepted; further reads are ignored until reset.
    Locked,

    /// Decoder could not start; fall back to manual entry.
    Unavailable,
}

impl SessionState {
    /// Returns true if decode events are currently evaluated.
    pub fn is_armed(&self) -> bool {
        matches!(self, SessionState::Armed)
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::Idle => write!(f, "idle"),
            SessionState::Armed => write!(f, "armed"),
            SessionState::Locked => write!(f, "locked"),
            SessionState::Unavailable => write!(f, "unavailable"),
        }
    }
}

/// The single detection a session commits to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct AcceptedDetection {
    pub code: String,
    pub confidence: f64,
}

// =============================================================================
// Batch Items
// =============================================================================

/// Per-item outcome state.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "kind", content = "reason", rename_all = "snake_case")]
pub enum ItemStatus {
    /// Not yet (successfully) relocated.
    #[default]
    Pending,

    /// Backend confirmed the relocation.
    Accepted,

    /// Backend rejected this code.
    Failed(String),
}

impl ItemStatus {
    /// Returns the failure reason, if any.
    pub fn failure_reason(&self) -> Option<&str> {
        match self {
            ItemStatus::Failed(reason) => Some(reason),
            _ => None,
        }
    }
}

/// A code in the operator's batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct BatchItem {
    /// Scanned code (unique within the batch, case-sensitive).
    pub code: String,

    /// Current outcome state.
    pub status: ItemStatus,

    /// When the code entered the batch.
    #[ts(as = "String")]
    pub added_at: DateTime<Utc>,
}

impl BatchItem {
    /// Creates a pending item stamped now.
    pub fn pending(code: impl Into<String>) -> Self {
        BatchItem {
            code: code.into(),
            status: ItemStatus::Pending,
            added_at: Utc::now(),
        }
    }
}

// =============================================================================
// Submission
// =============================================================================

/// The single request produced by a successful `submit`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionRequest {
    /// Correlates this request with its `reconcile` (UUID v4).
    pub id: String,

    /// All batch codes in insertion order.
    pub codes: Vec<String>,

    /// Target location.
    pub location_id: String,

    /// Target sublocation, if one was chosen.
    pub sublocation_id: Option<String>,
}

/// A code the backend could not relocate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct FailedItem {
    pub id: String,
    pub error: String,
}

/// Result of one submission.
///
/// ## Shapes
/// ```text
/// Success { message }                          every code relocated
/// Partial { message, succeededIds, failed }    some codes relocated
/// Error   { message }                          nothing happened; retryable
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum UpdateOutcome {
    Success {
        message: String,
    },
    Partial {
        message: String,
        #[serde(rename = "succeededIds")]
        succeeded_ids: Vec<String>,
        failed: Vec<FailedItem>,
    },
    Error {
        message: String,
    },
}

impl UpdateOutcome {
    /// Creates a success outcome.
    pub fn success(message: impl Into<String>) -> Self {
        UpdateOutcome::Success {
            message: message.into(),
        }
    }

    /// Creates a partial outcome.
    pub fn partial(
        message: impl Into<String>,
        succeeded_ids: Vec<String>,
        failed: Vec<FailedItem>,
    ) -> Self {
        UpdateOutcome::Partial {
            message: message.into(),
            succeeded_ids,
            failed,
        }
    }

    /// Creates an error outcome.
    pub fn error(message: impl Into<String>) -> Self {
        UpdateOutcome::Error {
            message: message.into(),
        }
    }

    /// Human-readable message from the backend.
    pub fn message(&self) -> &str {
        match self {
            UpdateOutcome::Success { message }
            | UpdateOutcome::Partial { message, .. }
            | UpdateOutcome::Error { message } => message,
        }
    }

    /// Returns true for the `Error` shape.
    pub fn is_error(&self) -> bool {
        matches!(self, UpdateOutcome::Error { .. })
    }
}

// =============================================================================
// Summary
// =============================================================================

/// Item counts by status, for rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct BatchSummary {
    pub total: usize,
    pub pending: usize,
    pub accepted: usize,
    pub failed: usize,
}

impl BatchSummary {
    /// Tallies a slice of items.
    pub fn from_items(items: &[BatchItem]) -> Self {
        items.iter().fold(
            BatchSummary {
                total: items.len(),
                ..Default::default()
            },
            |mut acc, item| {
                match item.status {
                    ItemStatus::Pending => acc.pending += 1,
                    ItemStatus::Accepted => acc.accepted += 1,
                    ItemStatus::Failed(_) => acc.failed += 1,
                }
                acc
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_event_clamps_confidence() {
        assert_eq!(DecodeEvent::new("X", 1.7).confidence, 1.0);
        assert_eq!(DecodeEvent::new("X", -0.2).confidence, 0.0);
        assert_eq!(DecodeEvent::new("X", f64::NAN).confidence, 0.0);
        assert_eq!(DecodeEvent::new("X", 0.42).confidence, 0.42);
    }

    #[test]
    fn test_outcome_serialization() {
        let outcome = UpdateOutcome::partial(
            "Updated 1 of 2 records",
            vec!["A".to_string()],
            vec![FailedItem {
                id: "B".to_string(),
                error: "Record not found".to_string(),
            }],
        );
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "partial");
        assert_eq!(json["succeededIds"][0], "A");
        assert_eq!(json["failed"][0]["error"], "Record not found");

        let back: UpdateOutcome = serde_json::from_value(json).unwrap();
        assert_eq!(back, outcome);
    }

    #[test]
    fn test_item_status_serialization() {
        let item = BatchItem {
            code: "B".to_string(),
            status: ItemStatus::Failed("E".to_string()),
            added_at: Utc::now(),
        };
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["status"]["kind"], "failed");
        assert_eq!(json["status"]["reason"], "E");
        assert!(json["addedAt"].is_string());

        let pending = serde_json::to_value(BatchItem::pending("A")).unwrap();
        assert_eq!(pending["status"]["kind"], "pending");
    }

    #[test]
    fn test_summary_counts() {
        let mut items = vec![
            BatchItem::pending("A"),
            BatchItem::pending("B"),
            BatchItem::pending("C"),
        ];
        items[0].status = ItemStatus::Accepted;
        items[1].status = ItemStatus::Failed("E".into());

        let summary = BatchSummary::from_items(&items);
        assert_eq!(
            summary,
            BatchSummary {
                total: 3,
                pending: 1,
                accepted: 1,
                failed: 1
            }
        );
    }
}
