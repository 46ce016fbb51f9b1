//! # Scan Batch Manager
//!
//! Owns the operator's ordered, deduplicated batch of codes and the single
//! outstanding submission for it.
//!
//! ## Batch Operations Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Batch Operations                                     │
//! │                                                                         │
//! │  Operator Action          Manager Call            Batch Change          │
//! │  ───────────────          ────────────            ────────────          │
//! │                                                                         │
//! │  Scan / type code ──────► add(code) ────────────► items.push(Pending)  │
//! │                                                                         │
//! │  Click remove ──────────► remove(code) ─────────► items.retain(..)     │
//! │                                                                         │
//! │  Click Update ──────────► submit(loc, sub) ─────► in_flight = Some(..) │
//! │                                                                         │
//! │  Backend answers ───────► reconcile(id, out) ───► statuses merged,     │
//! │                                                   in_flight = None     │
//! │                                                                         │
//! │  Click Reset ───────────► reset() ──────────────► items.clear()        │
//! │                                                                         │
//! │  NOTE: add/remove/submit are rejected while a submission is in flight.  │
//! │        reset is always allowed; the in-flight result is then discarded. │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Reconciliation Rules
//! ```text
//! Success  → every item Accepted
//! Partial  → in failed        → Failed(error)
//!            in succeededIds  → Accepted
//!            in neither       → Pending (never treated as success)
//! Error    → nothing changes, manager unlocked for retry
//! ```

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::types::{BatchItem, BatchSummary, ItemStatus, SubmissionRequest, UpdateOutcome};
use crate::validation::{non_blank, validate_code, CodePolicy};
use crate::MAX_CODE_LENGTH;

/// What `reconcile` did with an outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Reconciliation {
    /// The submission this outcome belongs to.
    pub submission_id: String,

    /// The backend's verdict, as received.
    pub outcome: UpdateOutcome,

    /// Counts after merging.
    pub summary: BatchSummary,

    /// True if the batch was reset while the submission was in flight, in
    /// which case no item was touched.
    pub discarded: bool,
}

#[derive(Debug, Clone)]
struct InFlight {
    id: String,
    reset_since_submit: bool,
}

/// The scan batch and its single-flight submission.
///
/// ## Invariants
/// - Codes are unique (case-sensitive exact match)
/// - Items keep first-insertion order
/// - At most one submission is in flight
#[derive(Debug, Clone)]
pub struct BatchManager {
    items: Vec<BatchItem>,
    policy: CodePolicy,
    max_code_length: usize,
    in_flight: Option<InFlight>,
}

impl Default for BatchManager {
    fn default() -> Self {
        Self::new(CodePolicy::default(), MAX_CODE_LENGTH)
    }
}

impl BatchManager {
    /// Creates an empty batch with the given code policy.
    pub fn new(policy: CodePolicy, max_code_length: usize) -> Self {
        BatchManager {
            items: Vec::new(),
            policy,
            max_code_length,
            in_flight: None,
        }
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Adds a code and returns its 0-based position.
    ///
    /// ## Errors
    /// - `SubmissionInProgress` while a submission is outstanding
    /// - `Validation(EmptyInput)` for blank input
    /// - `Validation(InvalidFormat)` if the code breaks the policy
    /// - `Validation(Duplicate)` if the code is already present
    pub fn add(&mut self, raw: &str) -> CoreResult<usize> {
        self.ensure_idle()?;

        let code = validate_code(raw, self.policy, self.max_code_length)?;
        if self.contains(&code) {
            return Err(ValidationError::Duplicate { code }.into());
        }

        self.items.push(BatchItem::pending(code));
        Ok(self.items.len() - 1)
    }

    /// Removes a code. Returns whether anything was removed; absence is not
    /// an error.
    pub fn remove(&mut self, code: &str) -> CoreResult<bool> {
        self.ensure_idle()?;

        let initial_len = self.items.len();
        self.items.retain(|i| i.code != code);
        Ok(self.items.len() != initial_len)
    }

    /// Starts the single in-flight submission.
    ///
    /// Nothing is mutated when a precondition fails.
    pub fn submit(
        &mut self,
        location_id: &str,
        sublocation_id: Option<&str>,
    ) -> CoreResult<SubmissionRequest> {
        self.ensure_idle()?;

        if self.items.is_empty() {
            return Err(CoreError::EmptyBatch);
        }

        let location_id = location_id.trim();
        if location_id.is_empty() {
            return Err(CoreError::NoLocation);
        }

        let request = SubmissionRequest {
            id: Uuid::new_v4().to_string(),
            codes: self.codes(),
            location_id: location_id.to_string(),
            sublocation_id: non_blank(sublocation_id).map(str::to_string),
        };

        self.in_flight = Some(InFlight {
            id: request.id.clone(),
            reset_since_submit: false,
        });

        Ok(request)
    }

    /// Merges the outcome of the in-flight submission into item statuses.
    ///
    /// ## Errors
    /// `UnknownSubmission` if `submission_id` is not the one in flight
    /// (including a second reconcile for the same submission).
    pub fn reconcile(
        &mut self,
        submission_id: &str,
        outcome: UpdateOutcome,
    ) -> CoreResult<Reconciliation> {
        let in_flight = match &self.in_flight {
            Some(f) if f.id == submission_id => f.clone(),
            _ => {
                return Err(CoreError::UnknownSubmission {
                    id: submission_id.to_string(),
                })
            }
        };
        self.in_flight = None;

        if !in_flight.reset_since_submit {
            self.apply(&outcome);
        }

        Ok(Reconciliation {
            submission_id: in_flight.id,
            outcome,
            summary: self.summary(),
            discarded: in_flight.reset_since_submit,
        })
    }

    /// Clears the batch. An in-flight submission stays in flight and its
    /// eventual result is discarded.
    pub fn reset(&mut self) {
        self.items.clear();
        if let Some(in_flight) = self.in_flight.as_mut() {
            in_flight.reset_since_submit = true;
        }
    }

    fn apply(&mut self, outcome: &UpdateOutcome) {
        match outcome {
            UpdateOutcome::Success { .. } => {
                for item in &mut self.items {
                    item.status = ItemStatus::Accepted;
                }
            }
            UpdateOutcome::Partial {
                succeeded_ids,
                failed,
                ..
            } => {
                let succeeded: HashSet<&str> = succeeded_ids.iter().map(String::as_str).collect();
                let failed: HashMap<&str, &str> = failed
                    .iter()
                    .map(|f| (f.id.as_str(), f.error.as_str()))
                    .collect();

                for item in &mut self.items {
                    item.status = if let Some(error) = failed.get(item.code.as_str()) {
                        ItemStatus::Failed(error.to_string())
                    } else if succeeded.contains(item.code.as_str()) {
                        ItemStatus::Accepted
                    } else {
                        ItemStatus::Pending
                    };
                }
            }
            UpdateOutcome::Error { .. } => {}
        }
    }

    fn ensure_idle(&self) -> CoreResult<()> {
        if self.in_flight.is_some() {
            return Err(CoreError::SubmissionInProgress);
        }
        Ok(())
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Items in insertion order.
    pub fn items(&self) -> &[BatchItem] {
        &self.items
    }

    /// Codes in insertion order.
    pub fn codes(&self) -> Vec<String> {
        self.items.iter().map(|i| i.code.clone()).collect()
    }

    /// Looks up an item by exact code.
    pub fn get(&self, code: &str) -> Option<&BatchItem> {
        self.items.iter().find(|i| i.code == code)
    }

    /// Returns true if the code is in the batch.
    pub fn contains(&self, code: &str) -> bool {
        self.get(code).is_some()
    }

    /// Number of items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Checks if the batch is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns true while a submission is outstanding.
    pub fn is_submitting(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Id of the outstanding submission.
    pub fn in_flight_id(&self) -> Option<&str> {
        self.in_flight.as_ref().map(|f| f.id.as_str())
    }

    /// Counts by status.
    pub fn summary(&self) -> BatchSummary {
        BatchSummary::from_items(&self.items)
    }

    /// Active code policy.
    pub fn policy(&self) -> CodePolicy {
        self.policy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FailedItem;

    fn batch_of(codes: &[&str]) -> BatchManager {
        let mut batch = BatchManager::default();
        for code in codes {
            batch.add(code).unwrap();
        }
        batch
    }

    fn status_of(batch: &BatchManager, code: &str) -> ItemStatus {
        batch.get(code).unwrap().status.clone()
    }

    #[test]
    fn test_add_preserves_order_and_rejects_duplicates() {
        let mut batch = BatchManager::default();

        assert_eq!(batch.add("B").unwrap(), 0);
        assert_eq!(batch.add(" A ").unwrap(), 1);
        assert_eq!(
            batch.add("B"),
            Err(CoreError::Validation(ValidationError::Duplicate {
                code: "B".to_string()
            }))
        );
        assert_eq!(batch.add("A\n").unwrap_err().to_string(), "Validation error: Code 'A' has already been scanned");

        // Case-sensitive
        assert_eq!(batch.add("b").unwrap(), 2);
        assert_eq!(batch.codes(), vec!["B", "A", "b"]);
    }

    #[test]
    fn test_add_empty_input_never_mutates() {
        let mut batch = batch_of(&["A"]);

        for raw in ["", "   ", "\t"] {
            assert_eq!(
                batch.add(raw),
                Err(CoreError::Validation(ValidationError::EmptyInput))
            );
        }
        assert_eq!(batch.codes(), vec!["A"]);
    }

    #[test]
    fn test_add_invalid_format() {
        let mut batch = BatchManager::default();
        assert!(matches!(
            batch.add("two words"),
            Err(CoreError::Validation(ValidationError::InvalidFormat { .. }))
        ));

        let mut numeric = BatchManager::new(CodePolicy::NumericOnly, MAX_CODE_LENGTH);
        assert!(numeric.add("4006381333931").is_ok());
        assert!(numeric.add("SAMPLE-1").is_err());
        assert!(batch.is_empty());
    }

    #[test]
    fn test_remove_is_noop_when_absent() {
        let mut batch = batch_of(&["A", "B"]);

        assert!(batch.remove("A").unwrap());
        assert!(!batch.remove("A").unwrap());
        assert!(!batch.remove("Z").unwrap());
        assert_eq!(batch.codes(), vec!["B"]);
    }

    #[test]
    fn test_submit_preconditions() {
        let mut empty = BatchManager::default();
        assert_eq!(empty.submit("LOC-1", None), Err(CoreError::EmptyBatch));
        assert!(!empty.is_submitting());

        let mut batch = batch_of(&["A"]);
        assert_eq!(batch.submit("", Some("sub1")), Err(CoreError::NoLocation));
        assert_eq!(batch.submit("  ", None), Err(CoreError::NoLocation));
        assert!(!batch.is_submitting());
        assert_eq!(batch.codes(), vec!["A"]);
    }

    #[test]
    fn test_submit_builds_ordered_request() {
        let mut batch = batch_of(&["C", "A", "B"]);

        let request = batch.submit("LOC-1", Some("")).unwrap();
        assert_eq!(request.codes, vec!["C", "A", "B"]);
        assert_eq!(request.location_id, "LOC-1");
        assert_eq!(request.sublocation_id, None);
        assert_eq!(batch.in_flight_id(), Some(request.id.as_str()));

        let mut other = batch_of(&["A"]);
        let request = other.submit("LOC-1", Some("sub2")).unwrap();
        assert_eq!(request.sublocation_id.as_deref(), Some("sub2"));
    }

    #[test]
    fn test_single_flight() {
        let mut batch = batch_of(&["A", "B"]);
        let request = batch.submit("LOC-1", None).unwrap();

        assert_eq!(batch.add("C"), Err(CoreError::SubmissionInProgress));
        assert_eq!(batch.remove("A"), Err(CoreError::SubmissionInProgress));
        assert_eq!(batch.submit("LOC-1", None), Err(CoreError::SubmissionInProgress));
        assert_eq!(batch.codes(), vec!["A", "B"]);
        assert_eq!(batch.in_flight_id(), Some(request.id.as_str()));
    }

    #[test]
    fn test_reconcile_success() {
        let mut batch = batch_of(&["A", "B"]);
        let request = batch.submit("LOC-1", None).unwrap();

        let result = batch
            .reconcile(&request.id, UpdateOutcome::success("Updated 2 of 2 records"))
            .unwrap();

        assert!(!result.discarded);
        assert_eq!(result.summary.accepted, 2);
        assert!(batch.items().iter().all(|i| i.status == ItemStatus::Accepted));
        assert!(!batch.is_submitting());
    }

    #[test]
    fn test_reconcile_partial() {
        let mut batch = batch_of(&["A", "B", "C"]);
        let request = batch.submit("LOC-1", None).unwrap();

        let outcome = UpdateOutcome::partial(
            "Updated 1 of 3 records",
            vec!["A".to_string()],
            vec![FailedItem {
                id: "B".to_string(),
                error: "E".to_string(),
            }],
        );
        let result = batch.reconcile(&request.id, outcome).unwrap();

        assert_eq!(status_of(&batch, "A"), ItemStatus::Accepted);
        assert_eq!(status_of(&batch, "B"), ItemStatus::Failed("E".to_string()));
        assert_eq!(status_of(&batch, "C"), ItemStatus::Pending);
        assert_eq!(
            result.summary,
            BatchSummary {
                total: 3,
                pending: 1,
                accepted: 1,
                failed: 1
            }
        );
    }

    #[test]
    fn test_reconcile_error_allows_retry() {
        let mut batch = batch_of(&["A", "B"]);
        let request = batch.submit("LOC-1", None).unwrap();

        batch
            .reconcile(&request.id, UpdateOutcome::error("Failed to authenticate"))
            .unwrap();

        assert!(batch.items().iter().all(|i| i.status == ItemStatus::Pending));
        assert!(!batch.is_submitting());

        let retry = batch.submit("LOC-1", None).unwrap();
        assert_ne!(retry.id, request.id);
        assert_eq!(retry.codes, vec!["A", "B"]);
    }

    #[test]
    fn test_reconcile_error_keeps_previous_statuses() {
        let mut batch = batch_of(&["A", "B"]);
        let first = batch.submit("LOC-1", None).unwrap();
        let partial = UpdateOutcome::partial(
            "Updated 1 of 2 records",
            vec!["A".to_string()],
            vec![FailedItem {
                id: "B".to_string(),
                error: "E".to_string(),
            }],
        );
        batch.reconcile(&first.id, partial).unwrap();

        let second = batch.submit("LOC-2", None).unwrap();
        batch
            .reconcile(&second.id, UpdateOutcome::error("unreachable"))
            .unwrap();

        assert_eq!(status_of(&batch, "A"), ItemStatus::Accepted);
        assert_eq!(status_of(&batch, "B"), ItemStatus::Failed("E".to_string()));
    }

    #[test]
    fn test_reconcile_only_once_per_submit() {
        let mut batch = batch_of(&["A"]);
        let request = batch.submit("LOC-1", None).unwrap();

        assert!(batch
            .reconcile(&request.id, UpdateOutcome::success("ok"))
            .is_ok());
        assert_eq!(
            batch.reconcile(&request.id, UpdateOutcome::error("late")),
            Err(CoreError::UnknownSubmission {
                id: request.id.clone()
            })
        );
        assert_eq!(status_of(&batch, "A"), ItemStatus::Accepted);
    }

    #[test]
    fn test_reconcile_wrong_id() {
        let mut batch = batch_of(&["A"]);
        batch.submit("LOC-1", None).unwrap();

        assert!(matches!(
            batch.reconcile("not-the-one", UpdateOutcome::success("ok")),
            Err(CoreError::UnknownSubmission { .. })
        ));
        assert!(batch.is_submitting());
    }

    #[test]
    fn test_reset_during_flight_discards_result() {
        let mut batch = batch_of(&["A", "B"]);
        let request = batch.submit("LOC-1", None).unwrap();

        batch.reset();
        assert!(batch.is_empty());
        assert!(batch.is_submitting());
        assert_eq!(batch.add("C"), Err(CoreError::SubmissionInProgress));

        let result = batch
            .reconcile(&request.id, UpdateOutcome::success("Updated 2 of 2 records"))
            .unwrap();
        assert!(result.discarded);
        assert_eq!(result.summary.total, 0);

        assert_eq!(batch.add("C").unwrap(), 0);
        assert_eq!(status_of(&batch, "C"), ItemStatus::Pending);
    }
}
