//! # Error Types
//!
//! Domain-specific error types for scanstation-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  scanstation-core errors (this file)                                   │
//! │  ├── ValidationError  - add-time input failures (warning, no change)   │
//! │  └── CoreError        - submit/reconcile precondition failures         │
//! │                                                                         │
//! │  scanstation-session errors (separate crate)                           │
//! │  └── SessionError     - decoder, transport, config failures            │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → SessionError → Presentation       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! None of these are fatal. Every variant is either rejected synchronously
//! with an explanatory message or leaves the batch retryable.

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core scan-session errors.
#[derive(Debug, Error, PartialEq)]
pub enum CoreError {
    /// `submit` was called with no items in the batch.
    #[error("No codes in the batch. Scan at least one code first")]
    EmptyBatch,

    /// `submit` was called without a target location.
    #[error("No location selected")]
    NoLocation,

    /// A submission is already outstanding.
    ///
    /// ## When This Occurs
    /// - Operator double-clicks "Update"
    /// - Operator edits the batch while the backend is still working
    #[error("A submission is already in progress")]
    SubmissionInProgress,

    /// `reconcile` was called for a submission that is not in flight.
    ///
    /// Guards the at-most-one-reconcile-per-submit rule.
    #[error("No in-flight submission with id {id}")]
    UnknownSubmission { id: String },

    /// The chosen sublocation is not offered for the current location.
    #[error("Sublocation {id} is not available for the selected location")]
    UnknownSublocation { id: String },

    /// A policy value is out of range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors raised when a code is added to the batch.
///
/// These surface as user-visible warnings; the batch is never changed.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    /// Code was empty or only whitespace.
    #[error("Please enter a barcode")]
    EmptyInput,

    /// Code does not match the configured lexical policy.
    #[error("Code '{code}' has invalid format: {reason}")]
    InvalidFormat { code: String, reason: String },

    /// Code is already in the batch.
    #[error("Code '{code}' has already been scanned")]
    Duplicate { code: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;
