//! # scanstation-core: Pure Scan-Session Logic for Scan Station
//!
//! This crate is the **heart** of Scan Station. It turns a noisy stream of
//! barcode decode attempts into accepted codes, keeps the operator's batch of
//! codes, and merges a relocation backend's verdict back into that batch.
//! Everything here is a plain state object with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Scan Station Architecture                          │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Browser page (presentation)                  │   │
//! │  │    Scanner modal ──► Batch table ──► Location picker ──► Result │   │
//! │  └─────────────────────────────▲───────────────────────────────────┘   │
//! │                                │ ScanEvent (one-way)                    │
//! │  ┌─────────────────────────────┴───────────────────────────────────┐   │
//! │  │                scanstation-session (ScanController)             │   │
//! │  │    decoder start, submit to backend, config, wire protocol      │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │             ★ scanstation-core (THIS CRATE) ★                   │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │ debounce  │  │   batch   │  │ location  │  │ validation│  │   │
//! │  │   │ Debouncer │  │ Manager   │  │ Catalog   │  │  policy   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO TIMERS • NO NETWORK • PLAIN STATE OBJECTS         │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (DecodeEvent, BatchItem, UpdateOutcome, etc.)
//! - [`debounce`] - Detection Debouncer state machine
//! - [`batch`] - Scan Batch Manager with single-flight submission
//! - [`location`] - Location catalog and cascading sublocation selection
//! - [`keystroke`] - Buffer for handheld scanners that type codes
//! - [`events`] - Presentation events
//! - [`validation`] - Code format policy
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use scanstation_core::batch::BatchManager;
//! use scanstation_core::types::{ItemStatus, UpdateOutcome};
//!
//! let mut batch = BatchManager::default();
//! batch.add("SAMPLE-001").unwrap();
//! batch.add("SAMPLE-002").unwrap();
//!
//! let request = batch.submit("LOC-7", None).unwrap();
//! assert_eq!(request.codes, vec!["SAMPLE-001", "SAMPLE-002"]);
//!
//! batch
//!     .reconcile(&request.id, UpdateOutcome::success("Updated 2 of 2 records"))
//!     .unwrap();
//! assert!(batch.items().iter().all(|i| i.status == ItemStatus::Accepted));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod batch;
pub mod debounce;
pub mod error;
pub mod events;
pub mod keystroke;
pub mod location;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use batch::{BatchManager, Reconciliation};
pub use debounce::{DebounceConfig, DetectionDebouncer};
pub use error::{CoreError, CoreResult, ValidationError};
pub use events::ScanEvent;
pub use keystroke::{Key, KeystrokeBuffer};
pub use location::{Location, LocationCatalog, LocationSelection, Sublocation};
pub use types::*;
pub use validation::CodePolicy;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Confidence at which a tracked code locks the session.
///
/// The later source revision used 0.40; the earlier one used 0.60
/// (see [`STRICT_ACCEPT_THRESHOLD`]).
pub const DEFAULT_ACCEPT_THRESHOLD: f64 = 0.40;

/// Confidence below which a decode event is ignored entirely.
pub const DEFAULT_TRACK_THRESHOLD: f64 = 0.08;

/// Accept threshold of the stricter preset.
pub const STRICT_ACCEPT_THRESHOLD: f64 = 0.60;

/// Track threshold of the stricter preset.
pub const STRICT_TRACK_THRESHOLD: f64 = 0.10;

/// How long a candidate survives without being reinforced (milliseconds).
pub const DEFAULT_CANDIDATE_WINDOW_MS: i64 = 2_000;

/// Longest code accepted into a batch.
///
/// Linear barcodes and QR payloads used as record labels are far shorter;
/// anything longer is almost certainly a mis-scan of unrelated content.
pub const MAX_CODE_LENGTH: usize = 128;
