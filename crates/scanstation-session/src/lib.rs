//! # scanstation-session: Async Scan-Session Controller
//!
//! Drives the pure `scanstation-core` state machines from an async host:
//! starts and stops the decoder, loads locations, submits batches and
//! reports every change as a `ScanEvent`.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Session Architecture                             │
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                    ScanController (cloneable)                    │  │
//! │  │                                                                  │  │
//! │  │  DetectionDebouncer + BatchManager + LocationSelection          │  │
//! │  │  behind one tokio Mutex, never held across an await             │  │
//! │  └────────────────────────────┬─────────────────────────────────────┘  │
//! │                               │                                         │
//! │         ┌─────────────────────┼─────────────────────┐                  │
//! │         ▼                     ▼                     ▼                   │
//! │  ┌────────────────┐  ┌────────────────┐  ┌────────────────────────┐    │
//! │  │ DecodingEngine │  │ LocationSource │  │  RelocationBackend     │    │
//! │  │                │  │                │  │                        │    │
//! │  │ camera start / │  │ catalog, with  │  │ one submission at a    │    │
//! │  │ stop, events   │  │ fallback       │  │ time, JSON protocol    │    │
//! │  │ via mpsc       │  │                │  │                        │    │
//! │  └────────────────┘  └────────────────┘  └────────────────────────┘    │
//! │                                                                         │
//! │  EVENTS (to the page via ScanEventEmitter):                            │
//! │  • ItemAdded / ItemRemoved / BatchCleared                              │
//! │  • SessionChanged / DetectionAccepted                                  │
//! │  • LocationsLoaded / SelectionChanged                                  │
//! │  • SubmissionStarted / OutcomeReconciled / Warning                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//! - [`collaborators`] - Decoder, location source and backend traits
//! - [`config`] - TOML + environment configuration
//! - [`controller`] - The `ScanController`
//! - [`emitter`] - Event emitters (no-op, broadcast)
//! - [`error`] - Session error types
//! - [`protocol`] - JSON wire format for locations and updates

pub mod collaborators;
pub mod config;
pub mod controller;
pub mod emitter;
pub mod error;
pub mod protocol;

// =============================================================================
// Re-exports
// =============================================================================

pub use collaborators::{
    DecodingEngine, LocationSource, NoCamera, RelocationBackend, StaticLocationSource,
};
pub use config::{BatchSettings, ScanConfig, SessionSettings};
pub use controller::{ScanController, ScanSnapshot};
pub use emitter::{BroadcastEmitter, NoOpEmitter, ScanEventEmitter};
pub use error::{SessionError, SessionResult};
pub use protocol::{
    parse_location_catalog, parse_update_response, UpdateLocationRequest, UpdateLocationResponse,
};
