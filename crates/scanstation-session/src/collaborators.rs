//! # Collaborators
//!
//! The three outside services the controller talks to. Hosts implement
//! these over whatever they have: a camera library, an HTTP client, a
//! fixture file.
//!
//! ```text
//! ┌──────────────────┐   start / stop    ┌──────────────────────────────┐
//! │                  │ ────────────────► │ DecodingEngine               │
//! │                  │ ◄──────────────── │ (DecodeEvents via mpsc)      │
//! │  ScanController  │                   └──────────────────────────────┘
//! │                  │  fetch_locations  ┌──────────────────────────────┐
//! │                  │ ────────────────► │ LocationSource               │
//! │                  │                   └──────────────────────────────┘
//! │                  │   submit_batch    ┌──────────────────────────────┐
//! │                  │ ────────────────► │ RelocationBackend            │
//! └──────────────────┘                   └──────────────────────────────┘
//! ```

use async_trait::async_trait;

use scanstation_core::{LocationCatalog, SubmissionRequest, UpdateOutcome};

use crate::error::{SessionError, SessionResult};

/// Camera-backed code detector.
///
/// Detections are not returned from `start`; the host forwards them to
/// `ScanController::run_decoder` (or `handle_decode`).
#[async_trait]
pub trait DecodingEngine: Send + Sync {
    /// Acquires the camera and begins decoding. An error (permission
    /// denied, no device) makes the session unavailable.
    async fn start(&self) -> SessionResult<()>;

    /// Releases the camera. Must be safe to call when not started.
    async fn stop(&self);
}

/// Supplies the location catalog.
#[async_trait]
pub trait LocationSource: Send + Sync {
    async fn fetch_locations(&self) -> SessionResult<LocationCatalog>;
}

/// Performs the relocation.
///
/// `Err` means the request never got a verdict (transport failure); the
/// controller turns it into an `Error` outcome so the batch stays
/// retryable.
#[async_trait]
pub trait RelocationBackend: Send + Sync {
    async fn submit_batch(&self, request: &SubmissionRequest) -> SessionResult<UpdateOutcome>;
}

// =============================================================================
// Stock Implementations
// =============================================================================

/// Serves a fixed catalog.
#[derive(Debug, Clone, Default)]
pub struct StaticLocationSource {
    catalog: LocationCatalog,
}

impl StaticLocationSource {
    pub fn new(catalog: LocationCatalog) -> Self {
        StaticLocationSource { catalog }
    }
}

#[async_trait]
impl LocationSource for StaticLocationSource {
    async fn fetch_locations(&self) -> SessionResult<LocationCatalog> {
        Ok(self.catalog.clone())
    }
}

/// Decoder for stations without a camera; every start fails, leaving
/// manual and keyboard-wedge entry.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCamera;

#[async_trait]
impl DecodingEngine for NoCamera {
    async fn start(&self) -> SessionResult<()> {
        Err(SessionError::DecoderUnavailable(
            "No camera available on this station".into(),
        ))
    }

    async fn stop(&self) {}
}
