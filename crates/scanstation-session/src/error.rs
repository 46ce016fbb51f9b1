//! # Session Error Types
//!
//! Error types for the async scan-session controller.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Session Error Categories                            │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Core           │  │   Decoder       │  │     Backend             │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  Validation     │  │  Unavailable    │  │  Transport              │ │
//! │  │  EmptyBatch     │  │  StartInProgress│  │  LocationSource         │ │
//! │  │  NoLocation     │  │  Timeout        │  │  Deserialization        │ │
//! │  │  InProgress     │  │  NoPending...   │  │                         │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  ┌─────────────────┐                                                    │
//! │  │  Configuration  │   No variant is fatal: each one is either a        │
//! │  │                 │   synchronous rejection or resolves into an        │
//! │  │  InvalidConfig  │   Error/Partial outcome that keeps the batch       │
//! │  │  Load / Save    │   retryable.                                       │
//! │  └─────────────────┘                                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use scanstation_core::CoreError;
use thiserror::Error;

/// Result type alias for session operations.
pub type SessionResult<T> = Result<T, SessionError>;

/// Every failure the controller can report.
#[derive(Debug, Error)]
pub enum SessionError {
    // =========================================================================
    // Core Errors
    // =========================================================================
    /// Validation or precondition failure from the core.
    #[error(transparent)]
    Core(#[from] CoreError),

    // =========================================================================
    // Decoder Errors
    // =========================================================================
    /// Decoder could not start; fall back to manual entry.
    #[error("Scanner unavailable: {0}")]
    DecoderUnavailable(String),

    /// A decoder start is already outstanding.
    #[error("Scanner is already starting")]
    StartInProgress,

    /// The session holds an accepted detection that must be used or
    /// discarded first.
    #[error("A detected code is waiting to be used or discarded")]
    DetectionPending,

    /// `commit_detection` was called with nothing detected.
    #[error("No detected code to use")]
    NoPendingDetection,

    /// An operation did not complete in time.
    #[error("Timed out after {0} seconds")]
    Timeout(u64),

    // =========================================================================
    // Backend Errors
    // =========================================================================
    /// The submission request itself failed (network, backend unreachable).
    #[error("Transport error: {0}")]
    Transport(String),

    /// The location source failed.
    #[error("Failed to load locations: {0}")]
    LocationSource(String),

    /// Failed to serialize a message.
    #[error("Serialization failed: {0}")]
    SerializationFailed(String),

    /// Failed to deserialize a message.
    #[error("Deserialization failed: {0}")]
    DeserializationFailed(String),

    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Failed to load config file.
    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    /// Failed to save config file.
    #[error("Failed to save config: {0}")]
    ConfigSaveFailed(String),
}

impl SessionError {
    /// Returns true if retrying the same call later may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SessionError::Transport(_)
                | SessionError::Timeout(_)
                | SessionError::StartInProgress
                | SessionError::LocationSource(_)
                | SessionError::Core(CoreError::SubmissionInProgress)
        )
    }
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<serde_json::Error> for SessionError {
    fn from(err: serde_json::Error) -> Self {
        SessionError::DeserializationFailed(err.to_string())
    }
}

impl From<std::io::Error> for SessionError {
    fn from(err: std::io::Error) -> Self {
        SessionError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for SessionError {
    fn from(err: toml::de::Error) -> Self {
        SessionError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for SessionError {
    fn from(err: toml::ser::Error) -> Self {
        SessionError::ConfigSaveFailed(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scanstation_core::ValidationError;

    #[test]
    fn test_core_errors_are_transparent() {
        let err: SessionError = CoreError::NoLocation.into();
        assert_eq!(err.to_string(), "No location selected");

        let err: SessionError = CoreError::from(ValidationError::EmptyInput).into();
        assert!(matches!(
            err,
            SessionError::Core(CoreError::Validation(ValidationError::EmptyInput))
        ));
    }

    #[test]
    fn test_retryable() {
        assert!(SessionError::Transport("connection refused".into()).is_retryable());
        assert!(SessionError::Core(CoreError::SubmissionInProgress).is_retryable());
        assert!(!SessionError::Core(CoreError::EmptyBatch).is_retryable());
        assert!(!SessionError::DecoderUnavailable("denied".into()).is_retryable());
    }
}
