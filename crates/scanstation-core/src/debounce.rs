//! # Detection Debouncer
//!
//! Turns a noisy, high-frequency stream of [`DecodeEvent`]s into at most one
//! [`AcceptedDetection`] per armed session.
//!
//! ## State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Detection Debouncer States                           │
//! │                                                                         │
//! │   ┌──────┐   arm()    ┌───────┐  stable read ≥ accept   ┌────────┐     │
//! │   │ Idle │ ─────────► │ Armed │ ──────────────────────► │ Locked │     │
//! │   └──────┘            └───┬───┘                          └───┬────┘     │
//! │      ▲                    │ weak / flip-flopping read        │          │
//! │      │                    └──► candidate update only         │          │
//! │      │                                                       │          │
//! │      └─────────────────────── reset() ◄──────────────────────┘          │
//! │                                                                         │
//! │   decoder start failed ──► Unavailable (events ignored; manual entry)  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Candidate Policy: higher confidence wins, same code reinforces
//! ```text
//! read < track_threshold            → ignored entirely
//! same code as candidate            → hits += 1, confidence = max(seen)
//! different code, higher confidence → replaces candidate (hits = 1)
//! different code, lower or equal    → dropped
//! candidate older than the window   → discarded before evaluation
//!
//! lock when: read.code == candidate.code
//!        and read.confidence ≥ accept_threshold
//!        and candidate.hits  ≥ required_hits
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::types::{AcceptedDetection, DecodeEvent, SessionState};
use crate::{
    DEFAULT_ACCEPT_THRESHOLD, DEFAULT_CANDIDATE_WINDOW_MS, DEFAULT_TRACK_THRESHOLD,
    STRICT_ACCEPT_THRESHOLD, STRICT_TRACK_THRESHOLD,
};

// =============================================================================
// Configuration
// =============================================================================

/// Tunable debounce policy.
///
/// The numeric thresholds are not load-bearing; two presets exist because
/// scanners in the field have run with both.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DebounceConfig {
    /// Reads below this confidence are ignored entirely.
    #[serde(default = "default_track_threshold")]
    pub track_threshold: f64,

    /// A stable read at or above this confidence locks the session.
    #[serde(default = "default_accept_threshold")]
    pub accept_threshold: f64,

    /// Tracked reads of the candidate code needed before it may lock.
    #[serde(default = "default_required_hits")]
    pub required_hits: u32,

    /// Milliseconds a candidate survives without reinforcement.
    #[serde(default = "default_candidate_window_ms")]
    pub candidate_window_ms: i64,
}

fn default_track_threshold() -> f64 {
    DEFAULT_TRACK_THRESHOLD
}

fn default_accept_threshold() -> f64 {
    DEFAULT_ACCEPT_THRESHOLD
}

fn default_required_hits() -> u32 {
    1
}

fn default_candidate_window_ms() -> i64 {
    DEFAULT_CANDIDATE_WINDOW_MS
}

impl Default for DebounceConfig {
    fn default() -> Self {
        DebounceConfig {
            track_threshold: default_track_threshold(),
            accept_threshold: default_accept_threshold(),
            required_hits: default_required_hits(),
            candidate_window_ms: default_candidate_window_ms(),
        }
    }
}

impl DebounceConfig {
    /// The stricter 0.10 / 0.60 preset.
    pub fn strict() -> Self {
        DebounceConfig {
            track_threshold: STRICT_TRACK_THRESHOLD,
            accept_threshold: STRICT_ACCEPT_THRESHOLD,
            ..Default::default()
        }
    }

    /// Checks `0 ≤ track ≤ accept ≤ 1`, `required_hits ≥ 1`, window > 0.
    pub fn validate(&self) -> CoreResult<()> {
        let in_unit = |v: f64| (0.0..=1.0).contains(&v);

        if !in_unit(self.track_threshold) || !in_unit(self.accept_threshold) {
            return Err(CoreError::InvalidConfig(
                "confidence thresholds must be between 0 and 1".into(),
            ));
        }

        if self.track_threshold > self.accept_threshold {
            return Err(CoreError::InvalidConfig(format!(
                "track_threshold ({}) must not exceed accept_threshold ({})",
                self.track_threshold, self.accept_threshold
            )));
        }

        if self.required_hits == 0 {
            return Err(CoreError::InvalidConfig(
                "required_hits must be at least 1".into(),
            ));
        }

        if self.candidate_window_ms <= 0 {
            return Err(CoreError::InvalidConfig(
                "candidate_window_ms must be greater than 0".into(),
            ));
        }

        Ok(())
    }
}

// =============================================================================
// Debouncer
// =============================================================================

#[derive(Debug, Clone)]
struct Candidate {
    code: String,
    confidence: f64,
    hits: u32,
    last_seen: DateTime<Utc>,
}

/// The scan-session state machine.
#[derive(Debug, Clone)]
pub struct DetectionDebouncer {
    config: DebounceConfig,
    state: SessionState,
    candidate: Option<Candidate>,
    accepted: Option<AcceptedDetection>,
    unavailable_reason: Option<String>,
}

impl Default for DetectionDebouncer {
    fn default() -> Self {
        Self::new(DebounceConfig::default())
    }
}

impl DetectionDebouncer {
    /// Creates an idle debouncer.
    pub fn new(config: DebounceConfig) -> Self {
        DetectionDebouncer {
            config,
            state: SessionState::Idle,
            candidate: None,
            accepted: None,
            unavailable_reason: None,
        }
    }

    /// Current session state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Active policy.
    pub fn config(&self) -> &DebounceConfig {
        &self.config
    }

    /// The accepted detection while `Locked`.
    pub fn accepted(&self) -> Option<&AcceptedDetection> {
        self.accepted.as_ref()
    }

    /// Best candidate so far as `(code, confidence)`.
    pub fn candidate(&self) -> Option<(&str, f64)> {
        self.candidate
            .as_ref()
            .map(|c| (c.code.as_str(), c.confidence))
    }

    /// Why the decoder is unavailable, while `Unavailable`.
    pub fn unavailable_reason(&self) -> Option<&str> {
        self.unavailable_reason.as_deref()
    }

    /// Decoder is ready: start evaluating reads.
    ///
    /// Returns false (and changes nothing) while `Locked`; the caller must
    /// `reset()` first so one physical scan never yields two detections.
    pub fn arm(&mut self) -> bool {
        match self.state {
            SessionState::Locked => false,
            SessionState::Armed => true,
            SessionState::Idle | SessionState::Unavailable => {
                self.clear();
                self.state = SessionState::Armed;
                true
            }
        }
    }

    /// Decoder failed to start. Terminal until `reset()` or a new `arm()`.
    pub fn mark_unavailable(&mut self, reason: impl Into<String>) {
        self.clear();
        self.state = SessionState::Unavailable;
        self.unavailable_reason = Some(reason.into());
    }

    /// "Scan again" or teardown: back to `Idle`, all tracking cleared.
    pub fn reset(&mut self) {
        self.clear();
        self.state = SessionState::Idle;
    }

    /// Evaluates one decode event.
    ///
    /// Returns the accepted detection on the `Armed → Locked` transition and
    /// `None` for every other event, including all events while not `Armed`.
    pub fn observe(&mut self, event: &DecodeEvent) -> Option<AcceptedDetection> {
        if !self.state.is_armed() || event.confidence < self.config.track_threshold {
            return None;
        }

        if let Some(candidate) = &self.candidate {
            let idle_ms = (event.timestamp - candidate.last_seen).num_milliseconds();
            if idle_ms > self.config.candidate_window_ms {
                self.candidate = None;
            }
        }

        match self.candidate.as_mut() {
            Some(candidate) if candidate.code == event.code => {
                candidate.confidence = candidate.confidence.max(event.confidence);
                candidate.hits += 1;
                candidate.last_seen = event.timestamp;
            }
            // Flip-flop to a weaker read
            Some(candidate) if event.confidence <= candidate.confidence => return None,
            _ => {
                self.candidate = Some(Candidate {
                    code: event.code.clone(),
                    confidence: event.confidence,
                    hits: 1,
                    last_seen: event.timestamp,
                });
            }
        }

        let hits = self.candidate.as_ref().map_or(0, |c| c.hits);
        if event.confidence < self.config.accept_threshold || hits < self.config.required_hits {
            return None;
        }

        let detection = AcceptedDetection {
            code: event.code.clone(),
            confidence: event.confidence,
        };
        self.candidate = None;
        self.accepted = Some(detection.clone());
        self.state = SessionState::Locked;
        Some(detection)
    }

    fn clear(&mut self) {
        self.candidate = None;
        self.accepted = None;
        self.unavailable_reason = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn armed(config: DebounceConfig) -> DetectionDebouncer {
        let mut debouncer = DetectionDebouncer::new(config);
        assert!(debouncer.arm());
        debouncer
    }

    #[test]
    fn test_locks_on_first_read_above_accept() {
        let mut debouncer = armed(DebounceConfig::default());

        assert_eq!(debouncer.observe(&DecodeEvent::new("X", 0.05)), None);
        assert_eq!(debouncer.candidate(), None);

        assert_eq!(debouncer.observe(&DecodeEvent::new("X", 0.3)), None);
        assert_eq!(debouncer.state(), SessionState::Armed);
        assert_eq!(debouncer.candidate(), Some(("X", 0.3)));

        let accepted = debouncer.observe(&DecodeEvent::new("X", 0.5));
        assert_eq!(
            accepted,
            Some(AcceptedDetection {
                code: "X".to_string(),
                confidence: 0.5
            })
        );
        assert_eq!(debouncer.state(), SessionState::Locked);
    }

    #[test]
    fn test_locked_ignores_everything_until_reset() {
        let mut debouncer = armed(DebounceConfig::default());
        debouncer.observe(&DecodeEvent::new("X", 0.5));

        assert_eq!(debouncer.observe(&DecodeEvent::new("Y", 0.9)), None);
        assert_eq!(debouncer.accepted().map(|d| d.code.as_str()), Some("X"));
        assert!(!debouncer.arm());

        debouncer.reset();
        assert_eq!(debouncer.state(), SessionState::Idle);
        assert_eq!(debouncer.accepted(), None);

        assert!(debouncer.arm());
        let accepted = debouncer.observe(&DecodeEvent::new("Y", 0.9));
        assert_eq!(accepted.map(|d| d.code), Some("Y".to_string()));
    }

    #[test]
    fn test_idle_ignores_events() {
        let mut debouncer = DetectionDebouncer::default();
        assert_eq!(debouncer.observe(&DecodeEvent::new("X", 0.99)), None);
        assert_eq!(debouncer.state(), SessionState::Idle);
    }

    #[test]
    fn test_weaker_different_code_is_dropped() {
        let mut debouncer = armed(DebounceConfig::default());

        debouncer.observe(&DecodeEvent::new("X", 0.3));
        debouncer.observe(&DecodeEvent::new("Y", 0.2));
        assert_eq!(debouncer.candidate(), Some(("X", 0.3)));

        // Equal confidence does not preempt either
        debouncer.observe(&DecodeEvent::new("Y", 0.3));
        assert_eq!(debouncer.candidate(), Some(("X", 0.3)));
    }

    #[test]
    fn test_stronger_different_code_replaces_and_may_lock() {
        let mut debouncer = armed(DebounceConfig::default());

        debouncer.observe(&DecodeEvent::new("X", 0.3));
        assert_eq!(debouncer.observe(&DecodeEvent::new("Y", 0.35)), None);
        assert_eq!(debouncer.candidate(), Some(("Y", 0.35)));

        let accepted = debouncer.observe(&DecodeEvent::new("Z", 0.7));
        assert_eq!(accepted.map(|d| d.code), Some("Z".to_string()));
    }

    #[test]
    fn test_same_code_keeps_max_confidence() {
        let mut debouncer = armed(DebounceConfig::default());

        debouncer.observe(&DecodeEvent::new("X", 0.35));
        debouncer.observe(&DecodeEvent::new("X", 0.2));
        assert_eq!(debouncer.candidate(), Some(("X", 0.35)));
    }

    #[test]
    fn test_required_hits() {
        let config = DebounceConfig {
            required_hits: 2,
            ..Default::default()
        };
        let mut debouncer = armed(config);

        assert_eq!(debouncer.observe(&DecodeEvent::new("X", 0.9)), None);
        let accepted = debouncer.observe(&DecodeEvent::new("X", 0.5));
        assert_eq!(accepted.map(|d| d.confidence), Some(0.5));
    }

    #[test]
    fn test_stale_candidate_is_discarded() {
        let mut debouncer = armed(DebounceConfig::default());
        let t0 = Utc::now();

        debouncer.observe(&DecodeEvent::at("X", 0.35, t0));
        debouncer.observe(&DecodeEvent::at("Y", 0.2, t0 + Duration::milliseconds(500)));
        assert_eq!(debouncer.candidate(), Some(("X", 0.35)));

        debouncer.observe(&DecodeEvent::at("Y", 0.2, t0 + Duration::seconds(3)));
        assert_eq!(debouncer.candidate(), Some(("Y", 0.2)));
    }

    #[test]
    fn test_strict_preset() {
        let mut debouncer = armed(DebounceConfig::strict());

        debouncer.observe(&DecodeEvent::new("X", 0.09));
        assert_eq!(debouncer.candidate(), None);
        assert_eq!(debouncer.observe(&DecodeEvent::new("X", 0.5)), None);
        assert!(debouncer.observe(&DecodeEvent::new("X", 0.6)).is_some());
    }

    #[test]
    fn test_unavailable() {
        let mut debouncer = DetectionDebouncer::default();
        debouncer.mark_unavailable("Permission denied");

        assert_eq!(debouncer.state(), SessionState::Unavailable);
        assert_eq!(debouncer.unavailable_reason(), Some("Permission denied"));
        assert_eq!(debouncer.observe(&DecodeEvent::new("X", 0.9)), None);

        // A new start attempt may succeed
        assert!(debouncer.arm());
        assert_eq!(debouncer.unavailable_reason(), None);
    }

    #[test]
    fn test_config_validation() {
        assert!(DebounceConfig::default().validate().is_ok());
        assert!(DebounceConfig::strict().validate().is_ok());

        let inverted = DebounceConfig {
            track_threshold: 0.5,
            accept_threshold: 0.4,
            ..Default::default()
        };
        assert!(inverted.validate().is_err());

        let out_of_range = DebounceConfig {
            accept_threshold: 1.5,
            ..Default::default()
        };
        assert!(out_of_range.validate().is_err());

        let no_hits = DebounceConfig {
            required_hits: 0,
            ..Default::default()
        };
        assert!(no_hits.validate().is_err());
    }
}
