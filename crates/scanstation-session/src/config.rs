//! # Scan Station Configuration
//!
//! Configuration for the scan-session controller.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     SCANSTATION_ACCEPT_THRESHOLD=0.6                                   │
//! │     SCANSTATION_CODE_POLICY=numeric_only                               │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/scanstation/scanstation.toml (Linux)                     │
//! │     ~/Library/Application Support/com.scanstation.scanstation/         │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     0.08 / 0.40 thresholds, alphanumeric codes, 1500 ms auto-commit    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # scanstation.toml
//! [debounce]
//! track_threshold = 0.08
//! accept_threshold = 0.40
//! required_hits = 1
//! candidate_window_ms = 2000
//!
//! [batch]
//! code_policy = "alphanumeric"  # alphanumeric | numeric_only
//! max_code_length = 128
//!
//! [session]
//! decoder_start_timeout_secs = 10
//! auto_commit_delay_ms = 1500  # 0 = wait for the operator
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

use scanstation_core::{BatchManager, CodePolicy, CoreError, DebounceConfig, MAX_CODE_LENGTH};

use crate::error::{SessionError, SessionResult};

// =============================================================================
// Batch Settings
// =============================================================================

/// What the batch accepts as a code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchSettings {
    /// Allowed characters.
    #[serde(default)]
    pub code_policy: CodePolicy,

    /// Longest accepted code after trimming.
    #[serde(default = "default_max_code_length")]
    pub max_code_length: usize,
}

fn default_max_code_length() -> usize {
    MAX_CODE_LENGTH
}

impl Default for BatchSettings {
    fn default() -> Self {
        BatchSettings {
            code_policy: CodePolicy::default(),
            max_code_length: default_max_code_length(),
        }
    }
}

// =============================================================================
// Session Settings
// =============================================================================

/// Camera session timing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSettings {
    /// How long a decoder start may take before the session is declared
    /// unavailable (seconds).
    #[serde(default = "default_decoder_start_timeout")]
    pub decoder_start_timeout_secs: u64,

    /// Delay before an accepted detection is added on its own
    /// (milliseconds). 0 waits for an explicit commit.
    #[serde(default = "default_auto_commit_delay")]
    pub auto_commit_delay_ms: u64,
}

fn default_decoder_start_timeout() -> u64 {
    10
}

fn default_auto_commit_delay() -> u64 {
    1_500
}

impl Default for SessionSettings {
    fn default() -> Self {
        SessionSettings {
            decoder_start_timeout_secs: default_decoder_start_timeout(),
            auto_commit_delay_ms: default_auto_commit_delay(),
        }
    }
}

// =============================================================================
// Main Configuration
// =============================================================================

/// Complete scan station configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Detection debounce policy.
    #[serde(default)]
    pub debounce: DebounceConfig,

    /// Code acceptance rules.
    #[serde(default)]
    pub batch: BatchSettings,

    /// Camera session timing.
    #[serde(default)]
    pub session: SessionSettings,
}

impl ScanConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (scanstation.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> SessionResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading scan config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load scan config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> SessionResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| SessionError::ConfigSaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| SessionError::ConfigSaveFailed(e.to_string()))?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents).map_err(|e| SessionError::ConfigSaveFailed(e.to_string()))?;

        info!(?path, "Scan config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> SessionResult<()> {
        self.debounce.validate().map_err(|e| match e {
            CoreError::InvalidConfig(reason) => SessionError::InvalidConfig(reason),
            other => SessionError::Core(other),
        })?;

        if self.batch.max_code_length == 0 {
            return Err(SessionError::InvalidConfig(
                "max_code_length must be greater than 0".into(),
            ));
        }

        if self.session.decoder_start_timeout_secs == 0 {
            return Err(SessionError::InvalidConfig(
                "decoder_start_timeout_secs must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Some(v) = env_parse::<f64>("SCANSTATION_TRACK_THRESHOLD") {
            debug!(track_threshold = v, "Overriding track threshold from environment");
            self.debounce.track_threshold = v;
        }

        if let Some(v) = env_parse::<f64>("SCANSTATION_ACCEPT_THRESHOLD") {
            debug!(accept_threshold = v, "Overriding accept threshold from environment");
            self.debounce.accept_threshold = v;
        }

        if let Some(v) = env_parse::<u32>("SCANSTATION_REQUIRED_HITS") {
            self.debounce.required_hits = v;
        }

        if let Ok(policy) = std::env::var("SCANSTATION_CODE_POLICY") {
            match policy.parse() {
                Ok(parsed) => {
                    debug!(policy = %policy, "Overriding code policy from environment");
                    self.batch.code_policy = parsed;
                }
                Err(_) => warn!(policy = %policy, "Unknown code policy in environment"),
            }
        }

        if let Some(v) = env_parse::<u64>("SCANSTATION_AUTO_COMMIT_MS") {
            self.session.auto_commit_delay_ms = v;
        }

        if let Some(v) = env_parse::<u64>("SCANSTATION_DECODER_TIMEOUT_SECS") {
            self.session.decoder_start_timeout_secs = v;
        }
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "scanstation", "scanstation")
            .map(|dirs| dirs.config_dir().join("scanstation.toml"))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    /// An empty batch configured with these rules.
    pub fn new_batch(&self) -> BatchManager {
        BatchManager::new(self.batch.code_policy, self.batch.max_code_length)
    }

    pub fn decoder_start_timeout(&self) -> Duration {
        Duration::from_secs(self.session.decoder_start_timeout_secs)
    }

    /// `None` when detections wait for an explicit commit.
    pub fn auto_commit_delay(&self) -> Option<Duration> {
        match self.session.auto_commit_delay_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    let raw = std::env::var(name).ok()?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!(name, value = %raw, "Ignoring unparsable environment override");
            None
        }
    }
}
