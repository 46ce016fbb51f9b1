//! # Validation Module
//!
//! Code format policy for Scan Station.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Page (TypeScript)                                            │
//! │  └── Immediate feedback on the input box                               │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: BatchManager::add (Rust)                                     │
//! │  ├── THIS MODULE: trim, empty check, lexical policy                    │
//! │  └── Duplicate check (batch.rs)                                        │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Relocation backend                                           │
//! │  └── Record lookup per code (reported as Partial failures)             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use scanstation_core::validation::{validate_code, CodePolicy};
//!
//! let code = validate_code("  SAMPLE-001.A  ", CodePolicy::Alphanumeric, 128).unwrap();
//! assert_eq!(code, "SAMPLE-001.A");
//!
//! assert!(validate_code("12-34", CodePolicy::NumericOnly, 128).is_err());
//! ```

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Code Policy
// =============================================================================

/// Which characters a scanned code may contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodePolicy {
    /// ASCII letters, digits, `-` and `.`.
    #[default]
    Alphanumeric,

    /// ASCII digits only (EAN/UPC style labels).
    NumericOnly,
}

impl CodePolicy {
    /// Returns true if `c` is allowed by this policy.
    pub fn allows(&self, c: char) -> bool {
        match self {
            CodePolicy::Alphanumeric => c.is_ascii_alphanumeric() || c == '-' || c == '.',
            CodePolicy::NumericOnly => c.is_ascii_digit(),
        }
    }

    fn describe(&self) -> &'static str {
        match self {
            CodePolicy::Alphanumeric => "must contain only letters, numbers, hyphens, and dots",
            CodePolicy::NumericOnly => "must contain only digits",
        }
    }
}

impl std::fmt::Display for CodePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CodePolicy::Alphanumeric => write!(f, "alphanumeric"),
            CodePolicy::NumericOnly => write!(f, "numeric_only"),
        }
    }
}

impl std::str::FromStr for CodePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "alphanumeric" | "default" => Ok(CodePolicy::Alphanumeric),
            "numeric_only" | "numeric" | "digits" => Ok(CodePolicy::NumericOnly),
            other => Err(format!(
                "Unknown code policy: '{}'. Valid options: alphanumeric, numeric_only",
                other
            )),
        }
    }
}

// =============================================================================
// Validators
// =============================================================================

/// Validates a raw scanned or typed code.
///
/// ## Rules
/// - Surrounding whitespace is trimmed
/// - Must not be empty after trimming
/// - Must not exceed `max_len` characters
/// - Every character must be allowed by `policy`
///
/// ## Returns
/// The trimmed code.
pub fn validate_code(raw: &str, policy: CodePolicy, max_len: usize) -> ValidationResult<String> {
    let code = raw.trim();

    if code.is_empty() {
        return Err(ValidationError::EmptyInput);
    }

    if code.chars().count() > max_len {
        return Err(ValidationError::InvalidFormat {
            code: code.to_string(),
            reason: format!("must be at most {} characters", max_len),
        });
    }

    if !code.chars().all(|c| policy.allows(c)) {
        return Err(ValidationError::InvalidFormat {
            code: code.to_string(),
            reason: policy.describe().to_string(),
        });
    }

    Ok(code.to_string())
}

/// Normalizes an optional identifier: blank becomes `None`.
///
/// The page sends `""` for "no sublocation"; the core models it as absent.
pub fn non_blank(id: Option<&str>) -> Option<&str> {
    id.map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_code_alphanumeric() {
        assert_eq!(
            validate_code("SAMPLE-001", CodePolicy::Alphanumeric, 128).unwrap(),
            "SAMPLE-001"
        );
        assert_eq!(validate_code("a.b-c", CodePolicy::Alphanumeric, 128).unwrap(), "a.b-c");
        assert_eq!(validate_code("7", CodePolicy::Alphanumeric, 128).unwrap(), "7");

        assert!(validate_code("has space", CodePolicy::Alphanumeric, 128).is_err());
        assert!(validate_code("under_score", CodePolicy::Alphanumeric, 128).is_err());
        assert!(validate_code("slash/1", CodePolicy::Alphanumeric, 128).is_err());
    }

    #[test]
    fn test_validate_code_trims() {
        assert_eq!(
            validate_code("\t 12345 \n", CodePolicy::NumericOnly, 128).unwrap(),
            "12345"
        );
    }

    #[test]
    fn test_validate_code_empty() {
        assert_eq!(
            validate_code("", CodePolicy::Alphanumeric, 128),
            Err(ValidationError::EmptyInput)
        );
        assert_eq!(
            validate_code("   ", CodePolicy::NumericOnly, 128),
            Err(ValidationError::EmptyInput)
        );
    }

    #[test]
    fn test_validate_code_numeric_only() {
        assert!(validate_code("0123456789", CodePolicy::NumericOnly, 128).is_ok());
        assert!(matches!(
            validate_code("ABC123", CodePolicy::NumericOnly, 128),
            Err(ValidationError::InvalidFormat { .. })
        ));
    }

    #[test]
    fn test_validate_code_too_long() {
        assert!(validate_code(&"9".repeat(8), CodePolicy::NumericOnly, 8).is_ok());
        assert!(matches!(
            validate_code(&"9".repeat(9), CodePolicy::NumericOnly, 8),
            Err(ValidationError::InvalidFormat { .. })
        ));
    }

    #[test]
    fn test_code_policy_parsing() {
        assert_eq!("alphanumeric".parse::<CodePolicy>().unwrap(), CodePolicy::Alphanumeric);
        assert_eq!("NUMERIC".parse::<CodePolicy>().unwrap(), CodePolicy::NumericOnly);
        assert!("hex".parse::<CodePolicy>().is_err());
    }

    #[test]
    fn test_non_blank() {
        assert_eq!(non_blank(Some("sub1")), Some("sub1"));
        assert_eq!(non_blank(Some("  ")), None);
        assert_eq!(non_blank(None), None);
    }
}
