//! Result and error types for storefront workflows.
//!
//! Structural failures (locator resolution, setup, navigation) are hard
//! errors. Text extraction problems travel as [`ExtractionMismatch`] so that
//! callers can downgrade them to soft assertion failures.

use thiserror::Error;

use crate::assertion::SoftAssertionError;

/// Result type for storefront operations
pub type StorefrontResult<T> = Result<T, StorefrontError>;

/// A textual read did not match the pattern expected for its field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("could not extract {field} from {text:?}")]
pub struct ExtractionMismatch {
    /// Which value was being read (e.g. "order id")
    pub field: &'static str,
    /// The text as rendered
    pub text: String,
}

impl ExtractionMismatch {
    /// Create a new mismatch record
    #[must_use]
    pub fn new(field: &'static str, text: impl Into<String>) -> Self {
        Self {
            field,
            text: text.into(),
        }
    }
}

/// Errors that can occur while driving the storefront
#[derive(Debug, Error)]
pub enum StorefrontError {
    /// A page family does not declare the requested key
    #[error("{family} page has no locator for {key}")]
    LocatorResolution {
        /// Page family name
        family: &'static str,
        /// Requested key
        key: String,
    },

    /// A registry was used against a surface it was not bound to
    #[error("{family} locators are bound to surface {bound}, not {active}")]
    StaleSurface {
        /// Page family name
        family: &'static str,
        /// Surface the registry was built for
        bound: String,
        /// Surface the operation ran on
        active: String,
    },

    /// A strict locator matched more than one element for an action
    #[error("{locator} matched {count} elements, expected exactly one")]
    AmbiguousMatch {
        /// Locator description
        locator: String,
        /// Number of matches
        count: usize,
    },

    /// No element matched an action target
    #[error("no element matches {locator}")]
    ElementNotFound {
        /// Locator description
        locator: String,
    },

    /// A synchronization primitive did not observe its condition in time
    #[error("timed out after {timeout_ms}ms waiting for {waited_for} (last observed: {last_observed})")]
    WaitTimeout {
        /// Description of the condition
        waited_for: String,
        /// Timeout that elapsed
        timeout_ms: u64,
        /// Last observation made before giving up
        last_observed: String,
    },

    /// Cart clearing could not reach zero items
    #[error("cart did not converge: {last_observed} item(s) left after {elapsed_ms}ms ({removals} removal(s) done)")]
    ConvergenceTimeout {
        /// Last observed line-item count
        last_observed: usize,
        /// Time spent in the convergence loop
        elapsed_ms: u64,
        /// Removals that were confirmed before the failure
        removals: usize,
    },

    /// A text read did not match its pattern
    #[error(transparent)]
    ParseExtraction(#[from] ExtractionMismatch),

    /// A typed input record failed structural validation
    #[error("invalid {record}: {field} must not be empty")]
    InvalidInput {
        /// Record type
        record: &'static str,
        /// Offending field
        field: &'static str,
    },

    /// A precondition workflow failed; nothing may proceed on this surface
    #[error("setup failed during {stage}: {source}")]
    SetupFailed {
        /// Stage of the setup workflow
        stage: &'static str,
        /// Underlying failure
        #[source]
        source: Box<StorefrontError>,
    },

    /// The driver reported a failure
    #[error("driver error: {message}")]
    Driver {
        /// Error message
        message: String,
    },

    /// Navigation error
    #[error("navigation to {url} failed: {message}")]
    Navigation {
        /// URL that failed
        url: String,
        /// Error message
        message: String,
    },

    /// Configuration could not be loaded
    #[error("configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// Collected soft assertion failures
    #[error(transparent)]
    SoftAssertions(#[from] SoftAssertionError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

impl StorefrontError {
    /// Wrap an error as a fatal setup failure
    #[must_use]
    pub fn setup(stage: &'static str, source: Self) -> Self {
        Self::SetupFailed {
            stage,
            source: Box::new(source),
        }
    }

    /// Build a driver error from any displayable cause
    pub fn driver(message: impl std::fmt::Display) -> Self {
        Self::Driver {
            message: message.to_string(),
        }
    }

    /// Whether this failure must abort the remainder of a scenario
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        !matches!(self, Self::ParseExtraction(_) | Self::SoftAssertions(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wait_timeout_message_names_condition() {
        let err = StorefrontError::WaitTimeout {
            waited_for: "#logInModal to be hidden".to_string(),
            timeout_ms: 250,
            last_observed: "visible".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("#logInModal"));
        assert!(msg.contains("250ms"));
    }

    #[test]
    fn test_setup_failure_keeps_source() {
        let inner = StorefrontError::ElementNotFound {
            locator: "a#login2".to_string(),
        };
        let err = StorefrontError::setup("login", inner);
        assert!(err.to_string().contains("login"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_extraction_is_not_fatal() {
        let err: StorefrontError = ExtractionMismatch::new("order id", "Amount: 5").into();
        assert!(!err.is_fatal());
        assert!(StorefrontError::ConvergenceTimeout {
            last_observed: 2,
            elapsed_ms: 10,
            removals: 0,
        }
        .is_fatal());
    }
}
