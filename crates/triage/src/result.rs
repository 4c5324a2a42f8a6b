//! Result and error types for Triage.
//!
//! Every failure carries enough context to be reported on its own: the
//! descriptor name, the attempted action and, for timeouts, the bound and
//! the last reason the target was not ready.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for Triage operations
pub type TriageResult<T> = Result<T, TriageError>;

/// Errors that can occur while driving a UI surface
#[derive(Debug, Error)]
pub enum TriageError {
    /// Descriptor resolved to no element with any strategy
    #[error("Element not found: {descriptor}")]
    NotFound {
        /// Semantic name of the descriptor
        descriptor: String,
    },

    /// Descriptor resolved to more than one element where one was required
    #[error("Ambiguous element: {descriptor} matched {count} elements")]
    Ambiguous {
        /// Semantic name of the descriptor
        descriptor: String,
        /// Number of elements the winning strategy matched
        count: usize,
    },

    /// A bounded wait elapsed
    #[error("Timed out after {timeout_ms}ms waiting to {action} {target}: {last}")]
    Timeout {
        /// Attempted action (e.g. "click", "navigate")
        action: String,
        /// Descriptor name or location
        target: String,
        /// Bound that elapsed
        timeout_ms: u64,
        /// Last observed reason the target was not ready
        last: String,
    },

    /// Target resolved but can never receive this action
    #[error("Cannot {action} {target}: {reason}")]
    NotActionable {
        /// Attempted action
        action: String,
        /// Descriptor name
        target: String,
        /// Why the element cannot receive the action
        reason: String,
    },

    /// Observed end state did not match expectation
    #[error("Assertion failed: {message}")]
    AssertionFailed {
        /// Error message
        message: String,
    },

    /// Optional screen was detected but its own required actions failed
    #[error("Unexpected screen {screen}: {source}")]
    UnexpectedScreen {
        /// Interstitial name
        screen: String,
        /// Failure raised while completing the screen
        #[source]
        source: Box<TriageError>,
    },

    /// Browser or surface backend failure
    #[error("Driver error: {message}")]
    Driver {
        /// Error message
        message: String,
    },

    /// Navigation error
    #[error("Navigation to {url} failed: {message}")]
    Navigation {
        /// URL that failed
        url: String,
        /// Error message
        message: String,
    },

    /// Screenshot error
    #[error("Screenshot failed: {message}")]
    Screenshot {
        /// Error message
        message: String,
    },

    /// Invalid configuration or fixture input
    #[error("Invalid configuration: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Taxonomy kind reported for a failed step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// No element matched
    NotFound,
    /// More than one element matched
    Ambiguous,
    /// A bounded wait elapsed
    Timeout,
    /// Element can never receive the action
    NotActionable,
    /// End state mismatch
    AssertionFailed,
    /// Optional screen present but unresolvable
    UnexpectedScreen,
    /// Backend, IO or configuration failure
    Infrastructure,
    /// Scenario cancelled by the run-level deadline
    Aborted,
}

impl ErrorKind {
    /// Stable label used in reports
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotFound => "NotFound",
            Self::Ambiguous => "Ambiguous",
            Self::Timeout => "Timeout",
            Self::NotActionable => "NotActionable",
            Self::AssertionFailed => "AssertionFailed",
            Self::UnexpectedScreen => "UnexpectedScreen",
            Self::Infrastructure => "Infrastructure",
            Self::Aborted => "Aborted",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TriageError {
    /// Classify this error for reporting
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Ambiguous { .. } => ErrorKind::Ambiguous,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::NotActionable { .. } => ErrorKind::NotActionable,
            Self::AssertionFailed { .. } => ErrorKind::AssertionFailed,
            Self::UnexpectedScreen { .. } => ErrorKind::UnexpectedScreen,
            Self::Driver { .. }
            | Self::Navigation { .. }
            | Self::Screenshot { .. }
            | Self::Config { .. }
            | Self::Io(_)
            | Self::Json(_) => ErrorKind::Infrastructure,
        }
    }

    /// Build an assertion failure
    #[must_use]
    pub fn assertion(message: impl Into<String>) -> Self {
        Self::AssertionFailed {
            message: message.into(),
        }
    }

    /// Build a driver failure
    #[must_use]
    pub fn driver(message: impl Into<String>) -> Self {
        Self::Driver {
            message: message.into(),
        }
    }

    /// Build a timeout failure
    #[must_use]
    pub fn timeout(
        action: impl Into<String>,
        target: impl Into<String>,
        timeout_ms: u64,
        last: impl Into<String>,
    ) -> Self {
        Self::Timeout {
            action: action.into(),
            target: target.into(),
            timeout_ms,
            last: last.into(),
        }
    }

    /// Whether this is a `Timeout`
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    mod display_tests {
        use super::*;

        #[test]
        fn test_timeout_names_action_and_target() {
            let err = TriageError::timeout("click", "Log In button", 5000, "element is disabled");
            let msg = err.to_string();
            assert!(msg.contains("5000ms"));
            assert!(msg.contains("click Log In button"));
            assert!(msg.contains("disabled"));
        }

        #[test]
        fn test_ambiguous_reports_count() {
            let err = TriageError::Ambiguous {
                descriptor: "row".into(),
                count: 3,
            };
            assert_eq!(err.to_string(), "Ambiguous element: row matched 3 elements");
        }

        #[test]
        fn test_unexpected_screen_wraps_source() {
            let inner = TriageError::timeout("click", "Confirm button", 10, "hidden");
            let err = TriageError::UnexpectedScreen {
                screen: "location selection".into(),
                source: Box::new(inner),
            };
            assert!(err.to_string().contains("location selection"));
            let source = std::error::Error::source(&err).unwrap();
            assert!(source.to_string().contains("Confirm button"));
        }
    }

    mod kind_tests {
        use super::*;

        #[test]
        fn test_taxonomy_kinds() {
            assert_eq!(
                TriageError::NotFound {
                    descriptor: "x".into()
                }
                .kind(),
                ErrorKind::NotFound
            );
            assert_eq!(TriageError::assertion("x").kind(), ErrorKind::AssertionFailed);
            assert_eq!(TriageError::driver("x").kind(), ErrorKind::Infrastructure);
            assert!(TriageError::timeout("a", "b", 1, "c").is_timeout());
        }

        #[test]
        fn test_io_error_is_infrastructure() {
            let err: TriageError = std::io::Error::other("disk").into();
            assert_eq!(err.kind(), ErrorKind::Infrastructure);
        }

        #[test]
        fn test_kind_serializes_snake_case() {
            let json = serde_json::to_string(&ErrorKind::NotActionable).unwrap();
            assert_eq!(json, "\"not_actionable\"");
            assert_eq!(ErrorKind::NotActionable.to_string(), "NotActionable");
        }
    }
}
