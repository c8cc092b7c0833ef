//! Structured result envelope returned across the service boundary.
//!
//! Operations never propagate errors to their callers. They return an
//! [`Outcome`] that UI handlers branch on.

use crate::error::{CollaborationError, ErrorKind};
use serde::{Deserialize, Serialize};

/// `{ success, value?, error?, errorKind? }`
///
/// # Examples
///
/// ```
/// use sponsorlink_core::error::{CollaborationError, ErrorKind};
/// use sponsorlink_core::outcome::Outcome;
///
/// let failed: Outcome<()> = Err(CollaborationError::Validation("reason is required".into())).into();
/// assert!(!failed.success);
/// assert_eq!(failed.error_kind, Some(ErrorKind::ValidationError));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Outcome<T> {
    /// Whether the operation succeeded
    pub success: bool,
    /// Result value on success
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<T>,
    /// Human-readable error on failure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Taxonomy entry on failure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
}

impl<T> Outcome<T> {
    /// Successful outcome carrying `value`.
    pub const fn ok(value: T) -> Self {
        Self {
            success: true,
            value: Some(value),
            error: None,
            error_kind: None,
        }
    }

    /// Failed outcome describing `error`.
    #[must_use]
    pub fn failed(error: &CollaborationError) -> Self {
        Self {
            success: false,
            value: None,
            error: Some(error.to_string()),
            error_kind: Some(error.kind()),
        }
    }

    /// Whether the operation failed with `kind`.
    #[must_use]
    pub fn is_kind(&self, kind: ErrorKind) -> bool {
        self.error_kind == Some(kind)
    }

    /// Consume the outcome, keeping only the value.
    pub fn into_value(self) -> Option<T> {
        self.value
    }
}

impl<T> From<Result<T, CollaborationError>> for Outcome<T> {
    fn from(result: Result<T, CollaborationError>) -> Self {
        match result {
            Ok(value) => Self::ok(value),
            Err(error) => Self::failed(&error),
        }
    }
}
