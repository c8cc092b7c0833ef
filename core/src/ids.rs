//! Strongly typed identifiers for collaborations, posts, and users.
//!
//! All identifiers are opaque strings assigned by external systems (the
//! document store assigns collaboration ids, the post service assigns post
//! ids, the session service assigns user ids). Wrapping them keeps a
//! `requester_id` from being passed where a `post_id` is expected.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error type for identifier parsing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid {kind} identifier: empty string")]
pub struct ParseIdError {
    kind: &'static str,
}

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            #[doc = concat!("Create a new ", $kind, " identifier without validation.")]
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Borrow the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Whether the identifier is the empty string.
            #[must_use]
            pub fn is_empty(&self) -> bool {
                self.0.trim().is_empty()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl FromStr for $name {
            type Err = ParseIdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                if s.trim().is_empty() {
                    return Err(ParseIdError { kind: $kind });
                }
                Ok(Self(s.to_string()))
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self::new(s)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id!(
    /// Identifier of a collaboration request, assigned by the store on creation.
    ///
    /// # Examples
    ///
    /// ```
    /// use sponsorlink_core::ids::CollaborationId;
    ///
    /// let id = CollaborationId::new("collab-1");
    /// assert_eq!(id.as_str(), "collab-1");
    /// assert!("".parse::<CollaborationId>().is_err());
    /// ```
    CollaborationId,
    "collaboration"
);

string_id!(
    /// Identifier of a demand post owned by the post service.
    PostId,
    "post"
);

string_id!(
    /// Identifier of a user (club or enterprise account).
    UserId,
    "user"
);
