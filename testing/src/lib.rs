//! # Sponsorlink Testing
//!
//! Testing utilities and helpers for the collaboration lifecycle.
//!
//! This crate provides:
//! - Deterministic clocks ([`FixedClock`], [`ManualClock`])
//! - In-memory implementations of every environment trait, with failure
//!   injection where a test needs a dependency to break
//! - The [`ReducerTest`] Given-When-Then harness
//! - Fixtures for posts, requests, and reviews
//!
//! ## Example
//!
//! ```ignore
//! use sponsorlink_testing::{InMemoryCollaborationStore, ManualClock, RecordingNotificationSink};
//!
//! #[tokio::test]
//! async fn accept_flow() {
//!     let store = Arc::new(InMemoryCollaborationStore::new());
//!     let sink = Arc::new(RecordingNotificationSink::new());
//!     let service = CollaborationService::new(store, posts, sink.clone(), Arc::new(ManualClock::default()));
//!
//!     let id = service.create_request(&requester, input).await.into_value().unwrap();
//!     assert!(service.accept(&id, &receiver).await.success);
//!     assert_eq!(sink.sent().len(), 2);
//! }
//! ```

use chrono::{DateTime, Utc};
use sponsorlink_core::environment::Clock;

mod in_memory;

/// Deterministic clocks.
pub mod mocks {
    use super::{Clock, DateTime, Utc};
    use chrono::{Duration, NaiveDate};
    use std::sync::RwLock;

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use sponsorlink_testing::mocks::FixedClock;
    /// use sponsorlink_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// let time1 = clock.now();
    /// let time2 = clock.now();
    /// assert_eq!(time1, time2); // Always the same!
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Clock a test moves by hand, for crossing days in deadline scenarios.
    ///
    /// # Example
    ///
    /// ```
    /// use sponsorlink_testing::mocks::ManualClock;
    /// use sponsorlink_core::environment::Clock;
    /// use chrono::Duration;
    ///
    /// let clock = ManualClock::default();
    /// let before = clock.today();
    /// clock.advance(Duration::days(4));
    /// assert_eq!((clock.today() - before).num_days(), 4);
    /// ```
    #[derive(Debug)]
    pub struct ManualClock {
        time: RwLock<DateTime<Utc>>,
    }

    impl ManualClock {
        /// Start the clock at `time`.
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self {
                time: RwLock::new(time),
            }
        }

        /// Start the clock at noon UTC on `date`.
        #[must_use]
        pub fn on_date(date: NaiveDate) -> Self {
            Self::new(date.and_hms_opt(12, 0, 0).unwrap_or_default().and_utc())
        }

        /// Jump to `time`.
        #[allow(clippy::unwrap_used)] // Test helper
        pub fn set(&self, time: DateTime<Utc>) {
            *self.time.write().unwrap() = time;
        }

        /// Move forward by `by`.
        #[allow(clippy::unwrap_used)] // Test helper
        pub fn advance(&self, by: Duration) {
            let mut time = self.time.write().unwrap();
            *time += by;
        }
    }

    impl Default for ManualClock {
        fn default() -> Self {
            Self::new(test_clock().now())
        }
    }

    impl Clock for ManualClock {
        #[allow(clippy::unwrap_used)] // Test helper
        fn now(&self) -> DateTime<Utc> {
            *self.time.read().unwrap()
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }
}

/// Fixtures for common test scenarios.
pub mod fixtures {
    use super::{DateTime, Utc};
    use chrono::NaiveDate;
    use sponsorlink_core::ids::{CollaborationId, PostId, UserId};
    use sponsorlink_core::types::{
        CollaborationDraft, CollaborationRequest, NewCollaborationRequest, PostSummary, Review,
    };

    /// A club account that sends requests.
    #[must_use]
    pub fn club() -> UserId {
        UserId::new("u1")
    }

    /// An enterprise account that owns demand posts.
    #[must_use]
    pub fn sponsor() -> UserId {
        UserId::new("u2")
    }

    /// Post `p1`, authored by [`sponsor`], ending on `end_date`.
    #[must_use]
    pub fn post(end_date: Option<NaiveDate>) -> PostSummary {
        PostSummary {
            post_id: PostId::new("p1"),
            author_id: sponsor(),
            title: "Campus hackathon sponsorship".to_string(),
            end_date,
        }
    }

    /// Creation input for [`club`] requesting post `p1` from [`sponsor`].
    #[must_use]
    pub fn new_request() -> NewCollaborationRequest {
        NewCollaborationRequest {
            post_id: PostId::new("p1"),
            post_title: "Campus hackathon sponsorship".to_string(),
            requester_id: club(),
            receiver_id: sponsor(),
            message: "interested".to_string(),
        }
    }

    /// A pending record as the store would return it.
    #[must_use]
    pub fn pending_request(id: &str, created_at: DateTime<Utc>) -> CollaborationRequest {
        CollaborationRequest::from_draft(
            CollaborationId::new(id),
            CollaborationDraft {
                post_id: PostId::new("p1"),
                post_title: "Campus hackathon sponsorship".to_string(),
                requester_id: club(),
                receiver_id: sponsor(),
                message: "interested".to_string(),
                end_date: None,
                created_at,
            },
        )
    }

    /// A valid review with the given scores and comment.
    #[must_use]
    pub fn review(scores: [u8; 4], comment: &str, timestamp: DateTime<Utc>) -> Review {
        let [professional_skill, communication, attitude, satisfaction] = scores;
        Review {
            professional_skill,
            communication,
            attitude,
            satisfaction,
            comment: comment.to_string(),
            is_anonymous: false,
            timestamp,
        }
    }
}

/// Property-based testing strategies using proptest.
pub mod properties {
    use super::{DateTime, Utc};
    use proptest::prelude::*;
    use sponsorlink_core::types::{RATING_RANGE, Review};

    /// Any score, valid or not.
    pub fn any_score() -> impl Strategy<Value = u8> {
        any::<u8>()
    }

    /// A score within the accepted rating range.
    pub fn valid_score() -> impl Strategy<Value = u8> {
        RATING_RANGE
    }

    /// A review that passes validation.
    pub fn valid_review(timestamp: DateTime<Utc>) -> impl Strategy<Value = Review> {
        (
            valid_score(),
            valid_score(),
            valid_score(),
            valid_score(),
            "[A-Za-z][A-Za-z ]{0,40}",
            any::<bool>(),
        )
            .prop_map(
                move |(professional_skill, communication, attitude, satisfaction, comment, is_anonymous)| {
                    Review {
                        professional_skill,
                        communication,
                        attitude,
                        satisfaction,
                        comment,
                        is_anonymous,
                        timestamp,
                    }
                },
            )
    }
}

// Re-export commonly used items
pub use in_memory::{
    InMemoryCollaborationStore, InMemoryDeadlineLedger, InMemoryPostDirectory,
    RecordingNotificationSink,
};
pub use mocks::{FixedClock, ManualClock, test_clock};
pub use reducer_test::{ReducerTest, assertions};
