//! Integration tests for `CollaborationService`
//!
//! Drives the service against the in-memory doubles from `sponsorlink-testing`
//! and checks both the returned outcomes and what was persisted and sent.

#![allow(clippy::unwrap_used, clippy::expect_used)] // Test code can use unwrap/expect

use chrono::{Duration, NaiveDate};
use sponsorlink_core::{
    CollaborationId, CollaborationStatus, ErrorKind, NewCollaborationRequest, NotificationKind,
    Outcome, PostId, UserId,
};
use sponsorlink_runtime::CollaborationService;
use sponsorlink_testing::fixtures::{club, new_request, post, review, sponsor};
use sponsorlink_testing::{
    InMemoryCollaborationStore, InMemoryPostDirectory, ManualClock, RecordingNotificationSink,
};
use sponsorlink_core::environment::Clock;
use std::sync::Arc;

// ============================================================================
// Test Fixtures
// ============================================================================

struct Harness {
    service: CollaborationService,
    store: Arc<InMemoryCollaborationStore>,
    posts: Arc<InMemoryPostDirectory>,
    sink: Arc<RecordingNotificationSink>,
    clock: Arc<ManualClock>,
}

fn harness() -> Harness {
    let store = Arc::new(InMemoryCollaborationStore::new());
    let posts = Arc::new(InMemoryPostDirectory::with_posts([post(NaiveDate::from_ymd_opt(
        2025, 3, 1,
    ))]));
    let sink = Arc::new(RecordingNotificationSink::new());
    let clock = Arc::new(ManualClock::default());
    let service = CollaborationService::new(store.clone(), posts.clone(), sink.clone(), clock.clone());
    Harness {
        service,
        store,
        posts,
        sink,
        clock,
    }
}

impl Harness {
    async fn create(&self) -> CollaborationId {
        let outcome = self.service.create_request(&club(), new_request()).await;
        assert!(outcome.success, "create failed: {:?}", outcome.error);
        outcome.into_value().unwrap()
    }

    async fn accepted(&self) -> CollaborationId {
        let id = self.create().await;
        assert!(self.service.accept(&id, &sponsor()).await.success);
        id
    }

    fn status(&self, id: &CollaborationId) -> CollaborationStatus {
        self.store.record(id).unwrap().status()
    }
}

fn assert_failed<T: std::fmt::Debug>(outcome: &Outcome<T>, kind: ErrorKind) {
    assert!(!outcome.success, "expected failure, got {outcome:?}");
    assert_eq!(outcome.error_kind, Some(kind), "{outcome:?}");
    assert!(outcome.value.is_none());
}

// ============================================================================
// Creation
// ============================================================================

#[tokio::test]
async fn scenario_a_create_then_accept() {
    let h = harness();

    let id = h.create().await;
    assert_eq!(h.status(&id), CollaborationStatus::Pending);

    let notes = h.sink.sent_to(&sponsor());
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].event_type, NotificationKind::RequestCreated);
    assert_eq!(notes[0].collaboration_id, id);

    let accepted = h.service.accept(&id, &sponsor()).await;
    assert!(accepted.success);
    assert_eq!(accepted.value.unwrap().status(), CollaborationStatus::Accepted);
    assert_eq!(h.status(&id), CollaborationStatus::Accepted);

    let to_club = h.sink.sent_to(&club());
    assert_eq!(to_club.len(), 1);
    assert_eq!(to_club[0].event_type, NotificationKind::Accepted);
}

#[tokio::test]
async fn scenario_b_duplicate_pending_request_is_rejected() {
    let h = harness();
    h.create().await;

    let second = h.service.create_request(&club(), new_request()).await;

    assert_failed(&second, ErrorKind::ValidationError);
    assert!(second.error.unwrap().contains("duplicate request"));
    assert_eq!(h.store.len(), 1);
}

#[tokio::test]
async fn resubmission_is_allowed_after_rejection() {
    let h = harness();
    let id = h.create().await;
    assert!(h.service.reject(&id, &sponsor(), "not this term").await.success);

    let again = h.service.create_request(&club(), new_request()).await;

    assert!(again.success);
    assert_eq!(h.store.len(), 2);
}

#[tokio::test]
async fn create_round_trips_through_the_store() {
    let h = harness();
    let id = h.create().await;

    let record = h.service.get(&id).await.into_value().unwrap();
    let input = new_request();
    assert_eq!(record.post_id, input.post_id);
    assert_eq!(record.requester_id, input.requester_id);
    assert_eq!(record.receiver_id, input.receiver_id);
    assert_eq!(record.message, input.message);
    assert_eq!(record.created_at, h.clock.now());
    assert_eq!(record.updated_at, record.created_at);
    assert_eq!(record.end_date, NaiveDate::from_ymd_opt(2025, 3, 1));
}

#[tokio::test]
async fn creation_checks_identity_before_the_post() {
    let h = harness();
    let mut input = new_request();
    input.post_id = PostId::new("missing");

    let outcome = h.service.create_request(&UserId::new("intruder"), input).await;

    assert_failed(&outcome, ErrorKind::AuthorizationError);
    assert!(outcome.error.unwrap().contains("identity mismatch"));
}

#[tokio::test]
async fn creation_requires_an_existing_post() {
    let h = harness();
    let input = NewCollaborationRequest {
        post_id: PostId::new("missing"),
        ..new_request()
    };

    let outcome = h.service.create_request(&club(), input).await;

    assert_failed(&outcome, ErrorKind::NotFoundError);
    assert!(outcome.error.unwrap().contains("post not found"));
    assert!(h.sink.sent().is_empty());
}

#[tokio::test]
async fn receiver_and_title_are_filled_from_the_post() {
    let h = harness();
    let input = NewCollaborationRequest {
        receiver_id: UserId::new(""),
        post_title: String::new(),
        ..new_request()
    };

    let id = h.service.create_request(&club(), input).await.into_value().unwrap();

    let record = h.store.record(&id).unwrap();
    assert_eq!(record.receiver_id, sponsor());
    assert_eq!(record.post_title, post(None).title);
}

#[tokio::test]
async fn receiver_must_be_the_post_author() {
    let h = harness();
    let input = NewCollaborationRequest {
        receiver_id: UserId::new("someone-else"),
        ..new_request()
    };

    let outcome = h.service.create_request(&club(), input).await;

    assert_failed(&outcome, ErrorKind::ValidationError);
}

#[tokio::test]
async fn author_cannot_request_own_post() {
    let h = harness();
    let input = NewCollaborationRequest {
        requester_id: sponsor(),
        ..new_request()
    };

    let outcome = h.service.create_request(&sponsor(), input).await;

    assert_failed(&outcome, ErrorKind::ValidationError);
    assert!(outcome.error.unwrap().contains("own post"));
}

#[tokio::test]
async fn post_service_failure_is_a_dependency_error() {
    let h = harness();
    h.posts.fail(true);

    let outcome = h.service.create_request(&club(), new_request()).await;

    assert_failed(&outcome, ErrorKind::DependencyError);
    assert!(h.store.is_empty());
}

// ============================================================================
// Transitions
// ============================================================================

#[tokio::test]
async fn accept_twice_fails_the_second_time() {
    let h = harness();
    let id = h.accepted().await;

    let again = h.service.accept(&id, &sponsor()).await;

    assert_failed(&again, ErrorKind::InvalidStateTransition);
}

#[tokio::test]
async fn requester_cannot_accept() {
    let h = harness();
    let id = h.create().await;

    let outcome = h.service.accept(&id, &club()).await;

    assert_failed(&outcome, ErrorKind::AuthorizationError);
    assert_eq!(h.status(&id), CollaborationStatus::Pending);
}

#[tokio::test]
async fn reject_without_reason_fails() {
    let h = harness();
    let id = h.create().await;

    let outcome = h.service.reject(&id, &sponsor(), "   ").await;

    assert_failed(&outcome, ErrorKind::ValidationError);
    assert_eq!(h.status(&id), CollaborationStatus::Pending);
}

#[tokio::test]
async fn reject_notifies_requester_with_reason() {
    let h = harness();
    let id = h.create().await;

    let rejected = h.service.reject(&id, &sponsor(), "budget already allocated").await;

    assert_eq!(
        rejected.value.unwrap().reject_reason(),
        Some("budget already allocated")
    );
    let note = h.sink.sent_to(&club()).pop().unwrap();
    assert_eq!(note.event_type, NotificationKind::Rejected);
    assert_eq!(note.payload["reason"], "budget already allocated");
}

#[tokio::test]
async fn unknown_id_is_not_found() {
    let h = harness();

    let outcome = h.service.accept(&CollaborationId::new("nope"), &sponsor()).await;

    assert_failed(&outcome, ErrorKind::NotFoundError);
}

#[tokio::test]
async fn scenario_c_completion_review_flow() {
    let h = harness();
    let id = h.accepted().await;
    h.clock.advance(Duration::days(10));

    let initiated = h.service.initiate_completion(&id, &sponsor(), None).await;
    assert!(initiated.success);
    assert_eq!(h.status(&id), CollaborationStatus::PendingReview);
    assert_eq!(
        h.sink.sent_to(&club()).last().unwrap().event_type,
        NotificationKind::ReviewRequested
    );

    let submitted = review([5, 4, 5, 4], "great", h.clock.now());
    let completed = h
        .service
        .submit_review(&id, &club(), submitted.clone())
        .await;
    assert!(completed.success);

    let record = h.store.record(&id).unwrap();
    assert_eq!(record.status(), CollaborationStatus::Complete);
    assert_eq!(record.review(), Some(&submitted));
    assert_eq!(record.updated_at, h.clock.now());
    assert_eq!(
        h.sink.sent_to(&sponsor()).last().unwrap().event_type,
        NotificationKind::Completed
    );
}

#[tokio::test]
async fn scenario_d_cancel_with_reason() {
    let h = harness();
    let id = h.accepted().await;

    let cancelled = h.service.cancel(&id, &club(), "budget cut", 2).await;

    assert!(cancelled.success);
    let record = h.store.record(&id).unwrap();
    assert_eq!(record.status(), CollaborationStatus::Cancel);
    assert_eq!(record.cancel_review().unwrap().comment, "budget cut");
    assert_eq!(
        h.sink.sent_to(&sponsor()).last().unwrap().event_type,
        NotificationKind::Cancelled
    );
}

#[tokio::test]
async fn terminal_records_refuse_every_operation() {
    let h = harness();
    let id = h.accepted().await;
    assert!(h.service.cancel(&id, &club(), "budget cut", 3).await.success);
    let now = h.clock.now();

    assert_failed(&h.service.accept(&id, &sponsor()).await, ErrorKind::InvalidStateTransition);
    assert_failed(
        &h.service.reject(&id, &sponsor(), "late").await,
        ErrorKind::InvalidStateTransition,
    );
    assert_failed(
        &h.service.initiate_completion(&id, &club(), None).await,
        ErrorKind::InvalidStateTransition,
    );
    assert_failed(
        &h.service.cancel(&id, &club(), "again", 1).await,
        ErrorKind::InvalidStateTransition,
    );
    assert_failed(
        &h.service
            .submit_review(&id, &sponsor(), review([3, 3, 3, 3], "ok", now))
            .await,
        ErrorKind::InvalidStateTransition,
    );
}

#[tokio::test]
async fn review_is_only_accepted_from_the_awaited_party() {
    let h = harness();
    let id = h.accepted().await;
    h.service.initiate_completion(&id, &club(), None).await;

    let own = h
        .service
        .submit_review(&id, &club(), review([5, 5, 5, 5], "me", h.clock.now()))
        .await;

    assert_failed(&own, ErrorKind::AuthorizationError);
    assert_eq!(h.status(&id), CollaborationStatus::PendingReview);
}

#[tokio::test]
async fn concurrent_change_surfaces_as_invalid_transition() {
    let h = harness();
    let id = h.create().await;
    h.sink.clear();
    h.store.conflict_next_update();

    let outcome = h.service.accept(&id, &sponsor()).await;

    assert_failed(&outcome, ErrorKind::InvalidStateTransition);
    assert!(h.sink.sent().is_empty());
}

// ============================================================================
// Dependency failures
// ============================================================================

#[tokio::test]
async fn notification_failure_does_not_fail_the_transition() {
    let h = harness();
    let id = h.create().await;
    h.sink.fail(true);

    let outcome = h.service.accept(&id, &sponsor()).await;

    assert!(outcome.success);
    assert_eq!(h.status(&id), CollaborationStatus::Accepted);
    assert_eq!(h.sink.attempts(), 2);
}

#[tokio::test]
async fn store_failure_aborts_before_notifying() {
    let h = harness();
    let id = h.create().await;
    h.sink.clear();
    h.store.fail_writes(true);

    let outcome = h.service.accept(&id, &sponsor()).await;

    assert_failed(&outcome, ErrorKind::DependencyError);
    assert_eq!(h.sink.attempts(), 0);
    assert_eq!(h.status(&id), CollaborationStatus::Pending);
}

// ============================================================================
// Listing
// ============================================================================

#[tokio::test]
async fn board_partitions_received_and_sent() {
    let h = harness();
    let pending = h.create().await;

    let sponsor_board = h.service.board(&sponsor()).await.into_value().unwrap();
    assert_eq!(sponsor_board.awaiting_reply.len(), 1);
    assert_eq!(sponsor_board.awaiting_reply[0].id, pending);

    let club_board = h.service.board(&club()).await.into_value().unwrap();
    assert!(club_board.awaiting_reply.is_empty());

    h.service.accept(&pending, &sponsor()).await;
    let club_board = h.service.board(&club()).await.into_value().unwrap();
    assert_eq!(club_board.counts().active, 1);

    assert_eq!(h.service.received(&sponsor()).await.into_value().unwrap().len(), 1);
    assert_eq!(h.service.sent(&club()).await.into_value().unwrap().len(), 1);
    assert!(h.service.sent(&sponsor()).await.into_value().unwrap().is_empty());
}

#[tokio::test]
async fn listing_failure_is_reported() {
    let h = harness();
    h.store.fail_reads(true);

    assert_failed(&h.service.board(&club()).await, ErrorKind::DependencyError);
}
