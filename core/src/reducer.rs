//! The collaboration state machine as a pure reducer.
//!
//! `(State, Action, Environment) → (State, Effects)`: the reducer validates an
//! action against the current record, updates the record in place, and
//! returns the notifications that should follow. It performs no I/O. On error
//! the record is left untouched.
//!
//! | From             | Action               | To               |
//! |------------------|----------------------|------------------|
//! | `pending`        | `Accept`             | `accepted`       |
//! | `pending`        | `Reject`             | `rejected`       |
//! | `accepted`       | `InitiateCompletion` | `pending_review` |
//! | `accepted`       | `Cancel`             | `cancel`         |
//! | `pending_review` | `SubmitReview`       | `complete`       |
//!
//! Checks run in a fixed order: source status, then the actor's role, then
//! the payload.

use crate::action::CollaborationAction;
use crate::environment::Clock;
use crate::error::CollaborationError;
use crate::ids::UserId;
use crate::notification::{Notification, NotificationKind};
use crate::types::{
    CancelReview, CollaborationPhase, CollaborationRequest, Review, validate_score,
};
use serde_json::json;
use smallvec::{SmallVec, smallvec};
use std::sync::Arc;

/// Effects returned by a reducer. Most transitions notify one party.
pub type Effects<E> = SmallVec<[E; 2]>;

/// The Reducer trait - core abstraction for business logic
///
/// # Type Parameters
///
/// - `State`: The domain state this reducer operates on
/// - `Action`: The action type this reducer processes
/// - `Environment`: The injected dependencies this reducer needs
/// - `Effect`: Description of a side effect for the runtime to execute
/// - `Error`: Why an action was refused
pub trait Reducer {
    /// The state type this reducer operates on
    type State;

    /// The action type this reducer processes
    type Action;

    /// The environment type with injected dependencies
    type Environment;

    /// Side effect description
    type Effect;

    /// Refusal reason
    type Error;

    /// Reduce an action into state changes and effects.
    ///
    /// # Errors
    ///
    /// Returns `Self::Error` when the action is refused. `state` must be
    /// unchanged in that case.
    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> Result<Effects<Self::Effect>, Self::Error>;
}

/// Dependencies of [`CollaborationReducer`].
#[derive(Clone)]
pub struct CollaborationEnvironment {
    /// Source of transition timestamps
    pub clock: Arc<dyn Clock>,
}

impl CollaborationEnvironment {
    /// Create an environment around `clock`.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }
}

impl std::fmt::Debug for CollaborationEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollaborationEnvironment").finish_non_exhaustive()
    }
}

/// Enforces the collaboration transition table.
#[derive(Debug, Clone, Copy, Default)]
pub struct CollaborationReducer;

impl CollaborationReducer {
    /// Create the reducer.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Reducer for CollaborationReducer {
    type State = CollaborationRequest;
    type Action = CollaborationAction;
    type Environment = CollaborationEnvironment;
    type Effect = Notification;
    type Error = CollaborationError;

    fn reduce(
        &self,
        record: &mut CollaborationRequest,
        action: CollaborationAction,
        env: &CollaborationEnvironment,
    ) -> Result<Effects<Notification>, CollaborationError> {
        if record.status() != action.source_status() {
            return Err(CollaborationError::InvalidStateTransition {
                id: record.id.clone(),
                from: record.status(),
                action: action.name(),
            });
        }

        let now = env.clock.now();

        match action {
            CollaborationAction::Accept { actor } => {
                require_receiver(record, &actor, "accept")?;

                record.transition_to(CollaborationPhase::Accepted { accepted_at: now }, now);
                Ok(smallvec![notify(
                    record,
                    record.requester_id.clone(),
                    NotificationKind::Accepted,
                    json!({}),
                )])
            }

            CollaborationAction::Reject { actor, reason } => {
                require_receiver(record, &actor, "reject")?;
                let reason = required_text(&reason, "reject reason")?;

                let effect = notify(
                    record,
                    record.requester_id.clone(),
                    NotificationKind::Rejected,
                    json!({ "reason": reason }),
                );
                record.transition_to(
                    CollaborationPhase::Rejected {
                        reject_reason: reason,
                        rejected_at: now,
                    },
                    now,
                );
                Ok(smallvec![effect])
            }

            CollaborationAction::InitiateCompletion { actor, review } => {
                let counterpart = require_party(record, &actor)?;
                if let Some(review) = &review {
                    review.validate()?;
                }

                let effect = notify(
                    record,
                    counterpart.clone(),
                    NotificationKind::ReviewRequested,
                    json!({ "initiatedBy": actor }),
                );
                record.transition_to(
                    CollaborationPhase::PendingReview {
                        initiated_by: actor,
                        awaiting: counterpart,
                        initiator_review: review,
                        requested_at: now,
                    },
                    now,
                );
                Ok(smallvec![effect])
            }

            CollaborationAction::Cancel {
                actor,
                reason,
                rating,
            } => {
                let counterpart = require_party(record, &actor)?;
                let reason = required_text(&reason, "cancel reason")?;
                validate_score("rating", rating)?;

                let effect = notify(
                    record,
                    counterpart,
                    NotificationKind::Cancelled,
                    json!({ "reason": reason, "cancelledBy": actor }),
                );
                record.transition_to(
                    CollaborationPhase::Cancel {
                        cancel_review: CancelReview {
                            rating,
                            comment: reason,
                            reviewer_id: actor,
                            reviewed_at: now,
                        },
                    },
                    now,
                );
                Ok(smallvec![effect])
            }

            CollaborationAction::SubmitReview { actor, review } => {
                let CollaborationPhase::PendingReview {
                    initiated_by,
                    awaiting,
                    initiator_review,
                    ..
                } = &record.phase
                else {
                    return Err(CollaborationError::InvalidStateTransition {
                        id: record.id.clone(),
                        from: record.status(),
                        action: "submit_review",
                    });
                };
                if awaiting != &actor {
                    return Err(CollaborationError::Authorization(
                        "only the party awaiting review can submit it".to_string(),
                    ));
                }
                review.validate()?;

                let phase = completed_phase(
                    initiated_by.clone(),
                    initiator_review.clone(),
                    review,
                    actor,
                    now,
                );
                let effect = notify(
                    record,
                    initiated_by.clone(),
                    NotificationKind::Completed,
                    json!({ "reviewer": awaiting }),
                );
                record.transition_to(phase, now);
                Ok(smallvec![effect])
            }
        }
    }
}

fn completed_phase(
    initiated_by: UserId,
    initiator_review: Option<Review>,
    review: Review,
    reviewer: UserId,
    completed_at: chrono::DateTime<chrono::Utc>,
) -> CollaborationPhase {
    CollaborationPhase::Complete {
        initiated_by,
        initiator_review,
        review,
        reviewer,
        completed_at,
    }
}

fn require_receiver(
    record: &CollaborationRequest,
    actor: &UserId,
    verb: &str,
) -> Result<(), CollaborationError> {
    if &record.receiver_id == actor {
        Ok(())
    } else {
        Err(CollaborationError::Authorization(format!(
            "only the receiver can {verb} this request"
        )))
    }
}

/// The counterpart of `actor`, who must be one of the two parties.
fn require_party(
    record: &CollaborationRequest,
    actor: &UserId,
) -> Result<UserId, CollaborationError> {
    record.counterpart_of(actor).cloned().ok_or_else(|| {
        CollaborationError::Authorization(
            "caller is not a party to this collaboration".to_string(),
        )
    })
}

fn required_text(text: &str, field: &str) -> Result<String, CollaborationError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        Err(CollaborationError::Validation(format!("{field} is required")))
    } else {
        Ok(trimmed.to_string())
    }
}

/// Notification about `record`, merging the post title into `payload`.
fn notify(
    record: &CollaborationRequest,
    recipient: UserId,
    kind: NotificationKind,
    mut payload: serde_json::Value,
) -> Notification {
    if let Some(fields) = payload.as_object_mut() {
        fields.insert("postTitle".to_string(), json!(record.post_title));
    }
    Notification::new(recipient, kind, record.id.clone(), payload)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)] // Test code

    use super::*;
    use crate::error::ErrorKind;
    use crate::ids::{CollaborationId, PostId};
    use crate::types::{CollaborationDraft, CollaborationStatus};
    use chrono::{DateTime, TimeZone, Utc};
    use proptest::prelude::*;

    struct StaticClock(DateTime<Utc>);

    impl Clock for StaticClock {
        fn now(&self) -> DateTime<Utc> {
            self.0
        }
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 4, 1, 9, 0, 0).unwrap()
    }

    fn env() -> CollaborationEnvironment {
        CollaborationEnvironment::new(Arc::new(StaticClock(t0())))
    }

    fn requester() -> UserId {
        UserId::new("club-1")
    }

    fn receiver() -> UserId {
        UserId::new("sponsor-1")
    }

    fn pending() -> CollaborationRequest {
        CollaborationRequest::from_draft(
            CollaborationId::new("c1"),
            CollaborationDraft {
                post_id: PostId::new("p1"),
                post_title: "Coding bootcamp".to_string(),
                requester_id: requester(),
                receiver_id: receiver(),
                message: "interested".to_string(),
                end_date: None,
                created_at: t0() - chrono::Duration::days(1),
            },
        )
    }

    fn review(comment: &str) -> Review {
        Review {
            professional_skill: 5,
            communication: 4,
            attitude: 5,
            satisfaction: 4,
            comment: comment.to_string(),
            is_anonymous: false,
            timestamp: t0(),
        }
    }

    fn reduce(
        record: &mut CollaborationRequest,
        action: CollaborationAction,
    ) -> Result<Effects<Notification>, CollaborationError> {
        CollaborationReducer::new().reduce(record, action, &env())
    }

    fn accepted() -> CollaborationRequest {
        let mut record = pending();
        reduce(&mut record, CollaborationAction::Accept { actor: receiver() }).unwrap();
        record
    }

    #[test]
    fn accept_notifies_requester() {
        let mut record = pending();
        let effects = reduce(&mut record, CollaborationAction::Accept { actor: receiver() }).unwrap();

        assert_eq!(record.status(), CollaborationStatus::Accepted);
        assert_eq!(record.updated_at, t0());
        assert_eq!(effects.len(), 1);
        assert_eq!(effects[0].recipient_id, requester());
        assert_eq!(effects[0].event_type, NotificationKind::Accepted);
        assert_eq!(effects[0].payload["postTitle"], "Coding bootcamp");
    }

    #[test]
    fn only_receiver_may_accept() {
        let mut record = pending();
        let err = reduce(&mut record, CollaborationAction::Accept { actor: requester() })
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AuthorizationError);
        assert_eq!(record, pending());
    }

    #[test]
    fn reject_requires_reason() {
        let mut record = pending();
        let err = reduce(
            &mut record,
            CollaborationAction::Reject {
                actor: receiver(),
                reason: "  ".to_string(),
            },
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValidationError);
        assert_eq!(record.status(), CollaborationStatus::Pending);
    }

    #[test]
    fn reject_stores_reason() {
        let mut record = pending();
        let effects = reduce(
            &mut record,
            CollaborationAction::Reject {
                actor: receiver(),
                reason: "out of budget".to_string(),
            },
        )
        .unwrap();
        assert_eq!(record.reject_reason(), Some("out of budget"));
        assert_eq!(effects[0].payload["reason"], "out of budget");
    }

    #[test]
    fn state_is_checked_before_role() {
        let mut record = accepted();
        let err = reduce(&mut record, CollaborationAction::Accept { actor: requester() })
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidStateTransition);
    }

    #[test]
    fn either_party_can_initiate_completion() {
        let mut record = accepted();
        let effects = reduce(
            &mut record,
            CollaborationAction::InitiateCompletion {
                actor: requester(),
                review: Some(review("smooth")),
            },
        )
        .unwrap();

        assert_eq!(record.status(), CollaborationStatus::PendingReview);
        assert_eq!(record.awaiting_review_from(), Some(&receiver()));
        assert_eq!(effects[0].recipient_id, receiver());
        assert_eq!(effects[0].event_type, NotificationKind::ReviewRequested);
    }

    #[test]
    fn outsider_cannot_cancel() {
        let mut record = accepted();
        let err = reduce(
            &mut record,
            CollaborationAction::Cancel {
                actor: UserId::new("stranger"),
                reason: "nope".to_string(),
                rating: 3,
            },
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AuthorizationError);
    }

    #[test]
    fn cancel_validates_rating() {
        let mut record = accepted();
        let err = reduce(
            &mut record,
            CollaborationAction::Cancel {
                actor: receiver(),
                reason: "budget cut".to_string(),
                rating: 0,
            },
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValidationError);
        assert_eq!(record.status(), CollaborationStatus::Accepted);
    }

    #[test]
    fn cancel_records_review_and_notifies_counterpart() {
        let mut record = accepted();
        let effects = reduce(
            &mut record,
            CollaborationAction::Cancel {
                actor: receiver(),
                reason: "budget cut".to_string(),
                rating: 2,
            },
        )
        .unwrap();

        let cancel = record.cancel_review().expect("cancel review stored");
        assert_eq!(cancel.comment, "budget cut");
        assert_eq!(cancel.reviewer_id, receiver());
        assert_eq!(effects[0].recipient_id, requester());
        assert_eq!(effects[0].event_type, NotificationKind::Cancelled);
    }

    #[test]
    fn only_awaited_party_submits_review() {
        let mut record = accepted();
        reduce(
            &mut record,
            CollaborationAction::InitiateCompletion {
                actor: receiver(),
                review: None,
            },
        )
        .unwrap();

        let err = reduce(
            &mut record,
            CollaborationAction::SubmitReview {
                actor: receiver(),
                review: review("self review"),
            },
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AuthorizationError);

        let effects = reduce(
            &mut record,
            CollaborationAction::SubmitReview {
                actor: requester(),
                review: review("great"),
            },
        )
        .unwrap();
        assert_eq!(record.status(), CollaborationStatus::Complete);
        assert_eq!(record.review(), Some(&review("great")));
        assert_eq!(effects[0].recipient_id, receiver());
        assert_eq!(effects[0].event_type, NotificationKind::Completed);
    }

    fn arb_action() -> impl Strategy<Value = CollaborationAction> {
        let actor = prop_oneof![Just(requester()), Just(receiver())];
        let text = "[a-z ]{0,12}";
        prop_oneof![
            actor.clone().prop_map(|actor| CollaborationAction::Accept { actor }),
            (actor.clone(), text)
                .prop_map(|(actor, reason)| CollaborationAction::Reject { actor, reason }),
            actor.clone().prop_map(|actor| CollaborationAction::InitiateCompletion {
                actor,
                review: None
            }),
            (actor.clone(), text, 0u8..8).prop_map(|(actor, reason, rating)| {
                CollaborationAction::Cancel {
                    actor,
                    reason,
                    rating,
                }
            }),
            (actor, 0u8..8).prop_map(|(actor, score)| CollaborationAction::SubmitReview {
                actor,
                review: Review {
                    professional_skill: score,
                    communication: score,
                    attitude: score,
                    satisfaction: score,
                    comment: "ok".to_string(),
                    is_anonymous: false,
                    timestamp: t0(),
                },
            }),
        ]
    }

    fn terminal_records() -> Vec<CollaborationRequest> {
        let mut rejected = pending();
        reduce(
            &mut rejected,
            CollaborationAction::Reject {
                actor: receiver(),
                reason: "no".to_string(),
            },
        )
        .unwrap();

        let mut cancelled = accepted();
        reduce(
            &mut cancelled,
            CollaborationAction::Cancel {
                actor: requester(),
                reason: "budget cut".to_string(),
                rating: 3,
            },
        )
        .unwrap();

        let mut complete = accepted();
        reduce(
            &mut complete,
            CollaborationAction::InitiateCompletion {
                actor: requester(),
                review: None,
            },
        )
        .unwrap();
        reduce(
            &mut complete,
            CollaborationAction::SubmitReview {
                actor: receiver(),
                review: review("great"),
            },
        )
        .unwrap();

        vec![rejected, cancelled, complete]
    }

    proptest! {
        #[test]
        fn terminal_records_refuse_every_action(index in 0usize..3, action in arb_action()) {
            let mut record = terminal_records().swap_remove(index);
            let before = record.clone();

            let err = reduce(&mut record, action).unwrap_err();

            prop_assert_eq!(err.kind(), ErrorKind::InvalidStateTransition);
            prop_assert_eq!(record, before);
        }

        #[test]
        fn out_of_range_ratings_never_cancel(rating in 6u8..=u8::MAX) {
            let mut record = accepted();
            let result = reduce(
                &mut record,
                CollaborationAction::Cancel { actor: requester(), reason: "late".to_string(), rating },
            );
            prop_assert!(result.is_err());
            prop_assert_eq!(record.status(), CollaborationStatus::Accepted);
        }
    }
}
