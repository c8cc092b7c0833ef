//! The collaboration service: load, reduce, persist, dispatch.
//!
//! Every public operation returns an [`Outcome`] instead of an error. Inside,
//! each transition is one conditional store update followed by notification
//! dispatch. A failed update aborts before anything is sent; a failed
//! notification is logged and does not undo the update.

use crate::dispatch::NotificationDispatcher;
use crate::metrics::CollaborationMetrics;
use sponsorlink_core::action::CollaborationAction;
use sponsorlink_core::environment::{
    Clock, CollaborationQuery, CollaborationStore, NotificationSink, PostDirectory,
};
use sponsorlink_core::error::{CollaborationError, ErrorKind, StoreError};
use sponsorlink_core::ids::{CollaborationId, UserId};
use sponsorlink_core::listing::CollaborationBoard;
use sponsorlink_core::notification::Notification;
use sponsorlink_core::outcome::Outcome;
use sponsorlink_core::reducer::{CollaborationEnvironment, CollaborationReducer, Reducer};
use sponsorlink_core::types::{
    CollaborationDraft, CollaborationRequest, CollaborationStatus, NewCollaborationRequest,
    Review,
};
use std::sync::Arc;

/// Entry point for UI action handlers.
#[derive(Clone)]
pub struct CollaborationService {
    store: Arc<dyn CollaborationStore>,
    posts: Arc<dyn PostDirectory>,
    dispatcher: NotificationDispatcher,
    reducer: CollaborationReducer,
    env: CollaborationEnvironment,
}

impl CollaborationService {
    /// Wire the service to its dependencies.
    #[must_use]
    pub fn new(
        store: Arc<dyn CollaborationStore>,
        posts: Arc<dyn PostDirectory>,
        sink: Arc<dyn NotificationSink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            posts,
            dispatcher: NotificationDispatcher::new(sink),
            reducer: CollaborationReducer::new(),
            env: CollaborationEnvironment::new(clock),
        }
    }

    /// Send a collaboration request on behalf of `caller`.
    ///
    /// Checks, first failure wins: `caller` is the requester, the post
    /// exists, no pending request exists for the same post and requester.
    /// The receiver and an empty title are filled from the post.
    #[tracing::instrument(skip_all, fields(post_id = %input.post_id, requester = %caller))]
    pub async fn create_request(
        &self,
        caller: &UserId,
        input: NewCollaborationRequest,
    ) -> Outcome<CollaborationId> {
        finish("create_request", self.try_create(caller, input).await)
    }

    /// Receiver accepts a pending request.
    #[tracing::instrument(skip_all, fields(collaboration_id = %id, actor = %caller))]
    pub async fn accept(&self, id: &CollaborationId, caller: &UserId) -> Outcome<CollaborationRequest> {
        let action = CollaborationAction::Accept {
            actor: caller.clone(),
        };
        finish("accept", self.transition(id, action).await)
    }

    /// Receiver rejects a pending request with a reason.
    #[tracing::instrument(skip_all, fields(collaboration_id = %id, actor = %caller))]
    pub async fn reject(
        &self,
        id: &CollaborationId,
        caller: &UserId,
        reason: &str,
    ) -> Outcome<CollaborationRequest> {
        let action = CollaborationAction::Reject {
            actor: caller.clone(),
            reason: reason.to_string(),
        };
        finish("reject", self.transition(id, action).await)
    }

    /// Either party marks an accepted collaboration finished, optionally
    /// reviewing the counterpart, and asks the counterpart for a review.
    #[tracing::instrument(skip_all, fields(collaboration_id = %id, actor = %caller))]
    pub async fn initiate_completion(
        &self,
        id: &CollaborationId,
        caller: &UserId,
        review: Option<Review>,
    ) -> Outcome<CollaborationRequest> {
        let action = CollaborationAction::InitiateCompletion {
            actor: caller.clone(),
            review,
        };
        finish("initiate_completion", self.transition(id, action).await)
    }

    /// Either party cancels an accepted collaboration.
    #[tracing::instrument(skip_all, fields(collaboration_id = %id, actor = %caller))]
    pub async fn cancel(
        &self,
        id: &CollaborationId,
        caller: &UserId,
        reason: &str,
        rating: u8,
    ) -> Outcome<CollaborationRequest> {
        let action = CollaborationAction::Cancel {
            actor: caller.clone(),
            reason: reason.to_string(),
            rating,
        };
        finish("cancel", self.transition(id, action).await)
    }

    /// The awaited party submits the completion review.
    #[tracing::instrument(skip_all, fields(collaboration_id = %id, actor = %caller))]
    pub async fn submit_review(
        &self,
        id: &CollaborationId,
        caller: &UserId,
        review: Review,
    ) -> Outcome<CollaborationRequest> {
        let action = CollaborationAction::SubmitReview {
            actor: caller.clone(),
            review,
        };
        finish("submit_review", self.transition(id, action).await)
    }

    /// Read one request by id.
    #[tracing::instrument(skip_all, fields(collaboration_id = %id))]
    pub async fn get(&self, id: &CollaborationId) -> Outcome<CollaborationRequest> {
        finish("get", self.load(id).await)
    }

    /// Requests `user` received, newest first.
    #[tracing::instrument(skip_all, fields(user = %user))]
    pub async fn received(&self, user: &UserId) -> Outcome<Vec<CollaborationRequest>> {
        let query = CollaborationQuery::new().receiver(user.clone());
        finish("received", self.find(query).await)
    }

    /// Requests `user` sent, newest first.
    #[tracing::instrument(skip_all, fields(user = %user))]
    pub async fn sent(&self, user: &UserId) -> Outcome<Vec<CollaborationRequest>> {
        let query = CollaborationQuery::new().requester(user.clone());
        finish("sent", self.find(query).await)
    }

    /// Received and sent requests merged and partitioned by status.
    #[tracing::instrument(skip_all, fields(user = %user))]
    pub async fn board(&self, user: &UserId) -> Outcome<CollaborationBoard> {
        finish("board", self.try_board(user).await)
    }

    async fn try_board(&self, user: &UserId) -> Result<CollaborationBoard, CollaborationError> {
        let received = self.find(CollaborationQuery::new().receiver(user.clone())).await?;
        let sent = self.find(CollaborationQuery::new().requester(user.clone())).await?;
        Ok(CollaborationBoard::build(user, received, sent))
    }

    async fn try_create(
        &self,
        caller: &UserId,
        input: NewCollaborationRequest,
    ) -> Result<CollaborationId, CollaborationError> {
        if caller != &input.requester_id {
            return Err(CollaborationError::Authorization("identity mismatch".to_string()));
        }

        let post = self
            .posts
            .get_post(&input.post_id)
            .await?
            .ok_or_else(|| CollaborationError::NotFound("post not found".to_string()))?;

        let duplicates = self
            .find(
                CollaborationQuery::new()
                    .post(input.post_id.clone())
                    .requester(input.requester_id.clone())
                    .status(CollaborationStatus::Pending),
            )
            .await?;
        if !duplicates.is_empty() {
            return Err(CollaborationError::Validation("duplicate request".to_string()));
        }

        if !input.receiver_id.is_empty() && input.receiver_id != post.author_id {
            return Err(CollaborationError::Validation(
                "receiver must be the post author".to_string(),
            ));
        }
        if input.requester_id == post.author_id {
            return Err(CollaborationError::Validation(
                "cannot request own post".to_string(),
            ));
        }

        let post_title = if input.post_title.trim().is_empty() {
            post.title
        } else {
            input.post_title
        };
        let draft = CollaborationDraft {
            post_id: input.post_id,
            post_title,
            requester_id: input.requester_id,
            receiver_id: post.author_id,
            message: input.message,
            end_date: post.end_date,
            created_at: self.env.clock.now(),
        };

        let record = self.store.insert(draft).await?;
        CollaborationMetrics::record_transition("create_request");
        tracing::info!(
            collaboration_id = %record.id,
            receiver = %record.receiver_id,
            "Collaboration request created"
        );

        self.dispatcher
            .dispatch([Notification::request_created(
                record.receiver_id.clone(),
                record.id.clone(),
                &record.post_title,
                &record.requester_id,
                &record.message,
            )])
            .await;

        Ok(record.id)
    }

    async fn transition(
        &self,
        id: &CollaborationId,
        action: CollaborationAction,
    ) -> Result<CollaborationRequest, CollaborationError> {
        let mut record = self.load(id).await?;
        let expected = record.status();
        let action_name = action.name();

        let effects = self.reducer.reduce(&mut record, action, &self.env)?;

        match self.store.update(record.clone(), expected).await {
            Ok(()) => {}
            Err(StoreError::Conflict { .. }) => {
                // Another writer moved the record first; report where it is now.
                let current = self
                    .store
                    .get(id)
                    .await?
                    .map_or(expected, |stored| stored.status());
                return Err(CollaborationError::InvalidStateTransition {
                    id: id.clone(),
                    from: current,
                    action: action_name,
                });
            }
            Err(StoreError::NotFound(missing)) => {
                return Err(CollaborationError::NotFound(format!(
                    "collaboration {missing} not found"
                )));
            }
            Err(error) => return Err(error.into()),
        }

        CollaborationMetrics::record_transition(action_name);
        tracing::info!(
            from = %expected,
            to = %record.status(),
            action = action_name,
            "Collaboration transitioned"
        );

        self.dispatcher.dispatch(effects).await;
        Ok(record)
    }

    async fn load(&self, id: &CollaborationId) -> Result<CollaborationRequest, CollaborationError> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| CollaborationError::NotFound(format!("collaboration {id} not found")))
    }

    async fn find(
        &self,
        query: CollaborationQuery,
    ) -> Result<Vec<CollaborationRequest>, CollaborationError> {
        Ok(self.store.find(query).await?)
    }
}

impl std::fmt::Debug for CollaborationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollaborationService").finish_non_exhaustive()
    }
}

/// Log and count a failed operation, then wrap the result.
fn finish<T>(operation: &'static str, result: Result<T, CollaborationError>) -> Outcome<T> {
    if let Err(error) = &result {
        let kind = error.kind();
        CollaborationMetrics::record_error(operation, kind);
        if kind == ErrorKind::DependencyError {
            tracing::error!(operation, error = %error, "Dependency failure");
        } else {
            tracing::info!(operation, kind = %kind, error = %error, "Operation refused");
        }
    }
    result.into()
}
