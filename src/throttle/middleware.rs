//! Admission control in front of the handler

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use super::feedback::{Cooldown, FeedbackController};
use super::window::{Admission, AdmissionGate};
use crate::Result;
use crate::channels::Update;
use crate::dispatch::{Dispatch, Middleware, Next};

/// Gates updates per actor and category
///
/// A rejected update never reaches the rest of the pipeline; the actor gets
/// feedback from the [`FeedbackController`] instead.
#[derive(Clone)]
pub struct ThrottleMiddleware {
    gate: Arc<AdmissionGate>,
    feedback: FeedbackController,
}

impl ThrottleMiddleware {
    /// Create the middleware over a shared gate and controller
    #[must_use]
    pub const fn new(gate: Arc<AdmissionGate>, feedback: FeedbackController) -> Self {
        Self { gate, feedback }
    }

    /// Admission gate consulted for every update
    #[must_use]
    pub const fn gate(&self) -> &Arc<AdmissionGate> {
        &self.gate
    }

    /// Controller handling rejected updates
    #[must_use]
    pub const fn feedback(&self) -> &FeedbackController {
        &self.feedback
    }

    /// Run `next` if the update's actor is admitted, otherwise suppress it
    ///
    /// # Errors
    ///
    /// Returns whatever `next` returns; rejection itself never fails
    pub async fn guard<F, Fut>(&self, update: Update, next: F) -> Result<Dispatch>
    where
        F: FnOnce(Update) -> Fut + Send,
        Fut: Future<Output = Result<Dispatch>> + Send,
    {
        let category = update.category();

        match self.gate.check(update.actor.id, category) {
            Admission::Admitted => next(update).await,
            Admission::Rejected { admitted_at, .. } => {
                let cooldown = Cooldown {
                    started_at: admitted_at,
                    rate_limit: self.gate.rate_limit(category),
                };
                self.feedback.on_rejected(&update, cooldown).await;
                Ok(Dispatch::Suppressed)
            }
        }
    }
}

#[async_trait]
impl Middleware for ThrottleMiddleware {
    async fn call(&self, update: Update, next: Next<'_>) -> Result<Dispatch> {
        self.guard(update, |update| next.run(update)).await
    }
}
