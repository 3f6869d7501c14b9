//! Turn handler failures into a notice for the user

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use super::{Dispatch, Middleware, Next};
use crate::Result;
use crate::channels::{Notifier, Update, UpdateKind};

/// How long the error notice stays in the chat
const NOTICE_LIFETIME: Duration = Duration::from_secs(10);

/// Logs handler errors and tells the user something went wrong
///
/// Messages get a short-lived notice in the chat, button presses an ack.
pub struct ErrorReportMiddleware {
    notifier: Arc<dyn Notifier>,
    notice: String,
}

impl ErrorReportMiddleware {
    /// Create the middleware with the notice text shown to users
    #[must_use]
    pub fn new(notifier: Arc<dyn Notifier>, notice: String) -> Self {
        Self { notifier, notice }
    }
}

#[async_trait]
impl Middleware for ErrorReportMiddleware {
    async fn call(&self, update: Update, next: Next<'_>) -> Result<Dispatch> {
        let actor = update.actor.id;
        let chat_id = update.chat_id;
        let kind = update.kind.clone();

        let err = match next.run(update).await {
            Ok(outcome) => return Ok(outcome),
            Err(e) => e,
        };

        tracing::error!(actor, error = %err, "handler failed");

        match kind {
            UpdateKind::Message { .. } => match self.notifier.send(chat_id, &self.notice).await {
                Ok(handle) => {
                    // Removal must not hold up the update stream
                    let notifier = Arc::clone(&self.notifier);
                    tokio::spawn(async move {
                        tokio::time::sleep(NOTICE_LIFETIME).await;
                        if let Err(e) = notifier.delete(&handle).await {
                            tracing::warn!(error = %e, "failed to delete error notice");
                        }
                    });
                }
                Err(e) => tracing::warn!(actor, error = %e, "failed to send error notice"),
            },
            UpdateKind::Button { query_id, .. } => {
                if let Err(e) = self.notifier.ack(&query_id, &self.notice, false).await {
                    tracing::warn!(actor, error = %e, "failed to answer failed button press");
                }
            }
        }

        Ok(Dispatch::Failed)
    }
}
