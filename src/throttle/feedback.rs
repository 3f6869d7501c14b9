//! Feedback for throttled actors
//!
//! A rejected message opens (at most) one countdown session per actor: a
//! "please wait" notification plus a background task that edits it until the
//! cooldown is nearly over, then deletes it and sends a one-shot "you may
//! proceed" notice. Rejected button presses get an ephemeral alert instead.
//!
//! ```text
//!   rejected message ──► try_open ──► send notice ──► spawn updater
//!                           │                            │
//!                      (exists: discard)        Running: sleep, edit
//!                                                        │ remaining ≤ threshold
//!                                               Finishing: close ─► delete ─► proceed
//! ```

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::time::Instant;

use super::session::{SessionRegistry, SessionTicket};
use crate::channels::{ChatId, MessageHandle, Notifier, Update, UpdateKind};
use crate::config::{FeedbackTexts, ThrottleConfig};

/// The running cooldown a rejected event fell into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cooldown {
    /// Last admission of the actor
    pub started_at: Instant,

    /// Cooldown length of the category
    pub rate_limit: Duration,
}

impl Cooldown {
    /// Cooldown left at `now`, saturating at zero
    #[must_use]
    pub fn remaining(&self, now: Instant) -> Duration {
        self.rate_limit
            .saturating_sub(now.saturating_duration_since(self.started_at))
    }
}

/// Countdown timing and texts
#[derive(Debug, Clone)]
struct FeedbackSettings {
    tick_ceiling: Duration,
    finish_threshold: Duration,
    texts: FeedbackTexts,
}

/// Owns the lifecycle of feedback sessions
#[derive(Clone)]
pub struct FeedbackController {
    notifier: Arc<dyn Notifier>,
    sessions: Arc<SessionRegistry>,
    settings: Arc<FeedbackSettings>,
}

impl FeedbackController {
    /// Create a controller sharing `sessions` with the rest of the process
    #[must_use]
    pub fn new(
        notifier: Arc<dyn Notifier>,
        sessions: Arc<SessionRegistry>,
        throttle: &ThrottleConfig,
        texts: FeedbackTexts,
    ) -> Self {
        Self {
            notifier,
            sessions,
            settings: Arc::new(FeedbackSettings {
                tick_ceiling: throttle.tick_ceiling,
                finish_threshold: throttle.finish_threshold,
                texts,
            }),
        }
    }

    /// Session registry backing this controller
    #[must_use]
    pub fn sessions(&self) -> &Arc<SessionRegistry> {
        &self.sessions
    }

    /// React to a rejected update
    ///
    /// Never fails: notifier errors are logged and discarded.
    pub async fn on_rejected(&self, update: &Update, cooldown: Cooldown) {
        let actor = update.actor.id;
        let category = update.category().as_str();
        let remaining = cooldown.remaining(Instant::now());

        match &update.kind {
            UpdateKind::Button { query_id, .. } => {
                tracing::warn!(actor, category, ?remaining, "frequent button presses");
                let text = self.settings.texts.button_wait_text(remaining);
                if let Err(e) = self.notifier.ack(query_id, &text, true).await {
                    tracing::warn!(actor, category, error = %e, "failed to answer throttled button press");
                }
            }
            UpdateKind::Message { .. } => {
                // Check-and-create happens before any await
                let ticket = self
                    .sessions
                    .try_open(actor, update.category(), cooldown.started_at);

                self.discard(update).await;

                match ticket {
                    Some(ticket) => {
                        tracing::warn!(
                            actor,
                            category,
                            ?remaining,
                            "frequent messages, starting countdown"
                        );
                        self.start_session(ticket, update.chat_id, cooldown, remaining)
                            .await;
                    }
                    None => {
                        tracing::debug!(
                            actor,
                            category,
                            "duplicate message during countdown discarded"
                        );
                    }
                }
            }
        }
    }

    /// Remove a rejected message from the chat, best-effort
    async fn discard(&self, update: &Update) {
        let Some(handle) = update.message_handle() else {
            return;
        };

        if let Err(e) = self.notifier.delete(&handle).await {
            tracing::warn!(
                actor = update.actor.id,
                error = %e,
                "failed to delete throttled message"
            );
        }
    }

    /// Send the first countdown notice and spawn its updater
    async fn start_session(
        &self,
        ticket: SessionTicket,
        chat_id: ChatId,
        cooldown: Cooldown,
        remaining: Duration,
    ) {
        let text = self.settings.texts.wait_text(remaining);

        let handle = match self.notifier.send(chat_id, &text).await {
            Ok(handle) => handle,
            Err(e) => {
                tracing::warn!(
                    actor = ticket.actor_id(),
                    error = %e,
                    "failed to send countdown notice, closing session"
                );
                self.sessions.close(&ticket);
                return;
            }
        };

        if !self.sessions.attach_notification(&ticket, handle) {
            // Shut down while the notice was in flight
            if let Err(e) = self.notifier.delete(&handle).await {
                tracing::warn!(error = %e, "failed to delete orphaned countdown notice");
            }
            return;
        }

        let updater = tokio::spawn(self.clone().run_updater(ticket, handle, cooldown));
        if !self.sessions.attach_updater(&ticket, updater) {
            tracing::debug!(actor = ticket.actor_id(), "session closed before updater attached");
        }
    }

    /// Body of the per-session background task
    async fn run_updater(self, ticket: SessionTicket, handle: MessageHandle, cooldown: Cooldown) {
        let ticking = AssertUnwindSafe(self.tick(&ticket, &handle, cooldown)).catch_unwind();

        if ticking.await.is_err() {
            tracing::error!(
                actor = ticket.actor_id(),
                "countdown updater panicked, finishing session"
            );
        }

        self.finish(&ticket).await;
    }

    /// Running state: edit the countdown until the threshold is reached
    async fn tick(&self, ticket: &SessionTicket, handle: &MessageHandle, cooldown: Cooldown) {
        loop {
            let remaining = cooldown.remaining(Instant::now());
            tokio::time::sleep(remaining.min(self.settings.tick_ceiling)).await;

            let remaining = cooldown.remaining(Instant::now());
            if remaining <= self.settings.finish_threshold {
                return;
            }

            let text = self.settings.texts.wait_text(remaining);
            match self.notifier.edit(handle, &text).await {
                Ok(()) => {
                    tracing::trace!(actor = ticket.actor_id(), ?remaining, "countdown updated");
                }
                Err(e) if e.is_message_gone() => {
                    tracing::warn!(
                        actor = ticket.actor_id(),
                        error = %e,
                        "countdown notice gone, finishing session"
                    );
                    return;
                }
                Err(e) => {
                    tracing::warn!(actor = ticket.actor_id(), error = %e, "failed to update countdown");
                }
            }
        }
    }

    /// Finishing state: close the session, then clean up and notify
    ///
    /// Closing the registry entry is the gate: only the caller that removes it
    /// talks to the notifier. Returns whether this call did the cleanup.
    pub async fn finish(&self, ticket: &SessionTicket) -> bool {
        let Some(session) = self.sessions.close(ticket) else {
            tracing::debug!(
                actor = ticket.actor_id(),
                category = ticket.category().as_str(),
                "session already finished"
            );
            return false;
        };

        let Some(handle) = session.notification else {
            return true;
        };

        if let Err(e) = self.notifier.delete(&handle).await {
            tracing::warn!(actor = session.actor_id, error = %e, "failed to delete countdown notice");
        }

        if let Err(e) = self
            .notifier
            .send(handle.chat_id, &self.settings.texts.proceed)
            .await
        {
            tracing::warn!(actor = session.actor_id, error = %e, "failed to send proceed notice");
        }

        tracing::debug!(actor = session.actor_id, "countdown finished");
        true
    }

    /// Stop every outstanding countdown
    ///
    /// Sessions are drained from the registry first, so updater tasks that
    /// wake up afterwards find nothing to finish.
    pub async fn shutdown(&self) {
        let sessions = self.sessions.drain();
        let count = sessions.len();

        let cleanups = sessions.into_iter().map(|session| async move {
            if let Some(updater) = session.updater {
                updater.abort();
            }
            if let Some(handle) = session.notification
                && let Err(e) = self.notifier.delete(&handle).await
            {
                tracing::warn!(
                    actor = session.actor_id,
                    category = session.category.as_str(),
                    error = %e,
                    "failed to delete countdown notice"
                );
            }
        });
        futures::future::join_all(cleanups).await;

        tracing::info!(count, "feedback sessions shut down");
    }
}
