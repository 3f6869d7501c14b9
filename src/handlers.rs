//! Default business handler for the bot

use std::sync::Arc;

use async_trait::async_trait;

use crate::Result;
use crate::channels::telegram::BotCommand;
use crate::channels::{Notifier, Update, UpdateKind};
use crate::dispatch::Handler;

/// Callback data prefix of pagination/no-op buttons
pub const NOOP_PREFIX: &str = "noop";

/// Callback data of the "close" button
pub const CLOSE_MESSAGE: &str = "close_message";

/// Handles `/start` and the shared keyboard buttons
pub struct SharedHandler {
    notifier: Arc<dyn Notifier>,
    greeting: String,
}

impl SharedHandler {
    /// Create the handler
    #[must_use]
    pub fn new(notifier: Arc<dyn Notifier>, greeting: String) -> Self {
        Self { notifier, greeting }
    }

    /// Commands this handler answers, for the bot menu
    #[must_use]
    pub fn commands() -> Vec<BotCommand> {
        vec![BotCommand::new("start", "Refresh the bot actions")]
    }

    async fn on_message(&self, update: &Update, text: Option<&str>) -> Result<()> {
        match text {
            Some(text) if text.starts_with("/start") => {
                self.notifier.send(update.chat_id, &self.greeting).await?;
                Ok(())
            }
            _ => {
                tracing::debug!(actor = update.actor.id, "no handler for message");
                Ok(())
            }
        }
    }

    async fn on_button(&self, update: &Update, query_id: &str, data: Option<&str>) -> Result<()> {
        let data = data.unwrap_or_default();

        if data == CLOSE_MESSAGE {
            self.notifier.ack(query_id, "", false).await?;
            if let Some(handle) = update.message_handle()
                && let Err(e) = self.notifier.delete(&handle).await
            {
                tracing::info!(actor = update.actor.id, error = %e, "failed to close message");
            }
            return Ok(());
        }

        if let Some(rest) = data.strip_prefix(NOOP_PREFIX) {
            return self.notifier.ack(query_id, &noop_text(rest), true).await;
        }

        tracing::debug!(actor = update.actor.id, data, "no handler for button");
        self.notifier.ack(query_id, "", false).await
    }
}

/// Alert text for a no-op button: the page number if the data carries one
fn noop_text(suffix: &str) -> String {
    match suffix.strip_prefix('_') {
        Some(page) if !page.is_empty() => format!("Current page:\n№{page}"),
        _ => "❕".to_string(),
    }
}

#[async_trait]
impl Handler for SharedHandler {
    async fn handle(&self, update: Update) -> Result<()> {
        match &update.kind {
            UpdateKind::Message { text, .. } => self.on_message(&update, text.as_deref()).await,
            UpdateKind::Button { query_id, data, .. } => {
                self.on_button(&update, query_id, data.as_deref()).await
            }
        }
    }
}
