//! Telegram channel adapter
//!
//! Long-polls the Bot API for updates and implements [`Notifier`] on top of
//! `sendMessage`, `editMessageText`, `deleteMessage` and
//! `answerCallbackQuery`.

mod api;
pub mod dedup;
pub mod polling;
pub mod types;

use async_trait::async_trait;
use reqwest::Client;

use super::{ChatId, MessageHandle, Notifier};
use crate::Result;

pub use api::classify_failure;
pub use dedup::UpdateDedup;
pub use types::BotCommand;

/// Telegram channel adapter
#[derive(Clone)]
pub struct TelegramChannel {
    token: String,
    client: Client,
}

impl std::fmt::Debug for TelegramChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramChannel")
            .field("token", &"[redacted]")
            .finish_non_exhaustive()
    }
}

impl TelegramChannel {
    /// Create a new Telegram channel adapter
    #[must_use]
    pub fn new(token: String) -> Self {
        Self {
            token,
            client: Client::new(),
        }
    }

    /// Prepare the bot for polling: validate the token, drop any webhook,
    /// and publish the command menu
    ///
    /// # Errors
    ///
    /// Returns error if the token is invalid or a setup call fails
    pub async fn connect(&self, drop_pending_updates: bool, commands: &[BotCommand]) -> Result<()> {
        self.get_me().await?;
        self.delete_webhook(drop_pending_updates).await?;
        self.set_my_commands(commands).await?;
        tracing::info!("Telegram channel connected");
        Ok(())
    }
}

#[async_trait]
impl Notifier for TelegramChannel {
    async fn send(&self, chat_id: ChatId, text: &str) -> Result<MessageHandle> {
        let message_id = self.send_message_returning_id(chat_id, text).await?;
        Ok(MessageHandle::new(chat_id, message_id))
    }

    async fn edit(&self, handle: &MessageHandle, text: &str) -> Result<()> {
        self.edit_message_text(handle.chat_id, handle.message_id, text)
            .await
    }

    async fn delete(&self, handle: &MessageHandle) -> Result<()> {
        self.delete_message_by_id(handle.chat_id, handle.message_id)
            .await
    }

    async fn ack(&self, query_id: &str, text: &str, alert: bool) -> Result<()> {
        let text = (!text.is_empty()).then_some(text);
        self.answer_callback_query(query_id, text, alert).await
    }
}
