//! Raw Telegram Bot API calls

use serde::Serialize;
use serde::de::DeserializeOwned;

use super::types::{
    API_BASE, AnswerCallbackQueryRequest, BotCommand, DeleteMessageRequest,
    DeleteWebhookRequest, EditMessageTextRequest, SendMessageRequest, SentMessage,
    SetMyCommandsRequest, TelegramResponse,
};
use crate::{Error, Result};

/// Bot API descriptions meaning the target message (or chat) is unreachable
const GONE_MARKERS: &[&str] = &[
    "message to edit not found",
    "message to delete not found",
    "message can't be edited",
    "message can't be deleted",
    "message_id_invalid",
    "chat not found",
    "bot was blocked by the user",
];

/// Map a failed Bot API call to a typed error
///
/// Unreachable messages become [`Error::MessageGone`]; everything else
/// (rate limits, server errors, parse errors) is a transient
/// [`Error::Channel`].
#[must_use]
pub fn classify_failure(method: &str, status: u16, description: &str) -> Error {
    let lower = description.to_lowercase();
    if GONE_MARKERS.iter().any(|marker| lower.contains(marker)) {
        return Error::MessageGone(format!("Telegram {method}: {description}"));
    }

    Error::Channel(format!("Telegram {method} error: {status} - {description}"))
}

/// Whether a failure description is the harmless "not modified" edit result
fn is_not_modified(err: &Error) -> bool {
    matches!(err, Error::Channel(msg) if msg.to_lowercase().contains("message is not modified"))
}

/// Whether a failure description is an HTML entity parse error
fn is_parse_error(err: &Error) -> bool {
    matches!(err, Error::Channel(msg) if msg.to_lowercase().contains("can't parse entities"))
}

impl super::TelegramChannel {
    /// POST a Bot API method and unwrap the response envelope
    async fn call<B, T>(&self, method: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let url = format!("{API_BASE}{}/{method}", self.token);

        let response = self.client.post(&url).json(body).send().await?;
        let status = response.status().as_u16();
        let parsed: TelegramResponse<T> = serde_json::from_str(&response.text().await?)?;

        parsed.into_result(method, status)
    }

    /// Send a message and return the platform message ID
    ///
    /// Uses HTML parse mode with plain-text fallback.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails
    pub async fn send_message_returning_id(&self, chat_id: i64, text: &str) -> Result<i64> {
        let request = SendMessageRequest {
            chat_id,
            text,
            parse_mode: Some("HTML"),
        };

        let sent: SentMessage = match self.call("sendMessage", &request).await {
            Err(e) if is_parse_error(&e) => {
                tracing::debug!(chat_id, "HTML rejected, resending as plain text");
                let fallback = SendMessageRequest {
                    parse_mode: None,
                    ..request
                };
                self.call("sendMessage", &fallback).await?
            }
            other => other?,
        };

        tracing::debug!(chat_id, message_id = sent.message_id, "Telegram message sent");
        Ok(sent.message_id)
    }

    /// Edit an existing message's text
    ///
    /// "message is not modified" is treated as success.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails
    pub async fn edit_message_text(&self, chat_id: i64, message_id: i64, text: &str) -> Result<()> {
        let request = EditMessageTextRequest {
            chat_id,
            message_id,
            text,
            parse_mode: Some("HTML"),
        };

        match self
            .call::<_, serde_json::Value>("editMessageText", &request)
            .await
        {
            Ok(_) => Ok(()),
            Err(e) if is_not_modified(&e) => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Delete a message by ID
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails
    pub async fn delete_message_by_id(&self, chat_id: i64, message_id: i64) -> Result<()> {
        let request = DeleteMessageRequest {
            chat_id,
            message_id,
        };

        self.call::<_, bool>("deleteMessage", &request).await?;
        Ok(())
    }

    /// Answer a callback query to dismiss the loading spinner on the button
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails
    pub async fn answer_callback_query(
        &self,
        callback_query_id: &str,
        text: Option<&str>,
        show_alert: bool,
    ) -> Result<()> {
        let request = AnswerCallbackQueryRequest {
            callback_query_id,
            text,
            show_alert: show_alert.then_some(true),
        };

        self.call::<_, bool>("answerCallbackQuery", &request).await?;
        Ok(())
    }

    /// Delete webhook (switch to polling mode)
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails
    pub async fn delete_webhook(&self, drop_pending_updates: bool) -> Result<()> {
        let request = DeleteWebhookRequest {
            drop_pending_updates,
        };

        self.call::<_, bool>("deleteWebhook", &request).await?;
        tracing::info!(drop_pending_updates, "Telegram webhook deleted");
        Ok(())
    }

    /// Register the bot's command menu
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails
    pub async fn set_my_commands(&self, commands: &[BotCommand]) -> Result<()> {
        let request = SetMyCommandsRequest { commands };

        self.call::<_, bool>("setMyCommands", &request).await?;
        tracing::info!(count = commands.len(), "Telegram commands registered");
        Ok(())
    }

    /// Validate the bot token by calling `getMe`
    ///
    /// # Errors
    ///
    /// Returns error if the token is invalid
    pub async fn get_me(&self) -> Result<()> {
        self.call::<_, serde_json::Value>("getMe", &serde_json::json!({}))
            .await
            .map_err(|e| Error::Config(format!("Invalid Telegram bot token: {e}")))?;
        Ok(())
    }
}
