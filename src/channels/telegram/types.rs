//! Telegram Bot API request/response types

use serde::{Deserialize, Serialize};

use super::api::classify_failure;
use crate::Result;

/// Telegram Bot API base URL
pub(crate) const API_BASE: &str = "https://api.telegram.org/bot";

/// Generic Bot API response envelope
#[derive(Debug, Deserialize)]
pub(crate) struct TelegramResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    pub error_code: Option<u16>,
    pub description: Option<String>,
}

impl<T> TelegramResponse<T> {
    /// Unwrap the result, or classify the failure the API reported
    ///
    /// `status` is the HTTP status, used when the body carries no
    /// `error_code`.
    pub fn into_result(self, method: &str, status: u16) -> Result<T> {
        match self.result {
            Some(result) if self.ok => Ok(result),
            _ => Err(classify_failure(
                method,
                self.error_code.unwrap_or(status),
                self.description.as_deref().unwrap_or_default(),
            )),
        }
    }
}

/// Message returned by `sendMessage`
#[derive(Debug, Deserialize)]
pub(crate) struct SentMessage {
    pub message_id: i64,
}

/// Telegram sendMessage request
#[derive(Serialize)]
pub(crate) struct SendMessageRequest<'a> {
    pub chat_id: i64,
    pub text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parse_mode: Option<&'a str>,
}

/// Telegram editMessageText request
#[derive(Serialize)]
pub(crate) struct EditMessageTextRequest<'a> {
    pub chat_id: i64,
    pub message_id: i64,
    pub text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parse_mode: Option<&'a str>,
}

/// Telegram deleteMessage request
#[derive(Serialize)]
pub(crate) struct DeleteMessageRequest {
    pub chat_id: i64,
    pub message_id: i64,
}

/// Telegram answerCallbackQuery request
#[derive(Serialize)]
pub(crate) struct AnswerCallbackQueryRequest<'a> {
    pub callback_query_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub show_alert: Option<bool>,
}

/// Telegram deleteWebhook request
#[derive(Serialize)]
pub(crate) struct DeleteWebhookRequest {
    pub drop_pending_updates: bool,
}

/// Telegram setMyCommands request
#[derive(Serialize)]
pub(crate) struct SetMyCommandsRequest<'a> {
    pub commands: &'a [BotCommand],
}

/// Bot command for the Telegram command menu
#[derive(Debug, Clone, Serialize)]
pub struct BotCommand {
    /// Command name without the leading slash
    pub command: String,
    /// Short description shown in the menu
    pub description: String,
}

impl BotCommand {
    /// Create a command entry
    #[must_use]
    pub fn new(command: &str, description: &str) -> Self {
        Self {
            command: command.to_string(),
            description: description.to_string(),
        }
    }
}
