//! Telegram polling mode — getUpdates loop and update conversion

use std::time::Duration;

use serde::Deserialize;
use tokio::sync::mpsc;

use super::dedup::UpdateDedup;
use super::types::{API_BASE, TelegramResponse};
use crate::Result;
use crate::channels::{Actor, ChatKind, Update, UpdateKind};

/// Long-poll timeout passed to getUpdates (seconds)
const LONG_POLL_TIMEOUT_SECS: u64 = 30;

/// A single update from getUpdates
#[derive(Debug, Deserialize)]
pub(crate) struct PollingUpdate {
    update_id: i64,
    message: Option<PollingMessage>,
    callback_query: Option<PollingCallbackQuery>,
}

/// Message from a polling update
#[derive(Debug, Deserialize)]
struct PollingMessage {
    message_id: i64,
    chat: PollingChat,
    from: Option<PollingUser>,
    text: Option<String>,
    caption: Option<String>,
}

/// Callback query (inline button press) from a polling update
#[derive(Debug, Deserialize)]
struct PollingCallbackQuery {
    id: String,
    from: PollingUser,
    message: Option<PollingCallbackMessage>,
    data: Option<String>,
}

/// Message carrying the pressed keyboard
#[derive(Debug, Deserialize)]
struct PollingCallbackMessage {
    message_id: i64,
    chat: PollingChat,
}

/// Chat info from polling
#[derive(Debug, Deserialize)]
struct PollingChat {
    id: i64,
    #[serde(rename = "type")]
    chat_type: String,
}

/// User info from polling
#[derive(Debug, Deserialize)]
struct PollingUser {
    id: i64,
    is_bot: bool,
    first_name: String,
    username: Option<String>,
}

impl From<&PollingUser> for Actor {
    fn from(user: &PollingUser) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            first_name: user.first_name.clone(),
        }
    }
}

impl super::TelegramChannel {
    /// Spawn a background task that polls Telegram's getUpdates API
    ///
    /// Converted updates are forwarded into `tx`; the task ends when the
    /// receiving side is dropped.
    #[must_use]
    pub fn start_polling(
        &self,
        tx: mpsc::Sender<Update>,
        interval: Duration,
    ) -> tokio::task::JoinHandle<()> {
        let token = self.token.clone();
        let client = self.client.clone();

        tokio::spawn(async move {
            polling_loop(token, client, tx, interval).await;
        })
    }
}

/// Run the polling loop (background task)
async fn polling_loop(
    token: String,
    client: reqwest::Client,
    tx: mpsc::Sender<Update>,
    interval: Duration,
) {
    let mut offset: Option<i64> = None;
    let mut dedup = UpdateDedup::default();

    loop {
        match fetch_updates(&client, &token, offset).await {
            Ok(batch) => {
                for update in &batch {
                    offset = Some(update.update_id + 1);

                    if dedup.is_duplicate(update.update_id) {
                        continue;
                    }

                    let Some(converted) = convert_update(update) else {
                        continue;
                    };

                    if tx.send(converted).await.is_err() {
                        tracing::info!("update receiver dropped, stopping Telegram polling");
                        return;
                    }
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Telegram getUpdates failed");
            }
        }

        tokio::time::sleep(interval).await;
    }
}

/// Run one getUpdates call
async fn fetch_updates(
    client: &reqwest::Client,
    token: &str,
    offset: Option<i64>,
) -> Result<Vec<PollingUpdate>> {
    let url = format!("{API_BASE}{token}/getUpdates");
    let mut params = serde_json::json!({
        "timeout": LONG_POLL_TIMEOUT_SECS,
        "allowed_updates": ["message", "callback_query"],
    });
    if let Some(off) = offset {
        params["offset"] = serde_json::json!(off);
    }

    let response = client.post(&url).json(&params).send().await?;
    let status = response.status().as_u16();
    decode_batch(&response.text().await?, status)
}

/// Decode a getUpdates body; `ok: false` replies become errors
fn decode_batch(body: &str, status: u16) -> Result<Vec<PollingUpdate>> {
    let parsed: TelegramResponse<Vec<PollingUpdate>> = serde_json::from_str(body)?;
    parsed.into_result("getUpdates", status)
}

/// Convert a polling update into an [`Update`]
///
/// Bot senders and updates without an attributable user are skipped.
pub(crate) fn convert_update(update: &PollingUpdate) -> Option<Update> {
    if let Some(msg) = &update.message {
        let from = msg.from.as_ref().filter(|u| !u.is_bot)?;

        return Some(Update {
            actor: from.into(),
            chat_id: msg.chat.id,
            chat_kind: ChatKind::from_api(&msg.chat.chat_type),
            kind: UpdateKind::Message {
                message_id: msg.message_id,
                text: msg.text.clone().or_else(|| msg.caption.clone()),
            },
        });
    }

    let query = update.callback_query.as_ref()?;
    if query.from.is_bot {
        return None;
    }

    // Inaccessible keyboard messages fall back to the user's private chat
    let (chat_id, chat_kind, message_id) = query.message.as_ref().map_or(
        (query.from.id, ChatKind::Private, None),
        |m| {
            (
                m.chat.id,
                ChatKind::from_api(&m.chat.chat_type),
                Some(m.message_id),
            )
        },
    );

    Some(Update {
        actor: (&query.from).into(),
        chat_id,
        chat_kind,
        kind: UpdateKind::Button {
            query_id: query.id.clone(),
            message_id,
            data: query.data.clone(),
        },
    })
}
