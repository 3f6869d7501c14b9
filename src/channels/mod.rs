//! Messaging channel adapters
//!
//! The bot core only talks to a channel through the [`Notifier`] trait and
//! only reads what it needs from an inbound [`Update`].

pub mod telegram;

use async_trait::async_trait;

pub use telegram::{TelegramChannel, UpdateDedup};

use crate::Result;

/// Identity an inbound update is attributed to
pub type ActorId = i64;

/// Platform chat identifier
pub type ChatId = i64;

/// The user behind an update
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    /// Platform user ID
    pub id: ActorId,

    /// Username without the leading `@` (if set)
    pub username: Option<String>,

    /// Display first name
    pub first_name: String,
}

impl Actor {
    /// Create an actor with only an ID
    #[must_use]
    pub fn new(id: ActorId) -> Self {
        Self {
            id,
            username: None,
            first_name: String::new(),
        }
    }
}

/// Kind of chat an update originated from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatKind {
    /// One-to-one chat with the bot
    Private,
    /// Basic group
    Group,
    /// Supergroup
    Supergroup,
    /// Broadcast channel
    Channel,
}

impl ChatKind {
    /// Parse the Bot API `chat.type` string
    #[must_use]
    pub fn from_api(value: &str) -> Self {
        match value {
            "group" => Self::Group,
            "supergroup" => Self::Supergroup,
            "channel" => Self::Channel,
            _ => Self::Private,
        }
    }
}

/// Class of event with its own cooldown duration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    /// Free-text messages
    Message,
    /// Inline keyboard button presses
    Button,
}

impl Category {
    /// Short label used in log fields
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Message => "message",
            Self::Button => "button",
        }
    }
}

/// Payload of an inbound update
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateKind {
    /// A chat message sent by the actor
    Message {
        /// Platform message ID
        message_id: i64,
        /// Text or caption (if any)
        text: Option<String>,
    },
    /// A press on an inline keyboard button
    Button {
        /// Callback query ID used to acknowledge the press
        query_id: String,
        /// Message carrying the keyboard (if still accessible)
        message_id: Option<i64>,
        /// Button callback data
        data: Option<String>,
    },
}

/// An actor-tagged inbound event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Update {
    /// Who sent it
    pub actor: Actor,

    /// Chat it belongs to
    pub chat_id: ChatId,

    /// Kind of chat
    pub chat_kind: ChatKind,

    /// Payload
    pub kind: UpdateKind,
}

impl Update {
    /// Build a private-chat text message update
    #[must_use]
    pub fn message(actor: ActorId, message_id: i64, text: &str) -> Self {
        Self {
            actor: Actor::new(actor),
            chat_id: actor,
            chat_kind: ChatKind::Private,
            kind: UpdateKind::Message {
                message_id,
                text: Some(text.to_string()),
            },
        }
    }

    /// Build a private-chat button press update
    #[must_use]
    pub fn button(actor: ActorId, query_id: &str, data: &str) -> Self {
        Self {
            actor: Actor::new(actor),
            chat_id: actor,
            chat_kind: ChatKind::Private,
            kind: UpdateKind::Button {
                query_id: query_id.to_string(),
                message_id: None,
                data: Some(data.to_string()),
            },
        }
    }

    /// Throttling category of this update
    #[must_use]
    pub const fn category(&self) -> Category {
        match self.kind {
            UpdateKind::Message { .. } => Category::Message,
            UpdateKind::Button { .. } => Category::Button,
        }
    }

    /// Handle of the message this update refers to, if any
    #[must_use]
    pub const fn message_handle(&self) -> Option<MessageHandle> {
        match self.kind {
            UpdateKind::Message { message_id, .. }
            | UpdateKind::Button {
                message_id: Some(message_id),
                ..
            } => Some(MessageHandle::new(self.chat_id, message_id)),
            UpdateKind::Button { .. } => None,
        }
    }
}

/// Reference to a sent message, needed to edit or delete it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageHandle {
    /// Chat the message lives in
    pub chat_id: ChatId,

    /// Platform message ID
    pub message_id: i64,
}

impl MessageHandle {
    /// Create a handle
    #[must_use]
    pub const fn new(chat_id: ChatId, message_id: i64) -> Self {
        Self {
            chat_id,
            message_id,
        }
    }
}

/// Outbound side of a channel used by the bot core
///
/// `edit` and `delete` failures are expected (the user may have deleted the
/// message); callers decide per failure whether to stop or carry on.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Send a short text message to a chat, returning its handle
    async fn send(&self, chat_id: ChatId, text: &str) -> Result<MessageHandle>;

    /// Replace the text of a previously sent message
    async fn edit(&self, handle: &MessageHandle, text: &str) -> Result<()>;

    /// Delete a message
    async fn delete(&self, handle: &MessageHandle) -> Result<()>;

    /// Acknowledge a button press with an ephemeral pop-up
    ///
    /// `alert` shows a modal alert instead of a toast.
    async fn ack(&self, query_id: &str, text: &str, alert: bool) -> Result<()>;
}
