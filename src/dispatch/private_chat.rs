//! Restrict the bot to private chats

use async_trait::async_trait;

use super::{Dispatch, Middleware, Next};
use crate::Result;
use crate::channels::{ChatKind, Update};

/// Drops updates that do not come from a private chat with the bot
#[derive(Debug, Default, Clone, Copy)]
pub struct PrivateChatMiddleware;

#[async_trait]
impl Middleware for PrivateChatMiddleware {
    async fn call(&self, update: Update, next: Next<'_>) -> Result<Dispatch> {
        if update.chat_kind == ChatKind::Private {
            return next.run(update).await;
        }

        tracing::info!(
            chat_id = update.chat_id,
            chat_kind = ?update.chat_kind,
            "ignoring update outside a private chat"
        );
        Ok(Dispatch::Ignored)
    }
}
