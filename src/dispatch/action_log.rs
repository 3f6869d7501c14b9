//! Log who did what before the handler runs

use async_trait::async_trait;

use super::{Dispatch, Middleware, Next};
use crate::Result;
use crate::channels::{Update, UpdateKind};

/// Logs every update that reaches the handler
#[derive(Debug, Default, Clone, Copy)]
pub struct ActionLogMiddleware;

#[async_trait]
impl Middleware for ActionLogMiddleware {
    async fn call(&self, update: Update, next: Next<'_>) -> Result<Dispatch> {
        let action = match &update.kind {
            UpdateKind::Message { text, .. } => {
                format!("message: {}", text.as_deref().unwrap_or("<no text>"))
            }
            UpdateKind::Button { data, .. } => {
                format!("button: {}", data.as_deref().unwrap_or("<no data>"))
            }
        };

        tracing::info!(
            actor = update.actor.id,
            username = update.actor.username.as_deref().unwrap_or("-"),
            first_name = %update.actor.first_name,
            %action,
            "user action"
        );

        next.run(update).await
    }
}
