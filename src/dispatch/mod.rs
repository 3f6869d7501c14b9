//! Update dispatch pipeline
//!
//! An update flows through an ordered chain of [`Middleware`]s and finally
//! reaches a [`Handler`]. Each middleware decides whether to call the rest
//! of the chain through [`Next`].

mod action_log;
mod error_report;
mod private_chat;

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

pub use action_log::ActionLogMiddleware;
pub use error_report::ErrorReportMiddleware;
pub use private_chat::PrivateChatMiddleware;

use crate::Result;
use crate::channels::Update;

/// How an update left the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// The handler ran to completion
    Handled,
    /// Rejected by admission control; the handler never ran
    Suppressed,
    /// Filtered out before reaching the handler
    Ignored,
    /// The handler failed and the user was notified
    Failed,
}

/// Business logic at the end of the pipeline
#[async_trait]
pub trait Handler: Send + Sync {
    /// Handle one update
    async fn handle(&self, update: Update) -> Result<()>;
}

/// A stage wrapping the rest of the pipeline
#[async_trait]
pub trait Middleware: Send + Sync {
    /// Process `update`, optionally passing it on through `next`
    async fn call(&self, update: Update, next: Next<'_>) -> Result<Dispatch>;
}

/// The remainder of the pipeline after the current middleware
#[derive(Clone, Copy)]
pub struct Next<'a> {
    middlewares: &'a [Arc<dyn Middleware>],
    handler: &'a dyn Handler,
}

impl<'a> Next<'a> {
    /// Build a continuation over `middlewares` ending at `handler`
    #[must_use]
    pub fn new(middlewares: &'a [Arc<dyn Middleware>], handler: &'a dyn Handler) -> Self {
        Self {
            middlewares,
            handler,
        }
    }

    /// Run the rest of the pipeline
    ///
    /// # Errors
    ///
    /// Returns the handler's error when no middleware converted it
    pub async fn run(self, update: Update) -> Result<Dispatch> {
        match self.middlewares.split_first() {
            Some((first, rest)) => first.call(update, Next::new(rest, self.handler)).await,
            None => {
                self.handler.handle(update).await?;
                Ok(Dispatch::Handled)
            }
        }
    }
}

/// Fixed middleware chain in front of a handler
#[derive(Clone)]
pub struct Dispatcher {
    middlewares: Vec<Arc<dyn Middleware>>,
    handler: Arc<dyn Handler>,
}

impl Dispatcher {
    /// Create a dispatcher with no middleware
    #[must_use]
    pub fn new(handler: Arc<dyn Handler>) -> Self {
        Self {
            middlewares: Vec::new(),
            handler,
        }
    }

    /// Append a middleware; the first added is the outermost
    #[must_use]
    pub fn layer(mut self, middleware: Arc<dyn Middleware>) -> Self {
        self.middlewares.push(middleware);
        self
    }

    /// Push one update through the pipeline
    ///
    /// # Errors
    ///
    /// Returns the handler's error when no middleware converted it
    pub async fn dispatch(&self, update: Update) -> Result<Dispatch> {
        Next::new(&self.middlewares, self.handler.as_ref())
            .run(update)
            .await
    }

    /// Dispatch updates from `rx` one by one until the sender side closes
    ///
    /// Updates are processed in arrival order, so an actor's admission
    /// decision always sees the previous one. The cost is throughput: every
    /// update waits for the previous one's Bot API calls, including the
    /// delete and first countdown notice of a rejected message, so one slow
    /// call delays all actors.
    pub async fn run(&self, mut rx: mpsc::Receiver<Update>) {
        while let Some(update) = rx.recv().await {
            let actor = update.actor.id;
            match self.dispatch(update).await {
                Ok(outcome) => tracing::trace!(actor, ?outcome, "update dispatched"),
                Err(e) => tracing::error!(actor, error = %e, "unhandled error while dispatching update"),
            }
        }

        tracing::info!("update stream closed");
    }
}
