//! Throttle Bot - per-actor admission control for a Telegram bot
//!
//! This library provides:
//! - An admission gate limiting each user to one message and one button
//!   press per cooldown window
//! - Live countdown feedback for throttled users
//! - A middleware pipeline in front of the bot's handlers
//! - A Telegram Bot API adapter
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │              Telegram (long polling)                 │
//! └────────────────────┬────────────────────────────────┘
//!                      │ Update
//! ┌────────────────────▼────────────────────────────────┐
//! │                   Dispatcher                         │
//! │  PrivateChat ─► Throttle ─► ErrorReport ─► ActionLog │
//! └──────────┬─────────────────────────────┬────────────┘
//!            │ rejected                    │ admitted
//! ┌──────────▼──────────┐        ┌─────────▼───────────┐
//! │ FeedbackController  │        │   SharedHandler     │
//! │ countdown sessions  │        │   /start, buttons   │
//! └─────────────────────┘        └─────────────────────┘
//! ```

pub mod channels;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod handlers;
pub mod throttle;

pub use channels::{Category, MessageHandle, Notifier, TelegramChannel, Update};
pub use config::Config;
pub use dispatch::{Dispatch, Dispatcher, Handler, Middleware};
pub use error::{Error, Result};
pub use handlers::SharedHandler;
pub use throttle::{FeedbackController, ThrottleMiddleware, ThrottleRegistry};
