//! Shared test utilities

#![allow(dead_code)]

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};

use async_trait::async_trait;
use throttle_bot::channels::{ChatId, MessageHandle, Notifier, Update};
use throttle_bot::dispatch::Handler;
use throttle_bot::{Error, Result};
use tokio::time::Instant;

/// First message id handed out by [`MockNotifier::send`]
pub const FIRST_SENT_ID: i64 = 1000;

/// One call made against the mock notifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Send { handle: MessageHandle, text: String },
    Edit { handle: MessageHandle, text: String },
    Delete { handle: MessageHandle },
    Ack { query_id: String, text: String, alert: bool },
}

/// Notifier that records every call with the (paused) time it happened
#[derive(Default)]
pub struct MockNotifier {
    calls: Mutex<Vec<(Instant, Call)>>,
    next_id: AtomicI64,
    fail_sends: AtomicBool,
    edits_gone: AtomicBool,
    edits_fail: AtomicBool,
    edits_panic: AtomicBool,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self {
            next_id: AtomicI64::new(FIRST_SENT_ID),
            ..Self::default()
        }
    }

    /// Make every `send` fail with a transient channel error
    pub fn fail_sends(&self) {
        self.fail_sends.store(true, Ordering::SeqCst);
    }

    /// Make every `edit` report the message as gone
    pub fn edits_gone(&self) {
        self.edits_gone.store(true, Ordering::SeqCst);
    }

    /// Make every `edit` fail with a transient channel error
    pub fn edits_fail(&self) {
        self.edits_fail.store(true, Ordering::SeqCst);
    }

    /// Make every `edit` panic
    pub fn edits_panic(&self) {
        self.edits_panic.store(true, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.timed_calls().into_iter().map(|(_, call)| call).collect()
    }

    pub fn timed_calls(&self) -> Vec<(Instant, Call)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn sent_texts(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Send { text, .. } => Some(text),
                _ => None,
            })
            .collect()
    }

    pub fn edit_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, Call::Edit { .. }))
            .count()
    }

    pub fn acks(&self) -> Vec<(String, bool)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Ack { text, alert, .. } => Some((text, alert)),
                _ => None,
            })
            .collect()
    }

    pub fn deleted(&self) -> Vec<MessageHandle> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Delete { handle } => Some(handle),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push((Instant::now(), call));
    }
}

#[async_trait]
impl Notifier for MockNotifier {
    async fn send(&self, chat_id: ChatId, text: &str) -> Result<MessageHandle> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(Error::Channel("send failed".to_string()));
        }

        let handle = MessageHandle::new(chat_id, self.next_id.fetch_add(1, Ordering::SeqCst));
        self.record(Call::Send {
            handle,
            text: text.to_string(),
        });
        Ok(handle)
    }

    async fn edit(&self, handle: &MessageHandle, text: &str) -> Result<()> {
        assert!(!self.edits_panic.load(Ordering::SeqCst), "edit exploded");
        if self.edits_gone.load(Ordering::SeqCst) {
            return Err(Error::MessageGone("message to edit not found".to_string()));
        }

        self.record(Call::Edit {
            handle: *handle,
            text: text.to_string(),
        });

        if self.edits_fail.load(Ordering::SeqCst) {
            return Err(Error::Channel("Too Many Requests".to_string()));
        }
        Ok(())
    }

    async fn delete(&self, handle: &MessageHandle) -> Result<()> {
        self.record(Call::Delete { handle: *handle });
        Ok(())
    }

    async fn ack(&self, query_id: &str, text: &str, alert: bool) -> Result<()> {
        self.record(Call::Ack {
            query_id: query_id.to_string(),
            text: text.to_string(),
            alert,
        });
        Ok(())
    }
}

/// Handler that counts the updates reaching it
#[derive(Default)]
pub struct CountingHandler {
    handled: AtomicUsize,
    fail: AtomicBool,
}

impl CountingHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every later call fail
    pub fn fail(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }

    pub fn count(&self) -> usize {
        self.handled.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Handler for CountingHandler {
    async fn handle(&self, _update: Update) -> Result<()> {
        self.handled.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::Handler("boom".to_string()));
        }
        Ok(())
    }
}
