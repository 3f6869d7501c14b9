//! Feedback sessions: the live countdown shown to a throttled actor
//!
//! The registry is the single source of truth for "is this actor being shown
//! a countdown". Opening is an atomic check-and-create; closing removes the
//! entry and is the only way to obtain ownership of a session's cleanup.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::task::JoinHandle;
use tokio::time::Instant;

use super::window::WindowKey;
use crate::channels::{ActorId, Category, MessageHandle};

/// Live countdown record for one actor and category
#[derive(Debug)]
pub struct FeedbackSession {
    /// Actor being throttled
    pub actor_id: ActorId,

    /// Category whose cooldown is shown
    pub category: Category,

    /// Start of the cooldown being counted down
    pub started_at: Instant,

    /// The "please wait" message, once sent
    pub notification: Option<MessageHandle>,

    /// Background task editing the notification
    pub updater: Option<JoinHandle<()>>,

    id: u64,
}

/// Proof of having opened a specific session
///
/// Tickets carry a generation number so a stale owner can never close a
/// newer session for the same key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionTicket {
    key: WindowKey,
    id: u64,
}

impl SessionTicket {
    /// Actor the session belongs to
    #[must_use]
    pub const fn actor_id(&self) -> ActorId {
        self.key.0
    }

    /// Category of the session
    #[must_use]
    pub const fn category(&self) -> Category {
        self.key.1
    }
}

/// Registry of open feedback sessions
#[derive(Debug, Default)]
pub struct SessionRegistry {
    next_id: AtomicU64,
    sessions: Mutex<HashMap<WindowKey, FeedbackSession>>,
}

impl SessionRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a session unless one is already live for the key
    ///
    /// Returns `None` when a session exists; the caller must reuse it.
    pub fn try_open(
        &self,
        actor_id: ActorId,
        category: Category,
        started_at: Instant,
    ) -> Option<SessionTicket> {
        let key = (actor_id, category);
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());

        if sessions.contains_key(&key) {
            return None;
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        sessions.insert(
            key,
            FeedbackSession {
                actor_id,
                category,
                started_at,
                notification: None,
                updater: None,
                id,
            },
        );

        Some(SessionTicket { key, id })
    }

    /// Record the notification sent for a session
    ///
    /// Returns `false` if the session was closed in the meantime.
    pub fn attach_notification(&self, ticket: &SessionTicket, handle: MessageHandle) -> bool {
        self.with_session(ticket, |session| session.notification = Some(handle))
    }

    /// Record the updater task of a session
    ///
    /// Returns `false` if the session was closed in the meantime; the task
    /// then stays detached and finds nothing to clean up.
    pub fn attach_updater(&self, ticket: &SessionTicket, updater: JoinHandle<()>) -> bool {
        self.with_session(ticket, |session| session.updater = Some(updater))
    }

    /// Remove the session named by `ticket`
    ///
    /// Only the first caller gets the record back; every later call (or a
    /// call with a stale ticket) returns `None`.
    pub fn close(&self, ticket: &SessionTicket) -> Option<FeedbackSession> {
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());

        let owned = sessions
            .get(&ticket.key)
            .is_some_and(|session| session.id == ticket.id);

        if owned {
            sessions.remove(&ticket.key)
        } else {
            None
        }
    }

    /// Remove every session
    pub fn drain(&self) -> Vec<FeedbackSession> {
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        sessions.drain().map(|(_, session)| session).collect()
    }

    /// Whether a session is live for the key
    #[must_use]
    pub fn contains(&self, actor_id: ActorId, category: Category) -> bool {
        let sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        sessions.contains_key(&(actor_id, category))
    }

    /// Notification handle of a live session
    #[must_use]
    pub fn notification(&self, actor_id: ActorId, category: Category) -> Option<MessageHandle> {
        let sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        sessions
            .get(&(actor_id, category))
            .and_then(|session| session.notification)
    }

    /// Number of live sessions
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Whether no session is live
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn with_session(&self, ticket: &SessionTicket, apply: impl FnOnce(&mut FeedbackSession)) -> bool {
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());

        match sessions.get_mut(&ticket.key) {
            Some(session) if session.id == ticket.id => {
                apply(session);
                true
            }
            _ => false,
        }
    }
}
