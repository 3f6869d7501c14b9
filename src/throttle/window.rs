//! Per-actor admission windows and the gate deciding admit/reject

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::Instant;

use crate::channels::{ActorId, Category};
use crate::config::ThrottleConfig;

/// Registry key: one window per actor and category
pub type WindowKey = (ActorId, Category);

/// "Last admitted at" record for one actor and category
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdmissionWindow {
    /// Actor the window belongs to
    pub actor_id: ActorId,

    /// Last admission (`None` = never admitted)
    pub admitted_at: Option<Instant>,

    /// Cooldown after each admission
    pub rate_limit: Duration,
}

impl AdmissionWindow {
    /// Create a window that has never admitted anything
    #[must_use]
    pub const fn new(actor_id: ActorId, rate_limit: Duration) -> Self {
        Self {
            actor_id,
            admitted_at: None,
            rate_limit,
        }
    }

    /// Cooldown left at `now` (zero when not in cooldown)
    #[must_use]
    pub fn remaining(&self, now: Instant) -> Duration {
        self.admitted_at.map_or(Duration::ZERO, |at| {
            self.rate_limit
                .saturating_sub(now.saturating_duration_since(at))
        })
    }

    /// Whether the actor must be rejected at `now`
    #[must_use]
    pub fn in_cooldown(&self, now: Instant) -> bool {
        !self.remaining(now).is_zero()
    }
}

/// Outcome of an admission check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// The event may proceed; the window now starts at this instant
    Admitted,
    /// The actor is in cooldown
    Rejected {
        /// Start of the running cooldown
        admitted_at: Instant,
        /// Cooldown left at the time of the check
        remaining: Duration,
    },
}

impl Admission {
    /// Whether the event was admitted
    #[must_use]
    pub const fn is_admitted(&self) -> bool {
        matches!(self, Self::Admitted)
    }
}

/// Decides for each event whether its actor is inside the cooldown window
///
/// Only an admission moves the window forward; rejected events leave it
/// untouched. The map lock is never held across an `.await`.
#[derive(Debug)]
pub struct AdmissionGate {
    limits: ThrottleConfig,
    windows: Mutex<HashMap<WindowKey, AdmissionWindow>>,
}

impl AdmissionGate {
    /// Create a gate using the per-category rate limits of `limits`
    #[must_use]
    pub fn new(limits: ThrottleConfig) -> Self {
        Self {
            limits,
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// Cooldown configured for a category
    #[must_use]
    pub const fn rate_limit(&self, category: Category) -> Duration {
        self.limits.rate_limit(category)
    }

    /// Admit or reject an event from `actor_id` right now
    pub fn admit(&self, actor_id: ActorId, category: Category) -> bool {
        self.check(actor_id, category).is_admitted()
    }

    /// Admit or reject, returning the cooldown snapshot on rejection
    pub fn check(&self, actor_id: ActorId, category: Category) -> Admission {
        self.check_at(actor_id, category, Instant::now())
    }

    /// Admit or reject as of `now`
    pub fn check_at(&self, actor_id: ActorId, category: Category, now: Instant) -> Admission {
        let rate_limit = self.rate_limit(category);
        let mut windows = self.windows.lock().unwrap_or_else(|e| e.into_inner());

        let window = windows
            .entry((actor_id, category))
            .or_insert_with(|| AdmissionWindow::new(actor_id, rate_limit));

        if let Some(admitted_at) = window.admitted_at {
            let remaining = window.remaining(now);
            if !remaining.is_zero() {
                return Admission::Rejected {
                    admitted_at,
                    remaining,
                };
            }
        }

        window.admitted_at = Some(now);
        Admission::Admitted
    }

    /// Snapshot of an actor's window
    #[must_use]
    pub fn window(&self, actor_id: ActorId, category: Category) -> Option<AdmissionWindow> {
        let windows = self.windows.lock().unwrap_or_else(|e| e.into_inner());
        windows.get(&(actor_id, category)).copied()
    }

    /// Drop windows whose cooldown is over, returning how many were removed
    pub fn evict_expired(&self) -> usize {
        self.evict_expired_at(Instant::now())
    }

    /// Drop windows whose cooldown is over as of `now`
    pub fn evict_expired_at(&self, now: Instant) -> usize {
        let mut windows = self.windows.lock().unwrap_or_else(|e| e.into_inner());
        let before = windows.len();
        windows.retain(|_, w| w.in_cooldown(now));
        before - windows.len()
    }

    /// Number of tracked windows
    #[must_use]
    pub fn len(&self) -> usize {
        self.windows.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Whether no windows are tracked
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Spawn a reaper that evicts expired windows every `interval`
    ///
    /// Expiry is passive without it; the reaper only bounds memory.
    pub fn spawn_reaper(self: &Arc<Self>, interval: Duration) -> tokio::task::JoinHandle<()> {
        let gate = Arc::downgrade(self);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // First tick completes immediately
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let Some(gate) = gate.upgrade() else {
                    tracing::debug!("admission gate dropped, stopping reaper");
                    return;
                };
                let evicted = gate.evict_expired();
                if evicted > 0 {
                    tracing::debug!(evicted, remaining = gate.len(), "evicted expired windows");
                }
            }
        })
    }
}
