//! Per-actor admission control
//!
//! - [`AdmissionGate`] decides admit/reject per actor and category
//! - [`SessionRegistry`] tracks the countdown shown to throttled actors
//! - [`FeedbackController`] drives those countdowns in background tasks
//! - [`ThrottleMiddleware`] wires both into the dispatch pipeline

pub mod feedback;
pub mod middleware;
pub mod session;
pub mod window;

use std::sync::Arc;

pub use feedback::{Cooldown, FeedbackController};
pub use middleware::ThrottleMiddleware;
pub use session::{FeedbackSession, SessionRegistry, SessionTicket};
pub use window::{Admission, AdmissionGate, AdmissionWindow};

use crate::channels::Notifier;
use crate::config::{FeedbackTexts, ThrottleConfig};

/// Process-wide throttling state
///
/// Created once at startup and shared; holds the window and session maps.
#[derive(Debug, Clone)]
pub struct ThrottleRegistry {
    /// Admission windows
    pub gate: Arc<AdmissionGate>,

    /// Open feedback sessions
    pub sessions: Arc<SessionRegistry>,
}

impl ThrottleRegistry {
    /// Create empty registries with the given rate limits
    #[must_use]
    pub fn new(config: &ThrottleConfig) -> Self {
        Self {
            gate: Arc::new(AdmissionGate::new(config.clone())),
            sessions: Arc::new(SessionRegistry::new()),
        }
    }

    /// Build the throttle middleware over this state
    #[must_use]
    pub fn middleware(
        &self,
        notifier: Arc<dyn Notifier>,
        config: &ThrottleConfig,
        texts: FeedbackTexts,
    ) -> ThrottleMiddleware {
        let feedback =
            FeedbackController::new(notifier, Arc::clone(&self.sessions), config, texts);
        ThrottleMiddleware::new(Arc::clone(&self.gate), feedback)
    }
}
