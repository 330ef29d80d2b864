//! Sink Notifications
//!
//! Discrete notifications emitted by the controller to the application
//! state sink. The sink is an `mpsc` channel supplied by the hosting
//! application; the core has no opinion about what the host does with a
//! notification (render it, persist it, forward it to a surface).
//!
//! There is exactly one notification kind per observable event, and every
//! notification carries the owning [`ExchangeId`] so hosts multiplexing
//! several controllers can route updates without extra bookkeeping.

use serde::{Deserialize, Serialize};

use crate::frame::{Citation, ExchangeId, UsageMetrics};

/// A notification from the controller to the application state sink
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExchangeNotification {
    /// The exchange this notification belongs to
    pub exchange: ExchangeId,
    /// What happened
    pub kind: NotificationKind,
}

impl ExchangeNotification {
    /// Create a notification for an exchange
    pub fn new(exchange: ExchangeId, kind: NotificationKind) -> Self {
        Self { exchange, kind }
    }
}

/// Kind of sink notification
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum NotificationKind {
    /// Content arrived as a delta; append to the accumulated text
    AppendContent {
        /// The text fragment to append
        text: String,
    },

    /// Content arrived as a full resend; supersede the accumulated text
    ReplaceContent {
        /// The complete answer-so-far
        text: String,
    },

    /// Reasoning trace fragment (side-channel)
    Reasoning {
        /// Reasoning text
        text: String,
    },

    /// Cited sources (side-channel)
    Citations {
        /// The cited sources
        sources: Vec<Citation>,
    },

    /// Follow-up question for the user (side-channel)
    InteractiveQuestion {
        /// The question text
        question: String,
    },

    /// Backend-enriched context (side-channel)
    EnrichedContext {
        /// The enriched context text
        context: String,
    },

    /// Cost/latency telemetry (side-channel)
    UsageMetrics {
        /// The reported metrics
        metrics: UsageMetrics,
    },

    /// The exchange completed. Emitted at most once per session.
    ///
    /// There is deliberately no "cancelled" counterpart; cancellation is
    /// silent toward the sink, mirroring the at-most-once completion
    /// design.
    Complete {
        /// Final accumulated answer text
        text: String,
    },
}
