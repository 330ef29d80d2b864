//! Stream Lifecycle Controller
//!
//! Owns the mutable state of one logical request/answer exchange and
//! translates the transport's frame stream into sink notifications. The
//! controller races the transport outcome against the activity timeout,
//! supports cooperative cancellation with session replacement, and
//! guarantees exactly-once completion toward the sink.
//!
//! # Design Philosophy
//!
//! The controller is deliberately boring at its boundary: `start` returns a
//! bool, faults are recorded and queried rather than thrown, and the sink
//! only ever sees the notification kinds in `notifications.rs`. Callers
//! should not need exception-style control flow for expected, recoverable
//! conditions like a timeout or an abort.
//!
//! At most one session is live per controller instance; that restriction
//! is itself the concurrency-control mechanism. Hosts wanting parallel
//! exchanges run one controller per exchange.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::config::ControllerConfig;
use crate::frame::{ExchangeId, Frame, OutboundMessage, SideChannel};
use crate::notifications::{ExchangeNotification, NotificationKind};
use crate::timeout::ActivityTimeout;
use crate::transport::{TransportError, TransportEvent, TransportExecutor};

/// Grace period between revoking a session's token and nulling its state,
/// so an in-flight callback can drain without observing a half-torn-down
/// session.
const CANCEL_DRAIN_GRACE: Duration = Duration::from_millis(50);

// ============================================================================
// Faults
// ============================================================================

/// A fault recorded by the controller.
///
/// Faults never propagate as errors across the public boundary; they
/// surface as `false` from `start` and are queryable via `status()` /
/// `last_fault()`.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum ExchangeFault {
    /// `start` was called while a session was active and interruption was
    /// not permitted
    #[error("a session is already active and interruption is not permitted")]
    ConcurrencyRejected,

    /// The transport collaborator reported a failure
    #[error("transport fault: {message}")]
    Transport {
        /// Fault description from the transport
        message: String,
    },

    /// No activity within the configured window
    #[error("no activity within {after:?}")]
    Timeout {
        /// The silence bound that elapsed
        after: Duration,
    },

    /// A required credential or setting is missing; fix configuration, do
    /// not retry
    #[error("configuration fault: {message}")]
    Configuration {
        /// What is misconfigured
        message: String,
    },
}

impl ExchangeFault {
    /// Whether this fault may be retried via `retry()`
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::Timeout { .. })
    }
}

// ============================================================================
// Options and status
// ============================================================================

/// Per-call options for `start`
#[derive(Clone, Copy, Debug, Default)]
pub struct StartOptions {
    /// Override the configured interruption policy for this call
    pub allow_interruption: Option<bool>,
}

impl StartOptions {
    /// Permit this call to preempt an active session
    #[must_use]
    pub fn interrupting() -> Self {
        Self {
            allow_interruption: Some(true),
        }
    }
}

/// Snapshot of the controller's observable state
#[derive(Clone, Debug)]
pub struct ExchangeStatus {
    /// Whether a session is live
    pub active: bool,
    /// Id of the current (or draining) session, if any
    pub id: Option<ExchangeId>,
    /// Whether a fault is recorded
    pub has_fault: bool,
    /// Whether `retry()` would succeed right now
    pub can_retry: bool,
}

// ============================================================================
// Session state
// ============================================================================

/// Mutable state owned exclusively by the controller for one exchange
struct ExchangeSession {
    /// Caller-supplied correlation token
    id: ExchangeId,
    /// Unique per-session fence; stale signals from a retired session can
    /// never touch a successor carrying a different epoch
    epoch: Uuid,
    /// Revocable handle threaded through this exchange
    cancel: CancellationToken,
    /// Answer text accumulated so far
    accumulated: String,
    /// Idempotent completion guard
    has_completed: bool,
}

impl ExchangeSession {
    fn is_live(&self) -> bool {
        !self.cancel.is_cancelled() && !self.has_completed
    }
}

/// Controller state behind the lock. `retry_count` and `last_fault`
/// survive session teardown; only a successful completion resets them.
struct ControllerState {
    session: Option<ExchangeSession>,
    last_fault: Option<ExchangeFault>,
    retry_count: u32,
}

// ============================================================================
// Controller
// ============================================================================

/// The stream lifecycle controller.
///
/// Generic over the transport collaborator; emits to the application state
/// sink through the channel supplied at construction. Methods take `&self`
/// so `cancel` and `status` can be called while `start` is suspended.
pub struct ExchangeController<T: TransportExecutor> {
    /// Transport collaborator
    transport: Arc<T>,
    /// Application state sink
    sink: mpsc::Sender<ExchangeNotification>,
    /// Configuration
    config: ControllerConfig,
    /// Mutable state (never locked across an await)
    state: Mutex<ControllerState>,
}

impl<T: TransportExecutor> ExchangeController<T> {
    /// Create a controller with the given transport, configuration, and
    /// sink channel
    pub fn new(
        transport: T,
        config: ControllerConfig,
        sink: mpsc::Sender<ExchangeNotification>,
    ) -> Self {
        Self {
            transport: Arc::new(transport),
            sink,
            config,
            state: Mutex::new(ControllerState {
                session: None,
                last_fault: None,
                retry_count: 0,
            }),
        }
    }

    /// Get the configuration
    #[must_use]
    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// Start a new exchange.
    ///
    /// Suspends until the transport settles, the activity timeout fires,
    /// or the session is cancelled. Returns `true` only when the exchange
    /// completed; any fault is recorded and surfaced as `false`. The
    /// caller is assumed to have already announced the exchange to its own
    /// UI layer; no "started" notification is emitted here.
    pub async fn start(
        &self,
        id: ExchangeId,
        outbound: Vec<OutboundMessage>,
        options: StartOptions,
    ) -> bool {
        let allow_interruption = options
            .allow_interruption
            .unwrap_or(self.config.allow_interruption);

        let occupied = {
            let state = self.state.lock();
            state.session.as_ref().is_some_and(ExchangeSession::is_live)
        };

        if occupied {
            if !allow_interruption {
                tracing::warn!(exchange = %id, "Rejected start while a session is active");
                self.state.lock().last_fault = Some(ExchangeFault::ConcurrencyRejected);
                return false;
            }
            // Preempt: cancel and clean up the active session first.
            self.cancel().await;
        }

        let (epoch, token) = {
            let mut state = self.state.lock();
            let token = CancellationToken::new();
            let epoch = Uuid::new_v4();
            state.session = Some(ExchangeSession {
                id: id.clone(),
                epoch,
                cancel: token.clone(),
                accumulated: String::new(),
                has_completed: false,
            });
            (epoch, token)
        };

        tracing::debug!(exchange = %id, transport = self.transport.name(), "Starting exchange");

        let rx = match self.transport.execute(&outbound, token.child_token()).await {
            Ok(rx) => rx,
            Err(e) => {
                let fault = match e {
                    TransportError::MissingCredential(_) => ExchangeFault::Configuration {
                        message: e.to_string(),
                    },
                    other => ExchangeFault::Transport {
                        message: other.to_string(),
                    },
                };
                tracing::warn!(exchange = %id, fault = %fault, "Exchange failed to launch");
                self.fail(epoch, fault);
                return false;
            }
        };

        self.drive(epoch, token, rx).await
    }

    /// Cancel the active session.
    ///
    /// Returns `true` iff a session was active. Revokes the token, waits a
    /// short drain grace for in-flight callbacks, then performs
    /// epoch-guarded cleanup. Deliberately silent toward the sink: there
    /// is no "cancelled" notification kind.
    pub async fn cancel(&self) -> bool {
        let (epoch, token) = {
            let state = self.state.lock();
            match state.session.as_ref().filter(|s| s.is_live()) {
                Some(session) => (session.epoch, session.cancel.clone()),
                None => return false,
            }
        };

        token.cancel();
        tokio::time::sleep(CANCEL_DRAIN_GRACE).await;

        let mut state = self.state.lock();
        if state.session.as_ref().is_some_and(|s| s.epoch == epoch) {
            state.session = None;
        }
        true
    }

    /// Snapshot the controller's observable state
    #[must_use]
    pub fn status(&self) -> ExchangeStatus {
        let state = self.state.lock();
        ExchangeStatus {
            active: state.session.as_ref().is_some_and(ExchangeSession::is_live),
            id: state.session.as_ref().map(|s| s.id.clone()),
            has_fault: state.last_fault.is_some(),
            can_retry: self.can_retry_locked(&state),
        }
    }

    /// The most recent fault, if any
    #[must_use]
    pub fn last_fault(&self) -> Option<ExchangeFault> {
        self.state.lock().last_fault.clone()
    }

    /// Whether a recorded fault can be retried: the fault is retryable,
    /// the retry ceiling is not reached, and no session is live
    #[must_use]
    pub fn can_retry(&self) -> bool {
        self.can_retry_locked(&self.state.lock())
    }

    /// Clear the fault and consume one retry credit.
    ///
    /// Does not resubmit the original outbound messages; the controller
    /// does not retain request payloads across faults. The caller must
    /// call `start` again.
    pub fn retry(&self) -> bool {
        let mut state = self.state.lock();
        if !self.can_retry_locked(&state) {
            return false;
        }
        state.last_fault = None;
        state.retry_count += 1;
        true
    }

    fn can_retry_locked(&self, state: &ControllerState) -> bool {
        state
            .last_fault
            .as_ref()
            .is_some_and(ExchangeFault::is_retryable)
            && state.retry_count < self.config.max_retries
            && !state.session.as_ref().is_some_and(ExchangeSession::is_live)
    }

    // ------------------------------------------------------------------
    // Drive loop
    // ------------------------------------------------------------------

    /// Race the transport's event stream against the activity timeout.
    ///
    /// The guard is disarmed on every exit path; a stale deadline must
    /// never outlive its session.
    async fn drive(
        &self,
        epoch: Uuid,
        cancel: CancellationToken,
        mut rx: mpsc::Receiver<TransportEvent>,
    ) -> bool {
        let mut guard = ActivityTimeout::new(self.config.max_timeout);

        loop {
            tokio::select! {
                // Revocation must win over queued events; a cancelled
                // session never applies another frame or completes.
                biased;

                () = cancel.cancelled() => {
                    // cancel() owns the cleanup; exit silently.
                    guard.disarm();
                    return false;
                }

                () = guard.expired() => {
                    guard.disarm();
                    cancel.cancel();
                    tracing::warn!(after = ?self.config.max_timeout, "Exchange timed out waiting for activity");
                    self.fail(
                        epoch,
                        ExchangeFault::Timeout {
                            after: self.config.max_timeout,
                        },
                    );
                    return false;
                }

                event = rx.recv() => match event {
                    Some(TransportEvent::Frame(frame)) => {
                        guard.rearm();
                        if self.apply_frame(epoch, &frame).await {
                            guard.disarm();
                            self.finish(epoch);
                            return true;
                        }
                    }

                    Some(TransportEvent::Done(final_frame)) => {
                        guard.disarm();
                        if let Some(frame) = final_frame {
                            self.apply_frame(epoch, &frame).await;
                        }
                        // Safety net for backends that never send a
                        // terminal frame; idempotent when they did.
                        self.complete(epoch).await;
                        self.finish(epoch);
                        return true;
                    }

                    Some(TransportEvent::Error(description)) => {
                        guard.disarm();
                        cancel.cancel();
                        if is_usage_limit_signal(&description) {
                            tracing::warn!(description = %description, "Backend reported usage limit exceeded");
                        } else {
                            tracing::warn!(description = %description, "Transport reported a fault");
                        }
                        self.fail(
                            epoch,
                            ExchangeFault::Transport {
                                message: description,
                            },
                        );
                        return false;
                    }

                    None => {
                        guard.disarm();
                        cancel.cancel();
                        self.fail(
                            epoch,
                            ExchangeFault::Transport {
                                message: "Stream disconnected unexpectedly".to_string(),
                            },
                        );
                        return false;
                    }
                }
            }
        }
    }

    /// Apply one inbound frame: accumulate content, translate side-channel
    /// signals, and handle a terminal flag. Returns `true` when this frame
    /// completed the exchange.
    ///
    /// Frames addressed to a retired or completed session are dropped.
    async fn apply_frame(&self, epoch: Uuid, frame: &Frame) -> bool {
        let exchange = {
            let mut state = self.state.lock();
            let Some(session) = state.session.as_mut().filter(|s| s.epoch == epoch) else {
                tracing::debug!("Dropping frame for a retired session");
                return false;
            };
            if session.has_completed {
                tracing::debug!(exchange = %session.id, "Dropping frame after terminal");
                return false;
            }
            if let Some(ref text) = frame.content {
                if frame.replace {
                    session.accumulated = text.clone();
                } else {
                    session.accumulated.push_str(text);
                }
            }
            session.id.clone()
        };

        if let Some(ref text) = frame.content {
            let kind = if frame.replace {
                NotificationKind::ReplaceContent { text: text.clone() }
            } else {
                NotificationKind::AppendContent { text: text.clone() }
            };
            self.notify(&exchange, kind).await;
        }

        for channel in &frame.side_channels {
            let kind = match channel.clone() {
                SideChannel::Reasoning { text } => NotificationKind::Reasoning { text },
                SideChannel::Citations { sources } => NotificationKind::Citations { sources },
                SideChannel::InteractiveQuestion { question } => {
                    NotificationKind::InteractiveQuestion { question }
                }
                SideChannel::EnrichedContext { context } => {
                    NotificationKind::EnrichedContext { context }
                }
                SideChannel::UsageMetrics(metrics) => NotificationKind::UsageMetrics { metrics },
            };
            self.notify(&exchange, kind).await;
        }

        if frame.terminal {
            return self.complete(epoch).await;
        }
        false
    }

    /// Complete the session exactly once. Returns `true` when this call
    /// performed the completion; a redundant signal is a no-op.
    async fn complete(&self, epoch: Uuid) -> bool {
        let completion = {
            let mut state = self.state.lock();
            match state.session.as_mut().filter(|s| s.epoch == epoch) {
                Some(session) if !session.has_completed => {
                    session.has_completed = true;
                    Some((session.id.clone(), session.accumulated.clone()))
                }
                Some(session) => {
                    // Tolerated, but worth a trace: repeated completions
                    // may indicate a racing backend rather than the usual
                    // defensive onDone.
                    tracing::debug!(exchange = %session.id, "Ignoring redundant completion signal");
                    None
                }
                None => None,
            }
        };

        match completion {
            Some((exchange, text)) => {
                self.notify(&exchange, NotificationKind::Complete { text })
                    .await;
                true
            }
            None => false,
        }
    }

    /// Retire a successfully completed session and reset fault/retry
    /// bookkeeping. Epoch-guarded.
    fn finish(&self, epoch: Uuid) {
        let mut state = self.state.lock();
        if state.session.as_ref().is_some_and(|s| s.epoch == epoch) {
            state.session = None;
            state.last_fault = None;
            state.retry_count = 0;
        }
    }

    /// Record a fault and retire the session. Epoch-guarded: a stale fault
    /// from a retired session never touches a successor.
    fn fail(&self, epoch: Uuid, fault: ExchangeFault) {
        let mut state = self.state.lock();
        if state.session.as_ref().is_some_and(|s| s.epoch == epoch) {
            state.session = None;
            state.last_fault = Some(fault);
        } else {
            tracing::debug!(fault = %fault, "Ignoring fault from a retired session");
        }
    }

    /// Send a notification to the application state sink
    async fn notify(&self, exchange: &ExchangeId, kind: NotificationKind) {
        if let Err(e) = self
            .sink
            .send(ExchangeNotification::new(exchange.clone(), kind))
            .await
        {
            tracing::warn!(error = %e, "Failed to deliver notification to sink");
        }
    }
}

/// Whether a transport fault description is a structured "usage limit
/// exceeded" signal. Classification affects logging only; the fault path
/// is the same.
fn is_usage_limit_signal(description: &str) -> bool {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(description) {
        let kind = value
            .get("error")
            .and_then(|e| e.get("type"))
            .or_else(|| value.get("type"))
            .and_then(serde_json::Value::as_str);
        if kind == Some("usage_limit_exceeded") {
            return true;
        }
    }
    description.contains("usage_limit_exceeded")
}

// ============================================================================
// Tests
// ============================================================================
