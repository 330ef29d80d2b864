//! Transport Executor Traits
//!
//! Trait contract for transport collaborators. The core never performs the
//! network exchange itself; it hands the outbound messages and a
//! cancellation token to a [`TransportExecutor`] and consumes the event
//! stream the executor produces.
//!
//! # Contract
//!
//! A conforming implementation must:
//! - deliver [`TransportEvent::Frame`] for every inbound update unit, in
//!   arrival order;
//! - deliver [`TransportEvent::Done`] when the exchange settles, even when
//!   the frame stream already carried `terminal = true` (the controller's
//!   idempotent completion guard tolerates the redundancy);
//! - deliver [`TransportEvent::Error`] with a human-readable description
//!   for any transport-level failure;
//! - observe the supplied cancellation token and abort promptly once it is
//!   revoked.

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::frame::{Frame, OutboundMessage};

/// An event from a transport executor.
///
/// These are the three callback slots of the transport contract, delivered
/// as a tagged variant on a channel so the drive loop can race them against
/// the activity timeout.
#[derive(Clone, Debug, PartialEq)]
pub enum TransportEvent {
    /// One inbound update unit
    Frame(Frame),
    /// The exchange settled; may carry a final frame as a safety net for
    /// backends that report completion out-of-band
    Done(Option<Frame>),
    /// The exchange failed
    Error(String),
}

/// Errors surfaced when launching a transport exchange
#[derive(Debug, Error)]
pub enum TransportError {
    /// A required credential is not configured.
    ///
    /// Maps to the non-retryable configuration fault; the caller must fix
    /// configuration, not retry.
    #[error("Missing required credential: {0}")]
    MissingCredential(String),

    /// The request could not be sent
    #[error("Request failed: {0}")]
    RequestFailed(String),

    /// The backend rejected the request
    #[error("Backend returned {status}: {body}")]
    BackendRejected {
        /// HTTP status code
        status: u16,
        /// Response body (may be empty)
        body: String,
    },
}

/// Transport executor contract.
///
/// Implement this trait to connect the controller to a backend delivery
/// mechanism (HTTP chunked responses, an in-process script, a test mock).
#[async_trait]
pub trait TransportExecutor: Send + Sync {
    /// Get the transport name (e.g., "Http", "Scripted")
    fn name(&self) -> &str;

    /// Check if the backend is healthy and reachable
    async fn health_check(&self) -> bool;

    /// Perform the network exchange for one set of outbound messages.
    ///
    /// Returns a channel receiver delivering [`TransportEvent`]s in arrival
    /// order. The channel closing without a `Done` is treated by the
    /// controller as an abnormal disconnect.
    async fn execute(
        &self,
        outbound: &[OutboundMessage],
        cancel: CancellationToken,
    ) -> Result<mpsc::Receiver<TransportEvent>, TransportError>;
}
