//! Transport Layer
//!
//! The transport executor contract and the two shipped implementations:
//! an HTTP streaming transport for real inference backends, and a scripted
//! in-process transport for tests and headless demos.
//!
//! The controller is generic over [`TransportExecutor`], so hosts can
//! supply their own delivery mechanism without touching core logic.

pub mod http;
pub mod scripted;
pub mod traits;

pub use http::{HttpTransport, HttpTransportConfig};
pub use scripted::{ScriptStep, ScriptedTransport};
pub use traits::{TransportError, TransportEvent, TransportExecutor};
