//! Courier Core - Headless Streaming-Exchange Lifecycle for ai-courier
//!
//! This crate manages one logical request/answer exchange with a remote
//! inference service whose answer arrives as an incremental sequence of
//! frames over a long-lived chunked connection. It is completely
//! independent of any UI framework and of any particular backend: the
//! hosting application supplies a transport collaborator and a state sink,
//! and the controller does the rest.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    Hosting Application                        │
//! │        (rendering, persistence, prompt assembly)              │
//! │            │                              ▲                   │
//! │     start/cancel/retry          ExchangeNotification          │
//! │            │                              │                   │
//! └────────────┼──────────────────────────────┼───────────────────┘
//!              ▼                              │
//! ┌──────────────────────────────────────────────────────────────┐
//! │                   COURIER CORE                                │
//! │  ┌────────────────────────────────────────────────────────┐  │
//! │  │                ExchangeController                       │  │
//! │  │  ┌───────────┐  ┌─────────────────┐  ┌──────────────┐  │  │
//! │  │  │  Session  │  │ ActivityTimeout │  │  Transport   │  │  │
//! │  │  │  (state)  │  │    (guard)      │  │  (executor)  │  │  │
//! │  │  └───────────┘  └─────────────────┘  └──────────────┘  │  │
//! │  └────────────────────────────────────────────────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Key Types
//!
//! - [`ExchangeController`]: owns per-exchange state; `start` / `cancel` /
//!   `status` / `retry`
//! - [`Frame`]: one inbound update unit (content, side-channels, terminal)
//! - [`ExchangeNotification`]: what the application state sink receives
//! - [`TransportExecutor`]: the transport collaborator contract
//! - [`ActivityTimeout`]: the liveness guard raced against the transport
//!
//! # Quick Start
//!
//! ```ignore
//! use courier_core::{
//!     ExchangeController, ExchangeId, OutboundMessage, StartOptions,
//!     config::ControllerConfig,
//!     transport::HttpTransport,
//! };
//! use tokio::sync::mpsc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let (tx, mut rx) = mpsc::channel(100);
//!     let controller = ExchangeController::new(
//!         HttpTransport::from_env(),
//!         ControllerConfig::from_env(),
//!         tx,
//!     );
//!
//!     // Apply notifications to application state as they arrive
//!     tokio::spawn(async move {
//!         while let Some(note) = rx.recv().await {
//!             // route by note.exchange, apply note.kind
//!         }
//!     });
//!
//!     let ok = controller
//!         .start(
//!             ExchangeId::new("m1"),
//!             vec![OutboundMessage::user("Hello")],
//!             StartOptions::default(),
//!         )
//!         .await;
//!
//!     if !ok {
//!         eprintln!("exchange faulted: {:?}", controller.last_fault());
//!     }
//! }
//! ```
//!
//! # Module Overview
//!
//! - [`frame`]: frame model, side-channel variants, outbound messages
//! - [`notifications`]: notifications emitted to the state sink
//! - [`timeout`]: activity timeout guard
//! - [`transport`]: transport executor contract and implementations
//! - [`controller`]: the stream lifecycle controller
//! - [`config`]: defaults, environment, and TOML file loading
//!
//! # No UI Dependencies
//!
//! This crate has **zero** dependencies on any UI framework. It is pure
//! lifecycle logic that can drive a TUI, a GUI, or run headless in tests.

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod controller;
pub mod frame;
pub mod notifications;
pub mod timeout;
pub mod transport;

// Re-exports for convenience
pub use config::{
    default_config_path, load_config, load_config_from_path, ConfigError, ControllerConfig,
    CourierConfig,
};
pub use controller::{ExchangeController, ExchangeFault, ExchangeStatus, StartOptions};
pub use frame::{
    Citation, ExchangeId, Frame, MessageRole, OutboundMessage, SideChannel, UsageMetrics,
};
pub use notifications::{ExchangeNotification, NotificationKind};
pub use timeout::ActivityTimeout;
pub use transport::{
    HttpTransport, HttpTransportConfig, ScriptStep, ScriptedTransport, TransportError,
    TransportEvent, TransportExecutor,
};
