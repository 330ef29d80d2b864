//! Courier Probe
//!
//! Minimal headless driver for the exchange core. Runs a single exchange
//! against the configured HTTP endpoint (or a built-in script in offline
//! mode) and prints every sink notification, which makes it useful for
//! smoke-testing a backend and for watching the frame stream without any
//! UI attached.
//!
//! # Usage
//!
//! ```bash
//! # Ask the configured endpoint a question
//! courier-probe "What is the airspeed velocity of an unladen swallow?"
//!
//! # Offline mode: replay a built-in script instead of touching the network
//! courier-probe --scripted
//!
//! # With verbose logging
//! RUST_LOG=debug courier-probe "hello"
//! ```
//!
//! # Environment Variables
//!
//! - `COURIER_ENDPOINT`: exchange endpoint URL
//! - `COURIER_API_KEY`: bearer credential
//! - `COURIER_MAX_TIMEOUT_SECS`: activity-timeout bound
//! - `RUST_LOG`: log level (trace, debug, info, warn, error)
//!
//! Exits non-zero when the exchange faults.

use tracing::info;

use courier_core::{
    load_config, ControllerConfig, ExchangeController, ExchangeId, ExchangeNotification,
    HttpTransport, NotificationKind, OutboundMessage, ScriptedTransport, StartOptions,
    TransportExecutor,
};

/// Run one exchange and print every notification
async fn run_exchange<T: TransportExecutor + 'static>(
    transport: T,
    config: ControllerConfig,
    prompt: String,
) -> anyhow::Result<bool> {
    let (tx, mut rx) = tokio::sync::mpsc::channel::<ExchangeNotification>(100);
    let controller = ExchangeController::new(transport, config, tx);

    let printer = tokio::spawn(async move {
        while let Some(note) = rx.recv().await {
            match note.kind {
                NotificationKind::AppendContent { text } => print!("{text}"),
                NotificationKind::ReplaceContent { text } => print!("\r{text}"),
                NotificationKind::Reasoning { text } => {
                    println!("\n[reasoning] {text}");
                }
                NotificationKind::Citations { sources } => {
                    println!("\n[citations] {} source(s)", sources.len());
                }
                NotificationKind::InteractiveQuestion { question } => {
                    println!("\n[question] {question}");
                }
                NotificationKind::EnrichedContext { context } => {
                    println!("\n[context] {context}");
                }
                NotificationKind::UsageMetrics { metrics } => {
                    println!("\n[usage] {metrics:?}");
                }
                NotificationKind::Complete { text } => {
                    println!("\n--- complete ({} chars) ---", text.len());
                }
            }
        }
    });

    let ok = controller
        .start(
            ExchangeId::new("probe"),
            vec![OutboundMessage::user(prompt)],
            StartOptions::default(),
        )
        .await;

    if !ok {
        if let Some(fault) = controller.last_fault() {
            eprintln!("exchange faulted: {fault}");
        }
    }

    drop(controller);
    printer.await?;
    Ok(ok)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("courier_probe=info".parse()?)
                .add_directive("courier_core=info".parse()?),
        )
        .with_target(true)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let scripted = args.iter().any(|a| a == "--scripted");
    let prompt = args
        .iter()
        .find(|a| !a.starts_with("--"))
        .cloned()
        .unwrap_or_else(|| "Say hello in five words or less.".to_string());

    let ok = if scripted {
        info!("Running against the built-in script");
        let transport = ScriptedTransport::answer(&["Hello", " from", " the", " script!"]);
        run_exchange(transport, ControllerConfig::default(), prompt).await?
    } else {
        let config = load_config()?;
        let transport = HttpTransport::new(config.transport.clone());
        info!(endpoint = transport.endpoint(), "Probing exchange endpoint");
        run_exchange(transport, config.controller, prompt).await?
    };

    if !ok {
        std::process::exit(1);
    }
    Ok(())
}
