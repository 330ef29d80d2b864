//! Chaos tests
//!
//! Adversarial timing scenarios for the exchange lifecycle: repeated
//! cancellation, session replacement while a prior cancellation is still
//! draining, and rapid back-to-back exchanges on one controller. These
//! tests care about state consistency, not about happy-path output.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use courier_core::{
    ControllerConfig, ExchangeController, ExchangeId, ExchangeNotification, Frame,
    NotificationKind, ScriptStep, ScriptedTransport, StartOptions,
};

fn config() -> ControllerConfig {
    ControllerConfig {
        max_timeout: Duration::from_secs(2),
        max_retries: 3,
        allow_interruption: false,
    }
}

fn drain(rx: &mut mpsc::Receiver<ExchangeNotification>) -> Vec<ExchangeNotification> {
    let mut collected = Vec::new();
    while let Ok(note) = rx.try_recv() {
        collected.push(note);
    }
    collected
}

/// Cancelling the same controller repeatedly is harmless: the first call
/// reports an active session, the rest report nothing to cancel.
#[tokio::test]
async fn test_cancellation_storm() {
    let (tx, mut rx) = mpsc::channel(100);
    let transport = ScriptedTransport::new(vec![
        ScriptStep::frame(Frame::content("never finished")),
        ScriptStep::pause(Duration::from_secs(30)),
    ]);
    let controller = Arc::new(ExchangeController::new(transport, config(), tx));

    let runner = Arc::clone(&controller);
    let task = tokio::spawn(async move {
        runner
            .start(ExchangeId::new("storm"), vec![], StartOptions::default())
            .await
    });
    tokio::time::sleep(Duration::from_millis(30)).await;

    let mut active_cancels = 0;
    for _ in 0..5 {
        if controller.cancel().await {
            active_cancels += 1;
        }
    }
    assert_eq!(active_cancels, 1, "only the first cancel finds a session");

    assert!(!task.await.unwrap());
    let status = controller.status();
    assert!(!status.active);
    assert!(!status.has_fault, "cancellation records no fault");

    // Cancellation is silent: content before the cancel, nothing after.
    let notes = drain(&mut rx);
    assert!(notes
        .iter()
        .all(|n| matches!(n.kind, NotificationKind::AppendContent { .. })));
}

/// A new session may begin while the prior cancellation's drain delay is
/// still pending; the late cleanup must not null the successor.
#[tokio::test]
async fn test_start_during_cancel_drain() {
    let (tx, mut rx) = mpsc::channel(100);
    let transport = ScriptedTransport::new(vec![
        ScriptStep::frame(Frame::content("answer")),
        ScriptStep::pause(Duration::from_millis(120)),
        ScriptStep::frame(Frame::terminal()),
        ScriptStep::done(),
    ]);
    let controller = Arc::new(ExchangeController::new(transport, config(), tx));

    let first = Arc::clone(&controller);
    let first_task = tokio::spawn(async move {
        first
            .start(ExchangeId::new("old"), vec![], StartOptions::default())
            .await
    });
    tokio::time::sleep(Duration::from_millis(20)).await;

    // Fire the cancel but do not await its drain before starting anew;
    // the interrupting start overlaps the drain window.
    let canceller = Arc::clone(&controller);
    let cancel_task = tokio::spawn(async move { canceller.cancel().await });
    tokio::time::sleep(Duration::from_millis(5)).await;

    let ok = controller
        .start(
            ExchangeId::new("new"),
            vec![],
            StartOptions::interrupting(),
        )
        .await;
    assert!(ok, "successor must complete despite the pending drain");
    assert!(cancel_task.await.unwrap());
    assert!(!first_task.await.unwrap());

    let notes = drain(&mut rx);
    let complete = notes
        .iter()
        .find(|n| matches!(n.kind, NotificationKind::Complete { .. }))
        .expect("successor completion");
    assert_eq!(complete.exchange, ExchangeId::new("new"));

    let status = controller.status();
    assert!(!status.active);
    assert!(!status.has_fault);
}

/// One controller can run many exchanges back to back; accumulation never
/// leaks across sessions.
#[tokio::test]
async fn test_rapid_sequential_exchanges() {
    let (tx, mut rx) = mpsc::channel(200);
    let transport = ScriptedTransport::answer(&["round"]);
    let controller = ExchangeController::new(transport, config(), tx);

    for i in 0..5 {
        let id = ExchangeId::new(format!("ex-{i}"));
        assert!(
            controller
                .start(id.clone(), vec![], StartOptions::default())
                .await
        );

        let notes = drain(&mut rx);
        assert!(notes.iter().all(|n| n.exchange == id));
        assert_eq!(
            notes.last().unwrap().kind,
            NotificationKind::Complete {
                text: "round".to_string()
            },
            "each session accumulates from empty"
        );
    }
}

/// Cancel immediately after start, before any frame arrives; the session
/// retires without faults or notifications.
#[tokio::test]
async fn test_cancel_before_first_frame() {
    let (tx, mut rx) = mpsc::channel(100);
    let transport = ScriptedTransport::new(vec![
        ScriptStep::pause(Duration::from_secs(30)),
        ScriptStep::frame(Frame::content("too late")),
    ]);
    let controller = Arc::new(ExchangeController::new(transport, config(), tx));

    let runner = Arc::clone(&controller);
    let task = tokio::spawn(async move {
        runner
            .start(ExchangeId::new("early"), vec![], StartOptions::default())
            .await
    });
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert!(controller.cancel().await);
    assert!(!task.await.unwrap());
    assert!(drain(&mut rx).is_empty());
    assert!(!controller.status().has_fault);
}
