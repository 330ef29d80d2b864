//! Scripted Transport
//!
//! Replays a predetermined event script instead of talking to a network
//! backend. Used by the test suites, the probe binary's offline mode, and
//! hosts that want to exercise their sink plumbing headlessly.
//!
//! Scripts are explicit: the transport emits exactly the steps it is given
//! (plus optional pauses) and nothing else, so tests can express imperfect
//! backends — a terminal frame followed by a redundant `Done`, an error
//! mid-stream, or long silences that trip the activity timeout.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::frame::{Frame, OutboundMessage};

use super::traits::{TransportError, TransportEvent, TransportExecutor};

/// One step of a transport script
#[derive(Clone, Debug)]
pub enum ScriptStep {
    /// Emit an event to the controller
    Emit(TransportEvent),
    /// Sleep before the next step (cancellation-aware)
    Pause(Duration),
}

impl ScriptStep {
    /// Emit a frame
    #[must_use]
    pub fn frame(frame: Frame) -> Self {
        Self::Emit(TransportEvent::Frame(frame))
    }

    /// Emit a completion signal
    #[must_use]
    pub fn done() -> Self {
        Self::Emit(TransportEvent::Done(None))
    }

    /// Emit an error
    pub fn error(description: impl Into<String>) -> Self {
        Self::Emit(TransportEvent::Error(description.into()))
    }

    /// Pause between steps
    #[must_use]
    pub fn pause(duration: Duration) -> Self {
        Self::Pause(duration)
    }
}

/// A transport that replays a fixed script
#[derive(Clone, Debug, Default)]
pub struct ScriptedTransport {
    /// The steps to replay, in order
    steps: Vec<ScriptStep>,
}

impl ScriptedTransport {
    /// Create a transport replaying the given steps
    #[must_use]
    pub fn new(steps: Vec<ScriptStep>) -> Self {
        Self { steps }
    }

    /// Build a script that streams the given fragments as delta frames,
    /// ends with a terminal frame, and settles with `Done`.
    #[must_use]
    pub fn answer(fragments: &[&str]) -> Self {
        let mut steps: Vec<ScriptStep> = fragments
            .iter()
            .map(|text| ScriptStep::frame(Frame::content(*text)))
            .collect();
        steps.push(ScriptStep::frame(Frame::terminal()));
        steps.push(ScriptStep::done());
        Self::new(steps)
    }
}

#[async_trait]
impl TransportExecutor for ScriptedTransport {
    fn name(&self) -> &'static str {
        "Scripted"
    }

    async fn health_check(&self) -> bool {
        true
    }

    async fn execute(
        &self,
        _outbound: &[OutboundMessage],
        cancel: CancellationToken,
    ) -> Result<mpsc::Receiver<TransportEvent>, TransportError> {
        let (tx, rx) = mpsc::channel(100);
        let steps = self.steps.clone();

        tokio::spawn(async move {
            for step in steps {
                match step {
                    ScriptStep::Pause(duration) => {
                        tokio::select! {
                            () = cancel.cancelled() => return,
                            () = tokio::time::sleep(duration) => {}
                        }
                    }
                    ScriptStep::Emit(event) => {
                        if cancel.is_cancelled() {
                            return;
                        }
                        if tx.send(event).await.is_err() {
                            // Receiver dropped, stop replaying
                            return;
                        }
                    }
                }
            }
        });

        Ok(rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_script_replays_in_order() {
        let transport = ScriptedTransport::answer(&["Hello", " world"]);
        let mut rx = transport
            .execute(&[OutboundMessage::user("hi")], CancellationToken::new())
            .await
            .unwrap();

        let first = rx.recv().await.unwrap();
        assert_eq!(first, TransportEvent::Frame(Frame::content("Hello")));

        let second = rx.recv().await.unwrap();
        assert_eq!(second, TransportEvent::Frame(Frame::content(" world")));

        let third = rx.recv().await.unwrap();
        assert_eq!(third, TransportEvent::Frame(Frame::terminal()));

        let fourth = rx.recv().await.unwrap();
        assert_eq!(fourth, TransportEvent::Done(None));

        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_cancellation_stops_replay_promptly() {
        let transport = ScriptedTransport::new(vec![
            ScriptStep::frame(Frame::content("early")),
            ScriptStep::pause(Duration::from_secs(30)),
            ScriptStep::frame(Frame::content("late")),
        ]);

        let cancel = CancellationToken::new();
        let mut rx = transport
            .execute(&[], cancel.clone())
            .await
            .unwrap();

        assert!(rx.recv().await.is_some());

        // Revoke while the script sleeps; the channel must close without
        // the trailing frame ever arriving.
        cancel.cancel();
        let next = tokio::time::timeout(Duration::from_millis(100), rx.recv()).await;
        assert!(matches!(next, Ok(None)));
    }
}
