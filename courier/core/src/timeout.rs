//! Activity Timeout Guard
//!
//! Detects connection staleness on an otherwise opaque channel. The guard
//! holds one deadline; every inbound signal rearms it, and silence past the
//! window resolves [`ActivityTimeout::expired`] so the drive loop can race
//! the fault against the transport outcome.
//!
//! A guard must be disarmed on every exit path. A disarmed guard never
//! fires, so a timer left over from a retired session cannot resolve into
//! a fault for a later one. The controller adds a second fence (the session
//! epoch) on top of this; see `controller.rs`.

use std::pin::Pin;
use std::time::Duration;

use tokio::time::{sleep, Instant, Sleep};

/// Liveness deadline for one exchange session.
///
/// Exactly one guard exists per live session, owned by the session's drive
/// loop. `expired()` is cancel-safe and intended for `tokio::select!`.
pub struct ActivityTimeout {
    /// The silence bound
    window: Duration,
    /// The pending deadline
    deadline: Pin<Box<Sleep>>,
    /// Whether the guard may fire at all
    armed: bool,
}

impl ActivityTimeout {
    /// Create an armed guard whose deadline is `window` from now
    #[must_use]
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            deadline: Box::pin(sleep(window)),
            armed: true,
        }
    }

    /// Reschedule the deadline to `window` from now.
    ///
    /// Called unconditionally for every inbound signal, including
    /// liveness-only frames with no content; a slow but alive backend must
    /// not be mistaken for a dead one.
    pub fn rearm(&mut self) {
        let window = self.window;
        self.deadline.as_mut().reset(Instant::now() + window);
        self.armed = true;
    }

    /// Cancel the guard without firing. A disarmed guard's `expired()`
    /// never resolves.
    pub fn disarm(&mut self) {
        self.armed = false;
    }

    /// Whether the guard can still fire
    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// The configured silence bound
    #[must_use]
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Resolves when the window elapses without a rearm
    pub async fn expired(&mut self) {
        if !self.armed {
            std::future::pending::<()>().await;
        }
        self.deadline.as_mut().await;
    }
}

impl std::fmt::Debug for ActivityTimeout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActivityTimeout")
            .field("window", &self.window)
            .field("armed", &self.armed)
            .finish()
    }
}
