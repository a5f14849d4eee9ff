// Copyright (c) The cellmaster Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::{pin::Pin, time::Duration};
use tokio::time::{Instant, Sleep};

/// The master's single one-shot phase timeout.
///
/// Arming while armed implicitly disarms the previous timeout, so at most
/// one timeout is ever pending. When timeouts are disabled by configuration,
/// arming and disarming are no-ops and [`TimeoutTimer::fired`] never
/// resolves.
///
/// Disarming is implemented by resetting the underlying sleep to a
/// far-future deadline rather than dropping it, so the timer can live across
/// iterations of the dispatcher's select loop.
#[derive(Debug)]
pub(crate) struct TimeoutTimer {
    enabled: bool,
    sleep: Pin<Box<Sleep>>,
    // The message to report when the timeout fires; None while disarmed.
    armed: Option<String>,
}

impl TimeoutTimer {
    pub(crate) fn new(enabled: bool) -> Self {
        Self {
            enabled,
            sleep: Box::pin(tokio::time::sleep_until(far_future())),
            armed: None,
        }
    }

    /// Arms the timeout, replacing any previously armed one.
    pub(crate) fn arm(&mut self, duration: Duration, message: impl Into<String>) {
        if !self.enabled {
            return;
        }
        self.sleep.as_mut().reset(Instant::now() + duration);
        self.armed = Some(message.into());
    }

    /// Disarms the timeout. Idempotent; a no-op after the timeout fired.
    pub(crate) fn disarm(&mut self) {
        if !self.enabled {
            return;
        }
        self.sleep.as_mut().reset(far_future());
        self.armed = None;
    }

    /// Resolves with the armed message once the deadline passes. Pends
    /// forever while disarmed. Cancel-safe.
    pub(crate) async fn fired(&mut self) -> String {
        if self.armed.is_none() {
            return futures::future::pending().await;
        }
        self.sleep.as_mut().await;
        self.sleep.as_mut().reset(far_future());
        self.armed.take().expect("timer was armed")
    }
}

fn far_future() -> Instant {
    // Matches what tokio does internally for "never": roughly 30 years out,
    // far enough that rounding in the time driver cannot pull it closer.
    Instant::now() + Duration::from_secs(86400 * 365 * 30)
}
