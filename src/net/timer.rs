//! One-shot handshake deadline.
//!
//! A thin state machine over [`tokio::time::Sleep`] that separates the two
//! ways a deadline can end: it ran out ([`TimerEvent::Expired`]) or it was
//! called off ([`TimerEvent::Aborted`]). Only the former may resolve a
//! handshake.

use std::pin::Pin;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::time::{Instant, Sleep};

/// Stand-in deadline for timeouts too large to add to `Instant::now()`.
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

/// Lifecycle of a [`DeadlineTimer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerState {
    /// Created, never armed.
    Idle,
    /// Counting down.
    Armed,
    /// Ran to its deadline.
    Expired,
    /// Cancelled before the deadline.
    Cancelled,
}

/// What a wait on the timer observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEvent {
    Expired,
    Aborted,
}

/// Deadline timer bound to one runtime.
#[derive(Debug)]
pub struct DeadlineTimer {
    sleep: Pin<Box<Sleep>>,
    state: TimerState,
}

impl DeadlineTimer {
    /// Create an unarmed, zero-length timer on the given runtime.
    pub fn new(runtime: &Handle) -> Self {
        let _guard = runtime.enter();
        Self {
            sleep: Box::pin(tokio::time::sleep(Duration::ZERO)),
            state: TimerState::Idle,
        }
    }

    /// Arm (or re-arm) the timer to fire `timeout` from now.
    ///
    /// Timeouts that overflow the clock, such as `Duration::MAX`, are
    /// clamped to roughly thirty years.
    pub fn expires_after(&mut self, timeout: Duration) {
        let now = Instant::now();
        let deadline = now.checked_add(timeout).unwrap_or(now + FAR_FUTURE);
        self.sleep.as_mut().reset(deadline);
        self.state = TimerState::Armed;
    }

    /// Wait for the deadline.
    ///
    /// Resolves immediately with [`TimerEvent::Aborted`] once the timer has
    /// been cancelled. An unarmed timer has a zero-length deadline and
    /// expires right away.
    pub async fn wait(&mut self) -> TimerEvent {
        match self.state {
            TimerState::Cancelled => return TimerEvent::Aborted,
            TimerState::Expired => return TimerEvent::Expired,
            TimerState::Idle | TimerState::Armed => {}
        }

        self.sleep.as_mut().await;
        self.state = TimerState::Expired;
        TimerEvent::Expired
    }

    /// Cancel an armed timer. Returns `false` if there was nothing to cancel.
    pub fn cancel(&mut self) -> bool {
        if self.state != TimerState::Armed {
            return false;
        }
        self.state = TimerState::Cancelled;
        true
    }

    /// Current lifecycle state.
    pub fn state(&self) -> TimerState {
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn armed_timer_expires() {
        let mut timer = DeadlineTimer::new(&Handle::current());
        assert_eq!(timer.state(), TimerState::Idle);

        timer.expires_after(Duration::from_millis(10));
        assert_eq!(timer.state(), TimerState::Armed);

        let started = std::time::Instant::now();
        assert_eq!(timer.wait().await, TimerEvent::Expired);
        assert!(started.elapsed() >= Duration::from_millis(10));
        assert_eq!(timer.state(), TimerState::Expired);
    }

    #[tokio::test]
    async fn cancelled_timer_reports_abort() {
        let mut timer = DeadlineTimer::new(&Handle::current());
        timer.expires_after(Duration::from_secs(60));

        assert!(timer.cancel());
        assert_eq!(timer.state(), TimerState::Cancelled);
        assert_eq!(timer.wait().await, TimerEvent::Aborted);
    }

    #[tokio::test]
    async fn cancel_is_a_no_op_unless_armed() {
        let mut timer = DeadlineTimer::new(&Handle::current());
        assert!(!timer.cancel());
        assert_eq!(timer.state(), TimerState::Idle);

        timer.expires_after(Duration::from_millis(1));
        timer.wait().await;
        assert!(!timer.cancel());
        assert_eq!(timer.state(), TimerState::Expired);
    }

    #[tokio::test]
    async fn unbounded_timeout_stays_armed() {
        let mut timer = DeadlineTimer::new(&Handle::current());
        timer.expires_after(Duration::MAX);
        assert_eq!(timer.state(), TimerState::Armed);

        let waited = tokio::time::timeout(Duration::from_millis(20), timer.wait()).await;
        assert!(waited.is_err());
        assert_eq!(timer.state(), TimerState::Armed);
        assert!(timer.cancel());
    }
}
