use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::info;

use crate::clock::Clock;
use crate::provider_policy::QuotaPolicy;
use crate::{UtcDateTime, ValidationError};

/// Extra pause added to every computed wait so the oldest call has left the
/// window when the limiter re-checks.
const SETTLE: Duration = Duration::from_millis(100);

/// Sliding-window admission control: at most `max_calls` recorded calls in any
/// trailing `window`.
///
/// Only calls that were both admitted and recorded count; checks alone never
/// consume budget.
pub struct SlidingWindowLimiter {
    max_calls: usize,
    window: Duration,
    calls: Mutex<VecDeque<UtcDateTime>>,
    clock: Arc<dyn Clock>,
}

impl SlidingWindowLimiter {
    pub fn new(
        max_calls: u32,
        window: Duration,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ValidationError> {
        if max_calls == 0 {
            return Err(ValidationError::ZeroRateLimit);
        }

        Ok(Self {
            max_calls: max_calls as usize,
            window,
            calls: Mutex::new(VecDeque::with_capacity(max_calls as usize)),
            clock,
        })
    }

    pub fn from_quota(quota: QuotaPolicy, clock: Arc<dyn Clock>) -> Result<Self, ValidationError> {
        Self::new(quota.max_calls, quota.window, clock)
    }

    /// Prunes expired calls and reports whether another call would be admitted.
    pub fn can_proceed(&self) -> bool {
        let now = self.clock.now();
        let mut calls = self.lock_calls();
        prune(&mut calls, now, self.window);
        calls.len() < self.max_calls
    }

    pub fn record_call(&self) {
        let now = self.clock.now();
        self.lock_calls().push_back(now);
    }

    /// Waits until [`can_proceed`](Self::can_proceed) holds.
    ///
    /// Each iteration sleeps until the oldest call leaves the window, then
    /// checks again. Does not record a call; see [`acquire`](Self::acquire).
    pub async fn await_capacity(&self) {
        while let Some(wait) = self.required_wait() {
            self.log_wait(wait);
            self.clock.sleep(wait).await;
        }
    }

    /// Waits for capacity and records the call.
    ///
    /// The check and the record happen under one lock, so concurrent callers
    /// sharing the limiter never exceed `max_calls` in the window.
    pub async fn acquire(&self) {
        while let Err(wait) = self.try_acquire() {
            self.log_wait(wait);
            self.clock.sleep(wait).await;
        }
    }

    /// Records a call if the window has room, else returns the wait needed.
    fn try_acquire(&self) -> Result<(), Duration> {
        let now = self.clock.now();
        let mut calls = self.lock_calls();
        match wait_for_capacity(&mut calls, now, self.window, self.max_calls) {
            Some(wait) => Err(wait),
            None => {
                calls.push_back(now);
                Ok(())
            }
        }
    }

    fn log_wait(&self, wait: Duration) {
        info!(
            wait_ms = u64::try_from(wait.as_millis()).unwrap_or(u64::MAX),
            max_calls = self.max_calls,
            window_secs = self.window.as_secs(),
            "request limit reached, waiting for the window to slide"
        );
    }

    /// Calls currently inside the window.
    pub fn in_window(&self) -> usize {
        let now = self.clock.now();
        let mut calls = self.lock_calls();
        prune(&mut calls, now, self.window);
        calls.len()
    }

    pub fn max_calls(&self) -> usize {
        self.max_calls
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    fn required_wait(&self) -> Option<Duration> {
        let now = self.clock.now();
        let mut calls = self.lock_calls();
        wait_for_capacity(&mut calls, now, self.window, self.max_calls)
    }

    fn lock_calls(&self) -> std::sync::MutexGuard<'_, VecDeque<UtcDateTime>> {
        self.calls
            .lock()
            .expect("rate window lock should not be poisoned")
    }
}

/// Prunes `calls`; `None` when another call fits, else the wait until the
/// oldest one leaves the window.
fn wait_for_capacity(
    calls: &mut VecDeque<UtcDateTime>,
    now: UtcDateTime,
    window: Duration,
    max_calls: usize,
) -> Option<Duration> {
    prune(calls, now, window);
    if calls.len() < max_calls {
        return None;
    }

    let oldest = calls.front().copied()?;
    let elapsed = now.saturating_since(oldest);
    Some(window.saturating_sub(elapsed) + SETTLE)
}

/// Drops every call at least `window` old.
fn prune(calls: &mut VecDeque<UtcDateTime>, now: UtcDateTime, window: Duration) {
    while calls
        .front()
        .is_some_and(|oldest| now.saturating_since(*oldest) >= window)
    {
        calls.pop_front();
    }
}
