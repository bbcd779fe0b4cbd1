//! Time source used by the rate limiter, the result cache and every pause
//! the orchestrator or batch driver takes.

use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;
use std::time::Duration;

use crate::UtcDateTime;

pub type SleepFuture = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

pub trait Clock: Send + Sync {
    fn now(&self) -> UtcDateTime;

    /// Suspends the caller for `duration` as measured by this clock.
    fn sleep(&self, duration: Duration) -> SleepFuture {
        Box::pin(tokio::time::sleep(duration))
    }
}

/// Wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> UtcDateTime {
        UtcDateTime::now()
    }
}

/// Clock that only moves when told to. Used to simulate TTL and window expiry.
///
/// `sleep` advances the clock by the requested duration and returns at once,
/// so waits are observable through [`ManualClock::slept`] without real delay.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<UtcDateTime>,
    slept: Mutex<Vec<Duration>>,
}

impl ManualClock {
    pub fn new(start: UtcDateTime) -> Self {
        Self {
            now: Mutex::new(start),
            slept: Mutex::new(Vec::new()),
        }
    }

    /// Every duration passed to `sleep`, in call order.
    pub fn slept(&self) -> Vec<Duration> {
        self.slept
            .lock()
            .expect("manual clock lock is not poisoned")
            .clone()
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().expect("manual clock lock is not poisoned");
        *now = now.plus(by);
    }

    pub fn set(&self, to: UtcDateTime) {
        *self.now.lock().expect("manual clock lock is not poisoned") = to;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(UtcDateTime::now())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> UtcDateTime {
        *self.now.lock().expect("manual clock lock is not poisoned")
    }

    fn sleep(&self, duration: Duration) -> SleepFuture {
        self.slept
            .lock()
            .expect("manual clock lock is not poisoned")
            .push(duration);
        self.advance(duration);
        Box::pin(std::future::ready(()))
    }
}
