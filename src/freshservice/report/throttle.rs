//! Rate-limit handling shared by every outbound request.
//!
//! A request starts out [`ThrottleState::Ready`]. When the service answers
//! with HTTP 429 the request moves to [`ThrottleState::Throttled`], waits for
//! the configured delay and then goes back to `Ready` to be sent again. The
//! delay never grows. Without a retry bound a service that keeps throttling
//! keeps the caller waiting forever; the bound exists so callers (and tests)
//! can opt into giving up.

use std::time::Duration;

use tracing::{debug, warn};

use crate::freshservice::report::error::{ReportError, Result};

/// Default pause after a rate-limit response.
pub const DEFAULT_THROTTLE_DELAY: Duration = Duration::from_secs(60);

/// Current position of a single request in the throttle state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThrottleState {
    Ready,
    Throttled,
}

/// Fixed-delay retry policy applied on rate limiting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThrottlePolicy {
    /// Pause between a 429 response and the next attempt.
    pub delay: Duration,
    /// Maximum number of retries after a 429. `None` retries forever.
    pub max_retries: Option<u32>,
}

impl Default for ThrottlePolicy {
    fn default() -> Self {
        Self {
            delay: DEFAULT_THROTTLE_DELAY,
            max_retries: None,
        }
    }
}

/// Outcome of one attempt at a request.
#[derive(Debug, PartialEq)]
pub enum Attempt<T> {
    /// The service answered with something other than a rate-limit signal.
    Done(T),
    /// The service asked us to slow down.
    RateLimited,
}

/// Blocks the current thread for a duration. Injected so tests can observe
/// pauses without waiting for them.
pub trait Sleeper {
    fn sleep(&self, duration: Duration);
}

/// [`Sleeper`] backed by [`std::thread::sleep`].
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Drives requests through the `Ready`/`Throttled` state machine.
pub struct Throttle {
    policy: ThrottlePolicy,
    sleeper: Box<dyn Sleeper>,
}

impl std::fmt::Debug for Throttle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Throttle")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl Throttle {
    /// Creates a throttle that really sleeps.
    pub fn new(policy: ThrottlePolicy) -> Self {
        Self::with_sleeper(policy, ThreadSleeper)
    }

    /// Creates a throttle with a custom sleeper.
    pub fn with_sleeper(policy: ThrottlePolicy, sleeper: impl Sleeper + 'static) -> Self {
        Self {
            policy,
            sleeper: Box::new(sleeper),
        }
    }

    /// Runs `attempt` until it produces something other than
    /// [`Attempt::RateLimited`], sleeping for the policy delay after every
    /// rate-limit signal. Errors from `attempt` are returned untouched.
    pub fn run<T, F>(&self, mut attempt: F) -> Result<T>
    where
        F: FnMut() -> Result<Attempt<T>>,
    {
        let mut state = ThrottleState::Ready;
        let mut retries: u32 = 0;

        loop {
            match state {
                ThrottleState::Ready => match attempt()? {
                    Attempt::Done(value) => return Ok(value),
                    Attempt::RateLimited => {
                        if self.policy.max_retries.is_some_and(|max| retries >= max) {
                            return Err(ReportError::RateLimited {
                                attempts: retries.saturating_add(1),
                            });
                        }
                        warn!(
                            delay_secs = self.policy.delay.as_secs(),
                            "rate limit reached, waiting before retrying"
                        );
                        state = ThrottleState::Throttled;
                    }
                },
                ThrottleState::Throttled => {
                    self.sleeper.sleep(self.policy.delay);
                    retries = retries.saturating_add(1);
                    debug!(retries, "retrying after throttle pause");
                    state = ThrottleState::Ready;
                }
            }
        }
    }
}
