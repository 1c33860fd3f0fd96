use std::time::Duration;

/// Decides whether and when a dropped stream is reopened.
pub trait ReconnectPolicy: Send {
    /// Called on every transport error. `None` means stop retrying until a
    /// manual reconnect.
    fn next_delay(&mut self) -> Option<Duration>;

    /// Called when the connection opens successfully.
    fn on_open(&mut self);

    /// Called on a manual reconnect request.
    fn reset(&mut self);

    fn attempts(&self) -> u32;
}

/// Doubling delay with a cap, and a ceiling on consecutive attempts.
///
/// With the defaults the schedule is 1s, 2s, 4s, 8s, 16s and then nothing.
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    base: Duration,
    max_delay: Duration,
    max_attempts: u32,
    attempts: u32,
}

impl ExponentialBackoff {
    pub const DEFAULT_BASE: Duration = Duration::from_millis(1000);
    pub const DEFAULT_MAX_DELAY: Duration = Duration::from_millis(16000);
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

    pub fn new(base: Duration, max_delay: Duration, max_attempts: u32) -> Self {
        Self {
            base,
            max_delay,
            max_attempts,
            attempts: 0,
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.attempts >= self.max_attempts
    }

    fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.base
            .checked_mul(1u32 << exponent)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self::new(
            Self::DEFAULT_BASE,
            Self::DEFAULT_MAX_DELAY,
            Self::DEFAULT_MAX_ATTEMPTS,
        )
    }
}

impl ReconnectPolicy for ExponentialBackoff {
    fn next_delay(&mut self) -> Option<Duration> {
        if self.is_exhausted() {
            return None;
        }
        self.attempts += 1;
        Some(self.delay_for(self.attempts))
    }

    fn on_open(&mut self) {
        self.attempts = 0;
    }

    fn reset(&mut self) {
        self.attempts = 0;
    }

    fn attempts(&self) -> u32 {
        self.attempts
    }
}

/// Same delay every time, never gives up.
#[derive(Debug, Clone)]
pub struct FixedDelay {
    delay: Duration,
    attempts: u32,
}

impl FixedDelay {
    pub const DEFAULT_DELAY: Duration = Duration::from_millis(5000);

    pub fn new(delay: Duration) -> Self {
        Self { delay, attempts: 0 }
    }
}

impl Default for FixedDelay {
    fn default() -> Self {
        Self::new(Self::DEFAULT_DELAY)
    }
}

impl ReconnectPolicy for FixedDelay {
    fn next_delay(&mut self) -> Option<Duration> {
        self.attempts = self.attempts.saturating_add(1);
        Some(self.delay)
    }

    fn on_open(&mut self) {
        self.attempts = 0;
    }

    fn reset(&mut self) {
        self.attempts = 0;
    }

    fn attempts(&self) -> u32 {
        self.attempts
    }
}
