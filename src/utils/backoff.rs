use std::time::Duration;

// ============================================================================
// Reconnect Backoff Schedule
// ============================================================================
//
// Drives the live feed's bounded reconnect loop: a fixed number of attempts
// with exponentially growing delays. The schedule is reset whenever a
// connection is established, so the budget applies to each outage rather
// than the process lifetime. Once the budget is spent the feed gives up and
// reports itself unhealthy; nothing else in the system retries.
//
// ============================================================================

#[derive(Clone, Debug)]
pub struct ReconnectPolicy {
    /// Reconnect attempts allowed per outage.
    pub max_attempts: u32,
    /// Delay before the first reconnect attempt.
    pub initial_delay: Duration,
    /// Ceiling for the grown delay.
    pub max_delay: Duration,
    /// Growth factor between attempts.
    pub multiplier: f64,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
        }
    }
}

/// Stateful view over a ReconnectPolicy: hand out the next delay until the
/// attempt budget is spent.
#[derive(Debug)]
pub struct Backoff {
    policy: ReconnectPolicy,
    attempts_made: u32,
    delay: Duration,
}

impl Backoff {
    pub fn new(policy: ReconnectPolicy) -> Self {
        let delay = policy.initial_delay;
        Self {
            policy,
            attempts_made: 0,
            delay,
        }
    }

    /// The delay to sleep before the next attempt, or None when the budget
    /// for this outage is exhausted.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.attempts_made >= self.policy.max_attempts {
            return None;
        }
        self.attempts_made += 1;

        let current = self.delay;
        self.delay = Duration::from_millis(
            ((self.delay.as_millis() as f64) * self.policy.multiplier) as u64,
        )
        .min(self.policy.max_delay);

        Some(current)
    }

    /// Called on a successful connection: the next outage gets a full budget.
    pub fn reset(&mut self) {
        self.attempts_made = 0;
        self.delay = self.policy.initial_delay;
    }

    pub fn attempts_made(&self) -> u32 {
        self.attempts_made
    }

    pub fn max_attempts(&self) -> u32 {
        self.policy.max_attempts
    }
}
