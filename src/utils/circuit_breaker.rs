use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

// ============================================================================
// Circuit Breaker
// ============================================================================
//
// Guards the order-service HTTP client: after enough consecutive failures
// the circuit opens and calls fail immediately instead of waiting out
// request timeouts against a dead backend. After a cool-off the circuit
// half-opens and lets probe requests through; enough successes close it
// again, one failure reopens it.
//
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Requests pass through.
    Closed,
    /// Requests are refused without being sent.
    Open,
    /// Probe requests are allowed to test recovery.
    HalfOpen,
}

impl CircuitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half_open",
        }
    }
}

#[derive(Clone, Debug)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures that open the circuit.
    pub failure_threshold: u32,
    /// Cool-off before probing an open circuit.
    pub timeout: Duration,
    /// Probe successes needed to close again.
    pub success_threshold: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            timeout: Duration::from_secs(30),
            success_threshold: 2,
        }
    }
}

#[derive(Debug)]
struct Tracker {
    state: CircuitState,
    failures: u32,
    probe_successes: u32,
    opened_at: Option<Instant>,
}

#[derive(Clone)]
pub struct CircuitBreaker {
    tracker: Arc<Mutex<Tracker>>,
    config: CircuitBreakerConfig,
}

#[derive(Debug)]
pub enum CircuitBreakerError<E> {
    /// The circuit refused the call; the operation never ran.
    CircuitOpen,
    OperationFailed(E),
}

impl<E: std::fmt::Display> std::fmt::Display for CircuitBreakerError<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CircuitBreakerError::CircuitOpen => write!(f, "circuit breaker is open"),
            CircuitBreakerError::OperationFailed(e) => write!(f, "operation failed: {e}"),
        }
    }
}

impl<E: std::error::Error> std::error::Error for CircuitBreakerError<E> {}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            tracker: Arc::new(Mutex::new(Tracker {
                state: CircuitState::Closed,
                failures: 0,
                probe_successes: 0,
                opened_at: None,
            })),
            config,
        }
    }

    /// Runs the operation if the circuit allows it, recording the outcome.
    pub async fn call<F, T, E>(&self, operation: F) -> Result<T, CircuitBreakerError<E>>
    where
        F: std::future::Future<Output = Result<T, E>>,
    {
        {
            let mut tracker = self.tracker.lock().await;
            if tracker.state == CircuitState::Open {
                let cooled_off = tracker
                    .opened_at
                    .is_some_and(|at| at.elapsed() >= self.config.timeout);
                if !cooled_off {
                    return Err(CircuitBreakerError::CircuitOpen);
                }
                tracing::info!("circuit breaker half-open, probing");
                tracker.state = CircuitState::HalfOpen;
                tracker.probe_successes = 0;
            }
        }

        match operation.await {
            Ok(value) => {
                self.on_success().await;
                Ok(value)
            }
            Err(err) => {
                self.on_failure().await;
                Err(CircuitBreakerError::OperationFailed(err))
            }
        }
    }

    async fn on_success(&self) {
        let mut tracker = self.tracker.lock().await;
        match tracker.state {
            CircuitState::Closed => {
                tracker.failures = 0;
            }
            CircuitState::HalfOpen => {
                tracker.probe_successes += 1;
                if tracker.probe_successes >= self.config.success_threshold {
                    tracing::info!(
                        probes = tracker.probe_successes,
                        "circuit breaker closed"
                    );
                    tracker.state = CircuitState::Closed;
                    tracker.failures = 0;
                    tracker.probe_successes = 0;
                    tracker.opened_at = None;
                }
            }
            CircuitState::Open => {}
        }
    }

    async fn on_failure(&self) {
        let mut tracker = self.tracker.lock().await;
        tracker.failures += 1;
        tracker.opened_at = Some(Instant::now());

        match tracker.state {
            CircuitState::Closed => {
                if tracker.failures >= self.config.failure_threshold {
                    tracing::warn!(failures = tracker.failures, "circuit breaker opened");
                    tracker.state = CircuitState::Open;
                }
            }
            CircuitState::HalfOpen => {
                tracing::warn!("probe failed, circuit breaker reopened");
                tracker.state = CircuitState::Open;
                tracker.probe_successes = 0;
            }
            CircuitState::Open => {}
        }
    }

    pub async fn get_state(&self) -> CircuitState {
        self.tracker.lock().await.state
    }

    pub async fn failure_count(&self) -> u32 {
        self.tracker.lock().await.failures
    }

    /// Operator-triggered reset back to closed.
    pub async fn reset(&self) {
        let mut tracker = self.tracker.lock().await;
        tracing::info!("circuit breaker reset");
        tracker.state = CircuitState::Closed;
        tracker.failures = 0;
        tracker.probe_successes = 0;
        tracker.opened_at = None;
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn quick_config() -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            failure_threshold: 3,
            timeout: Duration::from_millis(50),
            success_threshold: 1,
        }
    }

    #[tokio::test]
    async fn test_opens_after_consecutive_failures() {
        let breaker = CircuitBreaker::new(quick_config());

        for _ in 0..3 {
            let _ = breaker.call(async { Err::<(), _>("down") }).await;
        }
        assert_eq!(breaker.get_state().await, CircuitState::Open);

        let refused = breaker.call(async { Ok::<_, &str>(()) }).await;
        assert!(matches!(refused, Err(CircuitBreakerError::CircuitOpen)));
    }

    #[tokio::test]
    async fn test_probe_closes_after_cool_off() {
        let breaker = CircuitBreaker::new(quick_config());
        for _ in 0..3 {
            let _ = breaker.call(async { Err::<(), _>("down") }).await;
        }
        assert_eq!(breaker.get_state().await, CircuitState::Open);

        tokio::time::sleep(Duration::from_millis(80)).await;

        let probed = breaker.call(async { Ok::<_, &str>(()) }).await;
        assert!(probed.is_ok());
        assert_eq!(breaker.get_state().await, CircuitState::Closed);
    }

    #[tokio::test]
    async fn test_failed_probe_reopens() {
        let breaker = CircuitBreaker::new(quick_config());
        for _ in 0..3 {
            let _ = breaker.call(async { Err::<(), _>("down") }).await;
        }
        tokio::time::sleep(Duration::from_millis(80)).await;

        let _ = breaker.call(async { Err::<(), _>("still down") }).await;
        assert_eq!(breaker.get_state().await, CircuitState::Open);
    }

    #[tokio::test]
    async fn test_success_clears_failure_streak_while_closed() {
        let breaker = CircuitBreaker::new(quick_config());

        let _ = breaker.call(async { Err::<(), _>("blip") }).await;
        let _ = breaker.call(async { Err::<(), _>("blip") }).await;
        let _ = breaker.call(async { Ok::<_, &str>(()) }).await;
        let _ = breaker.call(async { Err::<(), _>("blip") }).await;

        assert_eq!(breaker.get_state().await, CircuitState::Closed);
        assert_eq!(breaker.failure_count().await, 1);
    }
}
