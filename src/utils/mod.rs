pub mod backoff;
pub mod circuit_breaker;

pub use backoff::{Backoff, ReconnectPolicy};
pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitBreakerError, CircuitState};
