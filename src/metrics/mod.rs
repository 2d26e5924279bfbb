// Private module declaration
mod server;

use prometheus::{
    HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
};

// Re-export for public API
pub use server::start_metrics_server;

use crate::utils::CircuitState;

// ============================================================================
// Metrics Module - Prometheus metrics for observability
// ============================================================================
//
// Tracks the console's moving parts:
// - live feed traffic (events received, dropped deltas, connection churn)
// - board state (order count, snapshot loads per source)
// - order-service calls (count, failures, latency)
// - circuit breaker state
//
// Everything is registered on one registry and scraped via /metrics.
// ============================================================================

pub struct Metrics {
    registry: Registry,

    // Live feed
    pub feed_events_received: IntCounterVec,
    pub feed_events_dropped: IntCounterVec,
    pub feed_connects_total: IntCounter,
    pub feed_disconnects_total: IntCounter,
    pub feed_connected: IntGauge,

    // Board
    pub board_orders: IntGauge,
    pub snapshot_loads_total: IntCounterVec,

    // Order service client
    pub api_requests_total: IntCounterVec,
    pub api_failures_total: IntCounterVec,
    pub api_request_duration: HistogramVec,

    // Circuit breaker
    pub circuit_breaker_state: IntGauge,
}

impl Metrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let feed_events_received = IntCounterVec::new(
            Opts::new("feed_events_received_total", "Live feed events received"),
            &["event"],
        )?;
        registry.register(Box::new(feed_events_received.clone()))?;

        let feed_events_dropped = IntCounterVec::new(
            Opts::new(
                "feed_events_dropped_total",
                "Live feed events dropped without applying",
            ),
            &["event", "reason"],
        )?;
        registry.register(Box::new(feed_events_dropped.clone()))?;

        let feed_connects_total = IntCounter::new(
            "feed_connects_total",
            "Successful live feed connections, including reconnects",
        )?;
        registry.register(Box::new(feed_connects_total.clone()))?;

        let feed_disconnects_total = IntCounter::new(
            "feed_disconnects_total",
            "Live feed disconnections and failed connection attempts",
        )?;
        registry.register(Box::new(feed_disconnects_total.clone()))?;

        let feed_connected = IntGauge::new(
            "feed_connected",
            "Whether the live feed is currently connected (0/1)",
        )?;
        registry.register(Box::new(feed_connected.clone()))?;

        let board_orders = IntGauge::new("board_orders", "Orders currently on the board")?;
        registry.register(Box::new(board_orders.clone()))?;

        let snapshot_loads_total = IntCounterVec::new(
            Opts::new("snapshot_loads_total", "Snapshot loads by source"),
            &["source", "outcome"],
        )?;
        registry.register(Box::new(snapshot_loads_total.clone()))?;

        let api_requests_total = IntCounterVec::new(
            Opts::new("api_requests_total", "Order service requests"),
            &["op"],
        )?;
        registry.register(Box::new(api_requests_total.clone()))?;

        let api_failures_total = IntCounterVec::new(
            Opts::new("api_failures_total", "Order service request failures"),
            &["op"],
        )?;
        registry.register(Box::new(api_failures_total.clone()))?;

        let api_request_duration = HistogramVec::new(
            HistogramOpts::new(
                "api_request_duration_seconds",
                "Order service request duration",
            )
            .buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]),
            &["op"],
        )?;
        registry.register(Box::new(api_request_duration.clone()))?;

        let circuit_breaker_state = IntGauge::new(
            "circuit_breaker_state",
            "Order service circuit breaker state (0=Closed, 1=Open, 2=HalfOpen)",
        )?;
        registry.register(Box::new(circuit_breaker_state.clone()))?;

        Ok(Self {
            registry,
            feed_events_received,
            feed_events_dropped,
            feed_connects_total,
            feed_disconnects_total,
            feed_connected,
            board_orders,
            snapshot_loads_total,
            api_requests_total,
            api_failures_total,
            api_request_duration,
            circuit_breaker_state,
        })
    }

    /// Get the Prometheus registry for exposing metrics via HTTP
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn record_feed_event(&self, event: &str) {
        self.feed_events_received.with_label_values(&[event]).inc();
    }

    /// A delta that arrived but was not applied (unmatched id, redundant
    /// snapshot, undecodable frame).
    pub fn record_dropped_delta(&self, event: &str, reason: &str) {
        self.feed_events_dropped
            .with_label_values(&[event, reason])
            .inc();
    }

    pub fn record_feed_connected(&self) {
        self.feed_connects_total.inc();
        self.feed_connected.set(1);
    }

    pub fn record_feed_disconnected(&self) {
        self.feed_disconnects_total.inc();
        self.feed_connected.set(0);
    }

    pub fn record_snapshot_load(&self, source: &str, applied: bool) {
        let outcome = if applied { "applied" } else { "ignored" };
        self.snapshot_loads_total
            .with_label_values(&[source, outcome])
            .inc();
    }

    pub fn set_board_size(&self, count: usize) {
        self.board_orders.set(count as i64);
    }

    pub fn record_api_call(&self, op: &str, duration_secs: f64, success: bool) {
        self.api_requests_total.with_label_values(&[op]).inc();
        if !success {
            self.api_failures_total.with_label_values(&[op]).inc();
        }
        self.api_request_duration
            .with_label_values(&[op])
            .observe(duration_secs);
    }

    pub fn update_circuit_breaker_state(&self, state: CircuitState) {
        let value = match state {
            CircuitState::Closed => 0,
            CircuitState::Open => 1,
            CircuitState::HalfOpen => 2,
        };
        self.circuit_breaker_state.set(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_creation() {
        let metrics = Metrics::new().unwrap();
        assert!(!metrics.registry.gather().is_empty());
    }

    #[test]
    fn test_record_feed_event() {
        let metrics = Metrics::new().unwrap();
        metrics.record_feed_event("order_created");
        metrics.record_feed_event("order_created");
        metrics.record_feed_event("order_updated");

        let gathered = metrics.registry.gather();
        let received = gathered
            .iter()
            .find(|m| m.name() == "feed_events_received_total")
            .unwrap();
        assert_eq!(received.metric.len(), 2);
    }

    #[test]
    fn test_record_dropped_delta() {
        let metrics = Metrics::new().unwrap();
        metrics.record_dropped_delta("order_updated", "unmatched_id");

        let gathered = metrics.registry.gather();
        let dropped = gathered
            .iter()
            .find(|m| m.name() == "feed_events_dropped_total")
            .unwrap();
        assert_eq!(dropped.metric[0].counter.value, Some(1.0));
    }

    #[test]
    fn test_feed_connection_gauge_tracks_state() {
        let metrics = Metrics::new().unwrap();
        metrics.record_feed_connected();
        metrics.record_feed_disconnected();
        metrics.record_feed_connected();

        let gathered = metrics.registry.gather();
        let connected = gathered
            .iter()
            .find(|m| m.name() == "feed_connected")
            .unwrap();
        assert_eq!(connected.metric[0].gauge.value, Some(1.0));
        let connects = gathered
            .iter()
            .find(|m| m.name() == "feed_connects_total")
            .unwrap();
        assert_eq!(connects.metric[0].counter.value, Some(2.0));
    }

    #[test]
    fn test_record_api_call_counts_failures() {
        let metrics = Metrics::new().unwrap();
        metrics.record_api_call("assign_driver", 0.2, true);
        metrics.record_api_call("assign_driver", 0.4, false);

        let gathered = metrics.registry.gather();
        let requests = gathered
            .iter()
            .find(|m| m.name() == "api_requests_total")
            .unwrap();
        assert_eq!(requests.metric[0].counter.value, Some(2.0));
        let failures = gathered
            .iter()
            .find(|m| m.name() == "api_failures_total")
            .unwrap();
        assert_eq!(failures.metric[0].counter.value, Some(1.0));
    }

    #[test]
    fn test_circuit_breaker_gauge() {
        let metrics = Metrics::new().unwrap();
        metrics.update_circuit_breaker_state(CircuitState::Open);

        let gathered = metrics.registry.gather();
        let state = gathered
            .iter()
            .find(|m| m.name() == "circuit_breaker_state")
            .unwrap();
        assert_eq!(state.metric[0].gauge.value, Some(1.0));
    }
}
