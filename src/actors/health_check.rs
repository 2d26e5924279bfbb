use actix::prelude::*;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;

use crate::api::OrderServiceApi;
use crate::metrics::Metrics;
use crate::utils::CircuitState;

use super::live_feed::{FeedHealth, GetFeedStatus, LiveFeedActor};

// ============================================================================
// Health Check Actor - Monitors system health
// ============================================================================
//
// Responsibilities:
// - Track health status of all components
// - Poll the live feed and the order service circuit breaker
// - Detect and report degraded states
// - Aggregate system-wide health
//
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum HealthStatus {
    Healthy,
    Degraded(String),
    Unhealthy(String),
}

#[derive(Debug, Clone)]
pub struct ComponentHealth {
    pub name: String,
    pub status: HealthStatus,
    pub last_check: DateTime<Utc>,
    pub details: Option<String>,
}

// ============================================================================
// Messages
// ============================================================================

#[derive(Message)]
#[rtype(result = "()")]
pub struct UpdateHealth {
    pub component: String,
    pub status: HealthStatus,
    pub details: Option<String>,
}

#[derive(Message)]
#[rtype(result = "SystemHealth")]
pub struct GetSystemHealth;

#[derive(Debug, Clone)]
pub struct SystemHealth {
    pub overall_status: HealthStatus,
    pub components: HashMap<String, ComponentHealth>,
    pub check_time: DateTime<Utc>,
}

// ============================================================================
// Health Check Actor
// ============================================================================

const POLL_INTERVAL_SECS: u64 = 10;

pub struct HealthCheckActor {
    components: HashMap<String, ComponentHealth>,
    feed: Addr<LiveFeedActor>,
    orders_api: Arc<OrderServiceApi>,
    metrics: Arc<Metrics>,
}

impl HealthCheckActor {
    pub fn new(
        feed: Addr<LiveFeedActor>,
        orders_api: Arc<OrderServiceApi>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            components: HashMap::new(),
            feed,
            orders_api,
            metrics,
        }
    }
}

fn overall_status(components: &HashMap<String, ComponentHealth>) -> HealthStatus {
    let mut has_degraded = false;
    let mut unhealthy_components = Vec::new();

    for (name, health) in components {
        match &health.status {
            HealthStatus::Unhealthy(msg) => {
                unhealthy_components.push(format!("{}: {}", name, msg));
            }
            HealthStatus::Degraded(_) => {
                has_degraded = true;
            }
            HealthStatus::Healthy => {}
        }
    }

    if !unhealthy_components.is_empty() {
        HealthStatus::Unhealthy(unhealthy_components.join(", "))
    } else if has_degraded {
        HealthStatus::Degraded("Some components degraded".to_string())
    } else {
        HealthStatus::Healthy
    }
}

fn feed_health(status: &FeedHealth) -> HealthStatus {
    if status.connected {
        HealthStatus::Healthy
    } else if status.gave_up {
        HealthStatus::Unhealthy("live feed exhausted its reconnect budget".to_string())
    } else {
        HealthStatus::Degraded("live feed not connected".to_string())
    }
}

fn breaker_health(state: CircuitState) -> HealthStatus {
    match state {
        CircuitState::Closed => HealthStatus::Healthy,
        CircuitState::HalfOpen => HealthStatus::Degraded("Circuit breaker half-open".to_string()),
        CircuitState::Open => HealthStatus::Unhealthy("Circuit breaker open".to_string()),
    }
}

impl Actor for HealthCheckActor {
    type Context = Context<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        tracing::info!("HealthCheckActor started");

        // Get address before borrowing ctx
        let addr = ctx.address();

        // Schedule periodic component polls
        ctx.run_interval(
            std::time::Duration::from_secs(POLL_INTERVAL_SECS),
            move |act, _ctx| {
                let feed = act.feed.clone();
                let orders_api = act.orders_api.clone();
                let metrics = act.metrics.clone();
                let addr = addr.clone();

                actix::spawn(async move {
                    match feed.send(GetFeedStatus).await {
                        Ok(status) => {
                            addr.do_send(UpdateHealth {
                                component: "live_feed".to_string(),
                                status: feed_health(&status),
                                details: Some(format!("{} subscriber(s)", status.subscribers)),
                            });
                        }
                        Err(err) => {
                            addr.do_send(UpdateHealth {
                                component: "live_feed".to_string(),
                                status: HealthStatus::Unhealthy(
                                    "live feed actor unreachable".to_string(),
                                ),
                                details: Some(err.to_string()),
                            });
                        }
                    }

                    let breaker = orders_api.breaker_state().await;
                    metrics.update_circuit_breaker_state(breaker);
                    addr.do_send(UpdateHealth {
                        component: "order_api".to_string(),
                        status: breaker_health(breaker),
                        details: Some(format!("circuit {}", breaker.as_str())),
                    });
                });
            },
        );
    }
}

impl Handler<UpdateHealth> for HealthCheckActor {
    type Result = ();

    fn handle(&mut self, msg: UpdateHealth, _: &mut Self::Context) {
        let health = ComponentHealth {
            name: msg.component.clone(),
            status: msg.status.clone(),
            last_check: Utc::now(),
            details: msg.details,
        };

        tracing::debug!(
            component = %msg.component,
            status = ?msg.status,
            "Updated component health"
        );

        self.components.insert(msg.component, health);
    }
}

impl Handler<GetSystemHealth> for HealthCheckActor {
    type Result = MessageResult<GetSystemHealth>;

    fn handle(&mut self, _msg: GetSystemHealth, _: &mut Self::Context) -> Self::Result {
        MessageResult(SystemHealth {
            overall_status: overall_status(&self.components),
            components: self.components.clone(),
            check_time: Utc::now(),
        })
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
