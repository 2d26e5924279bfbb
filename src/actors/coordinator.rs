use actix::prelude::*;
use std::sync::Arc;

use crate::api::{DriverDirectoryApi, OrderServiceApi};
use crate::config::AppConfig;
use crate::metrics::Metrics;

use super::board::{BoardActor, CloseView};
use super::health_check::{GetSystemHealth, HealthCheckActor, HealthStatus, UpdateHealth};
use super::live_feed::{Connect, LiveFeedActor};

// ============================================================================
// Coordinator Actor - Orchestrates all system actors
// ============================================================================
//
// Responsibilities:
// - Manages lifecycle of the long-lived actors (LiveFeedActor, HealthCheckActor)
// - Spawns one BoardActor per dashboard activation, closing the previous view
// - Opens the live feed connection on the first activation
// - Coordinates graceful shutdown
// - Reports system health
//
// Actor Hierarchy:
//   CoordinatorActor (Supervisor)
//   ├── LiveFeedActor
//   ├── HealthCheckActor
//   └── BoardActor (one per active dashboard view)
//
// ============================================================================

const HEALTH_LOG_INTERVAL_SECS: u64 = 30;

pub struct CoordinatorActor {
    config: AppConfig,
    metrics: Arc<Metrics>,
    orders_api: Arc<OrderServiceApi>,
    drivers_api: Arc<DriverDirectoryApi>,
    feed: Option<Addr<LiveFeedActor>>,
    board: Option<Addr<BoardActor>>,
    health_check: Option<Addr<HealthCheckActor>>,
}

impl CoordinatorActor {
    pub fn new(config: AppConfig, metrics: Arc<Metrics>) -> Self {
        let http = reqwest::Client::new();
        let orders_api = Arc::new(OrderServiceApi::new(http.clone(), &config.backend_url));
        let drivers_api = Arc::new(DriverDirectoryApi::new(http, &config.backend_url));

        Self {
            config,
            metrics,
            orders_api,
            drivers_api,
            feed: None,
            board: None,
            health_check: None,
        }
    }

    fn start_child_actors(&mut self) {
        tracing::info!("Starting supervised child actors");

        // The feed actor starts passive; Connect is sent on the first
        // dashboard activation.
        let feed = LiveFeedActor::new(
            self.config.feed_url.clone(),
            self.config.reconnect.clone(),
            self.metrics.clone(),
        )
        .start();
        self.feed = Some(feed.clone());

        let health_check =
            HealthCheckActor::new(feed, self.orders_api.clone(), self.metrics.clone()).start();
        self.health_check = Some(health_check.clone());

        health_check.do_send(UpdateHealth {
            component: "live_feed".to_string(),
            status: HealthStatus::Degraded("live feed not connected".to_string()),
            details: Some("waiting for dashboard activation".to_string()),
        });

        tracing::info!("✅ All supervised actors started successfully");
    }
}

impl Actor for CoordinatorActor {
    type Context = Context<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        tracing::info!("🎯 CoordinatorActor started");
        self.start_child_actors();

        // Schedule periodic health checks
        ctx.run_interval(
            std::time::Duration::from_secs(HEALTH_LOG_INTERVAL_SECS),
            |act, _ctx| {
                if let Some(ref health_check) = act.health_check {
                    let health_check = health_check.clone();
                    actix::spawn(async move {
                        match health_check.send(GetSystemHealth).await {
                            Ok(health) => match health.overall_status {
                                HealthStatus::Healthy => {
                                    tracing::debug!("System health check: Healthy");
                                }
                                HealthStatus::Degraded(ref msg) => {
                                    tracing::warn!("System health check: Degraded - {}", msg);
                                }
                                HealthStatus::Unhealthy(ref msg) => {
                                    tracing::error!("System health check: Unhealthy - {}", msg);
                                }
                            },
                            Err(e) => {
                                tracing::error!("Failed to get system health: {}", e);
                            }
                        }
                    });
                }
            },
        );
    }

    fn stopping(&mut self, _: &mut Self::Context) -> Running {
        tracing::info!("🛑 CoordinatorActor stopping - initiating graceful shutdown");
        Running::Stop
    }

    fn stopped(&mut self, _: &mut Self::Context) {
        tracing::info!("🛑 CoordinatorActor stopped");
    }
}

// ============================================================================
// Messages
// ============================================================================

/// Brings up a fresh dashboard view, replacing any previous one, and opens
/// the live feed connection if it is not already running.
#[derive(Message)]
#[rtype(result = "Option<Addr<BoardActor>>")]
pub struct ActivateDashboard;

impl Handler<ActivateDashboard> for CoordinatorActor {
    type Result = Option<Addr<BoardActor>>;

    fn handle(&mut self, _: ActivateDashboard, _: &mut Self::Context) -> Self::Result {
        let Some(feed) = self.feed.clone() else {
            tracing::error!("dashboard activated before the live feed actor came up");
            return None;
        };

        if let Some(previous) = self.board.take() {
            tracing::info!("closing previous dashboard view");
            previous.do_send(CloseView);
        }

        feed.do_send(Connect);

        let board = BoardActor::new(
            self.orders_api.clone(),
            self.drivers_api.clone(),
            feed,
            self.metrics.clone(),
        )
        .start();
        self.board = Some(board.clone());

        if let Some(ref health_check) = self.health_check {
            health_check.do_send(UpdateHealth {
                component: "dashboard".to_string(),
                status: HealthStatus::Healthy,
                details: Some("view activated".to_string()),
            });
        }

        Some(board)
    }
}

/// Tears down the current dashboard view, if any. The feed stays connected.
#[derive(Message)]
#[rtype(result = "()")]
pub struct DeactivateDashboard;

impl Handler<DeactivateDashboard> for CoordinatorActor {
    type Result = ();

    fn handle(&mut self, _: DeactivateDashboard, _: &mut Self::Context) {
        if let Some(board) = self.board.take() {
            board.do_send(CloseView);
        }
    }
}

#[derive(Message)]
#[rtype(result = "Result<(), String>")]
pub struct Shutdown;

impl Handler<Shutdown> for CoordinatorActor {
    type Result = Result<(), String>;

    fn handle(&mut self, _msg: Shutdown, ctx: &mut Self::Context) -> Self::Result {
        tracing::info!("Received shutdown signal");

        // Stop child actors gracefully
        if let Some(board) = self.board.take() {
            board.do_send(CloseView);
        }

        if let Some(feed) = self.feed.take() {
            feed.do_send(StopActor);
        }

        if let Some(health_check) = self.health_check.take() {
            health_check.do_send(StopActor);
        }

        // Stop coordinator
        ctx.stop();

        Ok(())
    }
}

/// Message to gracefully stop an actor
#[derive(Message)]
#[rtype(result = "()")]
struct StopActor;

impl Handler<StopActor> for LiveFeedActor {
    type Result = ();

    fn handle(&mut self, _: StopActor, ctx: &mut Self::Context) {
        tracing::info!("LiveFeedActor received stop signal");
        ctx.stop();
    }
}

impl Handler<StopActor> for HealthCheckActor {
    type Result = ();

    fn handle(&mut self, _: StopActor, ctx: &mut Self::Context) {
        tracing::info!("HealthCheckActor received stop signal");
        ctx.stop();
    }
}

// ============================================================================
// Public API for accessing child actors
// ============================================================================

#[derive(Message)]
#[rtype(result = "Option<Addr<HealthCheckActor>>")]
pub struct GetHealthCheckActor;

impl Handler<GetHealthCheckActor> for CoordinatorActor {
    type Result = Option<Addr<HealthCheckActor>>;

    fn handle(&mut self, _: GetHealthCheckActor, _: &mut Self::Context) -> Self::Result {
        self.health_check.clone()
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::ReconnectPolicy;
    use std::time::Duration;

    fn unroutable_config() -> AppConfig {
        AppConfig {
            backend_url: "http://127.0.0.1:1".to_string(),
            feed_url: "ws://127.0.0.1:1/ws/orders".to_string(),
            metrics_port: 0,
            reconnect: ReconnectPolicy {
                max_attempts: 1,
                initial_delay: Duration::from_millis(10),
                max_delay: Duration::from_millis(20),
                multiplier: 2.0,
            },
        }
    }

    #[actix::test]
    async fn test_activation_replaces_previous_view() {
        let metrics = Arc::new(Metrics::new().unwrap());
        let coordinator = CoordinatorActor::new(unroutable_config(), metrics).start();

        let first = coordinator
            .send(ActivateDashboard)
            .await
            .unwrap()
            .expect("feed starts before activations");
        let second = coordinator
            .send(ActivateDashboard)
            .await
            .unwrap()
            .expect("feed starts before activations");

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!first.connected());
        assert!(second.connected());

        coordinator.send(Shutdown).await.unwrap().unwrap();
    }

    #[actix::test]
    async fn test_health_actor_is_reachable() {
        let metrics = Arc::new(Metrics::new().unwrap());
        let coordinator = CoordinatorActor::new(unroutable_config(), metrics).start();

        let health_check = coordinator
            .send(GetHealthCheckActor)
            .await
            .unwrap()
            .expect("health actor starts with the coordinator");
        let system = health_check.send(GetSystemHealth).await.unwrap();

        // The feed has not been connected yet, so the system reports degraded.
        assert!(matches!(
            system.overall_status,
            HealthStatus::Degraded(_) | HealthStatus::Healthy
        ));

        coordinator.send(Shutdown).await.unwrap().unwrap();
    }
}
