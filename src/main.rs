use std::sync::Arc;

use actix::prelude::*;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod actors;
mod api;
mod auth;
mod config;
mod domain;
mod metrics;
mod models;
mod utils;

use actors::{
    ActivateDashboard, AssignDriver, BoardActor, CoordinatorActor, CreateDelivery,
    DeactivateDashboard, DeleteOrder, GetBoardPage, GetDriverRoster, GetHealthCheckActor,
    GetSystemHealth, MarkSuccessful, MarkUnsuccessful, NotifyDriverApp, ReloadSnapshot,
    SendConfirmationSms, SetDeliveryType, SetPage, SetPrice, SetTab, Shutdown,
};
use api::{AnalyticsApi, DriverAdmin, DriverDirectoryApi, ReportKind, REPORT_WINDOWS};
use auth::{authenticate, Destination, Role};
use config::AppConfig;
use domain::board::StatusTab;
use models::{DeliveryDraft, DriverDraft};

#[actix::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize structured logging with environment-based filtering
    // Default to INFO level, can be overridden with RUST_LOG env var
    // Example: RUST_LOG=debug cargo run
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,tolo_dispatch=debug")),
        )
        .init();

    tracing::info!("🚀 Starting Tolo Dispatch Console");

    let config = AppConfig::from_env()?;
    tracing::info!(
        backend = %config.backend_url,
        feed = %config.feed_url,
        "configuration loaded"
    );

    // === 1. Role-gated entry, mirroring the login screen ===
    let role = std::env::var("TOLO_ROLE")
        .unwrap_or_else(|_| "call-center".to_string())
        .parse::<Role>()?;
    let username = std::env::var("TOLO_USER").unwrap_or_else(|_| "call".to_string());
    let password = std::env::var("TOLO_PASS").unwrap_or_else(|_| "call123".to_string());
    let destination = authenticate(role, &username, &password)?;
    tracing::info!(?role, route = destination.route(), "🔓 login accepted");

    if destination == Destination::AdminMenu {
        return run_admin_menu(&config).await;
    }

    // === 2. Initialize Prometheus metrics ===
    tracing::info!("Initializing metrics");
    let metrics = Arc::new(metrics::Metrics::new()?);
    tracing::info!(
        "📊 Metrics registry created with {} metrics",
        metrics.registry().gather().len()
    );

    // Start metrics HTTP server in background thread
    let metrics_registry = Arc::new(metrics.registry().clone());
    let metrics_port = config.metrics_port;
    std::thread::spawn(move || {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            if let Err(e) = metrics::start_metrics_server(metrics_registry, metrics_port).await {
                tracing::error!("Metrics server error: {}", e);
            }
        });
    });

    // === 3. Start Coordinator Actor ===
    // The coordinator owns the live feed, the health registry and the
    // currently active dashboard view.
    tracing::info!("Starting coordinator actor");
    let coordinator = CoordinatorActor::new(config.clone(), metrics.clone()).start();

    // === 4. Activate the dashboard view ===
    let board = coordinator
        .send(ActivateDashboard)
        .await?
        .expect("live feed is started before activations are accepted");

    if let Some(health) = coordinator.send(GetHealthCheckActor).await? {
        let system = health.send(GetSystemHealth).await?;
        tracing::info!(
            overall = ?system.overall_status,
            components = system.components.len(),
            checked_at = %system.check_time,
            "initial system health"
        );
        for component in system.components.values() {
            tracing::debug!(
                name = %component.name,
                status = ?component.status,
                details = ?component.details,
                last_check = %component.last_check,
                "component health"
            );
        }
    }

    // === 5. Optionally walk one delivery through the full workflow ===
    if demo_requested() {
        run_demo_workflow(&board).await?;
    }

    // === 6. Stay up, logging a board summary until Ctrl-C ===
    tracing::info!("Dashboard live; press Ctrl-C to exit");
    let mut status_interval = tokio::time::interval(tokio::time::Duration::from_secs(10));
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                tracing::info!("🛑 Ctrl-C received; shutting down");
                break;
            }
            _ = status_interval.tick() => {
                let page = board.send(GetBoardPage).await?;
                tracing::info!(
                    tab = %page.tab,
                    page = page.page,
                    total_pages = page.total_pages,
                    pager = ?page.pager,
                    total_orders = page.total_orders,
                    pending = page.counts.pending,
                    successful = page.counts.successful,
                    unsuccessful = page.counts.unsuccessful,
                    initialized = page.initialized,
                    "board status"
                );
            }
        }
    }

    coordinator.send(DeactivateDashboard).await?;
    match coordinator.send(Shutdown).await? {
        Ok(()) => tracing::info!("coordinator stopped"),
        Err(error) => tracing::error!(%error, "coordinator shutdown reported an error"),
    }

    tracing::info!("🎉 Shutdown complete");
    Ok(())
}

fn demo_requested() -> bool {
    std::env::var("TOLO_DEMO").map(|v| v == "1").unwrap_or(false)
}

/// Admin landing: list the driver roster and the analytics windows, then
/// print the spreadsheet export links. With TOLO_DEMO=1 it also walks a
/// throwaway driver through add, edit and remove.
async fn run_admin_menu(config: &AppConfig) -> anyhow::Result<()> {
    let http = reqwest::Client::new();

    let mut drivers = DriverAdmin::new(DriverDirectoryApi::new(http.clone(), &config.backend_url));
    match drivers.refresh().await {
        Ok(()) => {
            tracing::info!(count = drivers.roster().len(), "📋 driver directory loaded");
            for driver in drivers.roster() {
                tracing::info!(
                    id = %driver.id,
                    name = %driver.name,
                    phone = %driver.phone,
                    plate = ?driver.vehicle_plate,
                    "driver"
                );
            }
        }
        Err(error) => {
            tracing::error!(%error, "driver directory unavailable; is the backend running?");
        }
    }

    if demo_requested() {
        run_driver_demo(&mut drivers).await;
    }

    let analytics = AnalyticsApi::new(http, &config.backend_url);
    for days in REPORT_WINDOWS {
        match analytics.detailed(days).await {
            Ok(report) => {
                tracing::info!(
                    days,
                    total_money = report.total_money,
                    total_users = report.total_users,
                    successful = report.status_counts.successful,
                    unsuccessful = report.status_counts.unsuccessful,
                    pending = report.status_counts.pending,
                    success_rate = report.status_counts.success_rate(),
                    daily_points = report.daily_counts.len(),
                    drivers_ranked = report.driver_performance.len(),
                    customers = report.customer_stats.len(),
                    denominations = report.birr_counts.len(),
                    "📊 analytics window"
                );
            }
            Err(error) => {
                tracing::error!(days, %error, "analytics unavailable");
                break;
            }
        }
    }

    for kind in [
        ReportKind::Daily,
        ReportKind::Status,
        ReportKind::Drivers,
        ReportKind::Customers,
        ReportKind::Master,
    ] {
        tracing::info!(?kind, url = %analytics.export_url(kind, 30, None), "spreadsheet export");
    }

    Ok(())
}

/// Scripted roster round trip. Every step logs and carries on so a missing
/// backend degrades to warnings instead of aborting the menu.
async fn run_driver_demo(drivers: &mut DriverAdmin) {
    tracing::info!("📝 Running scripted roster workflow");

    let draft = DriverDraft {
        name: "Demo Driver".to_string(),
        phone: "0910000000".to_string(),
        vehicle_plate: "AA-00000".to_string(),
    };
    if let Err(error) = drivers.add(&draft).await {
        tracing::warn!(%error, "driver add failed; is the backend running?");
        return;
    }
    tracing::info!("✅ Driver added");

    let Some(id) = drivers
        .roster()
        .iter()
        .find(|driver| driver.name == draft.name)
        .map(|driver| driver.id.clone())
    else {
        tracing::warn!("added driver not in refreshed roster; leaving it in place");
        return;
    };

    let edited = DriverDraft {
        vehicle_plate: "AA-11111".to_string(),
        ..draft
    };
    if let Err(error) = drivers.update(&id, &edited).await {
        tracing::warn!(%error, "driver edit failed");
    } else {
        tracing::info!(%id, "✅ Driver edited");
    }

    if let Err(error) = drivers.remove(&id).await {
        tracing::warn!(%error, "driver remove failed");
    } else {
        tracing::info!(%id, "🧹 demo driver removed");
    }
}

/// Walks the newest pending order through the call-center workflow: price,
/// delivery type, driver assignment, notifications, settlement and cleanup.
/// Needs the backend and its feed running to see the created delivery echo
/// back onto the board.
async fn run_demo_workflow(board: &Addr<BoardActor>) -> anyhow::Result<()> {
    tracing::info!("📝 Running scripted dispatch workflow");

    let draft = DeliveryDraft {
        pickup: "Bole Medhanialem".to_string(),
        dropoff: "Piassa Post Office".to_string(),
        sender_phone: "0911000000".to_string(),
        receiver_phone: "0911111111".to_string(),
        quantity: "1".to_string(),
        item_description: "Documents".to_string(),
    };
    if let Err(error) = board.send(CreateDelivery { draft }).await? {
        tracing::warn!(%error, "create failed; is the backend running?");
        return Ok(());
    }
    tracing::info!("✅ Delivery created");

    // Give the feed echo time to land on the board.
    tokio::time::sleep(tokio::time::Duration::from_secs(2)).await;

    board.send(SetTab { tab: StatusTab::Pending }).await?;
    let page_number = board.send(SetPage { page: 1 }).await?;
    tracing::debug!(page = page_number, "pager reset");

    let page = board.send(GetBoardPage).await?;
    let Some(row) = page.rows.first() else {
        tracing::warn!("no pending orders on the board; skipping the rest of the workflow");
        return Ok(());
    };
    let order_id = row.order.id.clone();
    tracing::info!(id = %order_id, "working the newest pending order");

    if let Err(error) = board
        .send(SetPrice { id: order_id.clone(), price: 150.0 })
        .await?
    {
        tracing::warn!(%error, "price update failed");
    }
    if let Err(error) = board
        .send(SetDeliveryType {
            id: order_id.clone(),
            delivery_type: "Payable".to_string(),
        })
        .await?
    {
        tracing::warn!(%error, "delivery type update failed");
    }

    let roster = board.send(GetDriverRoster).await?;
    match roster.first() {
        Some(driver) => {
            match board
                .send(AssignDriver {
                    id: order_id.clone(),
                    driver_id: driver.id.clone(),
                })
                .await?
            {
                Ok(()) => {
                    tracing::info!(driver = %driver.name, "✅ Driver assigned");
                    if let Err(error) = board
                        .send(NotifyDriverApp { id: order_id.clone() })
                        .await?
                    {
                        tracing::warn!(%error, "driver app notification failed");
                    }
                }
                Err(error) => tracing::warn!(%error, "driver assignment failed"),
            }
        }
        None => tracing::warn!("driver roster is empty; skipping assignment"),
    }

    if let Err(error) = board
        .send(SendConfirmationSms { id: order_id.clone() })
        .await?
    {
        tracing::warn!(%error, "confirmation SMS failed");
    }

    // First attempt fails, second succeeds; both settlement paths get used.
    if let Err(error) = board
        .send(MarkUnsuccessful {
            id: order_id.clone(),
            reason: Some("customer unreachable on first attempt".to_string()),
        })
        .await?
    {
        tracing::warn!(%error, "unsuccessful mark failed");
    }
    tokio::time::sleep(tokio::time::Duration::from_secs(1)).await;

    board.send(SetTab { tab: StatusTab::Unsuccessful }).await?;
    let failed_view = board.send(GetBoardPage).await?;
    tracing::info!(
        count = failed_view.counts.for_tab(failed_view.tab),
        "unsuccessful tab after first attempt"
    );

    if let Err(error) = board.send(MarkSuccessful { id: order_id.clone() }).await? {
        tracing::warn!(%error, "successful mark failed");
    }
    tokio::time::sleep(tokio::time::Duration::from_secs(2)).await;

    board.send(SetTab { tab: StatusTab::Successful }).await?;
    let done = board.send(GetBoardPage).await?;
    tracing::info!(
        successful = done.counts.successful,
        unsuccessful = done.counts.unsuccessful,
        "delivery settled"
    );

    if let Err(error) = board.send(DeleteOrder { id: order_id.clone() }).await? {
        tracing::warn!(%error, "cleanup delete failed");
    } else {
        tracing::info!(id = %order_id, "🧹 demo order removed");
    }

    board.send(ReloadSnapshot).await?;
    board.send(SetTab { tab: StatusTab::Pending }).await?;
    tokio::time::sleep(tokio::time::Duration::from_secs(1)).await;

    let resynced = board.send(GetBoardPage).await?;
    for tab in StatusTab::ALL {
        tracing::info!(tab = %tab, count = resynced.counts.for_tab(tab), "tab badge");
    }
    tracing::info!("✅ Workflow complete; board resynced");
    Ok(())
}
