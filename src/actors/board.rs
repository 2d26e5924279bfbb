use actix::fut;
use actix::prelude::*;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use crate::api::{ApiError, DriverDirectoryApi, OrderServiceApi};
use crate::domain::board::{
    clamp_page, page_slice, total_pages, visible_pages, OrderBoard, StatusTab, TabCounts,
    ORDERS_PER_PAGE,
};
use crate::metrics::Metrics;
use crate::models::{DeliveryDraft, Driver, DriverId, Order, OrderFeedEvent, OrderId, OrderOutcome};

use super::live_feed::{FeedNotification, LiveFeedActor, Subscribe, SubscriptionToken, Unsubscribe};

// ============================================================================
// Board Actor - One active dashboard view
// ============================================================================
//
// Owns the OrderBoard for a single activation of the dashboard. On start it
// subscribes to the live feed and fires the one-time HTTP snapshot fetch
// (driver roster first, then deliveries); whichever snapshot source lands
// first wins, the other is ignored. From then on the board moves only
// through feed deltas and the few commands that apply their result locally.
//
// Commands go to the Remote Order Service exactly once. A failed command
// changes nothing on the board and is surfaced to the caller; recovery for
// a failed snapshot is an explicit ReloadSnapshot, never an automatic retry.
//
// On stop the actor unsubscribes from the feed, so a closed view can never
// receive another delta, and any snapshot fetch still in flight dies with
// the actor's context.
//
// ============================================================================

pub struct BoardActor {
    orders_api: Arc<OrderServiceApi>,
    drivers_api: Arc<DriverDirectoryApi>,
    feed: Addr<LiveFeedActor>,
    metrics: Arc<Metrics>,
    board: OrderBoard,
    drivers: Vec<Driver>,
    tab: StatusTab,
    page: usize,
    subscription: Option<SubscriptionToken>,
}

// ============================================================================
// Messages
// ============================================================================

/// Everything the dashboard renders for the current tab and page.
#[derive(Message)]
#[rtype(result = "BoardPage")]
pub struct GetBoardPage;

#[derive(Clone, Debug)]
pub struct BoardPage {
    pub tab: StatusTab,
    pub counts: TabCounts,
    pub rows: Vec<BoardRow>,
    pub page: usize,
    pub total_pages: usize,
    pub pager: Vec<usize>,
    pub total_orders: usize,
    pub initialized: bool,
}

#[derive(Clone, Debug)]
pub struct BoardRow {
    pub order: Order,
    pub driver_name: Option<String>,
}

/// Driver directory as fetched with the snapshot; feeds the assignment
/// dropdown and the name join.
#[derive(Message)]
#[rtype(result = "Vec<Driver>")]
pub struct GetDriverRoster;

#[derive(Message)]
#[rtype(result = "()")]
pub struct SetTab {
    pub tab: StatusTab,
}

/// Moves to a page; the reply is the page actually landed on after clamping.
#[derive(Message)]
#[rtype(result = "usize")]
pub struct SetPage {
    pub page: usize,
}

#[derive(Message)]
#[rtype(result = "Result<(), ApiError>")]
pub struct MarkSuccessful {
    pub id: OrderId,
}

#[derive(Message)]
#[rtype(result = "Result<(), ApiError>")]
pub struct MarkUnsuccessful {
    pub id: OrderId,
    pub reason: Option<String>,
}

#[derive(Message)]
#[rtype(result = "Result<(), ApiError>")]
pub struct SetPrice {
    pub id: OrderId,
    pub price: f64,
}

#[derive(Message)]
#[rtype(result = "Result<(), ApiError>")]
pub struct SetDeliveryType {
    pub id: OrderId,
    pub delivery_type: String,
}

#[derive(Message)]
#[rtype(result = "Result<(), ApiError>")]
pub struct AssignDriver {
    pub id: OrderId,
    pub driver_id: DriverId,
}

/// Pushes the delivery to the already-assigned driver's app.
#[derive(Message)]
#[rtype(result = "Result<(), ApiError>")]
pub struct NotifyDriverApp {
    pub id: OrderId,
}

#[derive(Message)]
#[rtype(result = "Result<(), ApiError>")]
pub struct SendConfirmationSms {
    pub id: OrderId,
}

#[derive(Message)]
#[rtype(result = "Result<(), ApiError>")]
pub struct CreateDelivery {
    pub draft: DeliveryDraft,
}

#[derive(Message)]
#[rtype(result = "Result<(), ApiError>")]
pub struct DeleteOrder {
    pub id: OrderId,
}

/// Clears the board and refetches the snapshot. The recovery path after a
/// failed initial fetch.
#[derive(Message)]
#[rtype(result = "()")]
pub struct ReloadSnapshot;

/// View teardown; stops the actor and releases the feed subscription.
#[derive(Message)]
#[rtype(result = "()")]
pub struct CloseView;

// ============================================================================
// Actor
// ============================================================================

impl BoardActor {
    pub fn new(
        orders_api: Arc<OrderServiceApi>,
        drivers_api: Arc<DriverDirectoryApi>,
        feed: Addr<LiveFeedActor>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            orders_api,
            drivers_api,
            feed,
            metrics,
            board: OrderBoard::new(),
            drivers: Vec::new(),
            tab: StatusTab::Pending,
            page: 1,
            subscription: None,
        }
    }

    /// One-shot combined fetch: roster first, then deliveries. Either failure
    /// aborts the whole snapshot and leaves the board waiting on the feed's
    /// init event or a manual reload.
    fn spawn_snapshot_fetch(&mut self, ctx: &mut Context<Self>) {
        let orders_api = self.orders_api.clone();
        let drivers_api = self.drivers_api.clone();
        let metrics = self.metrics.clone();

        ctx.spawn(
            async move {
                let started_at = Instant::now();
                let drivers = drivers_api.list().await;
                metrics.record_api_call(
                    "list_drivers",
                    started_at.elapsed().as_secs_f64(),
                    drivers.is_ok(),
                );
                let drivers = drivers?;

                let started_at = Instant::now();
                let orders = orders_api.fetch_deliveries().await;
                metrics.record_api_call(
                    "fetch_deliveries",
                    started_at.elapsed().as_secs_f64(),
                    orders.is_ok(),
                );
                Ok((drivers, orders?))
            }
            .into_actor(self)
            .map(
                |result: Result<(Vec<Driver>, Vec<Order>), ApiError>, act, _ctx| match result {
                    Ok((drivers, orders)) => {
                        act.drivers = drivers;
                        let applied = act.board.load_snapshot(orders);
                        act.metrics.record_snapshot_load("http", applied);
                        act.metrics.set_board_size(act.board.len());
                        if applied {
                            tracing::info!(
                                orders = act.board.len(),
                                drivers = act.drivers.len(),
                                "✅ board loaded from http snapshot"
                            );
                        } else {
                            tracing::debug!("feed snapshot arrived first, http snapshot ignored");
                        }
                    }
                    Err(err) => {
                        tracing::error!(
                            error = %err,
                            "snapshot fetch failed, board stays empty until reload"
                        );
                    }
                },
            ),
        );
    }

    /// Runs one acknowledged command, recording latency and outcome. The
    /// board is not touched; the mutated order comes back on the feed.
    fn track<F>(&mut self, op: &'static str, request: F) -> ResponseActFuture<Self, Result<(), ApiError>>
    where
        F: Future<Output = Result<(), ApiError>> + 'static,
    {
        Box::pin(
            async move {
                let started_at = Instant::now();
                let result = request.await;
                (result, started_at.elapsed())
            }
            .into_actor(self)
            .map(move |(result, elapsed), act, _ctx| {
                act.metrics
                    .record_api_call(op, elapsed.as_secs_f64(), result.is_ok());
                if let Err(ref err) = result {
                    tracing::error!(op, error = %err, "order service command failed");
                }
                result
            }),
        )
    }

    /// Field updates echo the full order back in the response instead of on
    /// the feed; apply it to the board here.
    fn track_field_update<F>(
        &mut self,
        op: &'static str,
        request: F,
    ) -> ResponseActFuture<Self, Result<(), ApiError>>
    where
        F: Future<Output = Result<Order, ApiError>> + 'static,
    {
        Box::pin(
            async move {
                let started_at = Instant::now();
                let result = request.await;
                (result, started_at.elapsed())
            }
            .into_actor(self)
            .map(move |(result, elapsed), act, _ctx| {
                act.metrics
                    .record_api_call(op, elapsed.as_secs_f64(), result.is_ok());
                match result {
                    Ok(updated) => {
                        let id = updated.id.clone();
                        if !act.board.apply_updated(updated) {
                            tracing::debug!(order_id = %id, op, "updated order no longer on the board");
                        }
                        act.metrics.set_board_size(act.board.len());
                        Ok(())
                    }
                    Err(err) => {
                        tracing::error!(op, error = %err, "order service command failed");
                        Err(err)
                    }
                }
            }),
        )
    }
}

impl Actor for BoardActor {
    type Context = Context<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        tracing::info!("📋 dashboard view activated");

        // Hold the mailbox until the subscription is registered so no feed
        // event can slip past an unsubscribed view.
        let feed = self.feed.clone();
        let recipient = ctx.address().recipient();
        ctx.wait(
            async move { feed.send(Subscribe { recipient }).await }
                .into_actor(self)
                .map(|result, act, _ctx| match result {
                    Ok(token) => act.subscription = Some(token),
                    Err(err) => tracing::error!(error = %err, "live feed subscription failed"),
                }),
        );

        self.spawn_snapshot_fetch(ctx);
    }

    fn stopped(&mut self, _: &mut Self::Context) {
        if let Some(token) = self.subscription.take() {
            self.feed.do_send(Unsubscribe { token });
        }
        tracing::info!("📋 dashboard view closed, feed subscription released");
    }
}

// ============================================================================
// Feed Delta Handling
// ============================================================================

impl Handler<FeedNotification> for BoardActor {
    type Result = ();

    fn handle(&mut self, msg: FeedNotification, _: &mut Self::Context) {
        match msg.event {
            OrderFeedEvent::InitOrders(orders) => {
                let count = orders.len();
                let applied = self.board.load_snapshot(orders);
                self.metrics.record_snapshot_load("feed", applied);
                if applied {
                    tracing::info!(orders = count, "✅ board loaded from feed snapshot");
                } else {
                    tracing::debug!("board already initialized, feed snapshot ignored");
                }
            }
            OrderFeedEvent::OrderCreated(order) => {
                tracing::debug!(order_id = %order.id, "order created");
                self.board.apply_created(order);
            }
            OrderFeedEvent::OrderUpdated(order) => {
                let id = order.id.clone();
                if self.board.apply_updated(order) {
                    tracing::debug!(order_id = %id, "order updated");
                } else {
                    self.metrics.record_dropped_delta("order_updated", "unmatched");
                    tracing::debug!(order_id = %id, "update for unknown order dropped");
                }
            }
            OrderFeedEvent::OrderDeleted(deleted) => {
                if self.board.apply_deleted(&deleted.id) {
                    tracing::debug!(order_id = %deleted.id, "order deleted");
                } else {
                    self.metrics.record_dropped_delta("order_deleted", "unmatched");
                    tracing::debug!(order_id = %deleted.id, "deletion for unknown order dropped");
                }
            }
        }
        self.metrics.set_board_size(self.board.len());
    }
}

// ============================================================================
// View Queries
// ============================================================================

impl Handler<GetBoardPage> for BoardActor {
    type Result = MessageResult<GetBoardPage>;

    fn handle(&mut self, _: GetBoardPage, _: &mut Self::Context) -> Self::Result {
        let filtered: Vec<&Order> = self.board.filter_by_status(self.tab).collect();
        let pages = total_pages(filtered.len(), ORDERS_PER_PAGE);
        // Deletions can leave the cursor past the end; snap it back.
        self.page = clamp_page(self.page, filtered.len(), ORDERS_PER_PAGE);

        let rows = page_slice(&filtered, self.page, ORDERS_PER_PAGE)
            .iter()
            .map(|order| BoardRow {
                driver_name: order.driver_display_name(&self.drivers),
                order: (*order).clone(),
            })
            .collect();

        MessageResult(BoardPage {
            tab: self.tab,
            counts: self.board.tab_counts(),
            rows,
            page: self.page,
            total_pages: pages,
            pager: visible_pages(self.page, pages),
            total_orders: self.board.len(),
            initialized: self.board.initialized(),
        })
    }
}

impl Handler<GetDriverRoster> for BoardActor {
    type Result = MessageResult<GetDriverRoster>;

    fn handle(&mut self, _: GetDriverRoster, _: &mut Self::Context) -> Self::Result {
        MessageResult(self.drivers.clone())
    }
}

impl Handler<SetTab> for BoardActor {
    type Result = ();

    fn handle(&mut self, msg: SetTab, _: &mut Self::Context) {
        tracing::debug!(tab = %msg.tab, "tab selected");
        self.tab = msg.tab;
        self.page = 1;
    }
}

impl Handler<SetPage> for BoardActor {
    type Result = MessageResult<SetPage>;

    fn handle(&mut self, msg: SetPage, _: &mut Self::Context) -> Self::Result {
        let filtered = self.board.filter_by_status(self.tab).count();
        self.page = clamp_page(msg.page, filtered, ORDERS_PER_PAGE);
        MessageResult(self.page)
    }
}

// ============================================================================
// Order Commands
// ============================================================================

impl Handler<MarkSuccessful> for BoardActor {
    type Result = ResponseActFuture<Self, Result<(), ApiError>>;

    fn handle(&mut self, msg: MarkSuccessful, _: &mut Self::Context) -> Self::Result {
        let api = self.orders_api.clone();
        self.track("update_delivery_status", async move {
            api.update_delivery_status(&msg.id, OrderOutcome::Successful, None)
                .await
        })
    }
}

impl Handler<MarkUnsuccessful> for BoardActor {
    type Result = ResponseActFuture<Self, Result<(), ApiError>>;

    fn handle(&mut self, msg: MarkUnsuccessful, _: &mut Self::Context) -> Self::Result {
        let api = self.orders_api.clone();
        self.track("update_delivery_status", async move {
            api.update_delivery_status(&msg.id, OrderOutcome::Unsuccessful, msg.reason.as_deref())
                .await
        })
    }
}

impl Handler<SetPrice> for BoardActor {
    type Result = ResponseActFuture<Self, Result<(), ApiError>>;

    fn handle(&mut self, msg: SetPrice, _: &mut Self::Context) -> Self::Result {
        let api = self.orders_api.clone();
        self.track_field_update("update_delivery_field", async move {
            api.set_price(&msg.id, msg.price).await
        })
    }
}

impl Handler<SetDeliveryType> for BoardActor {
    type Result = ResponseActFuture<Self, Result<(), ApiError>>;

    fn handle(&mut self, msg: SetDeliveryType, _: &mut Self::Context) -> Self::Result {
        let api = self.orders_api.clone();
        self.track_field_update("update_delivery_field", async move {
            api.set_delivery_type(&msg.id, &msg.delivery_type).await
        })
    }
}

impl Handler<AssignDriver> for BoardActor {
    type Result = ResponseActFuture<Self, Result<(), ApiError>>;

    fn handle(&mut self, msg: AssignDriver, _: &mut Self::Context) -> Self::Result {
        let Some(order) = self.board.get(&msg.id) else {
            return Box::pin(fut::ready(Err(ApiError::Precondition(
                "order is not on the board",
            ))));
        };
        if !order.ready_for_assignment() {
            return Box::pin(fut::ready(Err(ApiError::Precondition(
                "price and delivery type must be set before assigning a driver",
            ))));
        }

        let api = self.orders_api.clone();
        self.track("assign_driver", async move {
            api.assign_driver(&msg.id, &msg.driver_id).await
        })
    }
}

impl Handler<NotifyDriverApp> for BoardActor {
    type Result = ResponseActFuture<Self, Result<(), ApiError>>;

    fn handle(&mut self, msg: NotifyDriverApp, _: &mut Self::Context) -> Self::Result {
        let Some(driver_id) = self
            .board
            .get(&msg.id)
            .and_then(|order| order.assigned_driver_id.clone())
        else {
            return Box::pin(fut::ready(Err(ApiError::Precondition(
                "no driver assigned to this order",
            ))));
        };

        let api = self.orders_api.clone();
        self.track("notify_driver_app", async move {
            api.notify_driver_app(&msg.id, &driver_id).await
        })
    }
}

impl Handler<SendConfirmationSms> for BoardActor {
    type Result = ResponseActFuture<Self, Result<(), ApiError>>;

    fn handle(&mut self, msg: SendConfirmationSms, _: &mut Self::Context) -> Self::Result {
        let Some(order) = self.board.get(&msg.id).cloned() else {
            return Box::pin(fut::ready(Err(ApiError::Precondition(
                "order is not on the board",
            ))));
        };

        let api = self.orders_api.clone();
        self.track("send_sms", async move {
            api.send_confirmation_sms(&order).await
        })
    }
}

impl Handler<CreateDelivery> for BoardActor {
    type Result = ResponseActFuture<Self, Result<(), ApiError>>;

    fn handle(&mut self, msg: CreateDelivery, _: &mut Self::Context) -> Self::Result {
        if let Err(err) = msg.draft.validate() {
            return Box::pin(fut::ready(Err(err.into())));
        }

        let api = self.orders_api.clone();
        self.track("create_delivery", async move {
            // The board is untouched here; the new order arrives as a
            // created event on the feed.
            api.create_delivery(&msg.draft).await
        })
    }
}

impl Handler<DeleteOrder> for BoardActor {
    type Result = ResponseActFuture<Self, Result<(), ApiError>>;

    fn handle(&mut self, msg: DeleteOrder, _: &mut Self::Context) -> Self::Result {
        let api = self.orders_api.clone();
        Box::pin(
            async move {
                let started_at = Instant::now();
                let result = api.delete_order(&msg.id).await;
                (msg.id, result, started_at.elapsed())
            }
            .into_actor(self)
            .map(|(id, result, elapsed), act, _ctx| {
                act.metrics
                    .record_api_call("delete_order", elapsed.as_secs_f64(), result.is_ok());
                match result {
                    Ok(()) => {
                        // No deletion event echoes back for this path.
                        act.board.apply_deleted(&id);
                        act.metrics.set_board_size(act.board.len());
                        Ok(())
                    }
                    Err(err) => {
                        tracing::error!(order_id = %id, error = %err, "delete failed, order kept on the board");
                        Err(err)
                    }
                }
            }),
        )
    }
}

impl Handler<ReloadSnapshot> for BoardActor {
    type Result = ();

    fn handle(&mut self, _: ReloadSnapshot, ctx: &mut Self::Context) {
        tracing::info!("manual reload requested, clearing board");
        self.board.reset();
        self.metrics.set_board_size(0);
        self.spawn_snapshot_fetch(ctx);
    }
}

impl Handler<CloseView> for BoardActor {
    type Result = ();

    fn handle(&mut self, _: CloseView, ctx: &mut Self::Context) {
        ctx.stop();
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::super::live_feed::GetFeedStatus;
    use super::*;
    use crate::models::DeletedOrder;
    use crate::utils::ReconnectPolicy;
    use chrono::{TimeZone, Utc};

    /// Feed is never connected and the backend URL is unroutable, so all
    /// state changes come from injected feed notifications.
    fn view() -> (Addr<LiveFeedActor>, Addr<BoardActor>) {
        let metrics = Arc::new(Metrics::new().unwrap());
        let feed = LiveFeedActor::new(
            "ws://127.0.0.1:1/ws/orders".to_string(),
            ReconnectPolicy::default(),
            metrics.clone(),
        )
        .start();

        let http = reqwest::Client::new();
        let orders_api = Arc::new(OrderServiceApi::new(http.clone(), "http://127.0.0.1:1"));
        let drivers_api = Arc::new(DriverDirectoryApi::new(http, "http://127.0.0.1:1"));
        let board = BoardActor::new(orders_api, drivers_api, feed.clone(), metrics).start();
        (feed, board)
    }

    fn pending_order(id: &str, minute: u32) -> Order {
        Order {
            id: OrderId::from(id),
            status: Some("pending".to_string()),
            timestamp: Some(Utc.with_ymd_and_hms(2026, 8, 20, 9, minute, 0).unwrap()),
            ..Default::default()
        }
    }

    async fn push(board: &Addr<BoardActor>, event: OrderFeedEvent) {
        board.send(FeedNotification { event }).await.unwrap();
    }

    #[actix::test]
    async fn test_feed_snapshot_then_paging() {
        let (_feed, board) = view();

        let orders: Vec<Order> = (1..=12)
            .map(|i| pending_order(&format!("o{i}"), i))
            .collect();
        push(&board, OrderFeedEvent::InitOrders(orders)).await;
        push(&board, OrderFeedEvent::OrderCreated(pending_order("fresh", 59))).await;

        let page = board.send(GetBoardPage).await.unwrap();
        assert!(page.initialized);
        assert_eq!(page.counts.pending, 13);
        assert_eq!(page.total_pages, 2);
        assert_eq!(page.rows.len(), 10);
        assert_eq!(page.rows[0].order.id, OrderId::from("fresh"));
        assert_eq!(page.pager, vec![1, 2]);

        // Way past the end lands on the last page.
        let landed = board.send(SetPage { page: 9 }).await.unwrap();
        assert_eq!(landed, 2);
        let page = board.send(GetBoardPage).await.unwrap();
        assert_eq!(page.rows.len(), 3);

        // Tab switch resets to page one.
        board
            .send(SetTab {
                tab: StatusTab::Successful,
            })
            .await
            .unwrap();
        let page = board.send(GetBoardPage).await.unwrap();
        assert_eq!(page.page, 1);
        assert!(page.rows.is_empty());
        assert_eq!(page.total_pages, 1);
        assert_eq!(page.pager, vec![1]);
    }

    #[actix::test]
    async fn test_feed_deltas_move_orders_between_tabs() {
        let (_feed, board) = view();

        push(
            &board,
            OrderFeedEvent::InitOrders(vec![pending_order("a", 1), pending_order("b", 2)]),
        )
        .await;

        let mut finished = pending_order("a", 1);
        finished.status = Some("successful".to_string());
        push(&board, OrderFeedEvent::OrderUpdated(finished)).await;

        // Unknown id: dropped, never inserted.
        push(&board, OrderFeedEvent::OrderUpdated(pending_order("ghost", 9))).await;

        push(
            &board,
            OrderFeedEvent::OrderDeleted(DeletedOrder {
                id: OrderId::from("b"),
            }),
        )
        .await;

        let page = board.send(GetBoardPage).await.unwrap();
        assert_eq!(page.total_orders, 1);
        assert_eq!(page.counts.pending, 0);
        assert_eq!(page.counts.successful, 1);
        assert!(page.rows.is_empty());
    }

    #[actix::test]
    async fn test_close_view_releases_feed_subscription() {
        let (feed, board) = view();

        // Any answered query proves started() finished subscribing.
        board.send(GetBoardPage).await.unwrap();
        assert_eq!(feed.send(GetFeedStatus).await.unwrap().subscribers, 1);

        board.send(CloseView).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        assert_eq!(feed.send(GetFeedStatus).await.unwrap().subscribers, 0);
    }

    #[actix::test]
    async fn test_assign_driver_gated_on_price_and_type() {
        let (_feed, board) = view();

        push(&board, OrderFeedEvent::InitOrders(vec![pending_order("bare", 1)])).await;

        let err = board
            .send(AssignDriver {
                id: OrderId::from("bare"),
                driver_id: DriverId::from("d1"),
            })
            .await
            .unwrap()
            .unwrap_err();
        assert!(matches!(err, ApiError::Precondition(_)));

        let err = board
            .send(NotifyDriverApp {
                id: OrderId::from("bare"),
            })
            .await
            .unwrap()
            .unwrap_err();
        assert!(matches!(err, ApiError::Precondition(_)));
    }

    #[actix::test]
    async fn test_create_delivery_validates_before_any_request() {
        let (_feed, board) = view();

        let err = board
            .send(CreateDelivery {
                draft: DeliveryDraft::default(),
            })
            .await
            .unwrap()
            .unwrap_err();
        assert!(matches!(err, ApiError::Form(_)));
    }
}
