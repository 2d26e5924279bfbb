use actix::prelude::*;
use futures_util::StreamExt;
use std::collections::HashMap;
use std::sync::Arc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::protocol::Message as WsMessage;

use crate::metrics::Metrics;
use crate::models::OrderFeedEvent;
use crate::utils::{Backoff, ReconnectPolicy};

// ============================================================================
// Live Feed Actor - WebSocket order event channel
// ============================================================================
//
// Owns the single connection to the backend's order feed. Frames are JSON
// text tagged by event name; each decoded event is fanned out to every
// registered subscriber. Delivery is at-most-once: events arriving while
// the socket is down are gone, the init snapshot pushed on (re)connect is
// what closes the gap.
//
// The connection is opened on the first Connect message, not on actor start,
// and stays up across view changes; views come and go via Subscribe and
// Unsubscribe. On failure the actor reconnects on a bounded exponential
// schedule and reports itself exhausted once the budget for the outage is
// spent. A later Connect starts over with a fresh budget.
//
// ============================================================================

pub struct LiveFeedActor {
    feed_url: String,
    policy: ReconnectPolicy,
    metrics: Arc<Metrics>,
    subscribers: HashMap<usize, Recipient<FeedNotification>>,
    next_token: usize,
    connected: bool,
    running: bool,
    gave_up: bool,
}

// ============================================================================
// Messages
// ============================================================================

/// One decoded feed event, delivered to every subscriber.
#[derive(Message, Clone, Debug)]
#[rtype(result = "()")]
pub struct FeedNotification {
    pub event: OrderFeedEvent,
}

/// Opens the connection if it is not already running. Idempotent; also the
/// manual recovery path after the reconnect budget ran out.
#[derive(Message)]
#[rtype(result = "()")]
pub struct Connect;

#[derive(Message)]
#[rtype(result = "SubscriptionToken")]
pub struct Subscribe {
    pub recipient: Recipient<FeedNotification>,
}

#[derive(Message)]
#[rtype(result = "()")]
pub struct Unsubscribe {
    pub token: SubscriptionToken,
}

/// Handed out by Subscribe; required to unsubscribe on view teardown.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SubscriptionToken(usize);

#[derive(Message)]
#[rtype(result = "FeedHealth")]
pub struct GetFeedStatus;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FeedHealth {
    pub connected: bool,
    pub gave_up: bool,
    pub subscribers: usize,
}

// Internal messages from the connection task back to the actor.

#[derive(Message)]
#[rtype(result = "()")]
struct Dispatch {
    event: OrderFeedEvent,
}

#[derive(Message)]
#[rtype(result = "()")]
struct ConnectionUp;

#[derive(Message)]
#[rtype(result = "()")]
struct ConnectionDown {
    reason: String,
}

#[derive(Message)]
#[rtype(result = "()")]
struct ConnectionExhausted {
    attempts: u32,
}

// ============================================================================
// Connection Task
// ============================================================================

/// Connect/read loop, detached from the actor so a slow socket never blocks
/// the mailbox. Exits when the actor is gone or the reconnect budget for the
/// current outage is spent.
async fn run_feed_loop(
    addr: Addr<LiveFeedActor>,
    feed_url: String,
    policy: ReconnectPolicy,
    metrics: Arc<Metrics>,
) {
    let mut backoff = Backoff::new(policy);

    loop {
        if !addr.connected() {
            return;
        }

        match connect_async(&feed_url).await {
            Ok((mut stream, _response)) => {
                backoff.reset();
                addr.do_send(ConnectionUp);

                while let Some(frame) = stream.next().await {
                    match frame {
                        Ok(WsMessage::Text(text)) => {
                            match serde_json::from_str::<OrderFeedEvent>(&text) {
                                Ok(event) => addr.do_send(Dispatch { event }),
                                Err(err) => {
                                    tracing::warn!(error = %err, "undecodable feed frame dropped");
                                    metrics.record_dropped_delta("unknown", "undecodable");
                                }
                            }
                        }
                        Ok(WsMessage::Close(_)) => break,
                        // Pings are answered by the protocol layer during the
                        // next poll; binary frames are not part of this feed.
                        Ok(_) => {}
                        Err(err) => {
                            tracing::warn!(error = %err, "feed stream error");
                            break;
                        }
                    }
                }

                addr.do_send(ConnectionDown {
                    reason: "stream closed".to_string(),
                });
            }
            Err(err) => {
                addr.do_send(ConnectionDown {
                    reason: err.to_string(),
                });
            }
        }

        match backoff.next_delay() {
            Some(delay) => {
                tracing::info!(
                    attempt = backoff.attempts_made(),
                    max_attempts = backoff.max_attempts(),
                    delay_ms = delay.as_millis() as u64,
                    "scheduling feed reconnect"
                );
                tokio::time::sleep(delay).await;
            }
            None => {
                addr.do_send(ConnectionExhausted {
                    attempts: backoff.attempts_made(),
                });
                return;
            }
        }
    }
}

// ============================================================================
// Actor
// ============================================================================

impl LiveFeedActor {
    pub fn new(feed_url: String, policy: ReconnectPolicy, metrics: Arc<Metrics>) -> Self {
        Self {
            feed_url,
            policy,
            metrics,
            subscribers: HashMap::new(),
            next_token: 0,
            connected: false,
            running: false,
            gave_up: false,
        }
    }
}

impl Actor for LiveFeedActor {
    type Context = Context<Self>;

    fn started(&mut self, _ctx: &mut Self::Context) {
        tracing::info!(feed_url = %self.feed_url, "LiveFeedActor started");
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        tracing::info!("🛑 LiveFeedActor stopped");
    }
}

impl Handler<Connect> for LiveFeedActor {
    type Result = ();

    fn handle(&mut self, _: Connect, ctx: &mut Self::Context) {
        if self.running {
            tracing::debug!("feed connection already running");
            return;
        }
        self.running = true;
        self.gave_up = false;

        tracing::info!(feed_url = %self.feed_url, "🔌 opening live feed connection");
        tokio::spawn(run_feed_loop(
            ctx.address(),
            self.feed_url.clone(),
            self.policy.clone(),
            self.metrics.clone(),
        ));
    }
}

impl Handler<Subscribe> for LiveFeedActor {
    type Result = MessageResult<Subscribe>;

    fn handle(&mut self, msg: Subscribe, _: &mut Self::Context) -> Self::Result {
        let token = SubscriptionToken(self.next_token);
        self.next_token += 1;
        self.subscribers.insert(token.0, msg.recipient);

        tracing::debug!(
            token = token.0,
            subscribers = self.subscribers.len(),
            "feed subscriber registered"
        );
        MessageResult(token)
    }
}

impl Handler<Unsubscribe> for LiveFeedActor {
    type Result = ();

    fn handle(&mut self, msg: Unsubscribe, _: &mut Self::Context) {
        if self.subscribers.remove(&msg.token.0).is_some() {
            tracing::debug!(
                token = msg.token.0,
                subscribers = self.subscribers.len(),
                "feed subscriber released"
            );
        }
    }
}

impl Handler<Dispatch> for LiveFeedActor {
    type Result = ();

    fn handle(&mut self, msg: Dispatch, _: &mut Self::Context) {
        self.metrics.record_feed_event(msg.event.kind());
        tracing::debug!(
            event = msg.event.kind(),
            subscribers = self.subscribers.len(),
            "feed event dispatched"
        );

        for recipient in self.subscribers.values() {
            recipient.do_send(FeedNotification {
                event: msg.event.clone(),
            });
        }
    }
}

impl Handler<ConnectionUp> for LiveFeedActor {
    type Result = ();

    fn handle(&mut self, _: ConnectionUp, _: &mut Self::Context) {
        self.connected = true;
        self.metrics.record_feed_connected();
        tracing::info!("✅ live feed connected");
    }
}

impl Handler<ConnectionDown> for LiveFeedActor {
    type Result = ();

    fn handle(&mut self, msg: ConnectionDown, _: &mut Self::Context) {
        // Failed attempts land here too; only count a real drop once.
        if self.connected {
            self.metrics.record_feed_disconnected();
        }
        self.connected = false;
        tracing::warn!(reason = %msg.reason, "live feed disconnected");
    }
}

impl Handler<ConnectionExhausted> for LiveFeedActor {
    type Result = ();

    fn handle(&mut self, msg: ConnectionExhausted, _: &mut Self::Context) {
        self.running = false;
        self.gave_up = true;
        tracing::error!(
            attempts = msg.attempts,
            "❌ live feed gave up reconnecting; deltas are lost until reconnected"
        );
    }
}

impl Handler<GetFeedStatus> for LiveFeedActor {
    type Result = MessageResult<GetFeedStatus>;

    fn handle(&mut self, _: GetFeedStatus, _: &mut Self::Context) -> Self::Result {
        MessageResult(FeedHealth {
            connected: self.connected,
            gave_up: self.gave_up,
            subscribers: self.subscribers.len(),
        })
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Order, OrderId};

    #[derive(Default)]
    struct Recorder {
        seen: Vec<&'static str>,
    }

    impl Actor for Recorder {
        type Context = Context<Self>;
    }

    impl Handler<FeedNotification> for Recorder {
        type Result = ();

        fn handle(&mut self, msg: FeedNotification, _: &mut Self::Context) {
            self.seen.push(msg.event.kind());
        }
    }

    #[derive(Message)]
    #[rtype(result = "Vec<&'static str>")]
    struct Seen;

    impl Handler<Seen> for Recorder {
        type Result = MessageResult<Seen>;

        fn handle(&mut self, _: Seen, _: &mut Self::Context) -> Self::Result {
            MessageResult(self.seen.clone())
        }
    }

    fn offline_feed() -> Addr<LiveFeedActor> {
        // Never sent Connect, so no socket is ever opened.
        LiveFeedActor::new(
            "ws://127.0.0.1:1/ws/orders".to_string(),
            ReconnectPolicy::default(),
            Arc::new(Metrics::new().unwrap()),
        )
        .start()
    }

    fn created(id: &str) -> OrderFeedEvent {
        OrderFeedEvent::OrderCreated(Order {
            id: OrderId::from(id),
            ..Default::default()
        })
    }

    #[actix::test]
    async fn test_dispatch_fans_out_until_unsubscribed() {
        let feed = offline_feed();
        let first = Recorder::default().start();
        let second = Recorder::default().start();

        let token = feed
            .send(Subscribe {
                recipient: first.clone().recipient(),
            })
            .await
            .unwrap();
        feed.send(Subscribe {
            recipient: second.clone().recipient(),
        })
        .await
        .unwrap();

        feed.send(Dispatch {
            event: created("o1"),
        })
        .await
        .unwrap();

        feed.send(Unsubscribe { token }).await.unwrap();

        feed.send(Dispatch {
            event: created("o2"),
        })
        .await
        .unwrap();

        assert_eq!(first.send(Seen).await.unwrap(), vec!["order_created"]);
        assert_eq!(
            second.send(Seen).await.unwrap(),
            vec!["order_created", "order_created"]
        );

        let status = feed.send(GetFeedStatus).await.unwrap();
        assert_eq!(status.subscribers, 1);
    }

    #[actix::test]
    async fn test_status_starts_disconnected_without_connect() {
        let feed = offline_feed();
        let status = feed.send(GetFeedStatus).await.unwrap();

        assert!(!status.connected);
        assert!(!status.gave_up);
        assert_eq!(status.subscribers, 0);
    }
}
