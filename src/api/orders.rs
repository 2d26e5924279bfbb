use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::models::{DeliveryDraft, DriverId, Order, OrderId, OrderOutcome};
use crate::utils::{CircuitBreaker, CircuitBreakerConfig, CircuitBreakerError, CircuitState};

use super::error::ApiError;

// ============================================================================
// Remote Order Service Client
// ============================================================================
//
// Thin JSON-over-HTTP client for the delivery backend. Three command shapes
// exist on the wire:
//
// - field update returns the full updated order, which the caller applies
//   locally;
// - status transition and driver assignment return only an acknowledgment,
//   the mutated order arrives later on the live feed;
// - delete returns an acknowledgment and the caller removes locally.
//
// Every call goes through a circuit breaker so a dead backend fails fast
// instead of piling up request timeouts. Failures are surfaced to the
// caller unchanged; nothing here retries.
//
// ============================================================================

const BREAKER_FAILURE_THRESHOLD: u32 = 5;
const BREAKER_RESET_TIMEOUT_SECS: u64 = 30;

pub struct OrderServiceApi {
    http: reqwest::Client,
    base_url: String,
    breaker: CircuitBreaker,
}

#[derive(Serialize)]
struct StatusBody<'a> {
    status: OrderOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<&'a str>,
}

#[derive(Serialize)]
struct FieldBody<'a> {
    field: &'a str,
    value: serde_json::Value,
}

#[derive(Serialize)]
struct AssignBody<'a> {
    driver_id: &'a DriverId,
}

#[derive(Serialize)]
struct SmsBody<'a> {
    delivery_id: &'a OrderId,
    sender_phone: Option<&'a str>,
    receiver_phone: Option<&'a str>,
    message: String,
}

#[derive(Serialize)]
struct NotifyBody<'a> {
    delivery_id: &'a OrderId,
    driver_id: &'a DriverId,
}

/// Acknowledgment shape the backend uses, with every field optional since
/// the endpoints are not uniform about which ones they set.
#[derive(Debug, Default, Deserialize)]
struct Ack {
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

async fn read_ack(op: &'static str, response: reqwest::Response) -> Result<(), ApiError> {
    let status = response.status();
    let text = response.text().await?;
    let ack: Ack = serde_json::from_str(&text).unwrap_or_default();
    let message = ack.error.or(ack.message);

    if !status.is_success() {
        return Err(match message {
            Some(message) => ApiError::Rejected { op, message },
            None => ApiError::Status { op, status },
        });
    }
    if ack.success == Some(false) {
        return Err(ApiError::Rejected {
            op,
            message: message.unwrap_or_else(|| "request not accepted".to_string()),
        });
    }
    Ok(())
}

impl OrderServiceApi {
    pub fn new(http: reqwest::Client, base_url: &str) -> Self {
        let breaker = CircuitBreaker::new(CircuitBreakerConfig {
            failure_threshold: BREAKER_FAILURE_THRESHOLD,
            timeout: Duration::from_secs(BREAKER_RESET_TIMEOUT_SECS),
            success_threshold: 2,
        });

        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            breaker,
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Runs one request under the circuit breaker, mapping an open circuit
    /// to its own error so callers can tell "never sent" from "failed".
    async fn guarded<T, F>(&self, op: &'static str, request: F) -> Result<T, ApiError>
    where
        F: Future<Output = Result<T, ApiError>>,
    {
        match self.breaker.call(request).await {
            Ok(value) => Ok(value),
            Err(CircuitBreakerError::CircuitOpen) => {
                tracing::warn!(op, "order service circuit open, failing fast");
                Err(ApiError::CircuitOpen)
            }
            Err(CircuitBreakerError::OperationFailed(err)) => Err(err),
        }
    }

    /// Bulk snapshot of all deliveries.
    pub async fn fetch_deliveries(&self) -> Result<Vec<Order>, ApiError> {
        let url = self.endpoint("/api/deliveries");
        self.guarded("fetch_deliveries", async {
            let response = self.http.get(&url).send().await?;
            let status = response.status();
            if !status.is_success() {
                return Err(ApiError::Status {
                    op: "fetch_deliveries",
                    status,
                });
            }
            let orders: Vec<Order> = response.json().await?;
            tracing::debug!(count = orders.len(), "fetched delivery snapshot");
            Ok(orders)
        })
        .await
    }

    pub async fn create_delivery(&self, draft: &DeliveryDraft) -> Result<(), ApiError> {
        let url = self.endpoint("/api/create_delivery");
        self.guarded("create_delivery", async {
            let response = self.http.post(&url).json(draft).send().await?;
            read_ack("create_delivery", response).await
        })
        .await?;
        tracing::info!(pickup = %draft.pickup, dropoff = %draft.dropoff, "delivery created");
        Ok(())
    }

    /// Sets one mutable field and returns the full updated order for the
    /// caller to apply locally.
    pub async fn update_delivery_field(
        &self,
        id: &OrderId,
        field: &str,
        value: serde_json::Value,
    ) -> Result<Order, ApiError> {
        let url = self.endpoint(&format!("/api/update_delivery_field/{id}"));
        let body = FieldBody { field, value };
        let updated = self
            .guarded("update_delivery_field", async {
                let response = self.http.post(&url).json(&body).send().await?;
                let status = response.status();
                if !status.is_success() {
                    let text = response.text().await?;
                    let ack: Ack = serde_json::from_str(&text).unwrap_or_default();
                    return Err(match ack.error.or(ack.message) {
                        Some(message) => ApiError::Rejected {
                            op: "update_delivery_field",
                            message,
                        },
                        None => ApiError::Status {
                            op: "update_delivery_field",
                            status,
                        },
                    });
                }
                Ok(response.json::<Order>().await?)
            })
            .await?;

        tracing::info!(order_id = %id, field, "delivery field updated");
        Ok(updated)
    }

    pub async fn set_price(&self, id: &OrderId, price: f64) -> Result<Order, ApiError> {
        self.update_delivery_field(id, "price", serde_json::json!(price))
            .await
    }

    pub async fn set_delivery_type(
        &self,
        id: &OrderId,
        delivery_type: &str,
    ) -> Result<Order, ApiError> {
        self.update_delivery_field(id, "delivery_type", serde_json::json!(delivery_type))
            .await
    }

    /// Marks an order successful or unsuccessful. Only the acknowledgment
    /// comes back; the updated order arrives on the live feed.
    pub async fn update_delivery_status(
        &self,
        id: &OrderId,
        outcome: OrderOutcome,
        reason: Option<&str>,
    ) -> Result<(), ApiError> {
        let url = self.endpoint(&format!("/api/update_delivery_status/{id}"));
        let body = StatusBody {
            status: outcome,
            reason,
        };
        self.guarded("update_delivery_status", async {
            let response = self.http.post(&url).json(&body).send().await?;
            read_ack("update_delivery_status", response).await
        })
        .await?;

        tracing::info!(order_id = %id, status = %outcome, "delivery status submitted");
        Ok(())
    }

    /// Assigns a driver. Acknowledgment only; state arrives on the feed.
    pub async fn assign_driver(&self, id: &OrderId, driver: &DriverId) -> Result<(), ApiError> {
        let url = self.endpoint(&format!("/api/assign_driver/{id}"));
        let body = AssignBody { driver_id: driver };
        self.guarded("assign_driver", async {
            let response = self.http.post(&url).json(&body).send().await?;
            read_ack("assign_driver", response).await
        })
        .await?;

        tracing::info!(order_id = %id, driver_id = %driver, "driver assignment submitted");
        Ok(())
    }

    /// Deletes an order. Local removal is the caller's job; the backend does
    /// not echo a deletion event for this path.
    pub async fn delete_order(&self, id: &OrderId) -> Result<(), ApiError> {
        let url = self.endpoint(&format!("/api/delete_order/{id}"));
        self.guarded("delete_order", async {
            let response = self.http.delete(&url).send().await?;
            read_ack("delete_order", response).await
        })
        .await?;

        tracing::info!(order_id = %id, "order deleted");
        Ok(())
    }

    /// Texts both parties the confirmation for an order.
    pub async fn send_confirmation_sms(&self, order: &Order) -> Result<(), ApiError> {
        let url = self.endpoint("/api/send_sms");
        let body = SmsBody {
            delivery_id: &order.id,
            sender_phone: order.sender_phone.as_deref(),
            receiver_phone: order.receiver_phone.as_deref(),
            message: confirmation_message(order),
        };
        self.guarded("send_sms", async {
            let response = self.http.post(&url).json(&body).send().await?;
            read_ack("send_sms", response).await
        })
        .await?;

        tracing::info!(order_id = %order.id, "confirmation SMS sent");
        Ok(())
    }

    /// Pushes the delivery to the assigned driver's app.
    pub async fn notify_driver_app(
        &self,
        delivery: &OrderId,
        driver: &DriverId,
    ) -> Result<(), ApiError> {
        let url = self.endpoint("/api/notify_driver_app");
        let body = NotifyBody {
            delivery_id: delivery,
            driver_id: driver,
        };
        self.guarded("notify_driver_app", async {
            let response = self.http.post(&url).json(&body).send().await?;
            read_ack("notify_driver_app", response).await
        })
        .await?;

        tracing::info!(order_id = %delivery, driver_id = %driver, "driver app notified");
        Ok(())
    }

    pub async fn breaker_state(&self) -> CircuitState {
        self.breaker.get_state().await
    }
}

fn confirmation_message(order: &Order) -> String {
    format!(
        "Your delivery order is confirmed. Pickup: {}, Dropoff: {}, Price: {}",
        order.pickup.as_deref().unwrap_or("-"),
        order.dropoff.as_deref().unwrap_or("-"),
        order
            .price
            .map(|price| price.to_string())
            .unwrap_or_else(|| "-".to_string()),
    )
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn api() -> OrderServiceApi {
        OrderServiceApi::new(reqwest::Client::new(), "http://orders.test/")
    }

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        let api = api();
        assert_eq!(
            api.endpoint("/api/deliveries"),
            "http://orders.test/api/deliveries"
        );
        assert_eq!(
            api.endpoint(&format!("/api/delete_order/{}", OrderId::from("o1"))),
            "http://orders.test/api/delete_order/o1"
        );
    }

    #[test]
    fn test_status_body_omits_reason_when_absent() {
        let successful = serde_json::to_value(StatusBody {
            status: OrderOutcome::Successful,
            reason: None,
        })
        .unwrap();
        assert_eq!(successful, serde_json::json!({"status": "successful"}));

        let unsuccessful = serde_json::to_value(StatusBody {
            status: OrderOutcome::Unsuccessful,
            reason: Some("receiver unreachable"),
        })
        .unwrap();
        assert_eq!(
            unsuccessful,
            serde_json::json!({"status": "unsuccessful", "reason": "receiver unreachable"})
        );
    }

    #[test]
    fn test_confirmation_message_fills_order_details() {
        let order = Order {
            id: OrderId::from("o1"),
            pickup: Some("Bole".to_string()),
            dropoff: Some("Piassa".to_string()),
            price: Some(200.0),
            ..Default::default()
        };
        assert_eq!(
            confirmation_message(&order),
            "Your delivery order is confirmed. Pickup: Bole, Dropoff: Piassa, Price: 200"
        );

        let bare = Order {
            id: OrderId::from("o2"),
            ..Default::default()
        };
        assert_eq!(
            confirmation_message(&bare),
            "Your delivery order is confirmed. Pickup: -, Dropoff: -, Price: -"
        );
    }

    #[test]
    fn test_ack_decodes_partial_shapes() {
        let refused: Ack = serde_json::from_str(r#"{"success": false, "error": "no"}"#).unwrap();
        assert_eq!(refused.success, Some(false));
        assert_eq!(refused.error.as_deref(), Some("no"));

        let bare: Ack = serde_json::from_str("{}").unwrap();
        assert_eq!(bare.success, None);
        assert_eq!(bare.error, None);
        assert_eq!(bare.message, None);
    }
}
