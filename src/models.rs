use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr, PickFirst};
use std::fmt;

// ============================================================================
// Wire Models
// Shapes shared by the Remote Order Service responses and the live feed.
// The backend is Mongo-flavored: identifiers travel as `_id` strings, most
// fields are optional, and numeric fields may arrive as strings depending on
// which channel (web form or bot) submitted the order.
// ============================================================================

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash, Default)]
#[serde(transparent)]
pub struct OrderId(pub String);

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for OrderId {
    fn from(raw: &str) -> Self {
        OrderId(raw.to_string())
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash, Default)]
#[serde(transparent)]
pub struct DriverId(pub String);

impl fmt::Display for DriverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DriverId {
    fn from(raw: &str) -> Self {
        DriverId(raw.to_string())
    }
}

#[serde_as]
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
pub struct Order {
    #[serde(rename = "_id")]
    pub id: OrderId,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default, alias = "user_name")]
    pub username: Option<String>,
    #[serde(default)]
    pub pickup: Option<String>,
    #[serde(default)]
    pub dropoff: Option<String>,
    #[serde(default)]
    pub sender_phone: Option<String>,
    #[serde(default)]
    pub receiver_phone: Option<String>,
    #[serde(default)]
    pub full_address: Option<String>,
    #[serde_as(as = "Option<PickFirst<(_, DisplayFromStr)>>")]
    #[serde(default)]
    pub quantity: Option<u32>,
    #[serde(default)]
    pub item_description: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub payment_from_sender_or_receiver: Option<String>,
    #[serde(default)]
    pub delivery_type: Option<String>,
    #[serde(default)]
    pub assigned_driver_id: Option<DriverId>,
    #[serde(default)]
    pub assigned_driver_name: Option<String>,
    #[serde_as(as = "Option<PickFirst<(_, DisplayFromStr)>>")]
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

impl Order {
    /// Driver name shown for a row: the denormalized name on the order wins,
    /// otherwise the assigned id is joined against the fetched directory.
    pub fn driver_display_name(&self, directory: &[Driver]) -> Option<String> {
        self.assigned_driver_name
            .as_deref()
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .or_else(|| {
                let wanted = self.assigned_driver_id.as_ref()?;
                directory
                    .iter()
                    .find(|driver| &driver.id == wanted)
                    .map(|driver| driver.name.clone())
            })
    }

    /// A driver can only be assigned once price and delivery type are set.
    pub fn ready_for_assignment(&self) -> bool {
        self.price.unwrap_or(0.0) > 0.0
            && self.delivery_type.as_deref().is_some_and(|t| !t.is_empty())
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
pub struct Driver {
    #[serde(rename = "_id")]
    pub id: DriverId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub vehicle_plate: Option<String>,
}

// ============================================================================
// Live Feed Events
// JSON text frames tagged by event name. `init_orders` carries the one-time
// snapshot; the other three are single-order deltas. Deletions only carry
// the identifier.
// ============================================================================

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum OrderFeedEvent {
    InitOrders(Vec<Order>),
    OrderCreated(Order),
    OrderUpdated(Order),
    OrderDeleted(DeletedOrder),
}

impl OrderFeedEvent {
    /// Stable label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            OrderFeedEvent::InitOrders(_) => "init_orders",
            OrderFeedEvent::OrderCreated(_) => "order_created",
            OrderFeedEvent::OrderUpdated(_) => "order_updated",
            OrderFeedEvent::OrderDeleted(_) => "order_deleted",
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct DeletedOrder {
    #[serde(rename = "_id")]
    pub id: OrderId,
}

// ============================================================================
// Command Bodies & Drafts
// ============================================================================

/// Terminal outcome a dispatcher can set on an order.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OrderOutcome {
    Successful,
    Unsuccessful,
}

impl OrderOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderOutcome::Successful => "successful",
            OrderOutcome::Unsuccessful => "unsuccessful",
        }
    }
}

impl fmt::Display for OrderOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum FormError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),
}

/// New-delivery form as submitted by the call center. Quantity stays a raw
/// string here since the form field is free text; the backend normalizes it.
#[derive(Serialize, Clone, Debug, Default)]
pub struct DeliveryDraft {
    pub pickup: String,
    pub dropoff: String,
    pub sender_phone: String,
    pub receiver_phone: String,
    pub quantity: String,
    pub item_description: String,
}

impl DeliveryDraft {
    /// First missing required field wins, mirroring the form's check order.
    pub fn validate(&self) -> Result<(), FormError> {
        let required = [
            ("pickup", &self.pickup),
            ("dropoff", &self.dropoff),
            ("sender_phone", &self.sender_phone),
            ("receiver_phone", &self.receiver_phone),
            ("quantity", &self.quantity),
        ];
        for (name, value) in required {
            if value.is_empty() {
                return Err(FormError::MissingField(name));
            }
        }
        Ok(())
    }
}

#[derive(Serialize, Clone, Debug, Default)]
pub struct DriverDraft {
    pub name: String,
    pub phone: String,
    pub vehicle_plate: String,
}

impl DriverDraft {
    pub fn validate(&self) -> Result<(), FormError> {
        if self.name.is_empty() {
            return Err(FormError::MissingField("name"));
        }
        if self.phone.is_empty() {
            return Err(FormError::MissingField("phone"));
        }
        Ok(())
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
