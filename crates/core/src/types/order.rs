//! Order types.
//!
//! Orders are created from cart lines at checkout and read back from the
//! orders endpoints. The write shape (`OrderLineInput`) discriminates
//! material vs design purchases through mutually exclusive ID fields, which
//! is how the backend's order serializer expects them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::id::OrderId;
use crate::types::price::Price;

/// Order lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    PendingPayment,
    PaymentFailed,
    Processing,
    Shipped,
    Delivered,
    Completed,
    CancelledByBuyer,
    CancelledBySeller,
    Refunded,
    Disputed,
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::PendingPayment => "pending_payment",
            Self::PaymentFailed => "payment_failed",
            Self::Processing => "processing",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Completed => "completed",
            Self::CancelledByBuyer => "cancelled_by_buyer",
            Self::CancelledBySeller => "cancelled_by_seller",
            Self::Refunded => "refunded",
            Self::Disputed => "disputed",
        };
        write!(f, "{s}")
    }
}

/// One line of a `POST /orders/` payload.
///
/// Exactly one of `material_id` / `design_id` is set; `unit_price` is the
/// price captured in the cart at add-time, which the backend re-validates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLineInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub material_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub design_id: Option<String>,
    pub quantity: u32,
    pub unit_price: Price,
}

/// Payload for `POST /orders/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateOrderRequest {
    pub items: Vec<OrderLineInput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shipping_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub billing_address: Option<String>,
}

/// One line of an order as read back from the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    /// Display name of the purchased listing, if still resolvable.
    #[serde(default)]
    pub item_name: Option<String>,
    pub quantity: u32,
    pub unit_price: Price,
}

/// An order as read back from the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub status: OrderStatus,
    pub order_total: Price,
    #[serde(default)]
    pub items: Vec<OrderItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shipping_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub billing_address: Option<String>,
    pub created_at: DateTime<Utc>,
}
