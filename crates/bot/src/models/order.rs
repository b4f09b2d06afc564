//! Order domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use gamestore_core::{OrderId, OrderStatus, Price, UserId};

/// A persisted order.
///
/// Orders denormalize the variant label and price at order time, so later
/// catalog edits never change what a customer was quoted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    /// Store-assigned id, strictly increasing in creation order.
    pub id: OrderId,
    /// Telegram user who placed the order.
    pub user_id: UserId,
    /// Telegram username, or `"unknown"` when the account has none.
    pub username: String,
    /// Catalog item key (e.g. `diamantes`).
    pub item_key: String,
    /// Variant label as shown at confirmation time.
    pub variant_label: String,
    /// In-game account id the goods are delivered to.
    pub game_id: String,
    /// Customer-supplied display name.
    pub customer_name: String,
    /// Customer-supplied contact (phone, handle, ...).
    pub contact: String,
    /// Price resolved from the catalog at commit time.
    pub price: Price,
    /// Store-assigned creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Lifecycle status; the flow only writes `pending`.
    pub status: OrderStatus,
}

/// A fully collected order awaiting insertion.
///
/// Everything except the store-assigned `id`, `created_at`, and `status`.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub user_id: UserId,
    pub username: String,
    pub item_key: String,
    pub variant_label: String,
    pub game_id: String,
    pub customer_name: String,
    pub contact: String,
    pub price: Price,
}

/// Aggregate figures over the whole order table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderStats {
    /// Total number of orders ever placed.
    pub order_count: i64,
    /// Sum of all order prices (0 when there are no orders).
    pub total_revenue: Price,
    /// The item with the most orders, if any orders exist.
    pub most_ordered: Option<MostOrdered>,
}

/// The most frequently ordered catalog item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MostOrdered {
    /// Catalog item key.
    pub item_key: String,
    /// How many orders reference it.
    pub order_count: i64,
}
