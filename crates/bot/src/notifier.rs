//! Operator notifications for committed orders.
//!
//! Notification is best-effort and strictly decoupled from persistence: the
//! order row is already committed before [`OrderNotifier::dispatch`] runs,
//! and a failed or slow notification never surfaces to the customer. The
//! operator channel going quiet shows up in the logs, not in the chat.

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info};

use gamestore_core::ChatId;

use crate::catalog::Catalog;
use crate::models::Order;
use crate::texts;
use crate::transport::Transport;

/// Upper bound on a single notification attempt.
const NOTIFY_TIMEOUT: Duration = Duration::from_secs(15);

/// Sends new-order alerts to the operator channel.
#[derive(Clone)]
pub struct OrderNotifier {
    transport: Arc<dyn Transport>,
    channel: ChatId,
    catalog: Arc<Catalog>,
}

impl OrderNotifier {
    pub fn new(transport: Arc<dyn Transport>, channel: ChatId, catalog: Arc<Catalog>) -> Self {
        Self {
            transport,
            channel,
            catalog,
        }
    }

    /// Fire off a notification for a freshly committed order.
    ///
    /// Spawns a background task and returns immediately. The outcome is
    /// only logged.
    pub fn dispatch(&self, order: &Order) {
        let transport = Arc::clone(&self.transport);
        let message = texts::order_notification(self.channel, &self.catalog, order);
        let order_id = order.id;

        tokio::spawn(async move {
            match tokio::time::timeout(NOTIFY_TIMEOUT, transport.send_message(message)).await {
                Ok(Ok(())) => {
                    info!(order_id = %order_id, "Operator notified of new order");
                }
                Ok(Err(e)) => {
                    error!(order_id = %order_id, error = %e, "Failed to notify operator");
                }
                Err(_) => {
                    error!(order_id = %order_id, "Operator notification timed out");
                }
            }
        });
    }
}

impl std::fmt::Debug for OrderNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderNotifier")
            .field("channel", &self.channel)
            .finish_non_exhaustive()
    }
}
