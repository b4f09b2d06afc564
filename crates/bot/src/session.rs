//! Per-user session slots with per-user mutual exclusion.
//!
//! Every user gets one slot holding their in-progress [`OrderSession`] (or
//! `None` when no order is in flight). The wizard locks the slot for the
//! whole of a step transition, so two updates from the same user can never
//! interleave, while different users proceed in parallel.
//!
//! Slots are never removed from the map, only emptied: removing an entry
//! while another task still holds its `Arc` would let that task write into
//! an orphaned slot and lose the update. The cost is one empty slot per
//! user ever seen, accepted for this bot's scale (sessions themselves are
//! already unbounded: abandonment is not detected).

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use gamestore_core::UserId;

use crate::models::session::OrderSession;

/// A user's session slot. `None` means no order in flight.
pub type SessionSlot = Arc<Mutex<Option<OrderSession>>>;

/// Registry of per-user session slots.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    slots: Mutex<HashMap<UserId, SessionSlot>>,
}

impl SessionRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create the slot for `user`.
    ///
    /// The registry lock is held only for the lookup; callers then lock the
    /// returned slot for as long as their step transition runs.
    pub async fn slot(&self, user: UserId) -> SessionSlot {
        let mut slots = self.slots.lock().await;
        Arc::clone(slots.entry(user).or_default())
    }
}
