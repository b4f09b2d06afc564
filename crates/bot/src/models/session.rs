//! Conversation session state.
//!
//! A session is the per-user record of an in-progress order. It is modeled
//! as an enum whose variants carry exactly the fields collected so far, so
//! "which fields are set in which step" is enforced by the type system
//! rather than checked at runtime.

/// Per-user state of an in-progress order conversation.
///
/// Variants appear in conversation order; each accepted input moves the
/// session to the next variant, carrying everything collected so far.
/// There is no terminal variant: a finished or cancelled conversation has
/// its session destroyed instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderSession {
    /// Waiting for the customer to pick a catalog item.
    SelectItem,
    /// Waiting for a variant of the chosen item.
    SelectVariant { item_key: String },
    /// Waiting for the in-game account id.
    EnterGameId {
        item_key: String,
        variant_key: String,
    },
    /// Waiting for the customer's name.
    EnterName {
        item_key: String,
        variant_key: String,
        game_id: String,
    },
    /// Waiting for contact details.
    EnterContact {
        item_key: String,
        variant_key: String,
        game_id: String,
        customer_name: String,
    },
    /// Everything collected; waiting for the final yes/no.
    Confirm(OrderDraft),
}

/// All customer-supplied fields of an order, collected and validated.
///
/// The draft stores catalog keys, not labels or prices: those are resolved
/// from the catalog at commit time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderDraft {
    pub item_key: String,
    pub variant_key: String,
    pub game_id: String,
    pub customer_name: String,
    pub contact: String,
}
