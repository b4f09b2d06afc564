//! Domain models for the bot.

pub mod order;
pub mod session;

pub use order::{MostOrdered, NewOrder, Order, OrderStats};
pub use session::{OrderDraft, OrderSession};
