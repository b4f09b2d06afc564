//! Telegram Bot API integration.
//!
//! This module provides:
//! - [`TelegramClient`] for long-polling updates and sending messages
//! - Wire types for the API subset this bot uses
//! - The [`crate::transport::Transport`] implementation used in production
//!
//! # Flow
//!
//! 1. `main` long-polls `getUpdates` and spawns one task per update
//! 2. The dispatcher acknowledges callback presses via `answerCallbackQuery`
//! 3. Replies and operator notifications go out via `sendMessage`

mod client;
mod error;
mod types;

pub use client::TelegramClient;
pub use error::TelegramError;
pub use types::{
    ApiResponse, CallbackQuery, Chat, InlineKeyboardButton, InlineKeyboardMarkup, Message, Update,
    User,
};
