//! Telegram-related errors.

use thiserror::Error;

/// Errors that can occur when talking to the Telegram Bot API.
#[derive(Debug, Error)]
pub enum TelegramError {
    /// HTTP request failed.
    #[error("Telegram request failed: {0}")]
    Request(String),

    /// Failed to parse the response body.
    #[error("Telegram response error: {0}")]
    Response(String),

    /// Telegram answered with `ok = false`.
    #[error("Telegram API error: {0}")]
    Api(String),
}
