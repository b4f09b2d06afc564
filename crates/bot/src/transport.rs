//! Outbound messaging seam.
//!
//! The wizard, notifier, and dispatcher talk to the chat platform through
//! the [`Transport`] trait so tests can swap the real Telegram client for
//! the recording mock. Telegram addresses users, groups, and channels with
//! one chat-id space, so a single `send_message` covers both "send to the
//! customer" and "send to the operator channel".

use async_trait::async_trait;

use gamestore_core::ChatId;

use crate::telegram::TelegramError;

/// A message to deliver to one chat, with an optional inline keyboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub chat: ChatId,
    pub text: String,
    pub keyboard: Option<Keyboard>,
}

impl OutgoingMessage {
    /// Create a plain text message.
    #[must_use]
    pub fn text(chat: ChatId, text: impl Into<String>) -> Self {
        Self {
            chat,
            text: text.into(),
            keyboard: None,
        }
    }

    /// Attach an inline keyboard.
    #[must_use]
    pub fn with_keyboard(mut self, keyboard: Keyboard) -> Self {
        self.keyboard = Some(keyboard);
        self
    }
}

/// An inline keyboard: rows of buttons.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Keyboard {
    pub rows: Vec<Vec<Button>>,
}

impl Keyboard {
    /// Create a keyboard from button rows.
    #[must_use]
    pub const fn new(rows: Vec<Vec<Button>>) -> Self {
        Self { rows }
    }
}

/// A labeled button carrying callback data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    /// Text shown on the button.
    pub label: String,
    /// Callback data delivered back when pressed.
    pub action: String,
}

impl Button {
    /// Create a button.
    #[must_use]
    pub fn new(label: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            action: action.into(),
        }
    }
}

/// Object-safe outbound messaging interface.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Deliver a message to a chat.
    ///
    /// # Errors
    ///
    /// Returns `TelegramError` if delivery fails; callers decide whether a
    /// failure is fatal (it never is for notifications).
    async fn send_message(&self, message: OutgoingMessage) -> Result<(), TelegramError>;

    /// Acknowledge a callback button press so the client stops its spinner.
    ///
    /// # Errors
    ///
    /// Returns `TelegramError` if the acknowledgment fails.
    async fn ack_callback(&self, callback_id: &str) -> Result<(), TelegramError>;
}
