//! Telegram Bot API wire types.
//!
//! Only the fields this bot reads are modeled; Telegram sends many more,
//! which serde ignores.

use serde::{Deserialize, Serialize};

use crate::transport::Keyboard;

/// Envelope every Bot API method responds with.
///
/// `result` and `description` rely on serde's builtin handling of missing
/// `Option` fields; `#[serde(default)]` would demand `T: Default` from
/// every caller for nothing.
#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    pub description: Option<String>,
}

/// One long-poll update: a message or a callback button press.
#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<Message>,
    #[serde(default)]
    pub callback_query: Option<CallbackQuery>,
}

/// An inbound chat message.
#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    #[serde(default)]
    pub from: Option<User>,
    pub chat: Chat,
    #[serde(default)]
    pub text: Option<String>,
}

/// A Telegram account.
#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: i64,
    pub first_name: String,
    #[serde(default)]
    pub username: Option<String>,
}

/// The chat a message belongs to (private, group, or channel).
#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

/// A button press on an inline keyboard.
#[derive(Debug, Clone, Deserialize)]
pub struct CallbackQuery {
    pub id: String,
    pub from: User,
    #[serde(default)]
    pub message: Option<Message>,
    #[serde(default)]
    pub data: Option<String>,
}

/// `sendMessage` request body.
#[derive(Debug, Serialize)]
pub struct SendMessageRequest {
    pub chat_id: i64,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_markup: Option<InlineKeyboardMarkup>,
}

/// `answerCallbackQuery` request body.
#[derive(Debug, Serialize)]
pub struct AnswerCallbackQueryRequest {
    pub callback_query_id: String,
}

/// `getUpdates` request body.
#[derive(Debug, Serialize)]
pub struct GetUpdatesRequest {
    /// Long-poll hold time in seconds.
    pub timeout: u64,
    /// First update id to return; confirms everything before it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<i64>,
    pub allowed_updates: &'static [&'static str],
}

/// Inline keyboard in Telegram's wire shape.
#[derive(Debug, Serialize)]
pub struct InlineKeyboardMarkup {
    pub inline_keyboard: Vec<Vec<InlineKeyboardButton>>,
}

/// One inline keyboard button.
#[derive(Debug, Serialize)]
pub struct InlineKeyboardButton {
    pub text: String,
    pub callback_data: String,
}

impl From<Keyboard> for InlineKeyboardMarkup {
    fn from(keyboard: Keyboard) -> Self {
        Self {
            inline_keyboard: keyboard
                .rows
                .into_iter()
                .map(|row| {
                    row.into_iter()
                        .map(|button| InlineKeyboardButton {
                            text: button.label,
                            callback_data: button.action,
                        })
                        .collect()
                })
                .collect(),
        }
    }
}
