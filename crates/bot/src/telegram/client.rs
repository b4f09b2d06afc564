//! Telegram Bot API client.
//!
//! Long-polls `getUpdates` and sends messages/acks. The bot token rides in
//! the URL path (Telegram's scheme), so request errors are stripped of
//! their URL before they reach logs.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, error, instrument};

use crate::transport::{OutgoingMessage, Transport};

use super::error::TelegramError;
use super::types::{
    AnswerCallbackQueryRequest, ApiResponse, GetUpdatesRequest, InlineKeyboardMarkup, Message,
    SendMessageRequest, Update,
};

/// Telegram Bot API base URL.
const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

/// Long-poll hold time for `getUpdates`, in seconds.
const POLL_TIMEOUT_SECS: u64 = 50;

/// HTTP timeout for ordinary calls (sends, acks).
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP timeout for the long poll; must exceed the hold time.
const POLL_REQUEST_TIMEOUT: Duration = Duration::from_secs(POLL_TIMEOUT_SECS + 10);

/// Update kinds the bot subscribes to.
const ALLOWED_UPDATES: &[&str] = &["message", "callback_query"];

/// Telegram API client for polling updates and sending messages.
#[derive(Clone)]
pub struct TelegramClient {
    /// HTTP client.
    client: Client,
    /// Bot token for authentication.
    bot_token: SecretString,
}

impl std::fmt::Debug for TelegramClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramClient")
            .field("bot_token", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl TelegramClient {
    /// Create a new Telegram client.
    ///
    /// # Errors
    ///
    /// Returns error if the underlying HTTP client cannot be constructed.
    pub fn new(bot_token: SecretString) -> Result<Self, TelegramError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| TelegramError::Request(e.without_url().to_string()))?;

        Ok(Self { client, bot_token })
    }

    /// Long-poll for updates after `offset`.
    ///
    /// Holds the request open up to [`POLL_TIMEOUT_SECS`]; an empty `Vec`
    /// just means nothing happened during the hold.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails or Telegram returns an error.
    #[instrument(skip(self))]
    pub async fn get_updates(&self, offset: Option<i64>) -> Result<Vec<Update>, TelegramError> {
        let request = GetUpdatesRequest {
            timeout: POLL_TIMEOUT_SECS,
            offset,
            allowed_updates: ALLOWED_UPDATES,
        };

        let updates: Vec<Update> = self
            .call("getUpdates", &request, POLL_REQUEST_TIMEOUT)
            .await?;

        if !updates.is_empty() {
            debug!(count = updates.len(), "Received updates");
        }

        Ok(updates)
    }

    /// POST one API method and unwrap Telegram's `{ok, result}` envelope.
    async fn call<P, T>(
        &self,
        method: &str,
        payload: &P,
        timeout: Duration,
    ) -> Result<T, TelegramError>
    where
        P: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = format!(
            "{TELEGRAM_API_BASE}/bot{}/{method}",
            self.bot_token.expose_secret()
        );

        let response = self
            .client
            .post(url)
            .timeout(timeout)
            .json(payload)
            .send()
            .await
            .map_err(|e| TelegramError::Request(e.without_url().to_string()))?;

        let envelope: ApiResponse<T> = response
            .json()
            .await
            .map_err(|e| TelegramError::Response(e.without_url().to_string()))?;

        if !envelope.ok {
            error!(
                method,
                error = ?envelope.description,
                "Telegram API error"
            );
            return Err(TelegramError::Api(
                envelope
                    .description
                    .unwrap_or_else(|| "Unknown error".to_string()),
            ));
        }

        envelope
            .result
            .ok_or_else(|| TelegramError::Response(format!("{method} returned ok without a result")))
    }
}

#[async_trait]
impl Transport for TelegramClient {
    #[instrument(skip(self, message), fields(chat = %message.chat))]
    async fn send_message(&self, message: OutgoingMessage) -> Result<(), TelegramError> {
        let request = SendMessageRequest {
            chat_id: message.chat.as_i64(),
            text: message.text,
            reply_markup: message.keyboard.map(InlineKeyboardMarkup::from),
        };

        let _sent: Message = self.call("sendMessage", &request, REQUEST_TIMEOUT).await?;

        debug!("Message sent");

        Ok(())
    }

    #[instrument(skip(self, callback_id))]
    async fn ack_callback(&self, callback_id: &str) -> Result<(), TelegramError> {
        let request = AnswerCallbackQueryRequest {
            callback_query_id: callback_id.to_string(),
        };

        let _acked: bool = self
            .call("answerCallbackQuery", &request, REQUEST_TIMEOUT)
            .await?;

        Ok(())
    }
}
