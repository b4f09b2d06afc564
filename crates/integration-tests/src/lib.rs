//! Test harness for end-to-end conversation tests.
//!
//! [`TestContext`] wires the real dispatcher, wizard, store, and notifier
//! together over an in-memory SQLite database and the recording transport,
//! then lets tests feed it the same [`Update`] values the long-poll loop
//! would. No tokens, no network, no files on disk.
//!
//! `handle_update` finishes every synchronous reply before it returns, so
//! the batch a helper hands back is complete except for the operator
//! alert, which rides a spawned task; tests that care about it await
//! [`TestContext::operator_alert`].

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use secrecy::SecretString;
use sqlx::SqlitePool;
use tokio::sync::mpsc::UnboundedReceiver;

use gamestore_bot::catalog::Catalog;
use gamestore_bot::config::BotConfig;
use gamestore_bot::db::{create_memory_pool, run_migrations};
use gamestore_bot::dispatch::handle_update;
use gamestore_bot::mock::RecordingTransport;
use gamestore_bot::state::AppState;
use gamestore_bot::telegram::{CallbackQuery, Chat, Message, Update, User};
use gamestore_bot::transport::{OutgoingMessage, Transport};
use gamestore_core::{ChatId, UserId};

/// The user id admin queries answer to in tests.
pub const OPERATOR_ID: i64 = 424_242;

/// The operator channel that receives new-order alerts in tests.
pub const ORDERS_CHANNEL: i64 = -1_000_500;

static NEXT_UPDATE_ID: AtomicI64 = AtomicI64::new(1);

/// A fully wired bot instance over in-memory collaborators.
pub struct TestContext {
    pub state: AppState,
    pub outbox: UnboundedReceiver<OutgoingMessage>,
    pub transport: Arc<RecordingTransport>,
}

impl TestContext {
    /// Build a fresh bot: empty store, builtin catalog, recording transport.
    ///
    /// # Panics
    ///
    /// Panics if the in-memory database or builtin catalog cannot be set up.
    pub async fn new() -> Self {
        let pool = create_memory_pool().await.expect("in-memory pool");
        run_migrations(&pool).await.expect("migrations");
        let catalog = Catalog::load(None).expect("builtin catalog");
        let (transport, outbox) = RecordingTransport::new();

        let config = BotConfig {
            bot_token: SecretString::from("12345:test-token"),
            operator_id: UserId::new(OPERATOR_ID),
            orders_channel_id: ChatId::new(ORDERS_CHANNEL),
            database_path: PathBuf::from(":memory:"),
            catalog_path: None,
        };

        let state = AppState::new(
            config,
            pool,
            catalog,
            Arc::clone(&transport) as Arc<dyn Transport>,
        );
        Self {
            state,
            outbox,
            transport,
        }
    }

    /// The pool backing the order store, for direct row assertions.
    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        self.state.pool()
    }

    /// Deliver a text message and return every reply it produced.
    pub async fn send_text(&mut self, user: i64, text: &str) -> Vec<OutgoingMessage> {
        handle_update(self.state.clone(), text_update(user, text)).await;
        self.drain()
    }

    /// Press an inline button and return every reply it produced.
    pub async fn press(&mut self, user: i64, data: &str) -> Vec<OutgoingMessage> {
        handle_update(self.state.clone(), callback_update(user, data)).await;
        self.drain()
    }

    /// Take everything currently sitting in the outbox.
    pub fn drain(&mut self) -> Vec<OutgoingMessage> {
        let mut messages = Vec::new();
        while let Ok(message) = self.outbox.try_recv() {
            messages.push(message);
        }
        messages
    }

    /// Pull the operator alert out of a reply batch, waiting for the
    /// notification task if it has not landed yet. Customer-facing
    /// messages received while waiting are pushed back onto the batch.
    ///
    /// # Panics
    ///
    /// Panics if the transport is dropped before an alert arrives.
    pub async fn operator_alert(&mut self, batch: &mut Vec<OutgoingMessage>) -> OutgoingMessage {
        let channel = ChatId::new(ORDERS_CHANNEL);
        if let Some(i) = batch.iter().position(|m| m.chat == channel) {
            return batch.remove(i);
        }
        loop {
            let message = self.outbox.recv().await.expect("outbox closed");
            if message.chat == channel {
                return message;
            }
            batch.push(message);
        }
    }
}

/// Build a text-message update from `user`, whose chat id equals their
/// user id, as it does for private chats.
#[must_use]
pub fn text_update(user: i64, text: &str) -> Update {
    Update {
        update_id: NEXT_UPDATE_ID.fetch_add(1, Ordering::Relaxed),
        message: Some(Message {
            message_id: 1,
            from: Some(test_user(user)),
            chat: Chat { id: user },
            text: Some(text.to_string()),
        }),
        callback_query: None,
    }
}

/// Build an inline-button press from `user` carrying `data`.
#[must_use]
pub fn callback_update(user: i64, data: &str) -> Update {
    Update {
        update_id: NEXT_UPDATE_ID.fetch_add(1, Ordering::Relaxed),
        message: None,
        callback_query: Some(CallbackQuery {
            id: format!("cb-{user}"),
            from: test_user(user),
            message: Some(Message {
                message_id: 2,
                from: None,
                chat: Chat { id: user },
                text: None,
            }),
            data: Some(data.to_string()),
        }),
    }
}

fn test_user(id: i64) -> User {
    User {
        id,
        first_name: "Test".to_string(),
        username: Some(format!("user{id}")),
    }
}
