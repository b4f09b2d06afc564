//! Recording transport for tests.
//!
//! # Testing Strategy
//!
//! Conversation tests should not talk to Telegram. [`RecordingTransport`]
//! implements [`Transport`] by pushing every outgoing message onto a channel
//! the test controls, so a test drives the wizard and then asserts on the
//! exact replies (and operator notifications) that came out. Failure
//! injection covers the "notification failed but the order stands" paths.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::telegram::TelegramError;
use crate::transport::{OutgoingMessage, Transport};

/// A [`Transport`] that records messages instead of delivering them.
#[derive(Debug)]
pub struct RecordingTransport {
    sender: mpsc::UnboundedSender<OutgoingMessage>,
    fail_sends: AtomicBool,
}

impl RecordingTransport {
    /// Create a recording transport and the receiver its messages arrive on.
    #[must_use]
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<OutgoingMessage>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let transport = Arc::new(Self {
            sender,
            fail_sends: AtomicBool::new(false),
        });
        (transport, receiver)
    }

    /// Make every subsequent `send_message` fail (or succeed again).
    pub fn fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn send_message(&self, message: OutgoingMessage) -> Result<(), TelegramError> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(TelegramError::Api(
                "recording transport set to fail".to_string(),
            ));
        }

        self.sender
            .send(message)
            .map_err(|_| TelegramError::Api("recording receiver dropped".to_string()))
    }

    async fn ack_callback(&self, _callback_id: &str) -> Result<(), TelegramError> {
        Ok(())
    }
}
