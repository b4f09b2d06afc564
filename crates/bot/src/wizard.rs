//! The order conversation, step by step.
//!
//! One [`OrderWizard`] call handles one inbound event for one user: it locks
//! the user's session slot, applies the event to the current step, and
//! returns what to say next. The slot stays locked for the whole transition,
//! order insert included, so a user mashing buttons can never interleave two
//! half-applied steps. Users other than the one being handled are untouched;
//! their slots stay free.
//!
//! The conversation runs strictly forward:
//!
//! ```text
//! SelectItem -> SelectVariant -> EnterGameId -> EnterName -> EnterContact
//!            -> Confirm -> committed / cancelled
//! ```
//!
//! Cancel works from any step. Begin always starts over. At the final
//! confirmation, anything that is not an explicit confirm cancels the order.

use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{info, instrument};

use gamestore_core::{Price, UserId};

use crate::catalog::{Catalog, CatalogItem, Variant};
use crate::db::{OrderRepository, RepositoryError};
use crate::models::order::{NewOrder, Order};
use crate::models::session::{OrderDraft, OrderSession};
use crate::notifier::OrderNotifier;
use crate::session::SessionRegistry;

const MIN_GAME_ID_DIGITS: usize = 8;
const MIN_NAME_CHARS: usize = 2;
const MIN_CONTACT_CHARS: usize = 5;

/// Errors that can occur while advancing an order conversation.
#[derive(Debug, Error)]
pub enum WizardError {
    /// The order store failed; the session is kept so the user can retry.
    #[error("storage error: {0}")]
    Storage(#[from] RepositoryError),

    /// A session references keys the catalog no longer has.
    #[error("selection no longer in catalog: {item_key}/{variant_key}")]
    StaleSelection {
        item_key: String,
        variant_key: String,
    },
}

/// A rejected free-text input. The session is left exactly as it was.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Game ids are digits only, at least eight of them.
    #[error("game id must be at least 8 digits, numbers only")]
    GameId,

    /// Names must be at least two characters after trimming.
    #[error("name must be at least 2 characters")]
    Name,

    /// Contact details must be at least five characters after trimming.
    #[error("contact must be at least 5 characters")]
    Contact,
}

/// The user on whose behalf an event is handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shopper {
    pub id: UserId,
    /// Telegram username, absent for accounts that never set one.
    pub username: Option<String>,
}

impl Shopper {
    /// Username for persistence, with the sentinel for absent ones.
    #[must_use]
    pub fn username_or_unknown(&self) -> String {
        self.username
            .clone()
            .unwrap_or_else(|| "unknown".to_string())
    }
}

/// One inbound user action, already decoded from the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WizardEvent {
    /// A catalog item was picked (button press or typed key).
    SelectItem(String),
    /// A variant of the current item was picked.
    SelectVariant(String),
    /// Free text.
    Text(String),
    /// The final go-ahead.
    Confirm,
    /// Explicit cancellation.
    Cancel,
}

/// What the conversation asks for next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepPrompt {
    ChooseItem,
    ChooseVariant { item_key: String },
    AskGameId,
    AskName,
    AskContact,
    ConfirmSummary(OrderSummary),
}

/// Everything shown at the confirmation step, resolved for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderSummary {
    pub item_name: String,
    pub variant_label: String,
    pub game_id: String,
    pub customer_name: String,
    pub contact: String,
    pub price: Price,
}

/// The outcome of handling one event, ready for rendering.
#[derive(Debug, Clone)]
pub enum WizardReply {
    /// Ask for the next (or same) piece of information.
    Prompt(StepPrompt),
    /// The input was rejected; the user should try the same step again.
    InvalidInput(ValidationError),
    /// The pressed button or typed key matches nothing right now; the
    /// carried prompt re-issues the current step.
    UnknownSelection(StepPrompt),
    /// The order is persisted; the conversation is over.
    Committed(Order),
    /// The conversation was cancelled and the session cleared.
    Cancelled,
    /// There is no order in progress for this user.
    NoActiveOrder,
}

/// Drives order conversations over the per-user session registry.
pub struct OrderWizard<'a> {
    pool: &'a SqlitePool,
    catalog: &'a Catalog,
    sessions: &'a SessionRegistry,
    notifier: &'a OrderNotifier,
}

impl<'a> OrderWizard<'a> {
    #[must_use]
    pub const fn new(
        pool: &'a SqlitePool,
        catalog: &'a Catalog,
        sessions: &'a SessionRegistry,
        notifier: &'a OrderNotifier,
    ) -> Self {
        Self {
            pool,
            catalog,
            sessions,
            notifier,
        }
    }

    /// Start (or restart) an order conversation.
    ///
    /// Any in-flight session for this user is discarded first.
    pub async fn begin(&self, shopper: &Shopper) -> WizardReply {
        let slot = self.sessions.slot(shopper.id).await;
        *slot.lock().await = Some(OrderSession::SelectItem);
        WizardReply::Prompt(StepPrompt::ChooseItem)
    }

    /// Re-issue the current step's prompt without touching the session.
    ///
    /// # Errors
    ///
    /// Returns `WizardError::StaleSelection` if a confirmation summary can
    /// no longer be resolved against the catalog.
    pub async fn prompt(&self, shopper: &Shopper) -> Result<WizardReply, WizardError> {
        let slot = self.sessions.slot(shopper.id).await;
        let session = slot.lock().await;
        let Some(current) = session.as_ref() else {
            return Ok(WizardReply::NoActiveOrder);
        };

        let prompt = match current {
            OrderSession::SelectItem => StepPrompt::ChooseItem,
            OrderSession::SelectVariant { item_key } => StepPrompt::ChooseVariant {
                item_key: item_key.clone(),
            },
            OrderSession::EnterGameId { .. } => StepPrompt::AskGameId,
            OrderSession::EnterName { .. } => StepPrompt::AskName,
            OrderSession::EnterContact { .. } => StepPrompt::AskContact,
            OrderSession::Confirm(draft) => StepPrompt::ConfirmSummary(self.summarize(draft)?),
        };
        Ok(WizardReply::Prompt(prompt))
    }

    /// Apply one event to this user's conversation.
    ///
    /// Inputs that do not fit the current step re-issue its prompt without
    /// mutating anything, with one exception: at the confirmation step any
    /// non-confirm input cancels the order.
    ///
    /// # Errors
    ///
    /// Returns `WizardError::Storage` if the commit-time insert fails (the
    /// session is kept so the user can confirm again), and
    /// `WizardError::StaleSelection` if the session's keys no longer
    /// resolve against the catalog.
    #[instrument(skip(self, shopper, event), fields(user_id = %shopper.id))]
    pub async fn handle_event(
        &self,
        shopper: &Shopper,
        event: WizardEvent,
    ) -> Result<WizardReply, WizardError> {
        let slot = self.sessions.slot(shopper.id).await;
        let mut session = slot.lock().await;

        if event == WizardEvent::Cancel {
            return Ok(if session.take().is_some() {
                WizardReply::Cancelled
            } else {
                WizardReply::NoActiveOrder
            });
        }

        let Some(current) = session.clone() else {
            return Ok(WizardReply::NoActiveOrder);
        };

        let reply = match (current, event) {
            (
                OrderSession::SelectItem,
                WizardEvent::SelectItem(key) | WizardEvent::Text(key),
            ) => {
                let key = key.trim();
                if self.catalog.item(key).is_some() {
                    *session = Some(OrderSession::SelectVariant {
                        item_key: key.to_string(),
                    });
                    WizardReply::Prompt(StepPrompt::ChooseVariant {
                        item_key: key.to_string(),
                    })
                } else {
                    WizardReply::UnknownSelection(StepPrompt::ChooseItem)
                }
            }
            (OrderSession::SelectItem, _) => {
                WizardReply::UnknownSelection(StepPrompt::ChooseItem)
            }

            (
                OrderSession::SelectVariant { item_key },
                WizardEvent::SelectVariant(key) | WizardEvent::Text(key),
            ) => {
                let key = key.trim();
                if self.catalog.variant(&item_key, key).is_some() {
                    *session = Some(OrderSession::EnterGameId {
                        item_key,
                        variant_key: key.to_string(),
                    });
                    WizardReply::Prompt(StepPrompt::AskGameId)
                } else {
                    WizardReply::UnknownSelection(StepPrompt::ChooseVariant { item_key })
                }
            }
            (OrderSession::SelectVariant { item_key }, _) => {
                WizardReply::UnknownSelection(StepPrompt::ChooseVariant { item_key })
            }

            (
                OrderSession::EnterGameId {
                    item_key,
                    variant_key,
                },
                WizardEvent::Text(input),
            ) => match validate_game_id(&input) {
                Ok(game_id) => {
                    *session = Some(OrderSession::EnterName {
                        item_key,
                        variant_key,
                        game_id,
                    });
                    WizardReply::Prompt(StepPrompt::AskName)
                }
                Err(error) => WizardReply::InvalidInput(error),
            },
            (OrderSession::EnterGameId { .. }, _) => {
                WizardReply::UnknownSelection(StepPrompt::AskGameId)
            }

            (
                OrderSession::EnterName {
                    item_key,
                    variant_key,
                    game_id,
                },
                WizardEvent::Text(input),
            ) => match validate_name(&input) {
                Ok(customer_name) => {
                    *session = Some(OrderSession::EnterContact {
                        item_key,
                        variant_key,
                        game_id,
                        customer_name,
                    });
                    WizardReply::Prompt(StepPrompt::AskContact)
                }
                Err(error) => WizardReply::InvalidInput(error),
            },
            (OrderSession::EnterName { .. }, _) => {
                WizardReply::UnknownSelection(StepPrompt::AskName)
            }

            (
                OrderSession::EnterContact {
                    item_key,
                    variant_key,
                    game_id,
                    customer_name,
                },
                WizardEvent::Text(input),
            ) => match validate_contact(&input) {
                Ok(contact) => {
                    let draft = OrderDraft {
                        item_key,
                        variant_key,
                        game_id,
                        customer_name,
                        contact,
                    };
                    let summary = self.summarize(&draft)?;
                    *session = Some(OrderSession::Confirm(draft));
                    WizardReply::Prompt(StepPrompt::ConfirmSummary(summary))
                }
                Err(error) => WizardReply::InvalidInput(error),
            },
            (OrderSession::EnterContact { .. }, _) => {
                WizardReply::UnknownSelection(StepPrompt::AskContact)
            }

            (OrderSession::Confirm(draft), WizardEvent::Confirm) => {
                let order = self.commit(shopper, &draft).await?;
                *session = None;
                WizardReply::Committed(order)
            }
            // Anything but an explicit confirm backs out of the order.
            (OrderSession::Confirm(_), _) => {
                *session = None;
                WizardReply::Cancelled
            }
        };

        Ok(reply)
    }

    /// Run the commit protocol for a confirmed draft.
    ///
    /// Price and label are resolved from the catalog here, at commit time,
    /// not from a snapshot taken at selection time. The insert completes
    /// before the operator notification is even scheduled; a failed insert
    /// aborts the commit with the session intact and nothing notified.
    async fn commit(&self, shopper: &Shopper, draft: &OrderDraft) -> Result<Order, WizardError> {
        let (_, variant) = self.resolve(draft)?;

        let new_order = NewOrder {
            user_id: shopper.id,
            username: shopper.username_or_unknown(),
            item_key: draft.item_key.clone(),
            variant_label: variant.label.clone(),
            game_id: draft.game_id.clone(),
            customer_name: draft.customer_name.clone(),
            contact: draft.contact.clone(),
            price: variant.price,
        };

        let order = OrderRepository::new(self.pool).insert(new_order).await?;
        info!(
            order_id = %order.id,
            user_id = %order.user_id,
            item_key = %order.item_key,
            price = %order.price,
            "Order committed"
        );

        self.notifier.dispatch(&order);
        Ok(order)
    }

    fn summarize(&self, draft: &OrderDraft) -> Result<OrderSummary, WizardError> {
        let (item, variant) = self.resolve(draft)?;
        Ok(OrderSummary {
            item_name: item.name.clone(),
            variant_label: variant.label.clone(),
            game_id: draft.game_id.clone(),
            customer_name: draft.customer_name.clone(),
            contact: draft.contact.clone(),
            price: variant.price,
        })
    }

    fn resolve(&self, draft: &OrderDraft) -> Result<(&CatalogItem, &Variant), WizardError> {
        self.catalog
            .variant(&draft.item_key, &draft.variant_key)
            .ok_or_else(|| WizardError::StaleSelection {
                item_key: draft.item_key.clone(),
                variant_key: draft.variant_key.clone(),
            })
    }
}

impl std::fmt::Debug for OrderWizard<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderWizard").finish_non_exhaustive()
    }
}

fn validate_game_id(input: &str) -> Result<String, ValidationError> {
    if input.len() >= MIN_GAME_ID_DIGITS && input.chars().all(|c| c.is_ascii_digit()) {
        Ok(input.to_string())
    } else {
        Err(ValidationError::GameId)
    }
}

fn validate_name(input: &str) -> Result<String, ValidationError> {
    let trimmed = input.trim();
    if trimmed.chars().count() >= MIN_NAME_CHARS {
        Ok(trimmed.to_string())
    } else {
        Err(ValidationError::Name)
    }
}

fn validate_contact(input: &str) -> Result<String, ValidationError> {
    let trimmed = input.trim();
    if trimmed.chars().count() >= MIN_CONTACT_CHARS {
        Ok(trimmed.to_string())
    } else {
        Err(ValidationError::Contact)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use tokio::sync::mpsc::UnboundedReceiver;

    use gamestore_core::{ChatId, OrderStatus};

    use crate::db::{create_memory_pool, run_migrations};
    use crate::mock::RecordingTransport;
    use crate::transport::{OutgoingMessage, Transport};

    struct Harness {
        pool: SqlitePool,
        catalog: Arc<Catalog>,
        sessions: SessionRegistry,
        notifier: OrderNotifier,
        outbox: UnboundedReceiver<OutgoingMessage>,
        transport: Arc<RecordingTransport>,
    }

    impl Harness {
        async fn new() -> Self {
            let pool = create_memory_pool().await.unwrap();
            run_migrations(&pool).await.unwrap();
            let catalog = Arc::new(Catalog::load(None).unwrap());
            let (transport, outbox) = RecordingTransport::new();
            let notifier = OrderNotifier::new(
                Arc::clone(&transport) as Arc<dyn Transport>,
                ChatId::new(-500),
                Arc::clone(&catalog),
            );
            Self {
                pool,
                catalog,
                sessions: SessionRegistry::new(),
                notifier,
                outbox,
                transport,
            }
        }

        fn wizard(&self) -> OrderWizard<'_> {
            OrderWizard::new(&self.pool, &self.catalog, &self.sessions, &self.notifier)
        }
    }

    fn ana() -> Shopper {
        Shopper {
            id: UserId::new(7),
            username: Some("ana_mx".to_string()),
        }
    }

    fn text(s: &str) -> WizardEvent {
        WizardEvent::Text(s.to_string())
    }

    /// Drive a fresh conversation up to the confirmation step.
    async fn advance_to_confirm(wizard: &OrderWizard<'_>, shopper: &Shopper) {
        wizard.begin(shopper).await;
        wizard
            .handle_event(shopper, WizardEvent::SelectItem("diamantes".to_string()))
            .await
            .unwrap();
        wizard
            .handle_event(shopper, WizardEvent::SelectVariant("310".to_string()))
            .await
            .unwrap();
        wizard.handle_event(shopper, text("123456789")).await.unwrap();
        wizard.handle_event(shopper, text("Ana")).await.unwrap();
        wizard
            .handle_event(shopper, text("+551199998888"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_begin_prompts_item_selection() {
        let h = Harness::new().await;
        let reply = h.wizard().begin(&ana()).await;
        assert!(matches!(reply, WizardReply::Prompt(StepPrompt::ChooseItem)));
    }

    #[tokio::test]
    async fn test_full_flow_commits_pending_order() {
        let mut h = Harness::new().await;
        let wizard = h.wizard();
        let shopper = ana();

        advance_to_confirm(&wizard, &shopper).await;
        let reply = wizard
            .handle_event(&shopper, WizardEvent::Confirm)
            .await
            .unwrap();

        let WizardReply::Committed(order) = reply else {
            panic!("expected commit, got {reply:?}");
        };
        assert_eq!(order.price, Price::new(150));
        assert_eq!(order.variant_label, "310");
        assert_eq!(order.game_id, "123456789");
        assert_eq!(order.customer_name, "Ana");
        assert_eq!(order.contact, "+551199998888");
        assert_eq!(order.username, "ana_mx");
        assert_eq!(order.status, OrderStatus::Pending);

        // Exactly one row in the store.
        let stored = OrderRepository::new(&h.pool).recent(10).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored.first().unwrap().id, order.id);

        // Exactly one operator notification, carrying the id and price.
        let notification = h.outbox.recv().await.unwrap();
        assert_eq!(notification.chat, ChatId::new(-500));
        assert!(notification.text.contains(&format!("#{}", order.id)));
        assert!(notification.text.contains("$150 MXN"));
        assert!(h.outbox.try_recv().is_err());

        // Terminal: the session is gone. A fresh wizard here keeps the
        // harness borrows disjoint from the outbox drain above.
        let after = h.wizard().prompt(&shopper).await.unwrap();
        assert!(matches!(after, WizardReply::NoActiveOrder));
    }

    #[tokio::test]
    async fn test_game_id_validation() {
        let h = Harness::new().await;
        let wizard = h.wizard();
        let shopper = ana();

        wizard.begin(&shopper).await;
        wizard
            .handle_event(&shopper, WizardEvent::SelectItem("diamantes".to_string()))
            .await
            .unwrap();
        wizard
            .handle_event(&shopper, WizardEvent::SelectVariant("310".to_string()))
            .await
            .unwrap();

        // Too short.
        let reply = wizard.handle_event(&shopper, text("1234567")).await.unwrap();
        assert!(matches!(
            reply,
            WizardReply::InvalidInput(ValidationError::GameId)
        ));
        // Non-digit.
        let reply = wizard.handle_event(&shopper, text("12a45678")).await.unwrap();
        assert!(matches!(
            reply,
            WizardReply::InvalidInput(ValidationError::GameId)
        ));

        // Both rejections left the conversation on the same step.
        let prompt = wizard.prompt(&shopper).await.unwrap();
        assert!(matches!(prompt, WizardReply::Prompt(StepPrompt::AskGameId)));

        // Exactly eight digits passes.
        let reply = wizard.handle_event(&shopper, text("12345678")).await.unwrap();
        assert!(matches!(reply, WizardReply::Prompt(StepPrompt::AskName)));
    }

    #[tokio::test]
    async fn test_name_validation() {
        let h = Harness::new().await;
        let wizard = h.wizard();
        let shopper = ana();

        wizard.begin(&shopper).await;
        wizard
            .handle_event(&shopper, WizardEvent::SelectItem("diamantes".to_string()))
            .await
            .unwrap();
        wizard
            .handle_event(&shopper, WizardEvent::SelectVariant("310".to_string()))
            .await
            .unwrap();
        wizard.handle_event(&shopper, text("12345678")).await.unwrap();

        let reply = wizard.handle_event(&shopper, text("a")).await.unwrap();
        assert!(matches!(
            reply,
            WizardReply::InvalidInput(ValidationError::Name)
        ));
        // Whitespace padding does not help a too-short name.
        let reply = wizard.handle_event(&shopper, text("  a  ")).await.unwrap();
        assert!(matches!(
            reply,
            WizardReply::InvalidInput(ValidationError::Name)
        ));

        let reply = wizard.handle_event(&shopper, text("Jo")).await.unwrap();
        assert!(matches!(reply, WizardReply::Prompt(StepPrompt::AskContact)));
    }

    #[tokio::test]
    async fn test_contact_validation() {
        let h = Harness::new().await;
        let wizard = h.wizard();
        let shopper = ana();

        wizard.begin(&shopper).await;
        wizard
            .handle_event(&shopper, WizardEvent::SelectItem("diamantes".to_string()))
            .await
            .unwrap();
        wizard
            .handle_event(&shopper, WizardEvent::SelectVariant("310".to_string()))
            .await
            .unwrap();
        wizard.handle_event(&shopper, text("12345678")).await.unwrap();
        wizard.handle_event(&shopper, text("Ana")).await.unwrap();

        let reply = wizard.handle_event(&shopper, text("1234")).await.unwrap();
        assert!(matches!(
            reply,
            WizardReply::InvalidInput(ValidationError::Contact)
        ));

        let reply = wizard.handle_event(&shopper, text("+1234")).await.unwrap();
        assert!(matches!(
            reply,
            WizardReply::Prompt(StepPrompt::ConfirmSummary(_))
        ));
    }

    #[tokio::test]
    async fn test_summary_resolves_names_and_price() {
        let h = Harness::new().await;
        let wizard = h.wizard();
        let shopper = ana();

        wizard.begin(&shopper).await;
        wizard
            .handle_event(&shopper, WizardEvent::SelectItem("monedas".to_string()))
            .await
            .unwrap();
        wizard
            .handle_event(&shopper, WizardEvent::SelectVariant("50000".to_string()))
            .await
            .unwrap();
        wizard.handle_event(&shopper, text("87654321")).await.unwrap();
        wizard.handle_event(&shopper, text("Ana")).await.unwrap();
        let reply = wizard
            .handle_event(&shopper, text("+551199998888"))
            .await
            .unwrap();

        let WizardReply::Prompt(StepPrompt::ConfirmSummary(summary)) = reply else {
            panic!("expected summary, got {reply:?}");
        };
        assert_eq!(summary.item_name, "🪙 Gold");
        assert_eq!(summary.variant_label, "50,000");
        assert_eq!(summary.price, Price::new(380));
        assert_eq!(summary.game_id, "87654321");
    }

    #[tokio::test]
    async fn test_unknown_item_reprompts_without_mutation() {
        let h = Harness::new().await;
        let wizard = h.wizard();
        let shopper = ana();

        wizard.begin(&shopper).await;
        let reply = wizard
            .handle_event(&shopper, WizardEvent::SelectItem("skins".to_string()))
            .await
            .unwrap();
        assert!(matches!(
            reply,
            WizardReply::UnknownSelection(StepPrompt::ChooseItem)
        ));

        // Still on item selection; a valid pick works.
        let reply = wizard
            .handle_event(&shopper, WizardEvent::SelectItem("pases".to_string()))
            .await
            .unwrap();
        assert!(matches!(
            reply,
            WizardReply::Prompt(StepPrompt::ChooseVariant { .. })
        ));
    }

    #[tokio::test]
    async fn test_unknown_variant_reprompts() {
        let h = Harness::new().await;
        let wizard = h.wizard();
        let shopper = ana();

        wizard.begin(&shopper).await;
        wizard
            .handle_event(&shopper, WizardEvent::SelectItem("diamantes".to_string()))
            .await
            .unwrap();

        // A variant key from a different item does not resolve here.
        let reply = wizard
            .handle_event(&shopper, WizardEvent::SelectVariant("elite".to_string()))
            .await
            .unwrap();
        let WizardReply::UnknownSelection(StepPrompt::ChooseVariant { item_key }) = reply else {
            panic!("expected variant re-prompt, got {reply:?}");
        };
        assert_eq!(item_key, "diamantes");
    }

    #[tokio::test]
    async fn test_typed_item_key_advances() {
        let h = Harness::new().await;
        let wizard = h.wizard();
        let shopper = ana();

        wizard.begin(&shopper).await;
        let reply = wizard.handle_event(&shopper, text("diamantes")).await.unwrap();
        assert!(matches!(
            reply,
            WizardReply::Prompt(StepPrompt::ChooseVariant { .. })
        ));
    }

    #[tokio::test]
    async fn test_replayed_button_reprompts_current_step() {
        let h = Harness::new().await;
        let wizard = h.wizard();
        let shopper = ana();

        wizard.begin(&shopper).await;
        wizard
            .handle_event(&shopper, WizardEvent::SelectItem("diamantes".to_string()))
            .await
            .unwrap();
        wizard
            .handle_event(&shopper, WizardEvent::SelectVariant("310".to_string()))
            .await
            .unwrap();

        // An old variant button pressed while the game id is expected.
        let reply = wizard
            .handle_event(&shopper, WizardEvent::SelectVariant("520".to_string()))
            .await
            .unwrap();
        assert!(matches!(
            reply,
            WizardReply::UnknownSelection(StepPrompt::AskGameId)
        ));

        // Unfazed: the expected input still advances.
        let reply = wizard.handle_event(&shopper, text("12345678")).await.unwrap();
        assert!(matches!(reply, WizardReply::Prompt(StepPrompt::AskName)));
    }

    #[tokio::test]
    async fn test_confirm_step_treats_anything_else_as_cancel() {
        let h = Harness::new().await;
        let wizard = h.wizard();
        let shopper = ana();

        advance_to_confirm(&wizard, &shopper).await;
        let reply = wizard.handle_event(&shopper, text("hmm wait")).await.unwrap();
        assert!(matches!(reply, WizardReply::Cancelled));

        // Session gone, nothing stored.
        let prompt = wizard.prompt(&shopper).await.unwrap();
        assert!(matches!(prompt, WizardReply::NoActiveOrder));
        let stored = OrderRepository::new(&h.pool).recent(10).await.unwrap();
        assert!(stored.is_empty());
    }

    #[tokio::test]
    async fn test_cancel_clears_session_from_any_step() {
        let h = Harness::new().await;
        let wizard = h.wizard();
        let shopper = ana();

        wizard.begin(&shopper).await;
        wizard
            .handle_event(&shopper, WizardEvent::SelectItem("diamantes".to_string()))
            .await
            .unwrap();

        let reply = wizard
            .handle_event(&shopper, WizardEvent::Cancel)
            .await
            .unwrap();
        assert!(matches!(reply, WizardReply::Cancelled));

        // Cancelling again has nothing to cancel.
        let reply = wizard
            .handle_event(&shopper, WizardEvent::Cancel)
            .await
            .unwrap();
        assert!(matches!(reply, WizardReply::NoActiveOrder));
    }

    #[tokio::test]
    async fn test_begin_resets_mid_conversation() {
        let h = Harness::new().await;
        let wizard = h.wizard();
        let shopper = ana();

        wizard.begin(&shopper).await;
        wizard
            .handle_event(&shopper, WizardEvent::SelectItem("diamantes".to_string()))
            .await
            .unwrap();
        wizard
            .handle_event(&shopper, WizardEvent::SelectVariant("310".to_string()))
            .await
            .unwrap();

        let reply = wizard.begin(&shopper).await;
        assert!(matches!(reply, WizardReply::Prompt(StepPrompt::ChooseItem)));

        // The discarded selection is gone: a game id is not expected yet.
        let reply = wizard.handle_event(&shopper, text("12345678")).await.unwrap();
        assert!(matches!(
            reply,
            WizardReply::UnknownSelection(StepPrompt::ChooseItem)
        ));
    }

    #[tokio::test]
    async fn test_event_with_no_session_reports_no_active_order() {
        let h = Harness::new().await;
        let reply = h
            .wizard()
            .handle_event(&ana(), WizardEvent::SelectItem("diamantes".to_string()))
            .await
            .unwrap();
        assert!(matches!(reply, WizardReply::NoActiveOrder));
    }

    #[tokio::test]
    async fn test_username_fallback_is_unknown() {
        let mut h = Harness::new().await;
        let wizard = h.wizard();
        let shopper = Shopper {
            id: UserId::new(8),
            username: None,
        };

        advance_to_confirm(&wizard, &shopper).await;
        let reply = wizard
            .handle_event(&shopper, WizardEvent::Confirm)
            .await
            .unwrap();

        let WizardReply::Committed(order) = reply else {
            panic!("expected commit, got {reply:?}");
        };
        assert_eq!(order.username, "unknown");
        h.outbox.recv().await.unwrap();
    }

    #[tokio::test]
    async fn test_insert_failure_keeps_session_and_skips_notification() {
        let mut h = Harness::new().await;
        let wizard = h.wizard();
        let shopper = ana();

        advance_to_confirm(&wizard, &shopper).await;

        // A closed pool makes the insert fail.
        h.pool.close().await;
        let result = wizard.handle_event(&shopper, WizardEvent::Confirm).await;
        assert!(matches!(result, Err(WizardError::Storage(_))));

        // The session survives for a retry, and the operator heard nothing.
        let prompt = wizard.prompt(&shopper).await.unwrap();
        assert!(matches!(
            prompt,
            WizardReply::Prompt(StepPrompt::ConfirmSummary(_))
        ));
        assert!(h.outbox.try_recv().is_err());

        // Storage comes back (a fresh pool): the retry commits.
        let pool = create_memory_pool().await.unwrap();
        run_migrations(&pool).await.unwrap();
        let recovered = OrderWizard::new(&pool, &h.catalog, &h.sessions, &h.notifier);
        let reply = recovered
            .handle_event(&shopper, WizardEvent::Confirm)
            .await
            .unwrap();
        assert!(matches!(reply, WizardReply::Committed(_)));
    }

    #[tokio::test]
    async fn test_notification_failure_does_not_affect_commit() {
        let h = Harness::new().await;
        let wizard = h.wizard();
        let shopper = ana();

        h.transport.fail_sends(true);
        advance_to_confirm(&wizard, &shopper).await;
        let reply = wizard
            .handle_event(&shopper, WizardEvent::Confirm)
            .await
            .unwrap();
        assert!(matches!(reply, WizardReply::Committed(_)));

        let stored = OrderRepository::new(&h.pool).recent(10).await.unwrap();
        assert_eq!(stored.len(), 1);
    }

    #[tokio::test]
    async fn test_prompt_reissues_step_after_detour() {
        let h = Harness::new().await;
        let wizard = h.wizard();
        let shopper = ana();

        wizard.begin(&shopper).await;
        wizard
            .handle_event(&shopper, WizardEvent::SelectItem("diamantes".to_string()))
            .await
            .unwrap();
        wizard
            .handle_event(&shopper, WizardEvent::SelectVariant("310".to_string()))
            .await
            .unwrap();

        // The help detour re-issues the prompt without consuming anything.
        let prompt = wizard.prompt(&shopper).await.unwrap();
        assert!(matches!(prompt, WizardReply::Prompt(StepPrompt::AskGameId)));
        let reply = wizard.handle_event(&shopper, text("12345678")).await.unwrap();
        assert!(matches!(reply, WizardReply::Prompt(StepPrompt::AskName)));
    }

    #[test]
    fn test_validate_game_id_rules() {
        assert!(validate_game_id("12345678").is_ok());
        assert!(validate_game_id("123456789012").is_ok());
        assert_eq!(validate_game_id("1234567"), Err(ValidationError::GameId));
        assert_eq!(validate_game_id("12a45678"), Err(ValidationError::GameId));
        assert_eq!(validate_game_id(""), Err(ValidationError::GameId));
        // Length is counted on digits only; padding is not stripped.
        assert_eq!(validate_game_id(" 12345678"), Err(ValidationError::GameId));
    }

    #[test]
    fn test_validate_name_trims_before_counting() {
        assert_eq!(validate_name("  Jo  ").as_deref(), Ok("Jo"));
        assert_eq!(validate_name(" a "), Err(ValidationError::Name));
        assert_eq!(validate_name("José").as_deref(), Ok("José"));
    }

    #[test]
    fn test_validate_contact_trims_before_counting() {
        assert_eq!(validate_contact(" +1234 ").as_deref(), Ok("+1234"));
        assert_eq!(validate_contact("1234"), Err(ValidationError::Contact));
        assert_eq!(validate_contact("@ana_mx").as_deref(), Ok("@ana_mx"));
    }
}
