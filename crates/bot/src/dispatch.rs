//! Inbound update routing.
//!
//! One update, one task: the poll loop in `main` spawns [`handle_update`]
//! for every update it receives. Commands and callback buttons map onto
//! wizard events, admin queries, or static texts. Send failures are logged
//! and never retried. Callback presses are acknowledged before any handling
//! so the client spinner never hangs on a slow commit.

use tracing::{debug, error, instrument, warn};

use gamestore_core::{ChatId, UserId};

use crate::admin::{AdminError, AdminService};
use crate::state::AppState;
use crate::telegram::{CallbackQuery, Message, Update, User};
use crate::texts;
use crate::transport::OutgoingMessage;
use crate::wizard::{OrderWizard, Shopper, StepPrompt, WizardError, WizardEvent, WizardReply};

/// A slash command addressed to the bot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Products,
    Order,
    Cancel,
    Help,
    AdminOrders,
    AdminStats,
    /// A `/something` the bot does not know; answered with the help text.
    Unknown,
}

/// Parse a message as a command, if it is one.
///
/// Accepts the `/command@botname` form used in group chats; anything after
/// the command word is ignored.
#[must_use]
pub fn parse_command(text: &str) -> Option<Command> {
    let first = text.split_whitespace().next()?;
    if !first.starts_with('/') {
        return None;
    }
    let name = first.split('@').next().unwrap_or(first);
    Some(match name {
        "/start" => Command::Start,
        "/products" => Command::Products,
        "/order" => Command::Order,
        "/cancel" => Command::Cancel,
        "/help" => Command::Help,
        "/admin_orders" => Command::AdminOrders,
        "/admin_stats" => Command::AdminStats,
        _ => Command::Unknown,
    })
}

/// A parsed inline-button press.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackAction {
    Menu,
    Catalog,
    Contact,
    Help,
    OrderStart,
    OrderItem(String),
    OrderVariant(String),
    OrderConfirm,
    OrderCancel,
    OrderResume,
    GameIdHelp,
}

/// Parse callback data into an action. `None` means unrecognized data,
/// which the caller logs and drops.
#[must_use]
pub fn parse_callback(data: &str) -> Option<CallbackAction> {
    let action = match data {
        "menu" => CallbackAction::Menu,
        "catalog" => CallbackAction::Catalog,
        "contact" => CallbackAction::Contact,
        "help" => CallbackAction::Help,
        // `order:restart` is the post-cancellation shortcut; both start over.
        "order:start" | "order:restart" => CallbackAction::OrderStart,
        "order:confirm" => CallbackAction::OrderConfirm,
        "order:cancel" => CallbackAction::OrderCancel,
        "order:resume" => CallbackAction::OrderResume,
        "gameid:help" => CallbackAction::GameIdHelp,
        _ => {
            if let Some(key) = data.strip_prefix("order:item:") {
                CallbackAction::OrderItem(key.to_string())
            } else if let Some(key) = data.strip_prefix("order:variant:") {
                CallbackAction::OrderVariant(key.to_string())
            } else {
                return None;
            }
        }
    };
    Some(action)
}

/// Route one update.
#[instrument(skip(state, update), fields(update_id = update.update_id))]
pub async fn handle_update(state: AppState, update: Update) {
    if let Some(message) = update.message {
        handle_message(&state, message).await;
    } else if let Some(query) = update.callback_query {
        handle_callback(&state, query).await;
    } else {
        debug!("Ignoring update with no message or callback");
    }
}

async fn handle_message(state: &AppState, message: Message) {
    let chat = ChatId::new(message.chat.id);
    let Some(from) = message.from else {
        debug!("Ignoring message without a sender");
        return;
    };
    let Some(text) = message.text else {
        debug!("Ignoring message without text");
        return;
    };
    let shopper = shopper_from(&from);

    if let Some(command) = parse_command(&text) {
        handle_command(state, chat, &shopper, &from.first_name, command).await;
    } else {
        let result = wizard(state)
            .handle_event(&shopper, WizardEvent::Text(text))
            .await;
        send_wizard_outcome(state, chat, result).await;
    }
}

async fn handle_command(
    state: &AppState,
    chat: ChatId,
    shopper: &Shopper,
    first_name: &str,
    command: Command,
) {
    match command {
        Command::Start => send(state, texts::welcome(chat, first_name)).await,
        Command::Products => send(state, texts::catalog_overview(chat, state.catalog())).await,
        Command::Help | Command::Unknown => send(state, texts::help_text(chat)).await,
        Command::Order => {
            let reply = wizard(state).begin(shopper).await;
            send_wizard_reply(state, chat, reply).await;
        }
        Command::Cancel => {
            let result = wizard(state)
                .handle_event(shopper, WizardEvent::Cancel)
                .await;
            send_wizard_outcome(state, chat, result).await;
        }
        Command::AdminOrders => {
            let admin = AdminService::new(state.pool(), state.config().operator_id);
            match admin.recent_orders(shopper.id).await {
                Ok(orders) => {
                    let report = texts::admin_orders_report(chat, &orders, state.catalog());
                    send(state, report).await;
                }
                Err(e) => handle_admin_error(state, chat, &e).await,
            }
        }
        Command::AdminStats => {
            let admin = AdminService::new(state.pool(), state.config().operator_id);
            match admin.stats(shopper.id).await {
                Ok(stats) => {
                    let report = texts::admin_stats_report(chat, &stats, state.catalog());
                    send(state, report).await;
                }
                Err(e) => handle_admin_error(state, chat, &e).await,
            }
        }
    }
}

async fn handle_callback(state: &AppState, query: CallbackQuery) {
    // Ack first so the client spinner stops even when handling is slow.
    if let Err(e) = state.transport().ack_callback(&query.id).await {
        warn!(error = %e, "Failed to acknowledge callback");
    }

    let shopper = shopper_from(&query.from);
    // Buttons normally carry their message; fall back to the user's own
    // chat for old presses where Telegram dropped it.
    let chat = query
        .message
        .as_ref()
        .map_or(ChatId::new(query.from.id), |m| ChatId::new(m.chat.id));

    let Some(data) = query.data else {
        debug!("Ignoring callback without data");
        return;
    };
    let Some(action) = parse_callback(&data) else {
        warn!(data = %data, "Dropping unrecognized callback data");
        return;
    };

    match action {
        CallbackAction::Menu => send(state, texts::main_menu(chat)).await,
        CallbackAction::Catalog => {
            send(state, texts::catalog_overview(chat, state.catalog())).await;
        }
        CallbackAction::Contact => send(state, texts::contact_card(chat)).await,
        CallbackAction::Help => send(state, texts::help_text(chat)).await,
        CallbackAction::GameIdHelp => send(state, texts::game_id_help(chat)).await,
        CallbackAction::OrderStart => {
            let reply = wizard(state).begin(&shopper).await;
            send_wizard_reply(state, chat, reply).await;
        }
        CallbackAction::OrderResume => {
            let result = wizard(state).prompt(&shopper).await;
            send_wizard_outcome(state, chat, result).await;
        }
        CallbackAction::OrderItem(key) => {
            let result = wizard(state)
                .handle_event(&shopper, WizardEvent::SelectItem(key))
                .await;
            send_wizard_outcome(state, chat, result).await;
        }
        CallbackAction::OrderVariant(key) => {
            let result = wizard(state)
                .handle_event(&shopper, WizardEvent::SelectVariant(key))
                .await;
            send_wizard_outcome(state, chat, result).await;
        }
        CallbackAction::OrderConfirm => {
            let result = wizard(state)
                .handle_event(&shopper, WizardEvent::Confirm)
                .await;
            send_wizard_outcome(state, chat, result).await;
        }
        CallbackAction::OrderCancel => {
            let result = wizard(state)
                .handle_event(&shopper, WizardEvent::Cancel)
                .await;
            send_wizard_outcome(state, chat, result).await;
        }
    }
}

fn wizard(state: &AppState) -> OrderWizard<'_> {
    OrderWizard::new(
        state.pool(),
        state.catalog(),
        state.sessions(),
        state.notifier(),
    )
}

fn shopper_from(user: &User) -> Shopper {
    Shopper {
        id: UserId::new(user.id),
        username: user.username.clone(),
    }
}

async fn send_wizard_outcome(
    state: &AppState,
    chat: ChatId,
    result: Result<WizardReply, WizardError>,
) {
    match result {
        Ok(reply) => send_wizard_reply(state, chat, reply).await,
        Err(WizardError::Storage(e)) => {
            error!(error = %e, "Order commit failed at the store");
            send(state, texts::commit_failed(chat)).await;
        }
        Err(WizardError::StaleSelection {
            item_key,
            variant_key,
        }) => {
            error!(
                item_key = %item_key,
                variant_key = %variant_key,
                "Session references an unknown catalog entry"
            );
            send(state, texts::selection_unavailable(chat)).await;
        }
    }
}

async fn send_wizard_reply(state: &AppState, chat: ChatId, reply: WizardReply) {
    match reply {
        WizardReply::Prompt(prompt) => send(state, prompt_message(state, chat, prompt)).await,
        WizardReply::InvalidInput(error) => send(state, texts::invalid_input(chat, error)).await,
        WizardReply::UnknownSelection(prompt) => {
            send(state, texts::unknown_selection(chat)).await;
            send(state, prompt_message(state, chat, prompt)).await;
        }
        WizardReply::Committed(order) => send(state, texts::order_committed(chat, &order)).await,
        WizardReply::Cancelled => send(state, texts::order_cancelled(chat)).await,
        WizardReply::NoActiveOrder => send(state, texts::no_active_order(chat)).await,
    }
}

fn prompt_message(state: &AppState, chat: ChatId, prompt: StepPrompt) -> OutgoingMessage {
    match prompt {
        StepPrompt::ChooseItem => texts::choose_item(chat, state.catalog()),
        StepPrompt::ChooseVariant { item_key } => {
            texts::choose_variant(chat, state.catalog(), &item_key)
        }
        StepPrompt::AskGameId => texts::ask_game_id(chat),
        StepPrompt::AskName => texts::ask_name(chat),
        StepPrompt::AskContact => texts::ask_contact(chat),
        StepPrompt::ConfirmSummary(summary) => texts::order_summary(chat, &summary),
    }
}

async fn handle_admin_error(state: &AppState, chat: ChatId, error: &AdminError) {
    match error {
        // A flat rejection: no hint about the store or the operator id.
        AdminError::Unauthorized => send(state, texts::admin_denied(chat)).await,
        AdminError::Repository(e) => {
            error!(error = %e, "Admin report query failed");
            send(state, texts::report_failed(chat)).await;
        }
    }
}

async fn send(state: &AppState, message: OutgoingMessage) {
    if let Err(e) = state.transport().send_message(message).await {
        error!(error = %e, "Failed to send message");
    }
}
