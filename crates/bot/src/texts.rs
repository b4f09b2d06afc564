//! Message builders: every user-visible string lives here.
//!
//! Builders take a chat id plus whatever data the message shows and return
//! a ready-to-send [`OutgoingMessage`]. Keeping all copy in one module keeps
//! wording consistent and lets tests assert on messages without scraping
//! handler code. Button callback data built here is parsed back in
//! `dispatch`; the dispatch tests round-trip the two.

use gamestore_core::ChatId;

use crate::admin::RECENT_ORDERS_LIMIT;
use crate::catalog::Catalog;
use crate::models::order::{Order, OrderStats};
use crate::transport::{Button, Keyboard, OutgoingMessage};
use crate::wizard::{OrderSummary, ValidationError};

/// Greeting for `/start`, addressed by the sender's first name.
#[must_use]
pub fn welcome(chat: ChatId, first_name: &str) -> OutgoingMessage {
    OutgoingMessage::text(
        chat,
        format!(
            "🎮 Welcome to Gamestore, {first_name}!\n\n\
             Top-ups for your game account, delivered fast.\n\n\
             What would you like to do?"
        ),
    )
    .with_keyboard(menu_keyboard())
}

/// The main menu, shown on its own for back-navigation.
#[must_use]
pub fn main_menu(chat: ChatId) -> OutgoingMessage {
    OutgoingMessage::text(chat, "What would you like to do?").with_keyboard(menu_keyboard())
}

fn menu_keyboard() -> Keyboard {
    Keyboard::new(vec![
        vec![
            Button::new("🛍 Catalog", "catalog"),
            Button::new("🧾 New order", "order:start"),
        ],
        vec![
            Button::new("📞 Contact", "contact"),
            Button::new("❓ Help", "help"),
        ],
    ])
}

/// Catalog overview with prices, for `/products`.
#[must_use]
pub fn catalog_overview(chat: ChatId, catalog: &Catalog) -> OutgoingMessage {
    let mut text = String::from("🛍 Our catalog\n");
    for item in catalog.items() {
        text.push('\n');
        text.push_str(&item.name);
        if !item.description.is_empty() {
            text.push_str(" · ");
            text.push_str(&item.description);
        }
        text.push('\n');
        for variant in &item.variants {
            text.push_str(&format!("  {} · {}\n", variant.label, variant.price));
        }
    }
    text.push_str("\nReady when you are.");

    OutgoingMessage::text(chat, text).with_keyboard(Keyboard::new(vec![
        vec![Button::new("🧾 Start an order", "order:start")],
        vec![Button::new("⬅️ Menu", "menu")],
    ]))
}

/// Support contact card.
#[must_use]
pub fn contact_card(chat: ChatId) -> OutgoingMessage {
    OutgoingMessage::text(
        chat,
        "📞 Gamestore support\n\n\
         WhatsApp: +52 55 0000 0000\n\
         Telegram: @gamestore_support\n\
         Hours: 9:00 to 21:00 (CDMX), every day.",
    )
    .with_keyboard(Keyboard::new(vec![vec![Button::new("⬅️ Menu", "menu")]]))
}

/// Command guide, also sent for unrecognized commands.
#[must_use]
pub fn help_text(chat: ChatId) -> OutgoingMessage {
    OutgoingMessage::text(
        chat,
        "❓ How this works\n\n\
         /order starts a guided order: pick a product and an amount, send\n\
         your player ID, your name and a contact, then confirm.\n\n\
         /start · main menu\n\
         /products · catalog and prices\n\
         /order · start an order\n\
         /cancel · cancel the order in progress\n\
         /help · this message",
    )
}

/// Step 1: pick an item.
#[must_use]
pub fn choose_item(chat: ChatId, catalog: &Catalog) -> OutgoingMessage {
    let mut rows: Vec<Vec<Button>> = catalog
        .items()
        .iter()
        .map(|item| vec![Button::new(&item.name, format!("order:item:{}", item.key))])
        .collect();
    rows.push(vec![cancel_button()]);

    OutgoingMessage::text(chat, "🧾 New order · step 1 of 5\n\nPick a product:")
        .with_keyboard(Keyboard::new(rows))
}

/// Step 2: pick a variant of the chosen item.
#[must_use]
pub fn choose_variant(chat: ChatId, catalog: &Catalog, item_key: &str) -> OutgoingMessage {
    let mut rows: Vec<Vec<Button>> = catalog.item(item_key).map_or_else(Vec::new, |item| {
        item.variants
            .iter()
            .map(|variant| {
                vec![Button::new(
                    format!("{} · {}", variant.label, variant.price),
                    format!("order:variant:{}", variant.key),
                )]
            })
            .collect()
    });
    rows.push(vec![cancel_button()]);

    let name = catalog.display_name(item_key);
    OutgoingMessage::text(chat, format!("Step 2 of 5\n\n{name}: pick an amount:"))
        .with_keyboard(Keyboard::new(rows))
}

/// Step 3: ask for the player id.
#[must_use]
pub fn ask_game_id(chat: ChatId) -> OutgoingMessage {
    OutgoingMessage::text(
        chat,
        "Step 3 of 5\n\nSend your player ID (digits only, at least 8).",
    )
    .with_keyboard(Keyboard::new(vec![
        vec![Button::new("❓ Where do I find my ID?", "gameid:help")],
        vec![cancel_button()],
    ]))
}

/// Step 4: ask for the customer's name.
#[must_use]
pub fn ask_name(chat: ChatId) -> OutgoingMessage {
    OutgoingMessage::text(chat, "Step 4 of 5\n\nWhat name should we put on the order?")
        .with_keyboard(Keyboard::new(vec![vec![cancel_button()]]))
}

/// Step 5: ask for contact details.
#[must_use]
pub fn ask_contact(chat: ChatId) -> OutgoingMessage {
    OutgoingMessage::text(
        chat,
        "Step 5 of 5\n\nHow can we reach you? Phone, WhatsApp or @username.",
    )
    .with_keyboard(Keyboard::new(vec![vec![cancel_button()]]))
}

/// The confirmation summary with confirm/cancel buttons.
#[must_use]
pub fn order_summary(chat: ChatId, summary: &OrderSummary) -> OutgoingMessage {
    OutgoingMessage::text(
        chat,
        format!(
            "🧾 Please review your order:\n\n\
             Item: {} {}\n\
             Player ID: {}\n\
             Name: {}\n\
             Contact: {}\n\n\
             Total: {}\n\n\
             All good?",
            summary.item_name,
            summary.variant_label,
            summary.game_id,
            summary.customer_name,
            summary.contact,
            summary.price,
        ),
    )
    .with_keyboard(confirm_keyboard())
}

/// Corrective line for a rejected input; the user retries the same step.
#[must_use]
pub fn invalid_input(chat: ChatId, error: ValidationError) -> OutgoingMessage {
    let text = match error {
        ValidationError::GameId => {
            "That doesn't look like a player ID. Digits only, at least 8 of them, e.g. 123456789."
        }
        ValidationError::Name => "That name is too short. Two characters or more, please.",
        ValidationError::Contact => {
            "That contact is too short. Five characters or more, e.g. +52 55 1234 5678 or @username."
        }
    };
    OutgoingMessage::text(chat, text)
}

/// Nudge sent before re-issuing the current step's prompt.
#[must_use]
pub fn unknown_selection(chat: ChatId) -> OutgoingMessage {
    OutgoingMessage::text(chat, "That option isn't available right now.")
}

/// Commit confirmation; carries the assigned order id.
#[must_use]
pub fn order_committed(chat: ChatId, order: &Order) -> OutgoingMessage {
    OutgoingMessage::text(
        chat,
        format!(
            "✅ Order #{} confirmed!\n\n\
             {} for player {}.\n\
             Total: {}\n\n\
             We'll deliver shortly and reach you at {} if anything comes up. Thanks!",
            order.id, order.variant_label, order.game_id, order.price, order.contact,
        ),
    )
}

/// Acknowledge a cancellation, with a shortcut to start over.
#[must_use]
pub fn order_cancelled(chat: ChatId) -> OutgoingMessage {
    OutgoingMessage::text(chat, "Order cancelled. Nothing was charged.").with_keyboard(
        Keyboard::new(vec![
            vec![Button::new("🧾 New order", "order:restart")],
            vec![Button::new("⬅️ Menu", "menu")],
        ]),
    )
}

/// Reply when there is nothing in progress to act on.
#[must_use]
pub fn no_active_order(chat: ChatId) -> OutgoingMessage {
    OutgoingMessage::text(chat, "No order in progress. Start one with /order.")
}

/// A picked item or variant has vanished from the catalog.
#[must_use]
pub fn selection_unavailable(chat: ChatId) -> OutgoingMessage {
    OutgoingMessage::text(
        chat,
        "That product is no longer available, sorry. Use /order to start over.",
    )
}

/// Storage-failure apology; the confirm keyboard lets the user retry.
#[must_use]
pub fn commit_failed(chat: ChatId) -> OutgoingMessage {
    OutgoingMessage::text(
        chat,
        "😔 Something went wrong saving your order. Nothing was charged.\n\
         Your details are still here, so you can try confirming again.",
    )
    .with_keyboard(confirm_keyboard())
}

/// Where to find the player id, with a way back into the order.
#[must_use]
pub fn game_id_help(chat: ChatId) -> OutgoingMessage {
    OutgoingMessage::text(
        chat,
        "Your player ID is on your in-game profile screen, under your\n\
         avatar. Digits only, at least 8 of them.",
    )
    .with_keyboard(Keyboard::new(vec![vec![Button::new(
        "⬅️ Back to my order",
        "order:resume",
    )]]))
}

/// Flat rejection for admin commands from anyone but the operator.
///
/// Deliberately discloses nothing about the store or who the operator is.
#[must_use]
pub fn admin_denied(chat: ChatId) -> OutgoingMessage {
    OutgoingMessage::text(chat, "❌ You don't have permission to use this command.")
}

/// Operator-facing note when a report query fails.
#[must_use]
pub fn report_failed(chat: ChatId) -> OutgoingMessage {
    OutgoingMessage::text(chat, "Could not load the report. Try again in a moment.")
}

/// Operator report: the most recent orders.
#[must_use]
pub fn admin_orders_report(chat: ChatId, orders: &[Order], catalog: &Catalog) -> OutgoingMessage {
    if orders.is_empty() {
        return OutgoingMessage::text(chat, "No orders yet.");
    }

    let mut text = format!("📋 Last {} orders (newest first):\n", RECENT_ORDERS_LIMIT);
    for order in orders {
        text.push_str(&format!(
            "\n#{} · {} {} · {} · {} · {} (@{})",
            order.id,
            catalog.display_name(&order.item_key),
            order.variant_label,
            order.price,
            order.status,
            order.customer_name,
            order.username,
        ));
    }
    OutgoingMessage::text(chat, text)
}

/// Operator report: aggregate figures.
#[must_use]
pub fn admin_stats_report(chat: ChatId, stats: &OrderStats, catalog: &Catalog) -> OutgoingMessage {
    let top = stats.most_ordered.as_ref().map_or_else(
        || "none yet".to_string(),
        |most| {
            format!(
                "{} ({} orders)",
                catalog.display_name(&most.item_key),
                most.order_count
            )
        },
    );

    OutgoingMessage::text(
        chat,
        format!(
            "📊 Store totals\n\n\
             Orders: {}\n\
             Revenue: {}\n\
             Top seller: {}",
            stats.order_count, stats.total_revenue, top,
        ),
    )
}

/// The new-order alert for the operator channel.
#[must_use]
pub fn order_notification(channel: ChatId, catalog: &Catalog, order: &Order) -> OutgoingMessage {
    OutgoingMessage::text(
        channel,
        format!(
            "🔔 New order #{}\n\n\
             Item: {} {}\n\
             Price: {}\n\
             Player ID: {}\n\
             Name: {}\n\
             Contact: {}\n\
             From: @{} (id {})\n\
             At: {}",
            order.id,
            catalog.display_name(&order.item_key),
            order.variant_label,
            order.price,
            order.game_id,
            order.customer_name,
            order.contact,
            order.username,
            order.user_id,
            order.created_at.format("%Y-%m-%d %H:%M UTC"),
        ),
    )
}

fn cancel_button() -> Button {
    Button::new("✖️ Cancel", "order:cancel")
}

fn confirm_keyboard() -> Keyboard {
    Keyboard::new(vec![vec![
        Button::new("✅ Confirm", "order:confirm"),
        Button::new("✖️ Cancel", "order:cancel"),
    ]])
}
