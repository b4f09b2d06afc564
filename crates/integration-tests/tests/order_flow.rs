//! Full order conversations, driven through `handle_update` exactly as
//! the long-poll loop drives them in production.

#![allow(clippy::unwrap_used)]

use gamestore_bot::db::OrderRepository;
use gamestore_core::{ChatId, OrderStatus, Price};
use gamestore_integration_tests::{ORDERS_CHANNEL, TestContext};

const ANA: i64 = 7;

/// Drive a conversation from `/order` up to the confirmation summary.
async fn advance_to_confirm(ctx: &mut TestContext, user: i64) {
    ctx.send_text(user, "/order").await;
    ctx.press(user, "order:item:diamantes").await;
    ctx.press(user, "order:variant:310").await;
    ctx.send_text(user, "123456789").await;
    ctx.send_text(user, "Ana").await;
    ctx.send_text(user, "+551199998888").await;
}

#[tokio::test]
async fn test_happy_path_persists_notifies_and_confirms() {
    let mut ctx = TestContext::new().await;

    advance_to_confirm(&mut ctx, ANA).await;
    let mut batch = ctx.press(ANA, "order:confirm").await;

    // Exactly one row, holding the commit-time price for diamantes/310.
    let orders = OrderRepository::new(ctx.pool()).recent(10).await.unwrap();
    assert_eq!(orders.len(), 1);
    let order = orders.first().unwrap();
    assert_eq!(order.item_key, "diamantes");
    assert_eq!(order.variant_label, "310");
    assert_eq!(order.price, Price::new(150));
    assert_eq!(order.game_id, "123456789");
    assert_eq!(order.customer_name, "Ana");
    assert_eq!(order.contact, "+551199998888");
    assert_eq!(order.username, "user7");
    assert_eq!(order.status, OrderStatus::Pending);

    // One operator alert, carrying the assigned id and the price.
    let alert = ctx.operator_alert(&mut batch).await;
    assert_eq!(alert.chat, ChatId::new(ORDERS_CHANNEL));
    assert!(alert.text.contains(&format!("#{}", order.id)));
    assert!(alert.text.contains("$150 MXN"));
    assert!(ctx.outbox.try_recv().is_err());

    // The customer's confirmation also names the assigned id.
    let confirmation = batch
        .iter()
        .find(|m| m.text.contains("confirmed"))
        .expect("customer confirmation");
    assert_eq!(confirmation.chat, ChatId::new(ANA));
    assert!(confirmation.text.contains(&format!("#{}", order.id)));
}

#[tokio::test]
async fn test_each_step_prompts_the_next() {
    let mut ctx = TestContext::new().await;

    let replies = ctx.send_text(ANA, "/order").await;
    assert!(replies.first().unwrap().text.contains("Pick a product"));

    let replies = ctx.press(ANA, "order:item:diamantes").await;
    assert!(replies.first().unwrap().text.contains("pick an amount"));

    let replies = ctx.press(ANA, "order:variant:310").await;
    assert!(replies.first().unwrap().text.contains("player ID"));

    let replies = ctx.send_text(ANA, "123456789").await;
    assert!(replies.first().unwrap().text.contains("name"));

    let replies = ctx.send_text(ANA, "Ana").await;
    assert!(replies.first().unwrap().text.contains("reach you"));

    let replies = ctx.send_text(ANA, "+551199998888").await;
    assert!(replies.first().unwrap().text.contains("review your order"));
    assert!(replies.first().unwrap().text.contains("$150 MXN"));
}

#[tokio::test]
async fn test_rejected_inputs_reprompt_without_storing() {
    let mut ctx = TestContext::new().await;
    ctx.send_text(ANA, "/order").await;
    ctx.press(ANA, "order:item:diamantes").await;
    ctx.press(ANA, "order:variant:310").await;

    // Seven digits, then a non-digit: both corrected, neither advances.
    let replies = ctx.send_text(ANA, "1234567").await;
    assert!(replies.first().unwrap().text.contains("player ID"));
    let replies = ctx.send_text(ANA, "12a45678").await;
    assert!(replies.first().unwrap().text.contains("player ID"));

    // The step finally accepts a valid id and moves on to the name.
    let replies = ctx.send_text(ANA, "12345678").await;
    assert!(replies.first().unwrap().text.contains("name"));

    let replies = ctx.send_text(ANA, "a").await;
    assert!(replies.first().unwrap().text.contains("too short"));
    let replies = ctx.send_text(ANA, "Jo").await;
    assert!(replies.first().unwrap().text.contains("reach you"));

    let replies = ctx.send_text(ANA, "1234").await;
    assert!(replies.first().unwrap().text.contains("too short"));
    let replies = ctx.send_text(ANA, "+1234").await;
    assert!(replies.first().unwrap().text.contains("review your order"));

    // Nothing was persisted while the conversation was still open.
    let orders = OrderRepository::new(ctx.pool()).recent(10).await.unwrap();
    assert!(orders.is_empty());
}

#[tokio::test]
async fn test_stale_button_reprompts_current_step() {
    let mut ctx = TestContext::new().await;
    ctx.send_text(ANA, "/order").await;
    ctx.press(ANA, "order:item:diamantes").await;
    ctx.press(ANA, "order:variant:310").await;

    // An old variant button replayed while a game id is expected.
    let replies = ctx.press(ANA, "order:variant:520").await;
    assert!(replies.first().unwrap().text.contains("isn't available"));
    assert!(replies.get(1).unwrap().text.contains("player ID"));

    // The replay consumed nothing: the expected input still advances.
    let replies = ctx.send_text(ANA, "123456789").await;
    assert!(replies.first().unwrap().text.contains("name"));
}

#[tokio::test]
async fn test_cancel_clears_session_completely() {
    let mut ctx = TestContext::new().await;
    ctx.send_text(ANA, "/order").await;
    ctx.press(ANA, "order:item:diamantes").await;
    ctx.press(ANA, "order:variant:310").await;
    ctx.send_text(ANA, "123456789").await;

    let replies = ctx.send_text(ANA, "/cancel").await;
    assert!(replies.first().unwrap().text.contains("cancelled"));

    // A fresh begin starts at item selection with no residue: the old
    // game id means nothing now.
    let replies = ctx.send_text(ANA, "/order").await;
    assert!(replies.first().unwrap().text.contains("Pick a product"));
    let replies = ctx.send_text(ANA, "123456789").await;
    assert!(replies.first().unwrap().text.contains("isn't available"));

    let orders = OrderRepository::new(ctx.pool()).recent(10).await.unwrap();
    assert!(orders.is_empty());
}

#[tokio::test]
async fn test_anything_but_confirm_at_summary_cancels() {
    let mut ctx = TestContext::new().await;
    advance_to_confirm(&mut ctx, ANA).await;

    let replies = ctx.send_text(ANA, "actually no").await;
    assert!(replies.first().unwrap().text.contains("cancelled"));

    let orders = OrderRepository::new(ctx.pool()).recent(10).await.unwrap();
    assert!(orders.is_empty());

    // The conversation is over; further input finds no active order.
    let replies = ctx.send_text(ANA, "hello?").await;
    assert!(replies.first().unwrap().text.contains("/order"));
}

#[tokio::test]
async fn test_storage_failure_reports_and_offers_retry() {
    let mut ctx = TestContext::new().await;
    advance_to_confirm(&mut ctx, ANA).await;

    // A closed pool makes the commit-time insert fail.
    ctx.pool().close().await;
    let replies = ctx.press(ANA, "order:confirm").await;

    let apology = replies.first().unwrap();
    assert!(apology.text.contains("went wrong"));
    let actions: Vec<&str> = apology
        .keyboard
        .as_ref()
        .unwrap()
        .rows
        .iter()
        .flatten()
        .map(|b| b.action.as_str())
        .collect();
    assert!(actions.contains(&"order:confirm"));

    // The failed commit notified nobody.
    assert!(ctx.outbox.try_recv().is_err());
}

#[tokio::test]
async fn test_commit_survives_transport_failure() {
    let mut ctx = TestContext::new().await;
    advance_to_confirm(&mut ctx, ANA).await;

    // Every outbound send fails: the confirmation and the operator alert
    // are both lost, but the order stands.
    ctx.transport.fail_sends(true);
    ctx.press(ANA, "order:confirm").await;

    let orders = OrderRepository::new(ctx.pool()).recent(10).await.unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders.first().unwrap().price, Price::new(150));
}
