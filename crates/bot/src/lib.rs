//! Gamestore Telegram bot - conversational order taking.
//!
//! The bot walks a customer through a fixed order conversation (product,
//! amount, player id, name, contact, confirm), persists confirmed orders in
//! SQLite, and alerts the operator channel about each one. Two operator-only
//! commands report on recent orders and totals.
//!
//! # Architecture
//!
//! - `telegram` + `transport` - Bot API client behind an object-safe seam
//! - `dispatch` - routes updates to commands, buttons, and the wizard
//! - `wizard` + `session` - the per-user order state machine
//! - `db` - SQLite order store via `sqlx`
//! - `notifier` - fire-and-forget operator alerts
//! - `texts` - every user-visible string
//!
//! The binary in `main.rs` wires these together around a `getUpdates` long
//! poll; the integration tests drive the same code over the recording
//! transport instead.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod admin;
pub mod catalog;
pub mod config;
pub mod db;
pub mod dispatch;
pub mod mock;
pub mod models;
pub mod notifier;
pub mod session;
pub mod state;
pub mod telegram;
pub mod texts;
pub mod transport;
pub mod wizard;
