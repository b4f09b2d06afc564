//! Gamestore Core - Shared types library.
//!
//! This crate provides common types used across the Gamestore components:
//! - `bot` - The Telegram order-taking bot
//! - `integration-tests` - End-to-end conversation tests
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no database access,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, prices, and statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
