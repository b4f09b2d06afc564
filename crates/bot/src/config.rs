//! Bot configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `TELEGRAM_BOT_TOKEN` - Bot API token from `@BotFather`
//! - `GAMESTORE_OPERATOR_ID` - Telegram user id allowed to run admin queries
//! - `GAMESTORE_ORDERS_CHANNEL_ID` - Chat id that receives new-order alerts
//!
//! ## Optional
//! - `GAMESTORE_DATABASE_PATH` - SQLite file path (default: gamestore.db)
//! - `GAMESTORE_CATALOG_PATH` - Catalog TOML overriding the builtin one

use std::path::PathBuf;

use secrecy::SecretString;
use thiserror::Error;

const DEFAULT_DATABASE_PATH: &str = "gamestore.db";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Bot application configuration.
///
/// Implements `Debug` manually to redact the bot token.
#[derive(Clone)]
pub struct BotConfig {
    /// Telegram Bot API token
    pub bot_token: SecretString,
    /// The one user id admin queries answer to
    pub operator_id: gamestore_core::UserId,
    /// Operator channel that receives new-order alerts
    pub orders_channel_id: gamestore_core::ChatId,
    /// SQLite database file
    pub database_path: PathBuf,
    /// Catalog TOML path; `None` uses the builtin catalog
    pub catalog_path: Option<PathBuf>,
}

impl std::fmt::Debug for BotConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BotConfig")
            .field("bot_token", &"[REDACTED]")
            .field("operator_id", &self.operator_id)
            .field("orders_channel_id", &self.orders_channel_id)
            .field("database_path", &self.database_path)
            .field("catalog_path", &self.catalog_path)
            .finish()
    }
}

impl BotConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let bot_token = get_required_env("TELEGRAM_BOT_TOKEN")?;
        validate_bot_token(&bot_token, "TELEGRAM_BOT_TOKEN")?;

        let operator_id = parse_id_env("GAMESTORE_OPERATOR_ID")?;
        let orders_channel_id = parse_id_env("GAMESTORE_ORDERS_CHANNEL_ID")?;

        let database_path =
            PathBuf::from(get_env_or_default("GAMESTORE_DATABASE_PATH", DEFAULT_DATABASE_PATH));
        let catalog_path = get_optional_env("GAMESTORE_CATALOG_PATH").map(PathBuf::from);

        Ok(Self {
            bot_token: SecretString::from(bot_token),
            operator_id: gamestore_core::UserId::new(operator_id),
            orders_channel_id: gamestore_core::ChatId::new(orders_channel_id),
            database_path,
            catalog_path,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Get a required environment variable parsed as an id.
fn parse_id_env(key: &str) -> Result<i64, ConfigError> {
    get_required_env(key)?
        .parse::<i64>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Check that a token has the `<bot_id>:<secret>` shape Telegram issues.
///
/// Catches the common mistake of pasting a bot username or an empty value;
/// it does not (and cannot) verify the token against the API.
fn validate_bot_token(token: &str, var_name: &str) -> Result<(), ConfigError> {
    let looks_valid = token.split_once(':').is_some_and(|(id, secret)| {
        !id.is_empty() && id.chars().all(|c| c.is_ascii_digit()) && !secret.is_empty()
    });
    if looks_valid {
        Ok(())
    } else {
        Err(ConfigError::InvalidEnvVar(
            var_name.to_string(),
            "does not look like a bot token (expected <digits>:<secret>)".to_string(),
        ))
    }
}
