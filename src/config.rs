//! Configuration types.
//!
//! Everything is read from the environment, after loading a `.env` file
//! when one is present.

use std::collections::HashSet;
use std::time::Duration;

use secrecy::SecretString;

use crate::advice::{AdviceBackend, AdviceConfig, DeepSeekConfig, YandexConfig};
use crate::error::ConfigError;

const DEFAULT_ADVICE_TIMEOUT_SECS: u64 = 30;
const DEFAULT_TOKEN_REFRESH_MINUTES: u64 = 55;

/// Top-level bot configuration.
#[derive(Debug, Clone)]
pub struct BotConfig {
    /// `None` runs the bot on the CLI channel only.
    pub telegram: Option<TelegramConfig>,
    pub advice: AdviceConfig,
}

/// Telegram transport settings.
#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub bot_token: String,
    /// Group chats the bot answers in.
    pub allowed_chats: HashSet<i64>,
    /// Users allowed to talk to the bot in private chats.
    pub admin_users: HashSet<i64>,
}

impl BotConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        if let Err(e) = dotenv::dotenv() {
            tracing::debug!("No .env file loaded: {e}");
        }
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary variable lookup.
    pub fn from_vars<F>(var: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let telegram = non_empty(&var, "TELEGRAM_BOT_TOKEN").map(|bot_token| TelegramConfig {
            bot_token,
            allowed_chats: parse_ids(
                &var("TELEGRAM_ALLOWED_CHATS").unwrap_or_default(),
                "allowed chat",
            ),
            admin_users: parse_ids(
                &var("TELEGRAM_ADMIN_USERS").unwrap_or_default(),
                "admin user",
            ),
        });

        let backend: AdviceBackend = non_empty(&var, "ADVICE_BACKEND")
            .as_deref()
            .unwrap_or("yandex")
            .parse()?;
        let timeout = Duration::from_secs(parse_u64(
            &var,
            "ADVICE_TIMEOUT_SECS",
            DEFAULT_ADVICE_TIMEOUT_SECS,
        )?);

        let advice = match backend {
            AdviceBackend::Yandex => {
                let oauth_token = required(&var, "YANDEX_OAUTH_TOKEN")?;
                let folder_id = required(&var, "YANDEX_FOLDER_ID")?;
                let refresh_minutes =
                    parse_u64(&var, "TOKEN_REFRESH_MINUTES", DEFAULT_TOKEN_REFRESH_MINUTES)?;
                if refresh_minutes == 0 {
                    return Err(ConfigError::InvalidValue {
                        key: "TOKEN_REFRESH_MINUTES".into(),
                        message: "must be greater than zero".into(),
                    });
                }

                let mut cfg = YandexConfig::new(SecretString::from(oauth_token), folder_id);
                cfg.timeout = timeout;
                cfg.refresh_period = Duration::from_secs(refresh_minutes * 60);
                AdviceConfig::Yandex(cfg)
            }
            AdviceBackend::DeepSeek => {
                let api_key = required(&var, "DEEPSEEK_API_KEY")?;
                let mut cfg = DeepSeekConfig::new(SecretString::from(api_key));
                if let Some(url) = non_empty(&var, "DEEPSEEK_API_URL") {
                    cfg.base_url = url;
                }
                cfg.timeout = timeout;
                AdviceConfig::DeepSeek(cfg)
            }
        };

        Ok(Self { telegram, advice })
    }
}

fn non_empty<F>(var: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    var(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn required<F>(var: &F, key: &str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    non_empty(var, key).ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
}

fn parse_u64<F>(var: &F, key: &str, default: u64) -> Result<u64, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match non_empty(var, key) {
        None => Ok(default),
        Some(raw) => raw.parse().map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("'{raw}': {e}"),
        }),
    }
}

/// Parse a comma-separated id list. Invalid entries are logged and skipped.
pub fn parse_ids(input: &str, kind: &str) -> HashSet<i64> {
    input
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| match s.parse::<i64>() {
            Ok(id) => Some(id),
            Err(_) => {
                tracing::error!(kind, value = s, "Invalid ID");
                None
            }
        })
        .collect()
}
