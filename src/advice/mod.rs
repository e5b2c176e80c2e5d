//! Coaching advice from a remote completion service.
//!
//! Supports:
//! - **YandexGPT**: session-credential backend, IAM token managed by
//!   `CredentialManager` with a background refresh task
//! - **DeepSeek**: static bearer key, OpenAI-style chat completions
//!
//! The pipeline only sees `Arc<dyn AdviceProvider>`.

pub mod credentials;
pub mod deepseek;
pub mod retry;
pub mod yandex;

pub use credentials::{Credential, CredentialManager, IamTokenExchange, TokenExchange};
pub use deepseek::{DeepSeekConfig, DeepSeekProvider};
pub use retry::RetryPolicy;
pub use yandex::{YandexConfig, YandexGptProvider};

use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use crate::error::{AdviceError, ConfigError};

/// Temperature shared by both backends.
pub const ADVICE_TEMPERATURE: f32 = 0.3;

/// Completion token limit shared by both backends.
pub const ADVICE_MAX_TOKENS: u32 = 2000;

/// Anything that can turn a raw hand history into coaching text.
#[async_trait]
pub trait AdviceProvider: Send + Sync {
    /// Provider name for logs and error messages.
    fn name(&self) -> &str;

    /// Request advice for the raw hand-history text.
    async fn advise(&self, hand_history: &str) -> Result<String, AdviceError>;
}

/// Supported advice backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdviceBackend {
    Yandex,
    DeepSeek,
}

impl FromStr for AdviceBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "yandex" | "yandexgpt" => Ok(Self::Yandex),
            "deepseek" => Ok(Self::DeepSeek),
            other => Err(ConfigError::InvalidValue {
                key: "ADVICE_BACKEND".into(),
                message: format!("unknown backend '{other}' (expected yandex or deepseek)"),
            }),
        }
    }
}

/// Backend selection with its settings.
#[derive(Debug, Clone)]
pub enum AdviceConfig {
    Yandex(YandexConfig),
    DeepSeek(DeepSeekConfig),
}

impl AdviceConfig {
    pub fn backend(&self) -> AdviceBackend {
        match self {
            Self::Yandex(_) => AdviceBackend::Yandex,
            Self::DeepSeek(_) => AdviceBackend::DeepSeek,
        }
    }
}

/// Create an advice provider from configuration.
///
/// The Yandex provider starts its token refresh task, so this must run
/// inside a tokio runtime.
pub fn create_provider(config: &AdviceConfig) -> Result<Arc<dyn AdviceProvider>, AdviceError> {
    match config {
        AdviceConfig::Yandex(cfg) => {
            let provider = YandexGptProvider::from_config(cfg)?;
            tracing::info!(folder_id = %cfg.folder_id, "Using YandexGPT advice backend");
            Ok(Arc::new(provider))
        }
        AdviceConfig::DeepSeek(cfg) => {
            let provider = DeepSeekProvider::new(cfg.clone())?;
            tracing::info!(model = %cfg.model, "Using DeepSeek advice backend");
            Ok(Arc::new(provider))
        }
    }
}

/// Build an HTTP client with a fixed request timeout.
pub(crate) fn http_client(
    provider: &str,
    timeout: std::time::Duration,
) -> Result<reqwest::Client, AdviceError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| AdviceError::Transport {
            provider: provider.to_string(),
            reason: format!("failed to build HTTP client: {e}"),
        })
}

/// Send a prepared request and decode a JSON body.
///
/// Transport failures, non-2xx statuses (body kept for diagnostics), and
/// undecodable bodies map to distinct `AdviceError` variants.
pub(crate) async fn send_json<T: DeserializeOwned>(
    provider: &str,
    request: reqwest::RequestBuilder,
) -> Result<T, AdviceError> {
    let resp = request.send().await.map_err(|e| AdviceError::Transport {
        provider: provider.to_string(),
        reason: e.to_string(),
    })?;

    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        tracing::warn!(provider, status = status.as_u16(), "Advice request rejected");
        return Err(AdviceError::Status {
            provider: provider.to_string(),
            status: status.as_u16(),
            body,
        });
    }

    resp.json::<T>().await.map_err(|e| AdviceError::Decode {
        provider: provider.to_string(),
        reason: e.to_string(),
    })
}
