//! Session-credential backend: YandexGPT foundation-models completion.
//!
//! Every request first asks the `CredentialManager` for a valid IAM token,
//! then posts with that token and the folder id header.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::advice::credentials::{
    CredentialManager, IAM_TOKEN_URL, IamTokenExchange, REFRESH_PERIOD, spawn_refresh_task,
};
use crate::advice::{ADVICE_MAX_TOKENS, ADVICE_TEMPERATURE, AdviceProvider, http_client, send_json};
use crate::error::AdviceError;

const PROVIDER: &str = "yandexgpt";

pub const COMPLETION_URL: &str =
    "https://llm.api.cloud.yandex.net/foundationModels/v1/completion";

const SYSTEM_PROMPT: &str = "You are a professional GTO poker coach. \
Analyze the hand along these aspects:\n\
1. Preflop: opening ranges, 3-bets\n\
2. Postflop: betting lines, value/bluff balance\n\
3. Bet sizing\n\
4. Pot odds and equity\n\
5. Likely player mistakes\n\
Keep the advice structured and concise, and use poker terminology.";

/// Settings for the session-credential backend.
#[derive(Debug, Clone)]
pub struct YandexConfig {
    /// Long-lived secret exchanged for short-lived IAM tokens.
    pub oauth_token: SecretString,
    pub folder_id: String,
    pub completion_url: String,
    pub token_url: String,
    pub timeout: Duration,
    pub refresh_period: Duration,
}

impl YandexConfig {
    pub fn new(oauth_token: SecretString, folder_id: impl Into<String>) -> Self {
        Self {
            oauth_token,
            folder_id: folder_id.into(),
            completion_url: COMPLETION_URL.to_string(),
            token_url: IAM_TOKEN_URL.to_string(),
            timeout: Duration::from_secs(30),
            refresh_period: REFRESH_PERIOD,
        }
    }

    /// `gpt://<folder>/yandexgpt`
    pub fn model_uri(&self) -> String {
        format!("gpt://{}/yandexgpt", self.folder_id)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CompletionRequest<'a> {
    model_uri: String,
    completion_options: CompletionOptions,
    messages: [Message<'a>; 2],
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CompletionOptions {
    stream: bool,
    temperature: f32,
    /// The API takes this as a string.
    max_tokens: String,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    text: &'a str,
}

#[derive(Deserialize)]
struct CompletionResponse {
    result: CompletionResult,
}

#[derive(Deserialize)]
struct CompletionResult {
    #[serde(default)]
    alternatives: Vec<Alternative>,
}

#[derive(Deserialize)]
struct Alternative {
    message: AlternativeMessage,
}

#[derive(Deserialize)]
struct AlternativeMessage {
    text: String,
}

/// Advice provider backed by a refreshable IAM token.
pub struct YandexGptProvider {
    folder_id: String,
    model_uri: String,
    completion_url: String,
    client: reqwest::Client,
    credentials: Arc<CredentialManager>,
    refresh_task: Option<JoinHandle<()>>,
}

impl YandexGptProvider {
    /// Build the provider and start its background token refresh.
    pub fn from_config(config: &YandexConfig) -> Result<Self, AdviceError> {
        let exchange = IamTokenExchange::with_url(config.oauth_token.clone(), &config.token_url)?;
        let credentials = Arc::new(CredentialManager::new(Arc::new(exchange)));
        let refresh_task = spawn_refresh_task(Arc::clone(&credentials), config.refresh_period);

        let mut provider = Self::with_credentials(config, credentials)?;
        provider.refresh_task = Some(refresh_task);
        Ok(provider)
    }

    /// Build the provider around an existing credential manager.
    /// No refresh task is started; tokens are refreshed on demand only.
    pub fn with_credentials(
        config: &YandexConfig,
        credentials: Arc<CredentialManager>,
    ) -> Result<Self, AdviceError> {
        Ok(Self {
            folder_id: config.folder_id.clone(),
            model_uri: config.model_uri(),
            completion_url: config.completion_url.clone(),
            client: http_client(PROVIDER, config.timeout)?,
            credentials,
            refresh_task: None,
        })
    }
}

impl Drop for YandexGptProvider {
    fn drop(&mut self) {
        if let Some(task) = self.refresh_task.take() {
            task.abort();
        }
    }
}

#[async_trait]
impl AdviceProvider for YandexGptProvider {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn advise(&self, hand_history: &str) -> Result<String, AdviceError> {
        self.credentials.ensure_valid().await?;
        let token = self.credentials.current_token().await.token;

        let body = CompletionRequest {
            model_uri: self.model_uri.clone(),
            completion_options: CompletionOptions {
                stream: false,
                temperature: ADVICE_TEMPERATURE,
                max_tokens: ADVICE_MAX_TOKENS.to_string(),
            },
            messages: [
                Message {
                    role: "system",
                    text: SYSTEM_PROMPT,
                },
                Message {
                    role: "user",
                    text: hand_history,
                },
            ],
        };

        let request = self
            .client
            .post(&self.completion_url)
            .bearer_auth(token)
            .header("x-folder-id", &self.folder_id)
            .json(&body);

        let response: CompletionResponse = send_json(PROVIDER, request).await?;
        debug!(
            alternatives = response.result.alternatives.len(),
            "YandexGPT completion received"
        );

        response
            .result
            .alternatives
            .into_iter()
            .next()
            .map(|alt| alt.message.text)
            .ok_or_else(|| AdviceError::EmptyResult {
                provider: PROVIDER.to_string(),
                reason: "no alternatives in response".to_string(),
            })
    }
}
