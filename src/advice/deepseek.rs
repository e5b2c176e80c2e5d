//! Static-key backend: OpenAI-style `/chat/completions`.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::advice::{ADVICE_MAX_TOKENS, ADVICE_TEMPERATURE, AdviceProvider, http_client, send_json};
use crate::error::AdviceError;

const PROVIDER: &str = "deepseek";

pub const DEFAULT_BASE_URL: &str = "https://api.deepseek.com/v1";
pub const DEFAULT_MODEL: &str = "deepseek-chat";

const SYSTEM_PROMPT: &str = "You're a professional poker coach specializing in GTO strategies \
for Mystery Battle Royale. Analyze the hand and provide specific advice.";

/// Settings for the static-key backend.
#[derive(Debug, Clone)]
pub struct DeepSeekConfig {
    pub api_key: SecretString,
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
}

impl DeepSeekConfig {
    pub fn new(api_key: SecretString) -> Self {
        Self {
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: String,
}

/// Advice provider authenticated with a fixed API key.
pub struct DeepSeekProvider {
    config: DeepSeekConfig,
    client: reqwest::Client,
}

impl DeepSeekProvider {
    pub fn new(config: DeepSeekConfig) -> Result<Self, AdviceError> {
        let client = http_client(PROVIDER, config.timeout)?;
        Ok(Self { config, client })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl AdviceProvider for DeepSeekProvider {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn advise(&self, hand_history: &str) -> Result<String, AdviceError> {
        let body = ChatRequest {
            model: &self.config.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: format!("Hand history:\n{hand_history}"),
                },
            ],
            temperature: ADVICE_TEMPERATURE,
            max_tokens: ADVICE_MAX_TOKENS,
        };

        let request = self
            .client
            .post(self.endpoint())
            .bearer_auth(self.config.api_key.expose_secret())
            .json(&body);

        let response: ChatResponse = send_json(PROVIDER, request).await?;
        debug!(choices = response.choices.len(), "DeepSeek completion received");

        response
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| AdviceError::EmptyResult {
                provider: PROVIDER.to_string(),
                reason: "no advice generated".to_string(),
            })
    }
}
