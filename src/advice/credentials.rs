//! Short-lived access token lifecycle for the session-credential backend.
//!
//! A long-lived secret is exchanged for a token + expiry pair. The pair sits
//! behind a `RwLock`: snapshots and validity checks share the lock, and a
//! refresh only takes the write side to swap the new pair in. The network
//! exchange itself never runs under the lock.
//!
//! Two refresh paths exist:
//! - `spawn_refresh_task()` — fixed-period background refresh
//! - `CredentialManager::ensure_valid()` — on demand, when the token is
//!   within the safety margin of its expiry

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, warn};

use crate::advice::retry::RetryPolicy;
use crate::error::CredentialError;

/// Default token exchange endpoint.
pub const IAM_TOKEN_URL: &str = "https://iam.api.cloud.yandex.net/iam/v1/tokens";

/// Tokens expiring sooner than this are refreshed before use.
pub const SAFETY_MARGIN: Duration = Duration::from_secs(5 * 60);

/// Default background refresh period.
pub const REFRESH_PERIOD: Duration = Duration::from_secs(55 * 60);

const EXCHANGE_TIMEOUT: Duration = Duration::from_secs(10);

/// Access token and its absolute expiry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl Credential {
    /// Placeholder held until the first successful refresh.
    pub fn empty() -> Self {
        Self {
            token: String::new(),
            expires_at: DateTime::<Utc>::MIN_UTC,
        }
    }

    /// Whether the token outlives `now` by more than `margin`.
    pub fn is_fresh(&self, now: DateTime<Utc>, margin: Duration) -> bool {
        !self.token.is_empty()
            && (self.expires_at - now)
                .to_std()
                .is_ok_and(|remaining| remaining > margin)
    }
}

/// One network round trip trading the long-lived secret for a credential.
#[async_trait]
pub trait TokenExchange: Send + Sync {
    async fn exchange(&self) -> Result<Credential, CredentialError>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ExchangeRequest<'a> {
    yandex_passport_oauth_token: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExchangeResponse {
    iam_token: String,
    expires_at: DateTime<Utc>,
}

/// HTTP token exchange against the IAM endpoint.
pub struct IamTokenExchange {
    client: reqwest::Client,
    url: String,
    oauth_token: SecretString,
}

impl IamTokenExchange {
    pub fn new(oauth_token: SecretString) -> Result<Self, CredentialError> {
        Self::with_url(oauth_token, IAM_TOKEN_URL)
    }

    pub fn with_url(
        oauth_token: SecretString,
        url: impl Into<String>,
    ) -> Result<Self, CredentialError> {
        let client = reqwest::Client::builder()
            .timeout(EXCHANGE_TIMEOUT)
            .build()
            .map_err(|e| CredentialError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            url: url.into(),
            oauth_token,
        })
    }
}

#[async_trait]
impl TokenExchange for IamTokenExchange {
    async fn exchange(&self) -> Result<Credential, CredentialError> {
        let body = ExchangeRequest {
            yandex_passport_oauth_token: self.oauth_token.expose_secret(),
        };

        let resp = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| CredentialError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(CredentialError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ExchangeResponse = resp
            .json()
            .await
            .map_err(|e| CredentialError::Decode(e.to_string()))?;

        Ok(Credential {
            token: parsed.iam_token,
            expires_at: parsed.expires_at,
        })
    }
}

/// Owner of the shared access token.
pub struct CredentialManager {
    exchange: Arc<dyn TokenExchange>,
    credential: RwLock<Credential>,
    /// Serializes refreshes so concurrent callers trigger one exchange.
    refresh_gate: Mutex<()>,
    retry: RetryPolicy,
    safety_margin: Duration,
}

impl CredentialManager {
    /// Create a manager holding an empty credential.
    pub fn new(exchange: Arc<dyn TokenExchange>) -> Self {
        Self {
            exchange,
            credential: RwLock::new(Credential::empty()),
            refresh_gate: Mutex::new(()),
            retry: RetryPolicy::default(),
            safety_margin: SAFETY_MARGIN,
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Consistent snapshot of token and expiry.
    pub async fn current_token(&self) -> Credential {
        self.credential.read().await.clone()
    }

    /// Whether the current token is usable without a refresh.
    pub async fn is_valid(&self) -> bool {
        self.credential
            .read()
            .await
            .is_fresh(Utc::now(), self.safety_margin)
    }

    /// Refresh synchronously if the token is missing or about to expire.
    pub async fn ensure_valid(&self) -> Result<(), CredentialError> {
        if self.is_valid().await {
            return Ok(());
        }

        let _gate = self.refresh_gate.lock().await;
        // Another caller may have refreshed while we waited.
        if self.is_valid().await {
            return Ok(());
        }

        debug!("Access token missing or near expiry, refreshing");
        self.refresh_with_retry().await
    }

    /// Unconditional refresh, used by the background task.
    pub async fn refresh(&self) -> Result<(), CredentialError> {
        let _gate = self.refresh_gate.lock().await;
        self.refresh_with_retry().await
    }

    async fn refresh_with_retry(&self) -> Result<(), CredentialError> {
        let mut last_err = None;

        for attempt in 0..self.retry.max_attempts {
            match self.exchange.exchange().await {
                Ok(credential) => {
                    let expires_at = credential.expires_at;
                    *self.credential.write().await = credential;
                    info!(attempt = attempt + 1, %expires_at, "Access token refreshed");
                    return Ok(());
                }
                Err(e) => {
                    warn!(attempt = attempt + 1, error = %e, "Token exchange failed");
                    last_err = Some(e);
                    if self.retry.has_next(attempt) {
                        tokio::time::sleep(self.retry.delay_for(attempt)).await;
                    }
                }
            }
        }

        Err(CredentialError::RetriesExhausted {
            attempts: self.retry.max_attempts,
            last: Box::new(last_err.unwrap_or_else(|| {
                CredentialError::Transport("no exchange attempts configured".into())
            })),
        })
    }
}

/// Spawn the periodic refresh task. The first refresh runs immediately.
///
/// Failures are logged and the task keeps its schedule.
pub fn spawn_refresh_task(
    manager: Arc<CredentialManager>,
    period: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        loop {
            ticker.tick().await;
            if let Err(e) = manager.refresh().await {
                error!(error = %e, "Background token refresh failed");
            }
        }
    })
}
