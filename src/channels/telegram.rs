//! Telegram channel — long-polls the Bot API for updates.
//!
//! Access control:
//! - private chats are accepted only from admin user ids
//! - group chats are accepted only from whitelisted chat ids, and only
//!   when the message is addressed to the bot (mention, reply, or command)
//!
//! Everything else is logged and dropped.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::OnceCell;

use crate::channels::{Channel, IncomingMessage, MessageStream, OutgoingResponse};
use crate::config::TelegramConfig;
use crate::error::ChannelError;

/// Maximum message length for Telegram's sendMessage API.
const TELEGRAM_MAX_MESSAGE_LENGTH: usize = 4096;

const DEFAULT_API_BASE: &str = "https://api.telegram.org";

const POLL_TIMEOUT_SECS: u64 = 30;
const POLL_RETRY_DELAY: Duration = Duration::from_secs(5);

/// The bot's own account, learned from `getMe`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotIdentity {
    pub id: i64,
    pub username: String,
}

/// Outcome of the access check for one message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Allowed,
    /// Private chat from a user who is not an admin.
    UnauthorizedUser,
    /// Group chat that is not whitelisted.
    UnlistedChat,
}

/// Telegram channel — connects to the Bot API via long-polling.
pub struct TelegramChannel {
    bot_token: String,
    api_base: String,
    allowed_chats: HashSet<i64>,
    admin_users: HashSet<i64>,
    client: reqwest::Client,
    identity: OnceCell<BotIdentity>,
}

impl TelegramChannel {
    pub fn new(config: TelegramConfig) -> Self {
        Self {
            bot_token: config.bot_token,
            api_base: DEFAULT_API_BASE.to_string(),
            allowed_chats: config.allowed_chats,
            admin_users: config.admin_users,
            client: reqwest::Client::new(),
            identity: OnceCell::new(),
        }
    }

    /// Point the channel at a different Bot API host.
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    fn api_url(&self, method: &str) -> String {
        api_url(&self.api_base, &self.bot_token, method)
    }

    /// Decide whether a message from `user_id` in `chat_id` may be processed.
    pub fn check_access(&self, chat_type: &str, chat_id: i64, user_id: i64) -> Access {
        check_access(
            &self.allowed_chats,
            &self.admin_users,
            chat_type,
            chat_id,
            user_id,
        )
    }

    /// Fetch (once) the bot's own id and username.
    async fn identity(&self) -> Result<&BotIdentity, ChannelError> {
        self.identity
            .get_or_try_init(|| async {
                let data: Value = self
                    .client
                    .get(self.api_url("getMe"))
                    .send()
                    .await
                    .map_err(|e| startup_failed(e.to_string()))?
                    .json()
                    .await
                    .map_err(|e| startup_failed(e.to_string()))?;

                let result = data
                    .get("result")
                    .ok_or_else(|| startup_failed("getMe returned no result".into()))?;
                let id = result.get("id").and_then(Value::as_i64).unwrap_or_default();
                let username = result
                    .get("username")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                tracing::info!(bot = %username, "Telegram bot identity resolved");
                Ok(BotIdentity { id, username })
            })
            .await
    }

    /// Send a text message, split to fit Telegram's limit.
    async fn send_message(
        &self,
        chat_id: &str,
        text: &str,
        markdown: bool,
        reply_to: Option<&str>,
    ) -> Result<(), ChannelError> {
        let chunks = split_message(text, TELEGRAM_MAX_MESSAGE_LENGTH);

        // Only the first chunk is threaded under the original message.
        for (i, chunk) in chunks.iter().enumerate() {
            let reply_to = if i == 0 { reply_to } else { None };
            self.send_message_chunk(chat_id, chunk, markdown, reply_to)
                .await?;
        }
        Ok(())
    }

    /// Send a single chunk, Markdown first with plain-text fallback.
    async fn send_message_chunk(
        &self,
        chat_id: &str,
        text: &str,
        markdown: bool,
        reply_to: Option<&str>,
    ) -> Result<(), ChannelError> {
        let mut body = serde_json::json!({
            "chat_id": chat_id,
            "text": text,
        });
        if let Some(id) = reply_to.and_then(|id| id.parse::<i64>().ok()) {
            body["reply_to_message_id"] = Value::from(id);
        }

        let mut markdown_status = None;
        if markdown {
            let mut markdown_body = body.clone();
            markdown_body["parse_mode"] = Value::from("Markdown");

            let resp = self.post("sendMessage", &markdown_body).await?;
            if resp.status().is_success() {
                return Ok(());
            }

            let status = resp.status();
            let _markdown_err = resp.text().await.unwrap_or_default();
            tracing::warn!(
                status = ?status,
                "Telegram sendMessage with Markdown failed; retrying without parse_mode"
            );
            markdown_status = Some(status);
        }

        let plain_resp = self.post("sendMessage", &body).await?;
        if !plain_resp.status().is_success() {
            let plain_err = plain_resp.text().await.unwrap_or_default();
            return Err(ChannelError::SendFailed {
                name: "telegram".into(),
                reason: match markdown_status {
                    Some(status) => {
                        format!("sendMessage failed (markdown: {status}, plain: {plain_err})")
                    }
                    None => format!("sendMessage failed: {plain_err}"),
                },
            });
        }

        Ok(())
    }

    async fn post(&self, method: &str, body: &Value) -> Result<reqwest::Response, ChannelError> {
        self.client
            .post(self.api_url(method))
            .json(body)
            .send()
            .await
            .map_err(|e| ChannelError::SendFailed {
                name: "telegram".into(),
                reason: e.to_string(),
            })
    }
}

// ── Channel trait implementation ────────────────────────────────────

#[async_trait]
impl Channel for TelegramChannel {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn start(&self) -> Result<MessageStream, ChannelError> {
        let identity = self.identity().await?.clone();

        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let url = self.api_url("getUpdates");
        let allowed_chats = self.allowed_chats.clone();
        let admin_users = self.admin_users.clone();
        let client = self.client.clone();

        tokio::spawn(async move {
            let mut offset: i64 = 0;

            tracing::info!("Telegram channel listening for messages...");

            loop {
                let body = serde_json::json!({
                    "offset": offset,
                    "timeout": POLL_TIMEOUT_SECS,
                    "allowed_updates": ["message"]
                });

                let resp = match client.post(&url).json(&body).send().await {
                    Ok(r) => r,
                    Err(e) => {
                        tracing::warn!("Telegram poll error: {e}");
                        tokio::time::sleep(POLL_RETRY_DELAY).await;
                        continue;
                    }
                };

                let data: Value = match resp.json().await {
                    Ok(d) => d,
                    Err(e) => {
                        tracing::warn!("Telegram parse error: {e}");
                        tokio::time::sleep(POLL_RETRY_DELAY).await;
                        continue;
                    }
                };

                let Some(results) = poll_results(&data) else {
                    tracing::warn!(
                        error_code = data.get("error_code").and_then(serde_json::Value::as_i64),
                        "Telegram getUpdates rejected: {}",
                        data.get("description")
                            .and_then(serde_json::Value::as_str)
                            .unwrap_or("no description")
                    );
                    tokio::time::sleep(POLL_RETRY_DELAY).await;
                    continue;
                };

                for update in results {
                    // Advance offset past this update
                    if let Some(uid) = update.get("update_id").and_then(Value::as_i64) {
                        offset = uid + 1;
                    }

                    let Some(message) = update.get("message") else {
                        continue;
                    };

                    let Some(incoming) =
                        accept_message(message, &identity, &allowed_chats, &admin_users)
                    else {
                        continue;
                    };

                    if tx.send(incoming).is_err() {
                        tracing::info!("Telegram listener channel closed");
                        return;
                    }
                }
            }
        });

        let stream = futures::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|msg| (msg, rx))
        });

        Ok(Box::pin(stream))
    }

    async fn respond(
        &self,
        msg: &IncomingMessage,
        response: OutgoingResponse,
    ) -> Result<(), ChannelError> {
        let chat_id = msg
            .metadata
            .get("chat_id")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ChannelError::SendFailed {
                name: "telegram".into(),
                reason: "No chat_id in message metadata".into(),
            })?;

        self.send_message(
            chat_id,
            &response.content,
            response.markdown,
            response.reply_to.as_deref(),
        )
        .await
    }

    async fn health_check(&self) -> Result<(), ChannelError> {
        let resp = self
            .client
            .get(self.api_url("getMe"))
            .send()
            .await
            .map_err(|e| startup_failed(e.to_string()))?;

        if resp.status().is_success() {
            Ok(())
        } else {
            Err(startup_failed(format!("getMe returned {}", resp.status())))
        }
    }

    async fn shutdown(&self) -> Result<(), ChannelError> {
        tracing::info!("Telegram channel shutting down");
        Ok(())
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

fn api_url(base: &str, token: &str, method: &str) -> String {
    format!("{}/bot{token}/{method}", base.trim_end_matches('/'))
}

fn startup_failed(reason: String) -> ChannelError {
    ChannelError::StartupFailed {
        name: "telegram".into(),
        reason,
    }
}

/// Updates from a `getUpdates` envelope, or `None` when the API refused
/// the call (`"ok": false`, e.g. a 409 conflict or a 429 rate limit).
fn poll_results(data: &Value) -> Option<&Vec<Value>> {
    if data.get("ok").and_then(Value::as_bool) != Some(true) {
        return None;
    }
    data.get("result").and_then(Value::as_array)
}

fn check_access(
    allowed_chats: &HashSet<i64>,
    admin_users: &HashSet<i64>,
    chat_type: &str,
    chat_id: i64,
    user_id: i64,
) -> Access {
    if chat_type == "private" {
        if admin_users.contains(&user_id) {
            Access::Allowed
        } else {
            Access::UnauthorizedUser
        }
    } else if allowed_chats.contains(&chat_id) {
        Access::Allowed
    } else {
        Access::UnlistedChat
    }
}

/// Turn one `message` object into an `IncomingMessage`, or drop it.
fn accept_message(
    message: &Value,
    bot: &BotIdentity,
    allowed_chats: &HashSet<i64>,
    admin_users: &HashSet<i64>,
) -> Option<IncomingMessage> {
    let text = message.get("text").and_then(Value::as_str)?;

    let chat = message.get("chat")?;
    let chat_id = chat.get("id").and_then(Value::as_i64)?;
    let chat_type = chat.get("type").and_then(Value::as_str).unwrap_or("private");

    let from = message.get("from");
    let user_id = from
        .and_then(|f| f.get("id"))
        .and_then(Value::as_i64)
        .unwrap_or_default();
    let username = from
        .and_then(|f| f.get("username"))
        .and_then(Value::as_str)
        .unwrap_or("unknown");

    match check_access(allowed_chats, admin_users, chat_type, chat_id, user_id) {
        Access::Allowed => {}
        Access::UnauthorizedUser => {
            tracing::warn!(user_id, username, "Unauthorized private message attempt");
            return None;
        }
        Access::UnlistedChat => {
            let title = chat.get("title").and_then(Value::as_str).unwrap_or_default();
            tracing::debug!(chat_id, chat_title = title, "Message from non-whitelisted group");
            return None;
        }
    }

    let reply_to_user = message
        .get("reply_to_message")
        .and_then(|r| r.get("from"))
        .and_then(|f| f.get("id"))
        .and_then(Value::as_i64);

    if !is_addressed_to_bot(text, chat_type, reply_to_user, bot) {
        return None;
    }

    let content = clean_message_text(text, &bot.username);
    if content.is_empty() {
        return None;
    }

    let message_id = message.get("message_id").and_then(Value::as_i64);

    let mut incoming = IncomingMessage::new("telegram", user_id.to_string(), content)
        .with_metadata(serde_json::json!({
            "chat_id": chat_id.to_string(),
            "message_id": message_id,
            "chat_type": chat_type,
            "username": username,
        }));
    let first_name = from
        .and_then(|f| f.get("first_name"))
        .and_then(Value::as_str);
    if let Some(name) = first_name.or(Some(username)) {
        incoming = incoming.with_user_name(name);
    }
    Some(incoming)
}

/// Private chats are always for the bot. In groups the bot must be
/// mentioned, replied to, or given a command.
pub fn is_addressed_to_bot(
    text: &str,
    chat_type: &str,
    reply_to_user: Option<i64>,
    bot: &BotIdentity,
) -> bool {
    if chat_type != "group" && chat_type != "supergroup" {
        return true;
    }
    if !bot.username.is_empty() && text.contains(&format!("@{}", bot.username)) {
        return true;
    }
    if reply_to_user == Some(bot.id) {
        return true;
    }
    text.trim_start().starts_with('/')
}

/// Strip bot mentions and the `/start` / `/help` commands.
pub fn clean_message_text(text: &str, bot_username: &str) -> String {
    let mut variants = vec!["/start".to_string(), "/help".to_string()];
    if !bot_username.is_empty() {
        variants.insert(0, format!("@ {bot_username}"));
        variants.insert(0, format!("@{bot_username}"));
    }

    let mut cleaned = text.to_string();
    for variant in &variants {
        cleaned = cleaned.replace(variant, "");
    }
    cleaned.trim().to_string()
}

/// Split a message into chunks that fit Telegram's character limit.
/// Tries to split on newlines, then spaces, then hard-cuts on a char boundary.
fn split_message(text: &str, max_len: usize) -> Vec<String> {
    if text.len() <= max_len {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut remaining = text;

    while !remaining.is_empty() {
        if remaining.len() <= max_len {
            chunks.push(remaining.to_string());
            break;
        }

        let mut limit = max_len;
        while !remaining.is_char_boundary(limit) {
            limit -= 1;
        }

        // Find a good split point
        let chunk = &remaining[..limit];
        let split_at = chunk
            .rfind('\n')
            .or_else(|| chunk.rfind(' '))
            .unwrap_or(limit);

        // Don't split at position 0 (infinite loop guard)
        let split_at = if split_at == 0 { limit } else { split_at };

        chunks.push(remaining[..split_at].to_string());
        remaining = remaining[split_at..].trim_start();
    }

    chunks
}

// ── Tests ───────────────────────────────────────────────────────────
