//! Bot loop — reads every channel and answers hand histories.
//!
//! Messages are handled one at a time in arrival order. Each message runs
//! inside its own `hand` span so every log line can be tied back to it.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use futures::StreamExt;
use tracing::Instrument;

use crate::channels::{ChannelManager, IncomingMessage, OutgoingResponse};
use crate::error::Error;
use crate::pipeline::HandPipeline;
use crate::store::{MessageStore, StoredMessage, User, UserStore};

pub struct Bot {
    channels: ChannelManager,
    pipeline: HandPipeline,
    users: Option<Arc<dyn UserStore>>,
    messages: Option<Arc<dyn MessageStore>>,
}

impl Bot {
    pub fn new(channels: ChannelManager, pipeline: HandPipeline) -> Self {
        Self {
            channels,
            pipeline,
            users: None,
            messages: None,
        }
    }

    /// Record users and messages as they arrive.
    pub fn with_stores(
        mut self,
        users: Arc<dyn UserStore>,
        messages: Arc<dyn MessageStore>,
    ) -> Self {
        self.users = Some(users);
        self.messages = Some(messages);
        self
    }

    /// Run until Ctrl+C or until every channel stream ends.
    pub async fn run(self) -> Result<(), Error> {
        let mut message_stream = self.channels.start_all().await?;

        tracing::info!(channels = ?self.channels.names(), "Bot ready and listening");

        loop {
            let message = tokio::select! {
                biased;
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Ctrl+C received, shutting down...");
                    break;
                }
                msg = message_stream.next() => {
                    match msg {
                        Some(m) => m,
                        None => {
                            tracing::info!("All channel streams ended, shutting down...");
                            break;
                        }
                    }
                }
            };

            let span = tracing::info_span!(
                "hand",
                message_id = %message.id,
                channel = %message.channel,
            );
            async {
                if let Some(response) = self.handle_message(&message).await {
                    if let Err(e) = self.channels.respond(&message, response).await {
                        tracing::error!(error = %e, "Failed to send reply");
                    }
                }
            }
            .instrument(span)
            .await;
        }

        tracing::info!("Bot shutting down...");
        self.channels.shutdown_all().await?;

        Ok(())
    }

    /// Record the message, run the pipeline, and build the reply if any.
    pub async fn handle_message(&self, message: &IncomingMessage) -> Option<OutgoingResponse> {
        tracing::debug!(
            "Received message from {} on {} ({} chars)",
            message.user_id,
            message.channel,
            message.content.len()
        );

        let started = Instant::now();
        self.record(message).await;

        let reply = self.pipeline.process(&message.content).await?;
        tracing::info!(
            outcome = reply.outcome.label(),
            advice_requested = reply.outcome.requested_advice(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Hand processed"
        );

        let mut response = OutgoingResponse::text(reply.text).with_markdown(reply.markdown);
        if let Some(id) = message.metadata.get("message_id").and_then(|v| v.as_i64()) {
            response = response.in_reply_to(id.to_string());
        }
        Some(response)
    }

    /// Store failures never block the reply.
    async fn record(&self, message: &IncomingMessage) {
        if let Some(users) = &self.users {
            let now = Utc::now();
            let user = User {
                id: message.user_id.clone(),
                channel: message.channel.clone(),
                user_name: message.user_name.clone(),
                first_seen: now,
                last_seen: now,
            };
            if let Err(e) = users.upsert(&user).await {
                tracing::warn!(error = %e, "Failed to upsert user");
            }
        }

        if let Some(messages) = &self.messages {
            let stored = StoredMessage {
                id: message.id,
                user_id: message.user_id.clone(),
                channel: message.channel.clone(),
                content: message.content.clone(),
                received_at: message.received_at,
            };
            if let Err(e) = messages.save(&stored).await {
                tracing::warn!(error = %e, "Failed to save message");
            }
        }
    }
}
