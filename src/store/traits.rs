//! Persistence traits for users and their messages.
//!
//! The hand pipeline does not depend on these; the bot loop records
//! traffic through them when a store is configured.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::StoreError;

/// A user seen on some channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    /// Channel-native sender id.
    pub id: String,
    pub channel: String,
    pub user_name: Option<String>,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

/// A persisted inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredMessage {
    pub id: Uuid,
    pub user_id: String,
    pub channel: String,
    pub content: String,
    pub received_at: DateTime<Utc>,
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert the user, or refresh name and `last_seen` if already known.
    /// `first_seen` is kept from the first insert.
    async fn upsert(&self, user: &User) -> Result<(), StoreError>;

    async fn get(&self, id: &str) -> Result<Option<User>, StoreError>;
}

#[async_trait]
pub trait MessageStore: Send + Sync {
    async fn save(&self, message: &StoredMessage) -> Result<(), StoreError>;

    /// Most recent messages from `user_id`, newest first, at most `limit`.
    async fn last_messages(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<StoredMessage>, StoreError>;
}
