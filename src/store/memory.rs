//! In-process store behind a `tokio::sync::RwLock`.

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::traits::{MessageStore, StoredMessage, User, UserStore};
use crate::error::StoreError;

/// Messages kept per user before the oldest are evicted.
pub const DEFAULT_HISTORY_LIMIT: usize = 100;

/// Users and recent messages held in memory for the life of the process.
///
/// Message history is capped per user; saving past the cap drops that
/// user's oldest message.
pub struct MemoryStore {
    users: RwLock<HashMap<String, User>>,
    messages: RwLock<HashMap<String, VecDeque<StoredMessage>>>,
    history_limit: usize,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self {
            users: RwLock::default(),
            messages: RwLock::default(),
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep at most `limit` messages per user (minimum 1).
    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit.max(1);
        self
    }

    /// Messages currently retained across all users.
    pub async fn message_count(&self) -> usize {
        self.messages.read().await.values().map(VecDeque::len).sum()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn upsert(&self, user: &User) -> Result<(), StoreError> {
        let mut users = self.users.write().await;
        users
            .entry(user.id.clone())
            .and_modify(|existing| {
                existing.user_name = user.user_name.clone();
                existing.last_seen = user.last_seen;
            })
            .or_insert_with(|| user.clone());
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<User>, StoreError> {
        Ok(self.users.read().await.get(id).cloned())
    }
}

#[async_trait]
impl MessageStore for MemoryStore {
    async fn save(&self, message: &StoredMessage) -> Result<(), StoreError> {
        let mut messages = self.messages.write().await;
        let history = messages.entry(message.user_id.clone()).or_default();
        if history.len() >= self.history_limit {
            history.pop_front();
        }
        history.push_back(message.clone());
        Ok(())
    }

    async fn last_messages(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<StoredMessage>, StoreError> {
        let messages = self.messages.read().await;
        Ok(messages
            .get(user_id)
            .map(|history| history.iter().rev().take(limit).cloned().collect())
            .unwrap_or_default())
    }
}
