//! Set of chats subscribed to price alerts.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use tokio::sync::Mutex;

/// Opaque recipient identifier (a Telegram chat id).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChatId(pub i64);

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for ChatId {
    fn from(id: i64) -> Self {
        ChatId(id)
    }
}

/// Membership-only subscriber set. Every operation takes the same lock, so a
/// snapshot never sees a half-applied mutation.
#[derive(Debug, Default)]
pub struct SubscriberRegistry {
    members: Mutex<HashSet<ChatId>>,
}

impl SubscriberRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if `id` was not subscribed before.
    pub async fn add(&self, id: ChatId) -> bool {
        self.members.lock().await.insert(id)
    }

    /// Returns `true` if `id` was subscribed. Removing a non-member changes nothing.
    pub async fn remove(&self, id: ChatId) -> bool {
        self.members.lock().await.remove(&id)
    }

    pub async fn contains(&self, id: ChatId) -> bool {
        self.members.lock().await.contains(&id)
    }

    /// Copy of the current members, safe to iterate while others mutate the set.
    pub async fn snapshot(&self) -> HashSet<ChatId> {
        self.members.lock().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.members.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.members.lock().await.is_empty()
    }
}
