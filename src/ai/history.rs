//! Local chat transcript, persisted through the key/value store.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::{
    ai::{AiFeature, Role, Turn},
    error::StoreError,
    kv::KeyValueStore,
};

pub const HISTORY_KEY: &str = "ai-chat-history";
pub const HISTORY_CAPACITY: usize = 50;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryMessage {
    pub id: String,
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub feature: Option<AiFeature>,
}

/// Ring buffer of the most recent messages. The cap holds after every append,
/// not just when written out.
pub struct ChatHistory {
    messages: VecDeque<HistoryMessage>,
    capacity: usize,
    kv: Box<dyn KeyValueStore>,
}

impl std::fmt::Debug for ChatHistory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatHistory")
            .field("len", &self.messages.len())
            .field("capacity", &self.capacity)
            .finish_non_exhaustive()
    }
}

impl ChatHistory {
    pub fn load(kv: Box<dyn KeyValueStore>) -> Result<Self, StoreError> {
        Self::with_capacity(kv, HISTORY_CAPACITY)
    }

    pub fn with_capacity(kv: Box<dyn KeyValueStore>, capacity: usize) -> Result<Self, StoreError> {
        let capacity = capacity.max(1);
        let mut messages: VecDeque<HistoryMessage> = match kv.get(HISTORY_KEY)? {
            Some(blob) => serde_json::from_str(&blob).unwrap_or_else(|e| {
                warn!(error = %e, "discarding unreadable chat history");
                VecDeque::new()
            }),
            None => VecDeque::new(),
        };
        while messages.len() > capacity {
            messages.pop_front();
        }

        Ok(Self {
            messages,
            capacity,
            kv,
        })
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Oldest first.
    pub fn messages(&self) -> impl Iterator<Item = &HistoryMessage> {
        self.messages.iter()
    }

    /// The last `n` messages as model turns, oldest first.
    pub fn recent_turns(&self, n: usize) -> Vec<Turn> {
        let skip = self.messages.len().saturating_sub(n);
        self.messages
            .iter()
            .skip(skip)
            .map(|m| Turn {
                role: m.role,
                content: m.content.clone(),
            })
            .collect()
    }

    pub fn push(
        &mut self,
        role: Role,
        content: impl Into<String>,
        feature: Option<AiFeature>,
        now: DateTime<Utc>,
    ) -> Result<HistoryMessage, StoreError> {
        let message = HistoryMessage {
            id: format!("msg-{}", Uuid::new_v4().simple()),
            role,
            content: content.into(),
            timestamp: now,
            feature,
        };
        self.messages.push_back(message.clone());
        while self.messages.len() > self.capacity {
            self.messages.pop_front();
        }
        self.persist()?;
        Ok(message)
    }

    pub fn remove(&mut self, id: &str) -> Result<bool, StoreError> {
        let before = self.messages.len();
        self.messages.retain(|m| m.id != id);
        let removed = self.messages.len() != before;
        if removed {
            self.persist()?;
        }
        Ok(removed)
    }

    pub fn clear(&mut self) -> Result<(), StoreError> {
        self.messages.clear();
        self.kv.remove(HISTORY_KEY)
    }

    fn persist(&mut self) -> Result<(), StoreError> {
        let blob = serde_json::to_string(&self.messages).map_err(|source| StoreError::Serde {
            key: HISTORY_KEY.to_string(),
            source,
        })?;
        self.kv.set(HISTORY_KEY, &blob)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::FileStore;
    use chrono::{Duration, TimeZone};

    fn t(i: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, 9, 0, 0).unwrap() + Duration::seconds(i)
    }

    #[test]
    fn cap_is_enforced_on_every_append() {
        let dir = tempfile::tempdir().unwrap();
        let mut h = ChatHistory::load(Box::new(FileStore::open(dir.path()).unwrap())).unwrap();

        for i in 0..60 {
            h.push(Role::User, format!("m{i}"), None, t(i)).unwrap();
            assert!(h.len() <= HISTORY_CAPACITY);
        }
        assert_eq!(h.messages().next().unwrap().content, "m10");

        let reloaded = ChatHistory::load(Box::new(FileStore::open(dir.path()).unwrap())).unwrap();
        assert_eq!(reloaded.len(), HISTORY_CAPACITY);
        assert_eq!(reloaded.messages().last().unwrap().content, "m59");
    }

    #[test]
    fn recent_turns_keep_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut h = ChatHistory::with_capacity(Box::new(FileStore::open(dir.path()).unwrap()), 5)
            .unwrap();
        h.push(Role::User, "q1", Some(AiFeature::FormTips), t(0)).unwrap();
        h.push(Role::Assistant, "a1", None, t(1)).unwrap();
        h.push(Role::User, "q2", None, t(2)).unwrap();

        assert_eq!(h.recent_turns(2), vec![Turn::assistant("a1"), Turn::user("q2")]);
        assert_eq!(h.recent_turns(10).len(), 3);
    }

    #[test]
    fn remove_and_clear() {
        let dir = tempfile::tempdir().unwrap();
        let mut h = ChatHistory::load(Box::new(FileStore::open(dir.path()).unwrap())).unwrap();
        let id = h.push(Role::User, "x", None, t(0)).unwrap().id;
        h.push(Role::Assistant, "y", None, t(1)).unwrap();

        assert!(h.remove(&id).unwrap());
        assert!(!h.remove(&id).unwrap());
        assert_eq!(h.len(), 1);

        h.clear().unwrap();
        let reloaded = ChatHistory::load(Box::new(FileStore::open(dir.path()).unwrap())).unwrap();
        assert!(reloaded.is_empty());
    }
}
