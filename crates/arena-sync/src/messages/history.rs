//! Conversation history.
//!
//! Stores messages per friend with a bounded ring buffer so memory usage
//! stays predictable.

use std::collections::{HashMap, VecDeque};

use crate::protocol::DirectMessage;

pub const DEFAULT_HISTORY_LIMIT: usize = 50;

/// In-memory direct-message history, keyed by friend id.
#[derive(Debug)]
pub struct ConversationHistory {
    limit: usize,
    conversations: HashMap<String, VecDeque<DirectMessage>>,
}

impl ConversationHistory {
    pub fn new(limit: usize) -> Self {
        Self {
            limit: limit.max(1),
            conversations: HashMap::new(),
        }
    }

    /// Replace a conversation with a polled snapshot, keeping the newest
    /// `limit` messages in chronological order. Returns true if the stored
    /// messages changed.
    pub fn replace(&mut self, friend_id: &str, mut snapshot: Vec<DirectMessage>) -> bool {
        snapshot.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        let skip = snapshot.len().saturating_sub(self.limit);
        let next: VecDeque<DirectMessage> = snapshot.into_iter().skip(skip).collect();

        let buf = self.conversations.entry(friend_id.to_string()).or_default();
        if *buf == next {
            return false;
        }
        *buf = next;
        true
    }

    /// Append one message. Duplicates (same id) are ignored; the oldest
    /// message is evicted when the buffer is full.
    pub fn push(&mut self, friend_id: &str, msg: DirectMessage) {
        let buf = self.conversations.entry(friend_id.to_string()).or_default();
        if buf.iter().any(|m| m.id == msg.id) {
            return;
        }
        if buf.len() >= self.limit {
            buf.pop_front();
        }
        buf.push_back(msg);
    }

    pub fn all(&self, friend_id: &str) -> Vec<&DirectMessage> {
        match self.conversations.get(friend_id) {
            Some(buf) => buf.iter().collect(),
            None => Vec::new(),
        }
    }

    pub fn clear_conversation(&mut self, friend_id: &str) {
        self.conversations.remove(friend_id);
    }
}

impl Default for ConversationHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}
