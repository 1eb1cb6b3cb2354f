//! Bounded per-conversation message history.

use dashmap::DashMap;

use consult_core::{config::HistoryConfig, types::ChatMessage};

/// Append-only message log per conversation, capped at `max_messages`.
///
/// When an update overflows the cap, whole user/assistant pairs are dropped
/// from the front, so the log is always a suffix of everything appended.
pub struct ConversationHistory {
    conversations: DashMap<String, Vec<ChatMessage>>,
    max_messages: usize,
}

impl ConversationHistory {
    pub fn new(max_messages: usize) -> Self {
        Self {
            conversations: DashMap::new(),
            max_messages,
        }
    }

    pub fn from_config(config: &HistoryConfig) -> Self {
        Self::new(config.max_messages)
    }

    /// Snapshot of a conversation's messages.
    ///
    /// Registers an empty conversation on first access.
    pub fn get(&self, conversation_id: &str) -> Vec<ChatMessage> {
        self.conversations
            .entry(conversation_id.to_string())
            .or_default()
            .clone()
    }

    /// Append a user/assistant turn and trim to the cap.
    pub fn update(
        &self,
        conversation_id: &str,
        user_message: impl Into<String>,
        assistant_message: impl Into<String>,
    ) {
        let mut messages = self
            .conversations
            .entry(conversation_id.to_string())
            .or_default();

        messages.push(ChatMessage::user(user_message));
        messages.push(ChatMessage::assistant(assistant_message));

        let overflow = messages.len().saturating_sub(self.max_messages);
        if overflow > 0 {
            // Round up to a whole pair.
            let drop = (overflow + overflow % 2).min(messages.len());
            messages.drain(..drop);
            tracing::debug!(
                conversation_id = conversation_id,
                dropped = drop,
                kept = messages.len(),
                "Trimmed conversation history"
            );
        }
    }

    /// Forget a conversation. Returns whether it existed.
    pub fn clear(&self, conversation_id: &str) -> bool {
        let existed = self.conversations.remove(conversation_id).is_some();
        if existed {
            tracing::debug!(conversation_id = conversation_id, "Cleared conversation history");
        }
        existed
    }

    pub fn has(&self, conversation_id: &str) -> bool {
        self.conversations.contains_key(conversation_id)
    }

    /// Number of known conversations.
    pub fn count(&self) -> usize {
        self.conversations.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_registers_conversation() {
        let history = ConversationHistory::new(4);
        assert!(!history.has("c1"));
        assert!(history.get("c1").is_empty());
        assert!(history.has("c1"));
        assert_eq!(history.count(), 1);
    }

    #[test]
    fn test_update_appends_in_order() {
        let history = ConversationHistory::new(10);
        history.update("c1", "q1", "a1");
        history.update("c1", "q2", "a2");

        assert_eq!(
            history.get("c1"),
            vec![
                ChatMessage::user("q1"),
                ChatMessage::assistant("a1"),
                ChatMessage::user("q2"),
                ChatMessage::assistant("a2"),
            ]
        );
    }

    #[test]
    fn test_trimming_keeps_latest_suffix() {
        let history = ConversationHistory::new(4);
        let mut appended = Vec::new();

        for i in 0..10 {
            let (q, a) = (format!("q{}", i), format!("a{}", i));
            history.update("c1", q.clone(), a.clone());
            appended.push(ChatMessage::user(q));
            appended.push(ChatMessage::assistant(a));

            let kept = history.get("c1");
            assert!(kept.len() <= 4);
            assert_eq!(kept.as_slice(), &appended[appended.len() - kept.len()..]);
        }

        let kept = history.get("c1");
        assert_eq!(kept.first(), Some(&ChatMessage::user("q8")));
        assert_eq!(kept.last(), Some(&ChatMessage::assistant("a9")));
    }

    #[test]
    fn test_odd_cap_drops_whole_pairs() {
        let history = ConversationHistory::new(3);
        history.update("c1", "q1", "a1");
        history.update("c1", "q2", "a2");

        let kept = history.get("c1");
        assert_eq!(kept, vec![ChatMessage::user("q2"), ChatMessage::assistant("a2")]);
    }

    #[test]
    fn test_clear_is_per_conversation() {
        let history = ConversationHistory::new(4);
        history.update("c1", "q", "a");
        history.update("c2", "q", "a");

        assert!(history.clear("c1"));
        assert!(!history.clear("c1"));
        assert!(!history.has("c1"));
        assert_eq!(history.get("c2").len(), 2);
    }
}
