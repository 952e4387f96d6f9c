use super::client::Message;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Rolling conversation history for one agent session.
///
/// The system message is pinned and never trimmed; the rest is bounded by
/// message count and a rough token estimate, oldest first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationContext {
    messages: VecDeque<Message>,
    max_messages: usize,
    max_tokens: usize,
    system_message: Option<Message>,
}

impl ConversationContext {
    pub fn new(max_messages: usize, max_tokens: usize) -> Self {
        Self {
            messages: VecDeque::new(),
            max_messages,
            max_tokens,
            system_message: None,
        }
    }

    /// 40 messages, ~12000 tokens: room for a whole shopping conversation
    pub fn with_defaults() -> Self {
        Self::new(40, 12000)
    }

    pub fn set_system_message(&mut self, content: impl Into<String>) {
        self.system_message = Some(Message::system(content));
    }

    pub fn system_message(&self) -> Option<&Message> {
        self.system_message.as_ref()
    }

    pub fn add_user_message(&mut self, content: impl Into<String>) {
        self.add_message(Message::user(content));
    }

    pub fn add_assistant_message(&mut self, content: impl Into<String>) {
        self.add_message(Message::assistant(content));
    }

    pub fn add_message(&mut self, message: Message) {
        self.messages.push_back(message);
        self.trim_context();
    }

    /// All messages for an API call, system message first
    pub fn get_messages(&self) -> Vec<Message> {
        self.system_message
            .iter()
            .chain(self.messages.iter())
            .cloned()
            .collect()
    }

    /// Clear all messages except the system message
    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    fn estimate_tokens(&self) -> usize {
        self.system_message
            .iter()
            .chain(self.messages.iter())
            .map(Self::estimate_message_tokens)
            .sum()
    }

    // ~4 characters per token, plus a little for the role and framing
    fn estimate_message_tokens(message: &Message) -> usize {
        (message.content.len() / 4) + (message.role.len() / 4) + 10
    }

    fn trim_context(&mut self) {
        while self.messages.len() > self.max_messages {
            self.messages.pop_front();
        }

        // keep at least the newest message even if it alone is over budget
        while self.estimate_tokens() > self.max_tokens && self.messages.len() > 1 {
            self.messages.pop_front();
        }
    }

    pub fn summary(&self) -> String {
        format!(
            "Context: {} messages, ~{} tokens (limits: {} messages, {} tokens)",
            self.len(),
            self.estimate_tokens(),
            self.max_messages,
            self.max_tokens
        )
    }

    /// Export conversation to JSON, e.g. to keep a transcript of a session
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json_str: &str) -> serde_json::Result<Self> {
        let mut context: Self = serde_json::from_str(json_str)?;
        context.trim_context();
        Ok(context)
    }
}

impl Default for ConversationContext {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_addition() {
        let mut context = ConversationContext::new(5, 1000);

        context.set_system_message("You are Ramu Kaka");
        context.add_user_message("Show me mugs");
        context.add_assistant_message("We have two mugs.");

        assert_eq!(context.len(), 2);

        let messages = context.get_messages();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].role, "system");
        assert_eq!(messages[1].role, "user");
        assert_eq!(messages[2].role, "assistant");
    }

    #[test]
    fn test_message_trimming() {
        let mut context = ConversationContext::new(3, 10000);

        for i in 0..5 {
            context.add_user_message(format!("Message {}", i));
        }

        assert_eq!(context.len(), 3);
        assert_eq!(context.get_messages()[0].content, "Message 2");
    }

    #[test]
    fn test_token_budget_keeps_newest() {
        let mut context = ConversationContext::new(10, 40);
        context.add_user_message("a".repeat(200));
        context.add_user_message("b".repeat(200));

        assert_eq!(context.len(), 1);
        assert!(context.get_messages()[0].content.starts_with('b'));
    }

    #[test]
    fn test_clear_keeps_system_message() {
        let mut context = ConversationContext::new(10, 10000);
        context.set_system_message("System");
        context.add_user_message("Hello");

        context.clear();
        assert!(context.is_empty());
        let messages = context.get_messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, "system");
    }

    #[test]
    fn test_json_roundtrip_keeps_limits() {
        let mut context = ConversationContext::new(5, 1000);
        context.set_system_message("You are helpful");
        context.add_user_message("Hello");

        let restored = ConversationContext::from_json(&context.to_json().unwrap()).unwrap();
        assert_eq!(restored.len(), 1);
        assert_eq!(restored.max_messages, 5);
        assert_eq!(restored.get_messages(), context.get_messages());
    }
}
