//! A single conversation exchange

use crate::llm_types::GenerateRequest;
use serde::{Deserialize, Serialize};

/// One exchange: what the user said, the system prompt sent with it, and the
/// generated reply
///
/// The reply stays empty until the language model answers. A turn is dropped
/// once its audio output finishes; nothing is retained across turns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub user_text: String,
    pub system_prompt: String,
    pub reply: String,
}

impl ConversationTurn {
    pub fn new(user_text: impl Into<String>, system_prompt: impl Into<String>) -> Self {
        Self {
            user_text: user_text.into(),
            system_prompt: system_prompt.into(),
            reply: String::new(),
        }
    }

    pub fn with_reply(mut self, reply: impl Into<String>) -> Self {
        self.reply = reply.into();
        self
    }

    pub fn set_reply(&mut self, reply: impl Into<String>) {
        self.reply = reply.into();
    }

    pub fn has_reply(&self) -> bool {
        !self.reply.trim().is_empty()
    }

    /// Request carrying exactly this turn's system prompt and user text
    pub fn to_request(&self) -> GenerateRequest {
        GenerateRequest::new(self.system_prompt.clone()).with_user_message(self.user_text.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_types::Role;

    #[test]
    fn test_turn_starts_without_reply() {
        let turn = ConversationTurn::new("Hello", "Be brief");
        assert!(!turn.has_reply());
        assert!(turn.with_reply("Hi there").has_reply());
    }

    #[test]
    fn test_request_has_no_history() {
        let turn = ConversationTurn::new("Hello", "Be brief");
        let req = turn.to_request();

        assert_eq!(req.messages.len(), 2);
        assert_eq!(req.messages[0].role, Role::System);
        assert_eq!(req.messages[1].role, Role::User);
        assert_eq!(req.messages[1].content, "Hello");
    }
}
