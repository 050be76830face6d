//! In-memory conversation state for one agent.

use crate::error::ElizaError;
use crate::models::ChatMessage;

pub const NO_RESPONSE_TEXT: &str = "No response";
pub const APOLOGY_TEXT: &str = "Sorry, I encountered an error. Please try again.";

/// Ordered chat log plus the bookkeeping for one in-flight reply.
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    messages: Vec<ChatMessage>,
    pending_reply: Option<usize>,
    notice: Option<String>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn set_notice(&mut self, notice: impl Into<String>) {
        self.notice = Some(notice.into());
    }

    pub fn is_awaiting_reply(&self) -> bool {
        self.pending_reply.is_some()
    }

    /// Append an operator message. Blank input is ignored.
    pub fn push_user(&mut self, text: &str) -> Option<&ChatMessage> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        self.messages.push(ChatMessage::user(text));
        self.messages.last()
    }

    /// Add an empty agent entry that partial updates will fill in.
    pub fn begin_reply(&mut self) {
        self.messages.push(ChatMessage::agent(String::new()));
        self.pending_reply = Some(self.messages.len() - 1);
    }

    pub fn apply_partial(&mut self, text: &str) {
        if let Some(message) = self.pending_reply.and_then(|idx| self.messages.get_mut(idx)) {
            message.text = text.to_string();
        }
    }

    /// Settle the pending entry with the first returned message.
    pub fn complete_reply(&mut self, replies: Vec<ChatMessage>) {
        let reply = replies
            .into_iter()
            .next()
            .unwrap_or_else(|| ChatMessage::agent(NO_RESPONSE_TEXT));

        match self.pending_reply.take() {
            Some(idx) if idx < self.messages.len() => self.messages[idx] = reply,
            _ => self.messages.push(reply),
        }
    }

    /// Replace the latest agent entry with an apology.
    ///
    /// An agent entry is only ever overwritten here, so a failed send leaves
    /// exactly one agent line after the user's message.
    pub fn fail_reply(&mut self) {
        self.pending_reply = None;
        let apology = ChatMessage::agent(APOLOGY_TEXT);

        match self.messages.iter().rposition(|m| !m.is_user) {
            Some(idx) if idx + 1 == self.messages.len() => self.messages[idx] = apology,
            _ => self.messages.push(apology),
        }
    }

    /// Install history from the backend, degrading to an empty log on error.
    pub fn replace_history(&mut self, history: Result<Vec<ChatMessage>, ElizaError>) {
        self.pending_reply = None;
        match history {
            Ok(messages) => {
                self.messages = messages;
                self.notice = None;
            }
            Err(err) => {
                self.messages.clear();
                self.notice = Some(format!("History unavailable: {err}"));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_input_is_a_no_op() {
        let mut conversation = Conversation::new();
        assert!(conversation.push_user("   ").is_none());
        assert!(conversation.messages().is_empty());

        let message = conversation.push_user("  hello  ").unwrap();
        assert_eq!(message.text, "hello");
        assert!(message.is_user);
    }

    #[test]
    fn partials_then_completion_fill_one_entry() {
        let mut conversation = Conversation::new();
        conversation.push_user("hello");
        conversation.begin_reply();
        assert!(conversation.is_awaiting_reply());

        conversation.apply_partial("par");
        assert_eq!(conversation.messages()[1].text, "par");
        conversation.apply_partial("partial answer");

        conversation.complete_reply(vec![ChatMessage::agent("final")]);
        assert!(!conversation.is_awaiting_reply());
        assert_eq!(conversation.messages().len(), 2);
        assert_eq!(conversation.messages()[1].text, "final");
        assert!(!conversation.messages()[1].is_user);
    }

    #[test]
    fn empty_reply_becomes_placeholder() {
        let mut conversation = Conversation::new();
        conversation.push_user("hello");
        conversation.begin_reply();
        conversation.complete_reply(Vec::new());
        assert_eq!(conversation.messages()[1].text, NO_RESPONSE_TEXT);
    }

    #[test]
    fn failure_overwrites_pending_entry() {
        let mut conversation = Conversation::new();
        conversation.push_user("hello");
        conversation.begin_reply();
        conversation.apply_partial("half");
        conversation.fail_reply();

        assert_eq!(conversation.messages().len(), 2);
        assert_eq!(conversation.messages()[1].text, APOLOGY_TEXT);
        assert!(!conversation.is_awaiting_reply());

        // A second failure still leaves a single trailing apology.
        conversation.fail_reply();
        assert_eq!(conversation.messages().len(), 2);
    }

    #[test]
    fn failure_without_placeholder_appends_once() {
        let mut conversation = Conversation::new();
        conversation.push_user("first");
        conversation.begin_reply();
        conversation.complete_reply(vec![ChatMessage::agent("answer")]);
        conversation.push_user("second");
        conversation.fail_reply();

        let texts: Vec<&str> = conversation.messages().iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "answer", "second", APOLOGY_TEXT]);
    }

    #[test]
    fn history_error_degrades_to_empty_with_notice() {
        let mut conversation = Conversation::new();
        conversation.push_user("stale");
        conversation.replace_history(Err(ElizaError::HistoryUnavailable("gone".into())));
        assert!(conversation.messages().is_empty());
        assert!(conversation.notice().unwrap().contains("gone"));

        conversation.replace_history(Ok(vec![ChatMessage::user("a"), ChatMessage::agent("b")]));
        assert_eq!(conversation.messages().len(), 2);
        assert!(conversation.notice().is_none());
    }
}
