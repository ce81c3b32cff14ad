use crate::error::Result;
use crate::llm::{Message, Role};

/// The live, mutable conversation of one user session.
///
/// User and assistant turns are appended in order. At most one system
/// message exists at a time, and it is kept at the head so it can be
/// promoted to request instructions; a new one replaces the old one.
#[derive(Debug, Default, Clone)]
pub struct Session {
    messages: Vec<Message>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_messages(messages: Vec<Message>) -> Self {
        let mut session = Self::new();
        session.replace(messages);
        session
    }

    /// Append a message by role name. Unknown roles are rejected.
    pub fn append(&mut self, role: &str, content: impl Into<String>) -> Result<()> {
        let role: Role = role.parse()?;
        self.push(Message::new(role, content));
        Ok(())
    }

    pub fn push(&mut self, message: Message) {
        if message.is_system() {
            self.messages.retain(|m| !m.is_system());
            self.messages.insert(0, message);
        } else {
            self.messages.push(message);
        }
    }

    pub fn add_user_message(&mut self, content: impl Into<String>) {
        self.push(Message::user(content));
    }

    pub fn add_assistant_message(&mut self, content: impl Into<String>) {
        self.push(Message::assistant(content));
    }

    /// Install `content` as the single system context.
    pub fn set_context(&mut self, content: impl Into<String>) {
        self.push(Message::system(content));
    }

    pub fn context(&self) -> Option<&str> {
        self.messages
            .iter()
            .find(|m| m.is_system())
            .map(|m| m.content.as_str())
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    /// Substitute the whole history, e.g. after loading a transcript.
    pub fn replace(&mut self, messages: Vec<Message>) {
        self.messages = messages;
    }

    pub fn snapshot(&self) -> Vec<Message> {
        self.messages.clone()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }
}
