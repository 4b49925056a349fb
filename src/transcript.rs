//! Chat messages and the transcript that displays them.

use std::fmt;

/// Who a message came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    User,
    Bot,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Bot => "bot",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single chat message. Never changes after it is created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    text: String,
    role: Role,
}

impl Message {
    pub fn new(text: impl Into<String>, role: Role) -> Self {
        Self {
            text: text.into(),
            role,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn role(&self) -> Role {
        self.role
    }
}

/// A transcript entry that has not been attached to a transcript yet.
///
/// Carries the message plus the style classes the screen picks colors by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageElement {
    message: Message,
    classes: [String; 2],
}

impl MessageElement {
    pub fn message(&self) -> &Message {
        &self.message
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }
}

/// Build an entry for `content` tagged with `role`.
pub fn create_message_element(content: impl fmt::Display, role: Role) -> MessageElement {
    MessageElement {
        message: Message::new(content.to_string(), role),
        classes: ["message".to_string(), format!("{}-message", role)],
    }
}

/// Append-only, insertion-ordered list of entries.
#[derive(Debug, Default)]
pub struct Transcript {
    entries: Vec<MessageElement>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, element: MessageElement) {
        self.entries.push(element);
    }

    pub fn entries(&self) -> &[MessageElement] {
        &self.entries
    }
}

#[cfg(test)]
impl MessageElement {
    /// Style classes: `message` and `<role>-message`.
    pub fn classes(&self) -> &[String] {
        &self.classes
    }
}

#[cfg(test)]
impl Transcript {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn count(&self, role: Role) -> usize {
        self.entries
            .iter()
            .filter(|e| e.message().role() == role)
            .count()
    }

    /// Texts of the entries with the given role, oldest first.
    pub fn texts(&self, role: Role) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|e| e.message().role() == role)
            .map(|e| e.message().text())
            .collect()
    }

    pub fn last(&self) -> Option<&MessageElement> {
        self.entries.last()
    }
}
