//! Wire format for the chat endpoint.
//!
//! The client posts a small JSON object and treats whatever JSON comes back
//! as opaque: it is only ever rendered as text.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Body of a chat submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// The raw input text, untrimmed.
    pub user: String,
}

impl ChatRequest {
    pub fn new(user: impl Into<String>) -> Self {
        Self { user: user.into() }
    }
}

/// Textual form of a reply body.
///
/// A JSON string shows as its contents; anything else shows as compact JSON.
pub fn render_reply(reply: &Value) -> String {
    match reply {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
