//! Client module for jaltol-chat.
//!
//! The client:
//! - Renders the chat screen (transcript, status line, input)
//! - Posts each submission to the chat endpoint
//! - Appends the user message and the bot reply to the transcript

pub mod http;
pub mod session;
pub mod tui;

pub use http::{ChatBackend, HttpBackend};
pub use session::ChatSession;
pub use tui::run_tui;
