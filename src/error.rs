//! Error type for a chat exchange.

use thiserror::Error;

/// A chat request that did not produce a reply.
///
/// Both variants are the same "request failed" outcome to the caller: the
/// failure is logged and no bot message is shown.
#[derive(Debug, Error)]
pub enum ChatError {
    /// The request could not be sent or its body could not be read.
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    /// The server answered with something that is not JSON.
    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),
}
