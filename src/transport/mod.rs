use async_trait::async_trait;
use thiserror::Error;

pub mod telegram;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Failed to send message: {0}")]
    SendFailed(String),
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),
    #[error("Invalid response from chat API: {0}")]
    InvalidResponse(String),
}

/// A chat message addressed to the bot, with any addressing prefix already
/// stripped. `user` and `channel` are opaque platform identifiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingMessage {
    pub user: String,
    pub channel: String,
    pub text: String,
}

/// Outbound side of the chat platform. The core only ever posts text to a
/// channel; delivery is fire-and-forget.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send_message(&self, channel: &str, text: &str) -> Result<(), TransportError>;
}
