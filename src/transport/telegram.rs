//! Chat transport backed by the Telegram Bot API.
//!
//! Outbound messages go through `sendMessage`; inbound commands are pulled
//! with long-polled `getUpdates` calls and forwarded over an mpsc channel.
//! In group chats only messages addressed to the bot are forwarded, and the
//! addressing prefix is stripped before the dispatcher sees the text.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};

use super::{ChatTransport, IncomingMessage, TransportError};

const POLL_TIMEOUT_SECS: u64 = 30;
const SEND_TIMEOUT_SECS: u64 = 10;
const POLL_BACKOFF_SECS: u64 = 5;

pub struct TelegramTransport {
    client: Client,
    token: String,
    bot_name: String,
}

#[derive(Serialize)]
struct SendMessagePayload<'a> {
    chat_id: &'a str,
    text: &'a str,
}

#[derive(Deserialize)]
struct UpdatesResponse {
    ok: bool,
    #[serde(default)]
    result: Vec<Update>,
}

#[derive(Deserialize)]
struct Update {
    update_id: i64,
    message: Option<TelegramMessage>,
}

#[derive(Deserialize)]
struct TelegramMessage {
    from: Option<TelegramUser>,
    chat: TelegramChat,
    text: Option<String>,
}

#[derive(Deserialize)]
struct TelegramUser {
    id: i64,
    #[serde(default)]
    is_bot: bool,
}

#[derive(Deserialize)]
struct TelegramChat {
    id: i64,
    #[serde(rename = "type")]
    chat_type: String,
}

impl TelegramTransport {
    pub fn new(token: String, bot_name: String) -> Self {
        Self {
            client: Client::new(),
            token,
            bot_name,
        }
    }

    /// Long-polls `getUpdates` forever, forwarding accepted messages to the
    /// dispatcher. Returns when the receiving side is dropped.
    pub async fn run_update_loop(&self, tx: mpsc::Sender<IncomingMessage>) {
        info!(bot_name = %self.bot_name, "Telegram update loop started.");
        let mut offset: i64 = 0;

        loop {
            match self.fetch_updates(offset).await {
                Ok(updates) => {
                    for update in updates {
                        offset = offset.max(update.update_id + 1);
                        let Some(message) = update.message else {
                            continue;
                        };
                        if let Some(incoming) = self.accept(message) {
                            if tx.send(incoming).await.is_err() {
                                info!("Dispatcher gone, stopping Telegram update loop.");
                                return;
                            }
                        }
                    }
                }
                Err(e) => {
                    warn!(error = %e, "Failed to fetch chat updates, backing off.");
                    tokio::time::sleep(Duration::from_secs(POLL_BACKOFF_SECS)).await;
                }
            }
        }
    }

    async fn fetch_updates(&self, offset: i64) -> Result<Vec<Update>, TransportError> {
        let api_url = format!("https://api.telegram.org/bot{}/getUpdates", self.token);
        let response = self
            .client
            .get(&api_url)
            .query(&[
                ("offset", offset.to_string()),
                ("timeout", POLL_TIMEOUT_SECS.to_string()),
            ])
            // Must outlast the server-side long-poll window.
            .timeout(Duration::from_secs(POLL_TIMEOUT_SECS + 10))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::InvalidResponse(format!(
                "getUpdates returned non-success status: {status}"
            )));
        }

        let raw = response.text().await?;
        let body: UpdatesResponse = serde_json::from_str(&raw)
            .map_err(|e| TransportError::InvalidResponse(format!("getUpdates body: {e}")))?;
        if !body.ok {
            return Err(TransportError::InvalidResponse(
                "getUpdates returned ok=false".to_string(),
            ));
        }
        Ok(body.result)
    }

    /// Filters one raw update down to a dispatchable message, applying the
    /// group-chat addressing rules.
    fn accept(&self, message: TelegramMessage) -> Option<IncomingMessage> {
        let text = message.text?;
        let from = message.from?;
        if from.is_bot {
            return None;
        }

        let is_group = matches!(message.chat.chat_type.as_str(), "group" | "supergroup");
        let text = if is_group {
            strip_addressing(&text, &self.bot_name)?
        } else {
            normalize_command(&text, &self.bot_name)
        };

        Some(IncomingMessage {
            user: from.id.to_string(),
            channel: message.chat.id.to_string(),
            text,
        })
    }
}

/// In group chats the bot only reacts when addressed: either a leading
/// `@botname` mention or the `/command@botname` form. Returns the text with
/// the addressing stripped, or `None` when the message is for someone else.
fn strip_addressing(text: &str, bot_name: &str) -> Option<String> {
    let trimmed = text.trim();
    let mention = format!("@{bot_name}");

    if let Some(rest) = trimmed.strip_prefix(&mention) {
        // The mention must be a whole word, not a prefix of a longer name.
        if rest.is_empty() || rest.starts_with(':') || rest.starts_with(char::is_whitespace) {
            let rest = rest.strip_prefix(':').unwrap_or(rest);
            return Some(rest.trim().to_string());
        }
    }

    if trimmed.starts_with('/') {
        let normalized = normalize_command(trimmed, bot_name);
        // Only addressed if the suffix was actually present.
        let first = trimmed.split_whitespace().next().unwrap_or("");
        if first.ends_with(&mention) {
            return Some(normalized);
        }
    }

    None
}

/// Rewrites `/monitor@botname example.com http` to `monitor example.com http`
/// so the dispatcher sees the same command grammar everywhere.
fn normalize_command(text: &str, bot_name: &str) -> String {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix('/') else {
        return trimmed.to_string();
    };

    let mut parts = rest.splitn(2, char::is_whitespace);
    let head = parts.next().unwrap_or("");
    let tail = parts.next().unwrap_or("").trim_start();

    let suffix = format!("@{bot_name}");
    let head = head.strip_suffix(&suffix).unwrap_or(head);

    if tail.is_empty() {
        head.to_string()
    } else {
        format!("{head} {tail}")
    }
}

#[async_trait]
impl ChatTransport for TelegramTransport {
    async fn send_message(&self, channel: &str, text: &str) -> Result<(), TransportError> {
        let api_url = format!("https://api.telegram.org/bot{}/sendMessage", self.token);
        let payload = SendMessagePayload {
            chat_id: channel,
            text,
        };

        let response = self
            .client
            .post(&api_url)
            .timeout(Duration::from_secs(SEND_TIMEOUT_SECS))
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            return Err(TransportError::SendFailed(format!(
                "Telegram API returned non-success status: {status}. Body: {error_body}"
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mention_prefix_is_stripped_in_groups() {
        assert_eq!(
            strip_addressing("@knockknockbot: monitor example.com ping", "knockknockbot"),
            Some("monitor example.com ping".to_string())
        );
        assert_eq!(
            strip_addressing("@knockknockbot monitors", "knockknockbot"),
            Some("monitors".to_string())
        );
    }

    #[test]
    fn unaddressed_group_messages_are_ignored() {
        assert_eq!(strip_addressing("monitor example.com ping", "knockknockbot"), None);
        assert_eq!(strip_addressing("/monitors", "knockknockbot"), None);
        assert_eq!(
            strip_addressing("@someoneelse: monitors", "knockknockbot"),
            None
        );
        // A longer name sharing the prefix is someone else.
        assert_eq!(
            strip_addressing("@knockknockbotson: monitors", "knockknockbot"),
            None
        );
    }

    #[test]
    fn slash_command_with_bot_suffix_is_accepted_in_groups() {
        assert_eq!(
            strip_addressing("/monitor@knockknockbot example.com http", "knockknockbot"),
            Some("monitor example.com http".to_string())
        );
    }

    #[test]
    fn slash_commands_are_normalized_in_direct_chats() {
        assert_eq!(
            normalize_command("/monitors all", "knockknockbot"),
            "monitors all"
        );
        assert_eq!(
            normalize_command("/unmonitor@knockknockbot 7", "knockknockbot"),
            "unmonitor 7"
        );
        assert_eq!(
            normalize_command("monitor example.com ping", "knockknockbot"),
            "monitor example.com ping"
        );
    }
}
