//! Translates validated chat commands into repository calls and replies.
//!
//! The dispatcher never probes; it only writes/reads the monitor registry
//! and answers in the channel the command came from. Storage failures are
//! logged and rendered as a plain error reply, never propagated.

use std::sync::Arc;

use sqlx::SqlitePool;
use tokio::sync::mpsc;
use tracing::{error, info};

use crate::bot::validation;
use crate::db::models::{Monitor, NewMonitor};
use crate::db::services::monitor_service;
use crate::transport::{ChatTransport, IncomingMessage};

const MONITOR_USAGE: &str = "Usage: monitor <target> <http|ping|port> [port]";
const UNMONITOR_USAGE: &str = "Usage: unmonitor <id>";

pub struct CommandDispatcher<T> {
    pool: SqlitePool,
    transport: Arc<T>,
}

impl<T: ChatTransport> CommandDispatcher<T> {
    pub fn new(pool: SqlitePool, transport: Arc<T>) -> Self {
        Self { pool, transport }
    }

    /// Consumes inbound messages until the channel closes.
    pub async fn run(&self, mut rx: mpsc::Receiver<IncomingMessage>) {
        while let Some(message) = rx.recv().await {
            self.handle_message(message).await;
        }
        info!("Inbound message channel closed, command dispatcher stopping.");
    }

    pub async fn handle_message(&self, message: IncomingMessage) {
        let reply = self.dispatch(&message).await;
        if let Err(e) = self.transport.send_message(&message.channel, &reply).await {
            error!(channel = %message.channel, error = %e, "Failed to send reply.");
        }
    }

    async fn dispatch(&self, message: &IncomingMessage) -> String {
        let mut parts = message.text.split_whitespace();
        let action = parts.next().unwrap_or("");

        match action {
            "monitor" => {
                self.add_monitor(message, parts.next(), parts.next(), parts.next())
                    .await
            }
            "monitors" => self.list_monitors(message, parts.next()).await,
            "unmonitor" => self.remove_monitor(message, parts.next()).await,
            _ => "I didn't understand you!".to_string(),
        }
    }

    async fn add_monitor(
        &self,
        message: &IncomingMessage,
        target: Option<&str>,
        type_str: Option<&str>,
        port_arg: Option<&str>,
    ) -> String {
        let Some(target) = target else {
            return MONITOR_USAGE.to_string();
        };
        // Type defaults to ping when omitted.
        let type_str = type_str.unwrap_or("ping");

        let (monitor_type, port) =
            match validation::validate_monitor_request(target, type_str, port_arg) {
                Ok(parsed) => parsed,
                Err(e) => {
                    info!(user = %message.user, monitor_target = target, error = %e, "Rejected monitor command.");
                    return format!("{e}. {MONITOR_USAGE}");
                }
            };

        let new_monitor = NewMonitor {
            user: message.user.clone(),
            channel: message.channel.clone(),
            target: target.to_string(),
            monitor_type,
            port,
        };

        match monitor_service::create_monitor(&self.pool, new_monitor).await {
            Ok(monitor) => {
                info!(
                    monitor_id = monitor.id,
                    user = %monitor.user,
                    monitor_target = %monitor.target,
                    monitor_type = %monitor.monitor_type,
                    "Monitor added."
                );
                "Monitor added.".to_string()
            }
            Err(e) => {
                error!(error = %e, "Failed to insert monitor.");
                "Error adding monitor.".to_string()
            }
        }
    }

    async fn list_monitors(&self, message: &IncomingMessage, scope: Option<&str>) -> String {
        let all_channels = scope == Some("all");
        let result = if all_channels {
            monitor_service::list_monitors_for_user(&self.pool, &message.user).await
        } else {
            monitor_service::list_monitors_for_user_in_channel(
                &self.pool,
                &message.user,
                &message.channel,
            )
            .await
        };

        let monitors = match result {
            Ok(monitors) => monitors,
            Err(e) => {
                error!(user = %message.user, error = %e, "Failed to read monitors.");
                return "Error reading monitors.".to_string();
            }
        };

        if monitors.is_empty() {
            return "You have currently no monitors.".to_string();
        }

        let lines: Vec<String> = monitors
            .iter()
            .map(|m| format_monitor_line(m, all_channels))
            .collect();
        let header = if all_channels {
            "Here is a list of your monitors in ALL CHANNELS:"
        } else {
            "Here is a list of your monitors in THIS CHANNEL:"
        };
        format!("{header}\n\n{}", lines.join("\n"))
    }

    async fn remove_monitor(&self, message: &IncomingMessage, id_arg: Option<&str>) -> String {
        let Some(id_arg) = id_arg else {
            return UNMONITOR_USAGE.to_string();
        };
        let Ok(monitor_id) = id_arg.parse::<i64>() else {
            return UNMONITOR_USAGE.to_string();
        };

        match monitor_service::delete_monitor(&self.pool, monitor_id, &message.user).await {
            Ok(1) => {
                info!(monitor_id, user = %message.user, "Monitor deleted.");
                format!("Monitor #{monitor_id} deleted.")
            }
            Ok(_) => "No monitors were affected.".to_string(),
            Err(e) => {
                error!(monitor_id, error = %e, "Failed to delete monitor.");
                "Unable to delete monitor.".to_string()
            }
        }
    }
}

fn format_monitor_line(monitor: &Monitor, with_channel: bool) -> String {
    let mut line = format!(
        "#{} {} {}",
        monitor.id, monitor.target, monitor.monitor_type
    );
    if let Some(port) = monitor.port {
        line.push_str(&format!(" Port: {port}"));
    }
    if with_channel {
        line.push_str(&format!(" (Channel: {})", monitor.channel));
    }
    line
}
