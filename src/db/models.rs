use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::str::FromStr;

use crate::db::enums::MonitorType;
use crate::probes::ProbeSpec;

/// Represents one recurring health check registered by a chat user.
/// Corresponds to the `monitors` table.
///
/// `monitor_type` is kept as the raw TEXT column value; rows with an unknown
/// type are tolerated at read time and skipped by the sweep.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Monitor {
    pub id: i64,
    pub user: String,
    pub channel: String,
    pub target: String,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub monitor_type: String,
    pub port: Option<u16>,
    pub last_state_failed: bool,
}

impl Monitor {
    /// Short human-readable label used in FAILED/RECOVERY notifications,
    /// e.g. `example.com PORT 443`.
    pub fn describe(&self) -> String {
        let mut label = format!("{} {}", self.target, self.monitor_type.to_uppercase());
        if let Some(port) = self.port {
            label.push(' ');
            label.push_str(&port.to_string());
        }
        label
    }

    /// Extracts what to probe from this record, or `None` when the row is
    /// unusable: empty target, unknown type, or a port monitor without a
    /// valid port. Validation normally prevents such rows; the sweep still
    /// refuses to probe them.
    pub fn probe_spec(&self) -> Option<ProbeSpec> {
        if self.target.is_empty() {
            return None;
        }
        let monitor_type = MonitorType::from_str(&self.monitor_type).ok()?;
        let port = match monitor_type {
            MonitorType::Port => Some(self.port.filter(|p| *p >= 1)?),
            _ => None,
        };
        Some(ProbeSpec {
            target: self.target.clone(),
            monitor_type,
            port,
        })
    }
}

/// Field set for inserting a new monitor; `id` and `last_state_failed` are
/// assigned by the database.
#[derive(Debug, Clone)]
pub struct NewMonitor {
    pub user: String,
    pub channel: String,
    pub target: String,
    pub monitor_type: MonitorType,
    pub port: Option<u16>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn monitor(monitor_type: &str, port: Option<u16>) -> Monitor {
        Monitor {
            id: 1,
            user: "U1".to_string(),
            channel: "C1".to_string(),
            target: "example.com".to_string(),
            monitor_type: monitor_type.to_string(),
            port,
            last_state_failed: false,
        }
    }

    #[test]
    fn describe_includes_uppercased_type_and_port() {
        assert_eq!(monitor("ping", None).describe(), "example.com PING");
        assert_eq!(monitor("port", Some(443)).describe(), "example.com PORT 443");
    }

    #[test]
    fn probe_spec_rejects_unknown_type() {
        assert!(monitor("icmp6", None).probe_spec().is_none());
    }

    #[test]
    fn probe_spec_rejects_port_monitor_without_port() {
        assert!(monitor("port", None).probe_spec().is_none());
        assert!(monitor("port", Some(0)).probe_spec().is_none());
    }

    #[test]
    fn probe_spec_drops_stray_port_on_non_port_monitor() {
        let spec = monitor("ping", Some(22)).probe_spec().unwrap();
        assert_eq!(spec.monitor_type, MonitorType::Ping);
        assert_eq!(spec.port, None);
    }

    #[test]
    fn probe_spec_rejects_empty_target() {
        let mut m = monitor("http", None);
        m.target = String::new();
        assert!(m.probe_spec().is_none());
    }
}
