use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Probe strategy a monitor uses, stored as lowercase TEXT in the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MonitorType {
    Http,
    Ping,
    Port,
}

impl MonitorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MonitorType::Http => "http",
            MonitorType::Ping => "ping",
            MonitorType::Port => "port",
        }
    }
}

impl FromStr for MonitorType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "http" => Ok(MonitorType::Http),
            "ping" => Ok(MonitorType::Ping),
            "port" => Ok(MonitorType::Port),
            _ => Err(()),
        }
    }
}

impl fmt::Display for MonitorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
