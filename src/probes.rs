//! Probe strategies for the three monitor types.
//!
//! Each check is a stateless network call bounded by the configured per-probe
//! timeout, folded into a [`ProbeOutcome`] — probes never return errors.

use std::net::IpAddr;
use std::time::Duration;

use async_trait::async_trait;
use rand::random;
use reqwest::StatusCode;

use crate::db::enums::MonitorType;

/// What to probe, extracted from a monitor record after validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeSpec {
    pub target: String,
    pub monitor_type: MonitorType,
    pub port: Option<u16>,
}

/// Result of a single check: a health verdict plus optional diagnostic text
/// that is appended to the FAILED/RECOVERY notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeOutcome {
    pub healthy: bool,
    pub detail: Option<String>,
}

impl ProbeOutcome {
    pub fn ok() -> Self {
        Self {
            healthy: true,
            detail: None,
        }
    }

    pub fn fail(detail: impl Into<String>) -> Self {
        Self {
            healthy: false,
            detail: Some(detail.into()),
        }
    }
}

/// Seam between the sweep and the network, so sweeps can be exercised with
/// scripted outcomes in tests.
#[async_trait]
pub trait Prober: Send + Sync {
    async fn probe(&self, spec: &ProbeSpec) -> ProbeOutcome;
}

/// Production prober: real HTTP, ICMP and TCP checks.
pub struct NetworkProber {
    client: reqwest::Client,
    timeout: Duration,
}

impl NetworkProber {
    pub fn new(timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap(); // Should not fail with default settings
        Self { client, timeout }
    }

    /// GET the target URL. Only a transport error or a 500 counts as a
    /// failure; every other status (including 4xx) means the host answered.
    async fn check_http(&self, target: &str) -> ProbeOutcome {
        match self.client.get(target).send().await {
            Ok(response) if response.status() == StatusCode::INTERNAL_SERVER_ERROR => {
                ProbeOutcome::fail("response code 500")
            }
            Ok(_) => ProbeOutcome::ok(),
            Err(e) => ProbeOutcome::fail(e.to_string()),
        }
    }

    async fn check_ping(&self, target: &str) -> ProbeOutcome {
        // The target can be a domain name or an IP address literal.
        let host = target.to_string();
        let resolved = tokio::task::spawn_blocking(move || {
            use std::net::ToSocketAddrs;
            format!("{host}:0").to_socket_addrs().map(|mut addrs| addrs.next())
        })
        .await;

        let addr = match resolved {
            Ok(Ok(Some(addr))) => addr.ip(),
            Ok(Ok(None)) => return ProbeOutcome::fail(format!("no addresses found for {target}")),
            Ok(Err(e)) => return ProbeOutcome::fail(e.to_string()),
            Err(e) => return ProbeOutcome::fail(e.to_string()),
        };

        let config = match addr {
            IpAddr::V4(_) => surge_ping::Config::default(),
            IpAddr::V6(_) => surge_ping::Config::builder().kind(surge_ping::ICMP::V6).build(),
        };
        let client = match surge_ping::Client::new(&config) {
            Ok(client) => client,
            Err(e) => return ProbeOutcome::fail(e.to_string()),
        };

        let mut pinger = client.pinger(addr, surge_ping::PingIdentifier(random())).await;
        pinger.timeout(self.timeout);
        match pinger.ping(surge_ping::PingSequence(0), &[]).await {
            Ok((_reply, _rtt)) => ProbeOutcome::ok(),
            Err(e) => ProbeOutcome::fail(e.to_string()),
        }
    }

    async fn check_tcp(&self, target: &str, port: u16) -> ProbeOutcome {
        let connect = tokio::net::TcpStream::connect((target, port));
        match tokio::time::timeout(self.timeout, connect).await {
            Ok(Ok(stream)) => {
                drop(stream);
                ProbeOutcome::ok()
            }
            Ok(Err(e)) => ProbeOutcome::fail(e.to_string()),
            Err(_) => ProbeOutcome::fail("connection timed out"),
        }
    }
}

#[async_trait]
impl Prober for NetworkProber {
    async fn probe(&self, spec: &ProbeSpec) -> ProbeOutcome {
        match spec.monitor_type {
            MonitorType::Http => self.check_http(&spec.target).await,
            MonitorType::Ping => self.check_ping(&spec.target).await,
            MonitorType::Port => match spec.port {
                Some(port) => self.check_tcp(&spec.target, port).await,
                // probe_spec() filters these out; refuse rather than guess.
                None => ProbeOutcome::fail("monitor has no port configured"),
            },
        }
    }
}
