//! Syntax validation for user-supplied monitor arguments.
//!
//! Runs before anything reaches the repository, so every stored row
//! satisfies the type/port invariant and carries a probeable target.

use std::net::IpAddr;

use url::Url;

use crate::db::enums::MonitorType;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("unknown monitor type '{0}'")]
    UnknownType(String),
    #[error("'{0}' is not a valid http/https URL")]
    InvalidUrl(String),
    #[error("'{0}' is not a valid IP address or hostname")]
    InvalidHost(String),
    #[error("'{0}' is not a valid port (1-65535)")]
    InvalidPort(String),
    #[error("a port monitor needs a port")]
    MissingPort,
    #[error("only port monitors take a port")]
    UnexpectedPort,
}

/// Checks one `monitor` command's arguments and returns the parsed type and
/// port on success.
pub fn validate_monitor_request(
    target: &str,
    type_str: &str,
    port_arg: Option<&str>,
) -> Result<(MonitorType, Option<u16>), ValidationError> {
    let monitor_type = type_str
        .parse::<MonitorType>()
        .map_err(|_| ValidationError::UnknownType(type_str.to_string()))?;

    match monitor_type {
        MonitorType::Http => {
            let url = Url::parse(target)
                .map_err(|_| ValidationError::InvalidUrl(target.to_string()))?;
            if url.scheme() != "http" && url.scheme() != "https" {
                return Err(ValidationError::InvalidUrl(target.to_string()));
            }
            if port_arg.is_some() {
                return Err(ValidationError::UnexpectedPort);
            }
            Ok((monitor_type, None))
        }
        MonitorType::Ping => {
            validate_host(target)?;
            if port_arg.is_some() {
                return Err(ValidationError::UnexpectedPort);
            }
            Ok((monitor_type, None))
        }
        MonitorType::Port => {
            validate_host(target)?;
            let raw = port_arg.ok_or(ValidationError::MissingPort)?;
            let port = raw
                .parse::<u16>()
                .ok()
                .filter(|p| *p >= 1)
                .ok_or_else(|| ValidationError::InvalidPort(raw.to_string()))?;
            Ok((monitor_type, Some(port)))
        }
    }
}

fn validate_host(target: &str) -> Result<(), ValidationError> {
    if target.parse::<IpAddr>().is_ok() {
        return Ok(());
    }
    if is_fully_qualified_hostname(target) {
        return Ok(());
    }
    Err(ValidationError::InvalidHost(target.to_string()))
}

/// RFC 1123 label rules, and at least one dot so bare names don't silently
/// resolve against the local search domain.
fn is_fully_qualified_hostname(host: &str) -> bool {
    if host.is_empty() || host.len() > 253 {
        return false;
    }
    let host = host.strip_suffix('.').unwrap_or(host);
    if !host.contains('.') {
        return false;
    }
    host.split('.').all(|label| {
        !label.is_empty()
            && label.len() <= 63
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_targets_must_be_http_or_https_urls() {
        assert_eq!(
            validate_monitor_request("http://example.com", "http", None).unwrap(),
            (MonitorType::Http, None)
        );
        assert_eq!(
            validate_monitor_request("https://example.com/healthz", "http", None).unwrap(),
            (MonitorType::Http, None)
        );
        assert!(matches!(
            validate_monitor_request("ftp://example.com", "http", None),
            Err(ValidationError::InvalidUrl(_))
        ));
        assert!(matches!(
            validate_monitor_request("example.com", "http", None),
            Err(ValidationError::InvalidUrl(_))
        ));
    }

    #[test]
    fn ping_targets_accept_ips_and_hostnames() {
        assert!(validate_monitor_request("1.2.3.4", "ping", None).is_ok());
        assert!(validate_monitor_request("2001:db8::1", "ping", None).is_ok());
        assert!(validate_monitor_request("host.example.com", "ping", None).is_ok());
        assert!(matches!(
            validate_monitor_request("not a host", "ping", None),
            Err(ValidationError::InvalidHost(_))
        ));
        assert!(matches!(
            validate_monitor_request("bare-name", "ping", None),
            Err(ValidationError::InvalidHost(_))
        ));
        assert!(matches!(
            validate_monitor_request("-bad.example.com", "ping", None),
            Err(ValidationError::InvalidHost(_))
        ));
    }

    #[test]
    fn port_monitors_require_an_in_range_port() {
        assert_eq!(
            validate_monitor_request("1.2.3.4", "port", Some("443")).unwrap(),
            (MonitorType::Port, Some(443))
        );
        assert_eq!(
            validate_monitor_request("1.2.3.4", "port", Some("65535")).unwrap(),
            (MonitorType::Port, Some(65535))
        );
        assert_eq!(
            validate_monitor_request("1.2.3.4", "port", None),
            Err(ValidationError::MissingPort)
        );
        assert!(matches!(
            validate_monitor_request("1.2.3.4", "port", Some("0")),
            Err(ValidationError::InvalidPort(_))
        ));
        assert!(matches!(
            validate_monitor_request("1.2.3.4", "port", Some("99999")),
            Err(ValidationError::InvalidPort(_))
        ));
        assert!(matches!(
            validate_monitor_request("1.2.3.4", "port", Some("ssh")),
            Err(ValidationError::InvalidPort(_))
        ));
    }

    #[test]
    fn non_port_monitors_reject_a_stray_port() {
        assert_eq!(
            validate_monitor_request("http://example.com", "http", Some("80")),
            Err(ValidationError::UnexpectedPort)
        );
        assert_eq!(
            validate_monitor_request("1.2.3.4", "ping", Some("80")),
            Err(ValidationError::UnexpectedPort)
        );
    }

    #[test]
    fn unknown_types_are_rejected() {
        assert_eq!(
            validate_monitor_request("example.com", "icmp", None),
            Err(ValidationError::UnknownType("icmp".to_string()))
        );
    }
}
