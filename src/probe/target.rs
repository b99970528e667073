//! Target host and port validation.
//!
//! Hosts are checked in order:
//!
//! 1. **IP literal**: anything `std::net::IpAddr` parses (IPv4 dotted quad or
//!    unbracketed IPv6).
//! 2. **Hostname**: RFC 1123 labels joined by dots, case-insensitive. Each
//!    label is 1-63 alphanumeric or hyphen characters and neither starts nor
//!    ends with a hyphen. The last label may not be all digits, so malformed
//!    addresses such as `256.1.1.1` are rejected instead of being treated as
//!    names.
//!
//! Ports must be plain decimal digits in `1..=65535`.
//!
//! Validation is pure: nothing here touches the network.

use std::fmt;
use std::net::IpAddr;

use serde::Serialize;

use super::error::ProbeError;

/// Maximum length of a single hostname label.
const MAX_LABEL_LEN: usize = 63;

/// Classification of a host string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HostKind {
    IpLiteral,
    Hostname,
    Invalid,
}

/// A host and port that passed validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidatedTarget {
    host: String,
    kind: HostKind,
    port: u16,
}

impl ValidatedTarget {
    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn kind(&self) -> HostKind {
        self.kind
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// `host:port`, with IPv6 literals bracketed.
    pub fn authority(&self) -> String {
        if self.kind == HostKind::IpLiteral && self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

impl fmt::Display for ValidatedTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.authority())
    }
}

/// Classify a host string (surrounding whitespace is ignored).
pub fn classify_host(host: &str) -> HostKind {
    let host = host.trim();

    if host.parse::<IpAddr>().is_ok() {
        return HostKind::IpLiteral;
    }

    if is_rfc1123_hostname(host) {
        HostKind::Hostname
    } else {
        HostKind::Invalid
    }
}

fn is_rfc1123_hostname(host: &str) -> bool {
    if host.is_empty() {
        return false;
    }

    let labels: Vec<&str> = host.split('.').collect();
    if !labels.iter().all(|label| is_valid_label(label)) {
        return false;
    }

    // An all-numeric top-level label would make the name look like an address.
    match labels.last() {
        Some(last) => !last.bytes().all(|b| b.is_ascii_digit()),
        None => false,
    }
}

fn is_valid_label(label: &str) -> bool {
    let bytes = label.as_bytes();
    if bytes.is_empty() || bytes.len() > MAX_LABEL_LEN {
        return false;
    }

    let edges_ok = bytes[0].is_ascii_alphanumeric() && bytes[bytes.len() - 1].is_ascii_alphanumeric();
    edges_ok && bytes.iter().all(|b| b.is_ascii_alphanumeric() || *b == b'-')
}

/// Parse and range-check a port given as text.
pub fn validate_port(port: &str) -> Result<u16, ProbeError> {
    let trimmed = port.trim();

    if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ProbeError::InvalidPort(port.to_string()));
    }

    match trimmed.parse::<u32>() {
        Ok(value) if (1..=65535).contains(&value) => {
            u16::try_from(value).map_err(|_| ProbeError::InvalidPort(port.to_string()))
        }
        _ => Err(ProbeError::InvalidPort(port.to_string())),
    }
}

/// Validate a host and port pair.
///
/// # Errors
///
/// * [`ProbeError::InvalidHost`] if the host is neither an IP literal nor a hostname
/// * [`ProbeError::InvalidPort`] if the port is non-numeric or out of range
pub fn validate(host: &str, port: &str) -> Result<ValidatedTarget, ProbeError> {
    let kind = classify_host(host);
    if kind == HostKind::Invalid {
        return Err(ProbeError::InvalidHost(host.to_string()));
    }

    let port = validate_port(port)?;

    Ok(ValidatedTarget {
        host: host.trim().to_string(),
        kind,
        port,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    mod ip_literals {
        use super::*;

        #[test]
        fn test_ipv4() {
            for host in ["127.0.0.1", "0.0.0.0", "255.255.255.255", "10.1.2.3"] {
                assert_eq!(classify_host(host), HostKind::IpLiteral, "{host}");
            }
        }

        #[test]
        fn test_ipv6() {
            for host in ["::1", "fe80::1", "2001:db8::8a2e:370:7334", "::ffff:10.0.0.1"] {
                assert_eq!(classify_host(host), HostKind::IpLiteral, "{host}");
            }
        }

        #[test]
        fn test_out_of_range_octet_is_invalid() {
            assert_eq!(classify_host("256.1.1.1"), HostKind::Invalid);
            assert_eq!(classify_host("1.2.3.999"), HostKind::Invalid);
        }

        #[test]
        fn test_bracketed_ipv6_is_invalid() {
            assert_eq!(classify_host("[::1]"), HostKind::Invalid);
        }

        #[test]
        fn test_surrounding_whitespace_ignored() {
            assert_eq!(classify_host("  192.168.1.1 \n"), HostKind::IpLiteral);
        }
    }

    mod hostnames {
        use super::*;

        #[test]
        fn test_valid_names() {
            for host in [
                "localhost",
                "example.com",
                "EXAMPLE.Com",
                "my-host.internal",
                "a.b.c.d.e",
                "3com.net",
                "x1",
            ] {
                assert_eq!(classify_host(host), HostKind::Hostname, "{host}");
            }
        }

        #[test]
        fn test_label_length_limits() {
            let ok = "a".repeat(63);
            let too_long = "a".repeat(64);
            assert_eq!(classify_host(&format!("{ok}.com")), HostKind::Hostname);
            assert_eq!(classify_host(&format!("{too_long}.com")), HostKind::Invalid);
        }

        #[test]
        fn test_hyphen_edges_rejected() {
            assert_eq!(classify_host("-bad.com"), HostKind::Invalid);
            assert_eq!(classify_host("bad-.com"), HostKind::Invalid);
            assert_eq!(classify_host("in-side.com"), HostKind::Hostname);
        }

        #[test]
        fn test_invalid_characters() {
            for host in [
                "under_score.com",
                "space here",
                "semi;colon",
                "dollar$",
                "a..b",
                ".leading",
                "trailing.",
                "",
                "   ",
                "host/path",
            ] {
                assert_eq!(classify_host(host), HostKind::Invalid, "{host:?}");
            }
        }

        #[test]
        fn test_numeric_top_label_rejected() {
            assert_eq!(classify_host("1.2.3"), HostKind::Invalid);
            assert_eq!(classify_host("8080"), HostKind::Invalid);
        }
    }

    mod ports {
        use super::*;

        #[test]
        fn test_boundaries() {
            assert!(validate_port("0").is_err());
            assert!(validate_port("65536").is_err());
            assert_eq!(validate_port("1"), Ok(1));
            assert_eq!(validate_port("65535"), Ok(65535));
        }

        #[test]
        fn test_non_numeric() {
            for port in ["", "http", "80a", "-1", "+80", "8.0", "0x50", " "] {
                assert_eq!(
                    validate_port(port),
                    Err(ProbeError::InvalidPort(port.to_string())),
                    "{port:?}"
                );
            }
        }

        #[test]
        fn test_overflow_is_invalid() {
            assert!(validate_port("99999999999999999999").is_err());
        }

        #[test]
        fn test_whitespace_trimmed() {
            assert_eq!(validate_port(" 8080 "), Ok(8080));
        }
    }

    mod validate_pair {
        use super::*;

        #[test]
        fn test_valid_target() {
            let target = validate(" example.com ", "443").unwrap();
            assert_eq!(target.host(), "example.com");
            assert_eq!(target.kind(), HostKind::Hostname);
            assert_eq!(target.port(), 443);
            assert_eq!(target.authority(), "example.com:443");
        }

        #[test]
        fn test_ipv6_authority_is_bracketed() {
            let target = validate("::1", "8080").unwrap();
            assert_eq!(target.authority(), "[::1]:8080");
        }

        #[test]
        fn test_host_checked_before_port() {
            assert_eq!(
                validate("256.1.1.1", "0"),
                Err(ProbeError::InvalidHost("256.1.1.1".to_string()))
            );
        }

        #[test]
        fn test_invalid_port() {
            assert_eq!(
                validate("127.0.0.1", "70000"),
                Err(ProbeError::InvalidPort("70000".to_string()))
            );
        }
    }
}
