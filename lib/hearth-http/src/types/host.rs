/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 the hearth project authors
 */

use std::fmt;
use std::net::{IpAddr, Ipv6Addr};
use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum HostParseError {
    #[error("empty string")]
    Empty,
    #[error("invalid ip address")]
    InvalidIp,
    #[error("invalid domain")]
    InvalidDomain,
}

/// A host value as seen in an authority or `Host` header.
///
/// Domains are stored lowercased so matching is case-insensitive.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub enum Host {
    Ip(IpAddr),
    Domain(String),
}

impl Host {
    pub fn is_empty(&self) -> bool {
        match self {
            Host::Ip(ip) => ip.is_unspecified(),
            Host::Domain(domain) => domain.is_empty(),
        }
    }

    fn from_maybe_mapped_ip6(ip6: Ipv6Addr) -> Self {
        if let Some(ip4) = ip6.to_ipv4_mapped() {
            Host::Ip(IpAddr::V4(ip4))
        } else {
            Host::Ip(IpAddr::V6(ip6))
        }
    }

    fn from_domain_str(domain: &str) -> Result<Self, HostParseError> {
        if domain.is_empty()
            || !domain
                .bytes()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, b'-' | b'.' | b'_'))
        {
            return Err(HostParseError::InvalidDomain);
        }
        Ok(Host::Domain(domain.to_ascii_lowercase()))
    }
}

impl fmt::Display for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Host::Ip(IpAddr::V6(ip6)) => write!(f, "[{ip6}]"),
            Host::Ip(ip) => write!(f, "{ip}"),
            Host::Domain(domain) => write!(f, "{domain}"),
        }
    }
}

impl FromStr for Host {
    type Err = HostParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(HostParseError::Empty);
        }
        match s.as_bytes()[0] {
            b'[' => {
                let pos_last = s.len() - 1;
                if s.as_bytes()[pos_last] == b']'
                    && let Ok(ip6) = Ipv6Addr::from_str(&s[1..pos_last])
                {
                    return Ok(Host::from_maybe_mapped_ip6(ip6));
                }
                Err(HostParseError::InvalidIp)
            }
            b':' => {
                if let Ok(ip6) = Ipv6Addr::from_str(s) {
                    Ok(Host::from_maybe_mapped_ip6(ip6))
                } else {
                    Err(HostParseError::InvalidIp)
                }
            }
            _ => {
                if let Ok(ip) = IpAddr::from_str(s) {
                    return match ip {
                        IpAddr::V4(_) => Ok(Host::Ip(ip)),
                        IpAddr::V6(ip6) => Ok(Host::from_maybe_mapped_ip6(ip6)),
                    };
                }
                Host::from_domain_str(s)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn parse_domain() {
        let host = Host::from_str("Example.COM").unwrap();
        assert_eq!(host, Host::Domain("example.com".to_string()));
    }

    #[test]
    fn parse_ip4() {
        let host = Host::from_str("192.0.2.1").unwrap();
        assert_eq!(host, Host::Ip(IpAddr::V4(Ipv4Addr::new(192, 0, 2, 1))));
    }

    #[test]
    fn parse_ip6_bracketed() {
        let host = Host::from_str("[2001:db8::1]").unwrap();
        assert_eq!(host.to_string(), "[2001:db8::1]");
    }

    #[test]
    fn reject_garbage() {
        assert!(Host::from_str("").is_err());
        assert!(Host::from_str("a b").is_err());
        assert!(Host::from_str("[::1").is_err());
    }
}
