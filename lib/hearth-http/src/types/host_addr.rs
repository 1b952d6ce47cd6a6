/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 the hearth project authors
 */

use std::fmt;
use std::str::FromStr;

use super::Host;
use super::host::HostParseError;

/// An authority: host plus optional port (0 means "not specified").
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct HostAddr {
    host: Host,
    port: u16,
}

impl HostAddr {
    pub fn new(host: Host, port: u16) -> Self {
        HostAddr { host, port }
    }

    #[inline]
    pub fn host(&self) -> &Host {
        &self.host
    }

    #[inline]
    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn set_port(&mut self, port: u16) {
        self.port = port;
    }
}

impl From<std::net::SocketAddr> for HostAddr {
    fn from(addr: std::net::SocketAddr) -> Self {
        HostAddr {
            host: Host::Ip(addr.ip()),
            port: addr.port(),
        }
    }
}

impl fmt::Display for HostAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.port != 0 {
            write!(f, "{}:{}", self.host, self.port)
        } else {
            write!(f, "{}", self.host)
        }
    }
}

impl FromStr for HostAddr {
    type Err = HostParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(HostParseError::Empty);
        }
        if s.as_bytes()[0] == b'[' {
            // bracketed ipv6, maybe with port
            return match memchr::memchr(b']', s.as_bytes()) {
                Some(pos_last) => {
                    let host = Host::from_str(&s[0..=pos_last])?;
                    match s[pos_last + 1..].strip_prefix(':') {
                        Some(p) => {
                            let port = u16::from_str(p).map_err(|_| HostParseError::InvalidIp)?;
                            Ok(HostAddr { host, port })
                        }
                        None if pos_last + 1 == s.len() => Ok(HostAddr { host, port: 0 }),
                        None => Err(HostParseError::InvalidIp),
                    }
                }
                None => Err(HostParseError::InvalidIp),
            };
        }

        match memchr::memrchr(b':', s.as_bytes()) {
            Some(p) if memchr::memchr(b':', &s.as_bytes()[..p]).is_none() => {
                let host = Host::from_str(&s[0..p])?;
                let port = u16::from_str(&s[p + 1..]).map_err(|_| HostParseError::InvalidDomain)?;
                Ok(HostAddr { host, port })
            }
            // more than one ':', treat the whole string as a bare ipv6 ip
            _ => Ok(HostAddr {
                host: Host::from_str(s)?,
                port: 0,
            }),
        }
    }
}
