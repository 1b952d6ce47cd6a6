/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 the hearth project authors
 */

use std::str::FromStr;

use http::{HeaderMap, HeaderName, header};
use thiserror::Error;

use crate::{Host, HostAddr};

#[derive(Debug, Error)]
pub enum ForwardedResolveError {
    #[error("invalid port value in {0}")]
    InvalidPortValue(&'static str),
    #[error("invalid host value in {0}")]
    InvalidHostValue(&'static str),
    #[error("invalid for value")]
    InvalidForValue,
}

/// Whether `X-Forwarded-Port` changes the authority seen in request URLs
/// or only the reported client port.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum ForwardedPortSemantics {
    #[default]
    Authority,
    Remote,
}

impl FromStr for ForwardedPortSemantics {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "authority" => Ok(ForwardedPortSemantics::Authority),
            "remote" => Ok(ForwardedPortSemantics::Remote),
            _ => Err(()),
        }
    }
}

/// Priority of the header a value came from. A slot is overwritten by a
/// higher-priority source, or by a later value from the same source for
/// the legacy headers (last occurrence wins per header name).
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd)]
enum Source {
    Unset,
    ProxiedHttps,
    XForwardedProto,
    XForwardedServer,
    XForwardedPort,
    XForwardedFor,
    XForwardedHost,
    Forwarded,
    Forced,
}

impl Source {
    fn rfc7239(self) -> bool {
        matches!(self, Source::Forwarded | Source::Forced)
    }
}

/// The effective client-visible view of one request, computed once before
/// the handler observes scheme/host/port/remote-address.
#[derive(Debug, Clone, Default)]
pub struct ForwardedResolution {
    pub secure: bool,
    /// effective scheme when a proxy declared one
    pub scheme: Option<String>,
    /// effective authority override, port already defaulted by scheme
    pub authority: Option<HostAddr>,
    /// effective client address; port 0 when unknown
    pub remote: Option<HostAddr>,
    pub ssl_session_id: Option<String>,
    pub ssl_client_cert: Option<String>,
}

struct Slot<T> {
    value: Option<T>,
    source: Source,
}

impl<T> Default for Slot<T> {
    fn default() -> Self {
        Slot {
            value: None,
            source: Source::Unset,
        }
    }
}

impl<T> Slot<T> {
    fn update(&mut self, v: T, source: Source) {
        // RFC 7239 values keep the first-seen value, the legacy headers
        // keep the most recent one
        let accept = if source.rfc7239() {
            source > self.source
        } else {
            source >= self.source
        };
        if accept {
            self.value = Some(v);
            self.source = source;
        }
    }
}

/// Configuration for the forwarded-header resolver.
///
/// Every recognized header name can be renamed independently, so a
/// deployment can ignore the well-known names an untrusted intermediary
/// may inject.
#[derive(Debug, Clone)]
pub struct ForwardedHeaderConfig {
    forwarded: Option<HeaderName>,
    for_name: Option<HeaderName>,
    proto_name: Option<HeaderName>,
    host_name: Option<HeaderName>,
    port_name: Option<HeaderName>,
    server_name: Option<HeaderName>,
    proxied_https_name: Option<HeaderName>,
    ssl_id_name: Option<HeaderName>,
    auth_cert_name: Option<HeaderName>,
    port_semantics: ForwardedPortSemantics,
    trust_proxy_ssl: bool,
    forced_host: Option<HostAddr>,
}

impl Default for ForwardedHeaderConfig {
    fn default() -> Self {
        ForwardedHeaderConfig {
            forwarded: Some(header::FORWARDED),
            for_name: Some(HeaderName::from_static("x-forwarded-for")),
            proto_name: Some(HeaderName::from_static("x-forwarded-proto")),
            host_name: Some(HeaderName::from_static("x-forwarded-host")),
            port_name: Some(HeaderName::from_static("x-forwarded-port")),
            server_name: Some(HeaderName::from_static("x-forwarded-server")),
            proxied_https_name: Some(HeaderName::from_static("x-proxied-https")),
            ssl_id_name: Some(HeaderName::from_static("proxy-ssl-id")),
            auth_cert_name: Some(HeaderName::from_static("proxy-auth-cert")),
            port_semantics: ForwardedPortSemantics::default(),
            trust_proxy_ssl: true,
            forced_host: None,
        }
    }
}

impl ForwardedHeaderConfig {
    pub fn set_forwarded_header(&mut self, name: Option<HeaderName>) {
        self.forwarded = name;
    }

    pub fn set_for_header(&mut self, name: Option<HeaderName>) {
        self.for_name = name;
    }

    pub fn set_proto_header(&mut self, name: Option<HeaderName>) {
        self.proto_name = name;
    }

    pub fn set_host_header(&mut self, name: Option<HeaderName>) {
        self.host_name = name;
    }

    pub fn set_port_header(&mut self, name: Option<HeaderName>) {
        self.port_name = name;
    }

    pub fn set_server_header(&mut self, name: Option<HeaderName>) {
        self.server_name = name;
    }

    pub fn set_port_semantics(&mut self, semantics: ForwardedPortSemantics) {
        self.port_semantics = semantics;
    }

    pub fn set_trust_proxy_ssl(&mut self, trust: bool) {
        self.trust_proxy_ssl = trust;
    }

    /// Force the effective authority regardless of any header.
    pub fn set_forced_host(&mut self, host: HostAddr) {
        self.forced_host = Some(host);
    }

    pub fn resolve(
        &self,
        headers: &HeaderMap,
    ) -> Result<ForwardedResolution, ForwardedResolveError> {
        let mut r = Resolver::default();

        if let Some(host) = &self.forced_host {
            r.authority_host.update(host.host().clone(), Source::Forced);
            if host.port() != 0 {
                r.authority_port.update(host.port(), Source::Forced);
            }
        }

        if self.trust_proxy_ssl {
            if let Some(name) = &self.proxied_https_name {
                for v in headers.get_all(name) {
                    if let Ok(s) = v.to_str() {
                        r.handle_proxied_https(s);
                    }
                }
            }
            if let Some(name) = &self.ssl_id_name {
                if let Some(v) = headers.get_all(name).iter().last()
                    && let Ok(s) = v.to_str()
                {
                    r.ssl_session_id = Some(s.to_string());
                    r.secure = true;
                }
            }
            if let Some(name) = &self.auth_cert_name {
                if let Some(v) = headers.get_all(name).iter().last()
                    && let Ok(s) = v.to_str()
                {
                    r.ssl_client_cert = Some(s.to_string());
                    r.secure = true;
                }
            }
        }

        if let Some(name) = &self.proto_name {
            for v in headers.get_all(name) {
                if let Ok(s) = v.to_str() {
                    r.handle_proto(left_most(s), Source::XForwardedProto);
                }
            }
        }
        if let Some(name) = &self.server_name {
            for v in headers.get_all(name) {
                let s = v
                    .to_str()
                    .map_err(|_| ForwardedResolveError::InvalidHostValue("x-forwarded-server"))?;
                r.handle_authority(left_most(s), Source::XForwardedServer, "x-forwarded-server")?;
            }
        }
        if let Some(name) = &self.port_name {
            for v in headers.get_all(name) {
                let s = v
                    .to_str()
                    .map_err(|_| ForwardedResolveError::InvalidPortValue("x-forwarded-port"))?;
                let port = u16::from_str(s.trim())
                    .map_err(|_| ForwardedResolveError::InvalidPortValue("x-forwarded-port"))?;
                match self.port_semantics {
                    ForwardedPortSemantics::Authority => {
                        r.authority_port.update(port, Source::XForwardedPort)
                    }
                    ForwardedPortSemantics::Remote => {
                        r.remote_port.update(port, Source::XForwardedPort)
                    }
                }
            }
        }
        if let Some(name) = &self.for_name {
            for v in headers.get_all(name) {
                let s = v
                    .to_str()
                    .map_err(|_| ForwardedResolveError::InvalidForValue)?;
                r.handle_for(left_most(s), Source::XForwardedFor)?;
            }
        }
        if let Some(name) = &self.host_name {
            for v in headers.get_all(name) {
                let s = v
                    .to_str()
                    .map_err(|_| ForwardedResolveError::InvalidHostValue("x-forwarded-host"))?;
                r.handle_authority(left_most(s), Source::XForwardedHost, "x-forwarded-host")?;
            }
        }

        if let Some(name) = &self.forwarded {
            for v in headers.get_all(name) {
                let s = v
                    .to_str()
                    .map_err(|_| ForwardedResolveError::InvalidForValue)?;
                r.handle_rfc7239(s)?;
            }
        }

        Ok(r.into_resolution())
    }
}

/// the first element of a comma separated list
fn left_most(value: &str) -> &str {
    match memchr::memchr(b',', value.as_bytes()) {
        Some(p) => value[..p].trim(),
        None => value.trim(),
    }
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}

#[derive(Default)]
struct Resolver {
    secure: bool,
    proto: Slot<String>,
    authority_host: Slot<Host>,
    authority_port: Slot<u16>,
    remote_host: Slot<Host>,
    remote_port: Slot<u16>,
    ssl_session_id: Option<String>,
    ssl_client_cert: Option<String>,
}

impl Resolver {
    fn handle_proxied_https(&mut self, value: &str) {
        match value.trim().to_lowercase().as_str() {
            "on" | "1" | "true" => {
                self.handle_proto("https", Source::ProxiedHttps);
            }
            "off" | "0" | "false" => {
                self.handle_proto("http", Source::ProxiedHttps);
            }
            _ => {}
        }
    }

    fn handle_proto(&mut self, value: &str, source: Source) {
        let value = unquote(value);
        if value.is_empty() {
            return;
        }
        self.proto.update(value.to_ascii_lowercase(), source);
    }

    fn handle_authority(
        &mut self,
        value: &str,
        source: Source,
        name: &'static str,
    ) -> Result<(), ForwardedResolveError> {
        let value = unquote(value);
        if value.is_empty() {
            return Ok(());
        }
        let addr = HostAddr::from_str(value)
            .map_err(|_| ForwardedResolveError::InvalidHostValue(name))?;
        if addr.port() != 0 {
            self.authority_port.update(addr.port(), source);
        }
        self.authority_host.update(addr.host().clone(), source);
        Ok(())
    }

    fn handle_for(&mut self, value: &str, source: Source) -> Result<(), ForwardedResolveError> {
        let value = unquote(value);
        if value.is_empty() || value.eq_ignore_ascii_case("unknown") {
            return Ok(());
        }
        let addr =
            HostAddr::from_str(value).map_err(|_| ForwardedResolveError::InvalidForValue)?;
        if addr.port() != 0 {
            self.remote_port.update(addr.port(), source);
        }
        self.remote_host.update(addr.host().clone(), source);
        Ok(())
    }

    /// one `Forwarded` header value: comma separated elements of
    /// semicolon separated `key=value` pairs
    fn handle_rfc7239(&mut self, value: &str) -> Result<(), ForwardedResolveError> {
        for element in value.split(',') {
            for pair in element.split(';') {
                let pair = pair.trim();
                if pair.is_empty() {
                    continue;
                }
                let Some(p) = memchr::memchr(b'=', pair.as_bytes()) else {
                    continue;
                };
                let key = pair[..p].trim();
                let v = pair[p + 1..].trim();
                if key.eq_ignore_ascii_case("for") {
                    self.handle_for(v, Source::Forwarded)?;
                } else if key.eq_ignore_ascii_case("host") {
                    self.handle_authority(v, Source::Forwarded, "forwarded")?;
                } else if key.eq_ignore_ascii_case("proto") {
                    self.handle_proto(v, Source::Forwarded);
                }
                // `by` carries proxy-side info, nothing to resolve from it
            }
        }
        Ok(())
    }

    fn into_resolution(self) -> ForwardedResolution {
        let mut secure = self.secure;
        let scheme = self.proto.value;
        if matches!(scheme.as_deref(), Some("https")) {
            secure = true;
        }

        let authority = self.authority_host.value.map(|host| {
            let port = self.authority_port.value.unwrap_or_else(|| {
                if secure || matches!(scheme.as_deref(), Some("https")) {
                    443
                } else {
                    80
                }
            });
            HostAddr::new(host, port)
        });

        let remote = self
            .remote_host
            .value
            .map(|host| HostAddr::new(host, self.remote_port.value.unwrap_or(0)));

        ForwardedResolution {
            secure,
            scheme,
            authority,
            remote,
            ssl_session_id: self.ssl_session_id,
            ssl_client_cert: self.ssl_client_cert,
        }
    }
}
