/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 the hearth project authors
 */

use std::net::IpAddr;

use ahash::AHashMap;
use arcstr::ArcStr;

use crate::Host;

/// Select a value by request host.
///
/// Domain keys are matched case-insensitively (both sides lowercased).
#[derive(Clone, Debug)]
pub struct HostMatch<T> {
    exact_domain: Option<AHashMap<ArcStr, T>>,
    exact_ip: Option<AHashMap<IpAddr, T>>,
    default: Option<T>,
}

impl<T> Default for HostMatch<T> {
    fn default() -> Self {
        HostMatch {
            exact_domain: None,
            exact_ip: None,
            default: None,
        }
    }
}

impl<T> HostMatch<T> {
    pub fn add_exact_domain(&mut self, domain: &str, v: T) -> Option<T> {
        self.exact_domain
            .get_or_insert(Default::default())
            .insert(ArcStr::from(domain.to_ascii_lowercase()), v)
    }

    pub fn add_exact_ip(&mut self, ip: IpAddr, v: T) -> Option<T> {
        self.exact_ip
            .get_or_insert(Default::default())
            .insert(ip, v)
    }

    #[inline]
    pub fn set_default(&mut self, v: T) -> Option<T> {
        self.default.replace(v)
    }

    pub fn get(&self, host: &Host) -> Option<&T> {
        match host {
            Host::Ip(ip) => {
                if let Some(ht) = &self.exact_ip
                    && let Some(v) = ht.get(ip)
                {
                    return Some(v);
                }
            }
            Host::Domain(domain) => {
                if let Some(ht) = &self.exact_domain
                    && let Some(v) = ht.get(domain.as_str())
                {
                    return Some(v);
                }
            }
        }
        self.default.as_ref()
    }

    #[inline]
    pub fn get_default(&self) -> Option<&T> {
        self.default.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.exact_domain.is_none() && self.exact_ip.is_none() && self.default.is_none()
    }
}
