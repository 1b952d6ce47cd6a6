/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 the hearth project authors
 */

use super::LineParseError;

pub struct RequestLine<'a> {
    pub method: &'a str,
    pub target: &'a str,
    /// 0 for HTTP/1.0, 1 for HTTP/1.1, 2 for HTTP/2
    pub version: u8,
}

impl<'a> RequestLine<'a> {
    pub fn parse(buf: &'a [u8]) -> Result<RequestLine<'a>, LineParseError> {
        const MINIMAL_LENGTH: usize = 15; // M / HTTP/1.x\r\n

        if buf.len() < MINIMAL_LENGTH {
            return Err(LineParseError::NotLongEnough);
        }

        let line = std::str::from_utf8(buf)?;
        let Some(p1) = memchr::memchr(b' ', line.as_bytes()) else {
            return Err(LineParseError::NoDelimiterFound(' '));
        };
        let method = &line[0..p1];
        if method.is_empty() {
            return Err(LineParseError::NotLongEnough);
        }

        let left = &line[p1 + 1..];
        let Some(p2) = memchr::memchr(b' ', left.as_bytes()) else {
            return Err(LineParseError::NoDelimiterFound(' '));
        };
        let target = &left[0..p2];
        if target.is_empty() {
            return Err(LineParseError::NotLongEnough);
        }

        let version = match left[p2 + 1..].trim_end() {
            "HTTP/1.0" => 0,
            "HTTP/1.1" => 1,
            "HTTP/2.0" | "HTTP/2" => 2,
            _ => return Err(LineParseError::InvalidVersion),
        };

        Ok(RequestLine {
            method,
            target,
            version,
        })
    }
}
