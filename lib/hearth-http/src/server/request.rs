/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 the hearth project authors
 */

use std::str::FromStr;

use http::{HeaderMap, HeaderName, HeaderValue, Method, Uri, Version, header};
use tokio::io::AsyncBufRead;

use hearth_io::BufReadLineExt;

use super::HttpRequestParseError;
use crate::{HeaderLine, HttpBodyType, LineParseError, RequestLine};
use crate::types::HostAddr;

#[derive(Debug)]
pub struct HttpServerRequest {
    pub version: Version,
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
    /// the port may be 0
    pub host: Option<HostAddr>,
    connection_value: Option<String>,
    extra_connection_headers: Vec<HeaderName>,
    origin_header_size: usize,
    keep_alive: bool,
    expect_continue: bool,
    content_length: u64,
    chunked_transfer: bool,
    chunked_with_trailer: bool,
    has_transfer_encoding: bool,
    has_content_length: bool,
    has_trailer: bool,
}

impl HttpServerRequest {
    fn new(method: Method, uri: Uri, version: Version) -> Self {
        HttpServerRequest {
            version,
            method,
            uri,
            headers: HeaderMap::new(),
            host: None,
            connection_value: None,
            extra_connection_headers: Vec::new(),
            origin_header_size: 0,
            keep_alive: false,
            expect_continue: false,
            content_length: 0,
            chunked_transfer: false,
            chunked_with_trailer: false,
            has_transfer_encoding: false,
            has_content_length: false,
            has_trailer: false,
        }
    }

    #[inline]
    pub fn origin_header_size(&self) -> usize {
        self.origin_header_size
    }

    /// the raw Connection header value as the client sent it
    #[inline]
    pub fn connection_value(&self) -> Option<&str> {
        self.connection_value.as_deref()
    }

    #[inline]
    pub fn disable_keep_alive(&mut self) {
        self.keep_alive = false;
    }

    #[inline]
    pub fn keep_alive(&self) -> bool {
        self.keep_alive
    }

    #[inline]
    pub fn expect_continue(&self) -> bool {
        self.expect_continue
    }

    pub fn body_type(&self) -> Option<HttpBodyType> {
        if self.chunked_transfer {
            if self.chunked_with_trailer {
                Some(HttpBodyType::ChunkedWithTrailer)
            } else {
                Some(HttpBodyType::ChunkedWithoutTrailer)
            }
        } else if self.content_length > 0 {
            Some(HttpBodyType::ContentLength(self.content_length))
        } else {
            None
        }
    }

    pub fn pipeline_safe(&self) -> bool {
        if matches!(
            &self.method,
            &Method::GET | &Method::HEAD | &Method::PUT | &Method::DELETE
        ) {
            // only pipeline idempotent requests without body
            if self.body_type().is_none() {
                return true;
            }
        }
        false
    }

    pub async fn parse<R>(
        reader: &mut R,
        max_header_size: usize,
        version: &mut Version,
    ) -> Result<Self, HttpRequestParseError>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut line_buf = Vec::<u8>::with_capacity(1024);
        let mut header_size: usize = 0;

        let rsp = reader
            .read_line_limited(b'\n', max_header_size, &mut line_buf)
            .await?;
        if rsp.len == 0 {
            return Err(HttpRequestParseError::ClientClosed);
        }
        if !rsp.complete {
            return if rsp.len < max_header_size {
                Err(HttpRequestParseError::ClientClosed)
            } else {
                Err(HttpRequestParseError::TooLongRequestLine(max_header_size))
            };
        }
        header_size += rsp.len;

        let mut req = HttpServerRequest::build_from_request_line(line_buf.as_ref())?;
        match req.version {
            Version::HTTP_10 => req.keep_alive = false,
            Version::HTTP_11 => req.keep_alive = true,
            _ => unreachable!(),
        }
        *version = req.version; // always set version in case of error

        loop {
            if header_size >= max_header_size {
                return Err(HttpRequestParseError::TooLargeHeader(max_header_size));
            }
            line_buf.clear();
            let max_len = max_header_size - header_size;
            let rsp = reader
                .read_line_limited(b'\n', max_len, &mut line_buf)
                .await?;
            if rsp.len == 0 {
                return Err(HttpRequestParseError::ClientClosed);
            }
            if !rsp.complete {
                return if rsp.len < max_len {
                    Err(HttpRequestParseError::ClientClosed)
                } else {
                    Err(HttpRequestParseError::TooLargeHeader(max_header_size))
                };
            }
            header_size += rsp.len;
            if (line_buf.len() == 1 && line_buf[0] == b'\n')
                || (line_buf.len() == 2 && line_buf[0] == b'\r' && line_buf[1] == b'\n')
            {
                // header end line
                break;
            }

            req.parse_header_line(line_buf.as_ref())?;
        }
        req.origin_header_size = header_size;

        req.post_check_and_fix()?;
        Ok(req)
    }

    fn post_check_and_fix(&mut self) -> Result<(), HttpRequestParseError> {
        if self.has_trailer && !self.chunked_transfer {
            self.headers.remove(header::TRAILER);
        }

        // the authority in an absolute-form target wins over the Host header
        if let Some(authority) = self.uri.authority() {
            let host = HostAddr::from_str(authority.as_str())
                .map_err(|_| HttpRequestParseError::InvalidRequestTarget)?;
            self.host = Some(host);
        }

        if self.version == Version::HTTP_11 && self.host.is_none() {
            return Err(HttpRequestParseError::MissedHost);
        }

        // an expectation is only recognized on HTTP/1.1 requests
        if self.version == Version::HTTP_10 {
            self.expect_continue = false;
        }

        Ok(())
    }

    fn build_from_request_line(line_buf: &[u8]) -> Result<Self, HttpRequestParseError> {
        let req =
            RequestLine::parse(line_buf).map_err(HttpRequestParseError::InvalidRequestLine)?;

        let version = match req.version {
            0 => Version::HTTP_10,
            1 => Version::HTTP_11,
            2 => return Err(HttpRequestParseError::UnsupportedVersion(Version::HTTP_2)),
            _ => unreachable!(),
        };

        let method = Method::from_str(req.method)
            .map_err(|_| HttpRequestParseError::UnsupportedMethod(req.method.to_string()))?;
        if req.target == "*" && method != Method::OPTIONS {
            return Err(HttpRequestParseError::InvalidRequestTarget);
        }
        let uri =
            Uri::from_str(req.target).map_err(|_| HttpRequestParseError::InvalidRequestTarget)?;
        Ok(HttpServerRequest::new(method, uri, version))
    }

    fn parse_header_line(&mut self, line_buf: &[u8]) -> Result<(), HttpRequestParseError> {
        let header =
            HeaderLine::parse(line_buf).map_err(HttpRequestParseError::InvalidHeaderLine)?;
        self.handle_header(header)
    }

    fn parse_header_connection(&mut self, value: &str) -> Result<(), HttpRequestParseError> {
        match &mut self.connection_value {
            Some(v) => {
                v.push_str(", ");
                v.push_str(value);
            }
            None => self.connection_value = Some(value.to_string()),
        }
        let value = value.to_lowercase();

        for v in value.as_str().split(',') {
            if v.is_empty() {
                continue;
            }

            match v.trim() {
                "keep-alive" => {
                    self.keep_alive = true;
                }
                "close" => {
                    self.keep_alive = false;
                }
                s => {
                    if let Ok(h) = HeaderName::from_str(s) {
                        self.extra_connection_headers.push(h);
                    }
                }
            }
        }

        Ok(())
    }

    fn parse_header_expect(&mut self, value: &str) -> Result<(), HttpRequestParseError> {
        if value.eq_ignore_ascii_case("100-continue") {
            self.expect_continue = true;
            Ok(())
        } else {
            Err(HttpRequestParseError::UnmetExpectation(value.to_string()))
        }
    }

    fn append_header(&mut self, name: HeaderName, value: &str) -> Result<(), HttpRequestParseError> {
        let value = HeaderValue::from_str(value).map_err(|_| {
            HttpRequestParseError::InvalidHeaderLine(LineParseError::InvalidHeaderValue)
        })?;
        self.headers.append(name, value);
        Ok(())
    }

    fn handle_header(&mut self, header: HeaderLine) -> Result<(), HttpRequestParseError> {
        let name = HeaderName::from_str(header.name).map_err(|_| {
            HttpRequestParseError::InvalidHeaderLine(LineParseError::InvalidHeaderName)
        })?;

        match name.as_str() {
            "host" => {
                if self.host.is_some() {
                    return Err(HttpRequestParseError::InvalidHost);
                }
                if !header.value.is_empty() {
                    let host = HostAddr::from_str(header.value)
                        .map_err(|_| HttpRequestParseError::InvalidHost)?;
                    // the default port depends on the effective scheme, fill it in later
                    self.host = Some(host);
                }
            }
            "connection" => {
                self.parse_header_connection(header.value)?;
            }
            "keep-alive" => {
                // the client should not send this, just ignore it
                return Ok(());
            }
            "expect" => {
                self.parse_header_expect(header.value)?;
            }
            "upgrade" => {
                // TODO add tunnel support for 101 switching protocols
                return Err(HttpRequestParseError::UpgradeIsNotSupported);
            }
            "trailer" => {
                self.has_trailer = true;
                if self.chunked_transfer {
                    self.chunked_with_trailer = true;
                }
            }
            "transfer-encoding" => {
                self.has_transfer_encoding = true;
                if self.has_content_length {
                    // delete content-length
                    self.headers.remove(header::CONTENT_LENGTH);
                    self.content_length = 0;
                    self.keep_alive = false; // according to rfc9112 Section 6.1
                }

                let v = header.value.to_lowercase();
                if v.ends_with("chunked") {
                    self.chunked_transfer = true;
                    if self.has_trailer {
                        self.chunked_with_trailer = true;
                    }
                } else {
                    return Err(HttpRequestParseError::InvalidChunkedTransferEncoding);
                }
            }
            "content-length" => {
                if self.has_transfer_encoding {
                    // ignore content-length
                    self.keep_alive = false; // according to rfc9112 Section 6.1
                    return Ok(());
                }

                let content_length = u64::from_str(header.value)
                    .map_err(|_| HttpRequestParseError::InvalidContentLength)?;

                if self.has_content_length && self.content_length != content_length {
                    return Err(HttpRequestParseError::InvalidContentLength);
                }
                self.has_content_length = true;
                self.content_length = content_length;
            }
            _ => {}
        }

        self.append_header(name, header.value)
    }
}
