/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 the hearth project authors
 */

use std::io::{self, Write};

use http::{StatusCode, Version};
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::server::HttpRequestParseError;

/// Canned responses written outside of the normal output pipeline:
/// interim 100-continue, parse failures, refused expectations.
pub struct HttpServerResponse {
    status: StatusCode,
    version: Version,
    close: bool,
    extra_headers: Vec<String>,
}

impl HttpServerResponse {
    const RESPONSE_BUFFER_SIZE: usize = 1024;

    pub fn from_standard(status: StatusCode, version: Version, close: bool) -> Self {
        HttpServerResponse {
            status,
            version,
            close,
            extra_headers: Vec::new(),
        }
    }

    pub fn from_request_error(e: &HttpRequestParseError, version: Version) -> Option<Self> {
        e.status_code()
            .map(|status| HttpServerResponse::from_standard(status, version, true))
    }

    #[inline]
    pub fn bad_request(version: Version) -> Self {
        HttpServerResponse::from_standard(StatusCode::BAD_REQUEST, version, true)
    }

    #[inline]
    pub fn internal_server_error(version: Version, close: bool) -> Self {
        HttpServerResponse::from_standard(StatusCode::INTERNAL_SERVER_ERROR, version, close)
    }

    #[inline]
    pub fn resource_not_found(version: Version, close: bool) -> Self {
        HttpServerResponse::from_standard(StatusCode::NOT_FOUND, version, close)
    }

    pub fn options_ok(version: Version, close: bool, allow: &str) -> Self {
        let mut response = HttpServerResponse::from_standard(StatusCode::OK, version, close);
        response.add_extra_header(format!("Allow: {allow}\r\n"));
        response.add_extra_header(crate::header::content_length(0));
        response
    }

    pub fn add_extra_header(&mut self, line: String) {
        self.extra_headers.push(line);
    }

    #[inline]
    pub fn status(&self) -> u16 {
        self.status.as_u16()
    }

    #[inline]
    pub fn should_close(&self) -> bool {
        self.close
    }

    fn canonical_reason(&self) -> &'static str {
        self.status.canonical_reason().unwrap_or("Unknown")
    }

    pub async fn reply_continue<W>(version: Version, writer: &mut W) -> io::Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        let s = format!("{version:?} 100 Continue\r\n\r\n");
        writer.write_all(s.as_bytes()).await?;
        writer.flush().await?;
        Ok(())
    }

    pub async fn reply_header_only<W>(&self, writer: &mut W) -> io::Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        let mut header = Vec::<u8>::with_capacity(Self::RESPONSE_BUFFER_SIZE);
        write!(
            header,
            "{:?} {} {}\r\n",
            self.version,
            self.status.as_str(),
            self.canonical_reason(),
        )?;
        for line in &self.extra_headers {
            header.extend_from_slice(line.as_bytes());
        }
        header.extend_from_slice(crate::header::connection_as_bytes(self.close));
        header.extend_from_slice(b"\r\n");
        writer.write_all(header.as_ref()).await?;
        writer.flush().await?;
        Ok(())
    }

    pub async fn reply_err<W>(&self, writer: &mut W) -> io::Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        let body = format!("{} {}\r\n", self.status.as_u16(), self.canonical_reason());

        let mut header = Vec::<u8>::with_capacity(Self::RESPONSE_BUFFER_SIZE);
        write!(
            header,
            "{:?} {} {}\r\n",
            self.version,
            self.status.as_str(),
            self.canonical_reason(),
        )?;
        for line in &self.extra_headers {
            header.extend_from_slice(line.as_bytes());
        }
        header.extend_from_slice(crate::header::content_type(&mime::TEXT_PLAIN).as_bytes());
        header.extend_from_slice(crate::header::content_length(body.len() as u64).as_bytes());
        header.extend_from_slice(crate::header::connection_as_bytes(self.close));
        header.extend_from_slice(b"\r\n");

        writer.write_all(header.as_ref()).await?;
        writer.write_all(body.as_bytes()).await?;
        writer.flush().await?;
        Ok(())
    }
}
