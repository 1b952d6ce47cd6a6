/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 the hearth project authors
 */

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use http::{HeaderMap, Method, Uri, Version};
use tokio::io::{AsyncBufRead, AsyncReadExt};

use hearth_http::body::HttpBodyReader;
use hearth_http::header::ForwardedResolution;
use hearth_http::response::HttpServerResponse;
use hearth_http::server::HttpServerRequest;
use hearth_http::HostAddr;

use crate::output::{HttpOutput, OutputError, SharedWriter};

#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    #[error("output failed: {0}")]
    Output(#[from] OutputError),
    #[error("read body failed: {0:?}")]
    ReadBodyFailed(io::Error),
    #[error("io failed: {0:?}")]
    IoFailed(#[from] io::Error),
    #[error("internal error: {0}")]
    Internal(String),
}

/// Exchange state shared between the request side and the response
/// output. The interim 100 must never be written once the real response
/// head is on the wire, and a response committed while the interim is
/// still owed can no longer keep the connection alive.
pub(crate) struct ContinueState {
    interim_pending: AtomicBool,
    response_committed: AtomicBool,
}

impl ContinueState {
    pub(crate) fn new(expect_continue: bool) -> Self {
        ContinueState {
            interim_pending: AtomicBool::new(expect_continue),
            response_committed: AtomicBool::new(false),
        }
    }

    #[inline]
    pub(crate) fn interim_pending(&self) -> bool {
        self.interim_pending.load(Ordering::Relaxed)
    }

    #[inline]
    pub(crate) fn set_interim_sent(&self) {
        self.interim_pending.store(false, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn response_committed(&self) -> bool {
        self.response_committed.load(Ordering::Relaxed)
    }

    #[inline]
    pub(crate) fn set_response_committed(&self) {
        self.response_committed.store(true, Ordering::Relaxed);
    }
}

/// One request as a handler sees it: the parsed head, the resolved
/// forwarding info, and the (possibly empty) body stream.
pub struct ServerRequest<'a> {
    head: &'a HttpServerRequest,
    peer_addr: SocketAddr,
    local_addr: SocketAddr,
    forwarded: ForwardedResolution,
    body: Option<HttpBodyReader<'a, dyn AsyncBufRead + Send + Unpin>>,
    writer: SharedWriter,
    continue_state: Arc<ContinueState>,
}

impl<'a> ServerRequest<'a> {
    pub(crate) fn new(
        head: &'a HttpServerRequest,
        peer_addr: SocketAddr,
        local_addr: SocketAddr,
        forwarded: ForwardedResolution,
        body: Option<HttpBodyReader<'a, dyn AsyncBufRead + Send + Unpin>>,
        writer: SharedWriter,
        continue_state: Arc<ContinueState>,
    ) -> Self {
        ServerRequest {
            head,
            peer_addr,
            local_addr,
            forwarded,
            body,
            writer,
            continue_state,
        }
    }

    #[inline]
    pub fn method(&self) -> &Method {
        &self.head.method
    }

    #[inline]
    pub fn uri(&self) -> &Uri {
        &self.head.uri
    }

    #[inline]
    pub fn version(&self) -> Version {
        self.head.version
    }

    #[inline]
    pub fn headers(&self) -> &HeaderMap {
        &self.head.headers
    }

    /// the effective authority: a proxy declared host wins over the
    /// request's own Host
    pub fn authority(&self) -> Option<&HostAddr> {
        self.forwarded.authority.as_ref().or(self.head.host.as_ref())
    }

    #[inline]
    pub fn forwarded(&self) -> &ForwardedResolution {
        &self.forwarded
    }

    #[inline]
    pub fn is_secure(&self) -> bool {
        self.forwarded.secure
    }

    pub fn scheme(&self) -> &str {
        match &self.forwarded.scheme {
            Some(s) => s.as_str(),
            None => {
                if self.forwarded.secure {
                    "https"
                } else {
                    "http"
                }
            }
        }
    }

    /// the effective client address, socket peer unless a proxy told us
    /// otherwise
    pub fn remote(&self) -> HostAddr {
        match &self.forwarded.remote {
            Some(addr) => addr.clone(),
            None => HostAddr::from(self.peer_addr),
        }
    }

    #[inline]
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    #[inline]
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    #[inline]
    pub fn has_body(&self) -> bool {
        self.body.is_some()
    }

    /// true when the client still waits on a 100 that was never sent
    #[inline]
    pub(crate) fn continue_suppressed(&self) -> bool {
        self.continue_state.interim_pending()
    }

    async fn send_continue(&mut self) -> Result<(), HandlerError> {
        if self.continue_state.response_committed() {
            // the real response head is already out, an interim injected
            // now would land inside its body
            return Ok(());
        }
        let mut writer = self.writer.lock().await;
        HttpServerResponse::reply_continue(self.head.version, &mut *writer)
            .await
            .map_err(HandlerError::IoFailed)?;
        drop(writer);
        self.continue_state.set_interim_sent();
        Ok(())
    }

    /// Read the next piece of request body. The interim 100 response is
    /// sent lazily on the first read, so a handler that never touches the
    /// body never triggers it.
    pub async fn read_body_chunk(&mut self, buf: &mut [u8]) -> Result<usize, HandlerError> {
        if self.continue_state.interim_pending() {
            self.send_continue().await?;
        }
        match self.body.as_mut() {
            Some(reader) => reader.read(buf).await.map_err(HandlerError::ReadBodyFailed),
            None => Ok(0),
        }
    }

    pub async fn read_body_to_end(&mut self) -> Result<Vec<u8>, HandlerError> {
        if self.continue_state.interim_pending() {
            self.send_continue().await?;
        }
        let mut body = Vec::new();
        if let Some(reader) = self.body.as_mut() {
            reader
                .read_to_end(&mut body)
                .await
                .map_err(HandlerError::ReadBodyFailed)?;
        }
        Ok(body)
    }

    pub fn body_finished(&self) -> bool {
        match &self.body {
            Some(reader) => reader.finished(),
            None => true,
        }
    }

    /// trailers received after a chunked body, empty until the body is
    /// fully read
    pub fn trailers(&self) -> Option<&HeaderMap> {
        self.body.as_ref().map(|r| r.trailers())
    }
}

/// The application seam: one handler per virtual host serves every
/// request routed to it.
#[async_trait]
pub trait HttpHandler: Send + Sync {
    async fn handle(
        &self,
        req: &mut ServerRequest<'_>,
        out: &mut HttpOutput,
    ) -> Result<(), HandlerError>;
}
