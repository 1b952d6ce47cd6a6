/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 the hearth project authors
 */

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use http::{HeaderMap, HeaderName, HeaderValue, StatusCode, Version, header};
use log::trace;
use tokio::io::AsyncWrite;
use tokio::sync::Mutex;

use hearth_http::body::ChunkedEncoder;
use hearth_io::WriteFlushExt;

use super::interceptor::run_chain;
use super::listener::WriteState;
use super::{ContentSource, OutputError, OutputInterceptor, StreamChunk, WriteFlow, WriteListener};
use crate::handler::{ContinueState, HandlerError};

pub(crate) type SharedWriter = Arc<Mutex<Box<dyn AsyncWrite + Send + Unpin>>>;

/// The header crate keeps names lowercase, the wire here carries the
/// usual Title-Case so generated and application headers read alike.
fn extend_header_name(dst: &mut Vec<u8>, name: &HeaderName) {
    let mut first = true;
    for &b in name.as_str().as_bytes() {
        if first {
            dst.push(b.to_ascii_uppercase());
        } else {
            dst.push(b);
        }
        first = b == b'-';
    }
}

enum Framing {
    ContentLength(u64),
    Chunked,
    /// body ends when the connection closes, or there is no body at all
    Unframed,
}

/// Buffered, interceptable response output for one exchange.
///
/// Writes below the aggregate size are collected before they touch the
/// network; the head is committed on the first network flush. Bytes flow
/// through the interceptor chain into a single terminal stage that frames
/// them (content-length or chunked) and stages them for the endpoint
/// writer.
pub struct HttpOutput {
    writer: SharedWriter,
    version: Version,
    status: StatusCode,
    headers: HeaderMap,
    declared_content_length: Option<u64>,
    /// the request's Connection token list, rewritten in place at commit
    connection_value: Option<String>,
    server_id: Option<String>,
    close: bool,
    head_request: bool,
    continue_state: Arc<ContinueState>,
    write_timeout: Duration,

    aggregate_size: usize,
    buffer_size: usize,
    aggregate: Vec<u8>,
    staged: Vec<u8>,

    chain: Vec<Box<dyn OutputInterceptor>>,
    encoder: ChunkedEncoder,

    committed: bool,
    chunked: bool,
    discard: bool,
    closed: bool,
    failed: bool,
    need_flush: bool,

    written: u64,
    emitted: u64,
    network_flushes: u64,

    listener: Option<Box<dyn WriteListener>>,
    listener_state: WriteState,
}

impl HttpOutput {
    pub(crate) fn new(
        writer: SharedWriter,
        version: Version,
        head_request: bool,
        connection_value: Option<String>,
        server_id: Option<String>,
        close: bool,
        continue_state: Arc<ContinueState>,
        write_timeout: Duration,
        aggregate_size: usize,
        buffer_size: usize,
    ) -> Self {
        HttpOutput {
            writer,
            version,
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            declared_content_length: None,
            connection_value,
            server_id,
            close,
            head_request,
            continue_state,
            write_timeout,
            aggregate_size,
            buffer_size,
            aggregate: Vec::with_capacity(aggregate_size),
            staged: Vec::with_capacity(buffer_size),
            chain: Vec::new(),
            encoder: ChunkedEncoder::new(),
            committed: false,
            chunked: false,
            discard: false,
            closed: false,
            failed: false,
            need_flush: false,
            written: 0,
            emitted: 0,
            network_flushes: 0,
            listener: None,
            listener_state: WriteState::Idle,
        }
    }

    #[inline]
    pub fn version(&self) -> Version {
        self.version
    }

    #[inline]
    pub fn is_committed(&self) -> bool {
        self.committed
    }

    #[inline]
    pub fn will_close(&self) -> bool {
        self.close
    }

    pub fn set_close(&mut self, close: bool) {
        self.close = close;
    }

    /// bytes accepted through the write API, discarded bytes included
    #[inline]
    pub fn written(&self) -> u64 {
        self.written
    }

    /// bytes handed to the endpoint writer stage, framing excluded
    #[inline]
    pub fn emitted(&self) -> u64 {
        self.emitted
    }

    #[inline]
    pub fn network_flushes(&self) -> u64 {
        self.network_flushes
    }

    pub fn set_status(&mut self, status: StatusCode) -> Result<(), OutputError> {
        if self.committed {
            return Err(OutputError::AlreadyCommitted);
        }
        self.status = status;
        Ok(())
    }

    pub fn set_header(&mut self, name: HeaderName, value: HeaderValue) -> Result<(), OutputError> {
        if self.committed {
            return Err(OutputError::AlreadyCommitted);
        }
        self.headers.insert(name, value);
        Ok(())
    }

    pub fn set_content_length(&mut self, len: u64) -> Result<(), OutputError> {
        if self.committed {
            return Err(OutputError::AlreadyCommitted);
        }
        self.declared_content_length = Some(len);
        Ok(())
    }

    pub fn set_content_type(&mut self, mime: &mime::Mime) -> Result<(), OutputError> {
        // a mime essence is always a valid header value
        let value = HeaderValue::from_str(mime.as_ref())
            .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));
        self.set_header(header::CONTENT_TYPE, value)
    }

    /// Install a stage in front of the existing chain: the new stage sees
    /// the bytes first and forwards into whatever was there before.
    pub fn set_interceptor(&mut self, interceptor: Box<dyn OutputInterceptor>) {
        self.chain.insert(0, interceptor);
    }

    fn check_open(&self) -> Result<(), OutputError> {
        if self.failed {
            return Err(OutputError::Failed);
        }
        if self.closed {
            return Err(OutputError::Closed);
        }
        Ok(())
    }

    /// serialize the response head into the staging buffer and fix the
    /// body framing
    fn commit_to_staged(&mut self, known_len: Option<u64>) -> Result<(), OutputError> {
        debug_assert!(!self.committed);

        if self.continue_state.interim_pending() {
            // the interim 100 was never sent, the client may still hold
            // back a body nobody will read
            self.close = true;
        }

        let status = self.status;
        let bodiless =
            status.is_informational() || matches!(status, StatusCode::NO_CONTENT | StatusCode::NOT_MODIFIED);
        if bodiless || self.head_request {
            self.discard = true;
        }

        let framing = if status == StatusCode::NO_CONTENT || status.is_informational() {
            Framing::Unframed
        } else if let Some(len) = self.declared_content_length.or(known_len) {
            Framing::ContentLength(len)
        } else if status == StatusCode::NOT_MODIFIED {
            Framing::Unframed
        } else if self.version == Version::HTTP_11 {
            Framing::Chunked
        } else {
            // http/1.0 without a known length: the close delimits the body
            self.close = true;
            Framing::Unframed
        };

        let mut head = Vec::<u8>::with_capacity(256);
        let _ = write!(
            head,
            "{:?} {} {}\r\n",
            self.version,
            status.as_str(),
            status.canonical_reason().unwrap_or("Unknown"),
        );
        if let Some(id) = &self.server_id
            && !self.headers.contains_key(header::SERVER)
        {
            let _ = write!(head, "Server: {id}\r\n");
        }
        for (name, value) in self.headers.iter() {
            if name == header::CONTENT_LENGTH
                || name == header::TRANSFER_ENCODING
                || name == header::CONNECTION
            {
                continue;
            }
            extend_header_name(&mut head, name);
            head.extend_from_slice(b": ");
            head.extend_from_slice(value.as_bytes());
            head.extend_from_slice(b"\r\n");
        }
        match framing {
            Framing::ContentLength(len) => {
                head.extend_from_slice(hearth_http::header::content_length(len).as_bytes());
            }
            Framing::Chunked => {
                head.extend_from_slice(hearth_http::header::transfer_encoding_chunked().as_bytes());
                self.chunked = true;
            }
            Framing::Unframed => {}
        }
        // an application supplied Connection value keeps its other tokens,
        // only the persistence token is rewritten in place
        let app_connection = self
            .headers
            .get(header::CONNECTION)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string());
        match app_connection.as_deref().or(self.connection_value.as_deref()) {
            Some(v) => {
                let rewritten = hearth_http::header::rewrite_connection_value(v, self.close);
                let _ = write!(head, "Connection: {rewritten}\r\n");
            }
            None => {
                if self.close {
                    // http/1.0 closes by default, the header would be noise
                    if self.version == Version::HTTP_11 {
                        head.extend_from_slice(hearth_http::header::connection_as_bytes(true));
                    }
                } else if self.version == Version::HTTP_10 {
                    head.extend_from_slice(hearth_http::header::connection_as_bytes(false));
                }
            }
        }
        head.extend_from_slice(b"\r\n");

        debug_assert!(self.staged.is_empty());
        self.staged.extend_from_slice(&head);
        self.committed = true;
        self.continue_state.set_response_committed();
        trace!("response committed: {} chunked={}", status, self.chunked);
        Ok(())
    }

    /// push bytes through the interceptor chain into the staging buffer
    fn stage(&mut self, data: &[u8], last: bool) -> Result<(), OutputError> {
        if !self.committed {
            self.commit_to_staged(None)?;
        }

        let chunked = self.chunked;
        let discard = self.discard;
        let encoder = &mut self.encoder;
        let staged = &mut self.staged;
        let emitted = &mut self.emitted;
        let chain = &mut self.chain;
        let mut sink = |data: &[u8], last: bool| {
            if discard {
                return Ok(());
            }
            *emitted += data.len() as u64;
            if chunked {
                encoder.encode_chunk(data, staged);
                if last {
                    encoder.encode_end(staged);
                }
            } else {
                staged.extend_from_slice(data);
            }
            Ok(())
        };
        run_chain(chain, data, last, &mut sink)
    }

    /// The aggregation step. Never touches the network; when the commit
    /// threshold is crossed the caller must follow up with a flush.
    pub fn write_buffered(&mut self, data: &[u8]) -> Result<(), OutputError> {
        self.check_open()?;
        self.written += data.len() as u64;

        let n = self.aggregate.len();
        let l = data.len();
        if n + l <= self.aggregate_size {
            self.aggregate.extend_from_slice(data);
            return Ok(());
        }

        if n > 0 {
            let buf = std::mem::take(&mut self.aggregate);
            self.stage(&buf, false)?;
        }
        if l <= self.aggregate_size {
            self.aggregate.extend_from_slice(data);
        } else {
            // oversized write goes straight through, no copy into the
            // aggregation buffer
            self.stage(data, false)?;
        }

        self.need_flush = true;
        if self.listener_state == WriteState::Ready {
            self.listener_state = WriteState::Pending;
        }
        Ok(())
    }

    async fn flush_staged(&mut self) -> Result<(), OutputError> {
        let buf = std::mem::take(&mut self.staged);
        self.need_flush = false;
        let mut writer = self.writer.lock().await;
        match tokio::time::timeout(self.write_timeout, writer.write_all_flush(&buf)).await {
            Ok(Ok(_)) => {
                self.network_flushes += 1;
                Ok(())
            }
            Ok(Err(e)) => {
                self.failed = true;
                Err(OutputError::WriteFailed(e))
            }
            Err(_) => {
                self.failed = true;
                Err(OutputError::WriteTimeout)
            }
        }
    }

    pub async fn write(&mut self, data: &[u8]) -> Result<(), OutputError> {
        self.write_buffered(data)?;
        if self.need_flush {
            self.flush_staged().await?;
        }
        Ok(())
    }

    /// Commit (if not yet committed) and force everything buffered so far
    /// onto the network.
    pub async fn flush(&mut self) -> Result<(), OutputError> {
        self.check_open()?;
        if !self.aggregate.is_empty() {
            let buf = std::mem::take(&mut self.aggregate);
            self.stage(&buf, false)?;
        } else if !self.committed {
            self.commit_to_staged(None)?;
        }
        self.flush_staged().await
    }

    pub async fn send_content(&mut self, source: &mut dyn ContentSource) -> Result<(), OutputError> {
        loop {
            match source.next_chunk().await {
                StreamChunk::Data(data) => {
                    self.write_buffered(&data)?;
                    if self.need_flush || self.staged.len() >= self.buffer_size {
                        self.flush_staged().await?;
                    }
                }
                StreamChunk::Last(data) => {
                    self.write(&data).await?;
                    return Ok(());
                }
                StreamChunk::EndOfStream => return Ok(()),
                StreamChunk::Failed => {
                    self.failed = true;
                    return Err(OutputError::SourceFailed);
                }
            }
        }
    }

    /// Finish the response: commit with the exact length when nothing hit
    /// the network yet, run the chain with the last flag, write the
    /// chunked terminator where needed.
    pub async fn close(&mut self) -> Result<(), OutputError> {
        if self.closed {
            return Ok(());
        }
        if self.failed {
            return Err(OutputError::Failed);
        }
        if !self.committed {
            // whole body is still buffered, its exact size is known
            let len = self.aggregate.len() as u64;
            self.commit_to_staged(Some(len))?;
        }
        let buf = std::mem::take(&mut self.aggregate);
        self.stage(&buf, true)?;
        self.flush_staged().await?;
        self.closed = true;
        self.listener_state = WriteState::Closed;
        Ok(())
    }

    /// Give up on the response. Nothing more is written: for a committed
    /// chunked response the terminator is never sent, so the peer sees a
    /// truncated body when the connection closes.
    pub fn abort(&mut self) {
        self.failed = true;
        self.listener_state = WriteState::Closed;
    }

    pub fn set_write_listener(&mut self, listener: Box<dyn WriteListener>) -> Result<(), OutputError> {
        if self.listener.is_some() {
            return Err(OutputError::ListenerAlreadySet);
        }
        self.listener = Some(listener);
        self.listener_state = WriteState::Ready;
        Ok(())
    }

    /// false exactly while buffered bytes wait on a network flush
    pub fn is_ready(&self) -> bool {
        self.listener_state == WriteState::Ready
    }

    /// Serialized dispatch loop for the async write path: flush when the
    /// listener went pending, then hand control back to it. Runs until the
    /// listener completes or fails.
    pub async fn drive(&mut self) -> Result<(), HandlerError> {
        loop {
            match self.listener_state {
                WriteState::Idle | WriteState::Closed => return Ok(()),
                WriteState::Pending => {
                    if let Err(e) = self.flush_staged().await {
                        if let Some(l) = self.listener.as_mut() {
                            l.on_error(&e);
                        }
                        return Err(HandlerError::Output(e));
                    }
                    self.listener_state = WriteState::Ready;
                }
                WriteState::Ready => {
                    let Some(mut listener) = self.listener.take() else {
                        return Ok(());
                    };
                    let flow = listener.on_write_possible(self);
                    self.listener = Some(listener);
                    match flow {
                        Ok(WriteFlow::Continue) => {}
                        Ok(WriteFlow::Complete) => {
                            self.close().await.map_err(HandlerError::Output)?;
                            return Ok(());
                        }
                        Err(e) => return Err(e),
                    }
                }
            }
        }
    }
}
