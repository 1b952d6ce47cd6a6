/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 the hearth project authors
 */

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use http::Method;
use log::{debug, trace};
use tokio::io::{AsyncBufRead, AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::{Mutex, mpsc};

use hearth_http::body::HttpBodyReader;
use hearth_http::response::HttpServerResponse;
use hearth_http::route::HostMatch;

use super::pipeline::PipelineReaderTask;
use super::request::PipelinedRequest;
use crate::config::HttpServerConfig;
use crate::handler::{ContinueState, HttpHandler, ServerRequest};
use crate::output::{HttpOutput, SharedWriter};

const OPTIONS_ALLOW: &str = "GET, HEAD, POST, PUT, DELETE, OPTIONS";

enum ExchangeResult {
    Persist,
    Close,
}

/// A pipelined HTTP/1.x server engine with per-host request handlers.
pub struct HttpServer {
    config: Arc<HttpServerConfig>,
    hosts: HostMatch<Arc<dyn HttpHandler>>,
}

impl HttpServer {
    pub fn new(config: HttpServerConfig) -> Self {
        HttpServer {
            config: Arc::new(config),
            hosts: HostMatch::default(),
        }
    }

    #[inline]
    pub fn config(&self) -> &HttpServerConfig {
        &self.config
    }

    pub fn add_host(&mut self, domain: &str, handler: Arc<dyn HttpHandler>) {
        self.hosts.add_exact_domain(domain, handler);
    }

    pub fn add_host_ip(&mut self, ip: IpAddr, handler: Arc<dyn HttpHandler>) {
        self.hosts.add_exact_ip(ip, handler);
    }

    pub fn set_default_handler(&mut self, handler: Arc<dyn HttpHandler>) {
        self.hosts.set_default(handler);
    }

    pub async fn serve(self: Arc<Self>, listener: TcpListener) -> std::io::Result<()> {
        loop {
            let (stream, peer_addr) = listener.accept().await?;
            let local_addr = stream.local_addr()?;
            trace!("new connection from {peer_addr}");
            let server = Arc::clone(&self);
            tokio::spawn(async move {
                let (r, w) = stream.into_split();
                server.run_connection(r, w, peer_addr, local_addr).await;
            });
        }
    }

    /// Drive one connection to completion: requests are handled strictly
    /// in arrival order while the reader task parses ahead.
    pub async fn run_connection<R, W>(
        &self,
        reader: R,
        writer: W,
        peer_addr: SocketAddr,
        local_addr: SocketAddr,
    ) where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let (task_sender, mut task_receiver) = mpsc::channel(self.config.pipeline_size);
        let reader_task = PipelineReaderTask::new(Arc::clone(&self.config), task_sender);
        tokio::spawn(reader_task.into_running(reader));

        let writer: SharedWriter = Arc::new(Mutex::new(Box::new(writer)));
        while let Some(item) = task_receiver.recv().await {
            match item {
                Ok(req) => {
                    match self
                        .run_exchange(req, &writer, peer_addr, local_addr)
                        .await
                    {
                        ExchangeResult::Persist => {}
                        ExchangeResult::Close => break,
                    }
                }
                Err(rsp) => {
                    let mut w = writer.lock().await;
                    let _ = rsp.reply_err(&mut *w).await;
                    break;
                }
            }
        }
        drop(task_receiver);
        let mut w = writer.lock().await;
        let _ = w.shutdown().await;
    }

    async fn reply_and_close(&self, writer: &SharedWriter, rsp: HttpServerResponse) -> ExchangeResult {
        let mut w = writer.lock().await;
        let _ = rsp.reply_err(&mut *w).await;
        ExchangeResult::Close
    }

    async fn run_exchange<R>(
        &self,
        req: PipelinedRequest<R>,
        writer: &SharedWriter,
        peer_addr: SocketAddr,
        local_addr: SocketAddr,
    ) -> ExchangeResult
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        let PipelinedRequest {
            inner: head,
            time_received,
            mut body_reader,
            stream_sender,
        } = req;
        let version = head.version;
        let had_body_reader = body_reader.is_some();

        let forwarded = match self.config.forwarded.resolve(&head.headers) {
            Ok(f) => f,
            Err(e) => {
                debug!("invalid forwarding headers: {e}");
                if had_body_reader {
                    let _ = stream_sender.send(None).await;
                }
                return self
                    .reply_and_close(writer, HttpServerResponse::bad_request(version))
                    .await;
            }
        };

        // server-wide OPTIONS, never routed to a handler
        if head.method == Method::OPTIONS && head.uri == "*" {
            let close = !head.keep_alive();
            let rsp = HttpServerResponse::options_ok(version, close, OPTIONS_ALLOW);
            let mut w = writer.lock().await;
            let sent = rsp.reply_header_only(&mut *w).await.is_ok();
            drop(w);
            let result = if sent && !close {
                ExchangeResult::Persist
            } else {
                ExchangeResult::Close
            };
            if had_body_reader {
                // the reader task is waiting for its reader back
                let give_back = if matches!(result, ExchangeResult::Persist) {
                    body_reader
                } else {
                    None
                };
                let _ = stream_sender.send(give_back).await;
            }
            return result;
        }

        let authority = forwarded.authority.clone().or_else(|| head.host.clone());
        let handler = match authority
            .as_ref()
            .and_then(|a| self.hosts.get(a.host()))
            .or_else(|| self.hosts.get_default())
        {
            Some(h) => Arc::clone(h),
            None => {
                debug!("no handler for host {authority:?}");
                if had_body_reader {
                    let _ = stream_sender.send(None).await;
                }
                return self
                    .reply_and_close(
                        writer,
                        HttpServerResponse::resource_not_found(version, true),
                    )
                    .await;
            }
        };

        let body = match (body_reader.as_mut(), head.body_type()) {
            (Some(r), Some(body_type)) => {
                let stream: &mut (dyn AsyncBufRead + Send + Unpin) = r;
                Some(HttpBodyReader::new(
                    stream,
                    body_type,
                    self.config.body_line_max_len,
                ))
            }
            _ => None,
        };
        let continue_state = Arc::new(ContinueState::new(head.expect_continue()));
        let mut request = ServerRequest::new(
            &head,
            peer_addr,
            local_addr,
            forwarded,
            body,
            Arc::clone(writer),
            Arc::clone(&continue_state),
        );

        let head_request = head.method == Method::HEAD;
        let mut out = HttpOutput::new(
            Arc::clone(writer),
            version,
            head_request,
            head.connection_value().map(str::to_string),
            self.config.server_id.clone(),
            !head.keep_alive(),
            continue_state,
            self.config.send_rsp_timeout,
            self.config.output_aggregate_size,
            self.config.output_buffer_size,
        );

        let result = match handler.handle(&mut request, &mut out).await {
            Ok(()) => out.drive().await,
            Err(e) => Err(e),
        };

        let body_finished = request.body_finished();
        let continue_suppressed = request.continue_suppressed();
        drop(request);

        let result = match result {
            Ok(()) => {
                trace!(
                    "request handled in {:?}, {} bytes written",
                    time_received.elapsed(),
                    out.written(),
                );
                match out.close().await {
                    Ok(()) => {
                        let persist = !out.will_close()
                            && head.keep_alive()
                            && body_finished
                            && !continue_suppressed;
                        if persist {
                            ExchangeResult::Persist
                        } else {
                            ExchangeResult::Close
                        }
                    }
                    Err(e) => {
                        debug!("response close failed: {e}");
                        ExchangeResult::Close
                    }
                }
            }
            Err(e) => {
                debug!("handler failed: {e}");
                if out.is_committed() {
                    // the head is on the wire, the only honest signal left
                    // is an abrupt close with no chunk terminator
                    out.abort();
                    ExchangeResult::Close
                } else {
                    drop(out);
                    let rsp = HttpServerResponse::internal_server_error(version, true);
                    let mut w = writer.lock().await;
                    let _ = rsp.reply_err(&mut *w).await;
                    ExchangeResult::Close
                }
            }
        };

        if had_body_reader {
            let give_back = if matches!(result, ExchangeResult::Persist) {
                body_reader
            } else {
                None
            };
            let _ = stream_sender.send(give_back).await;
        }
        result
    }
}
