/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 the hearth project authors
 */

use std::sync::Arc;

use http::{StatusCode, Version};
use log::{debug, trace};
use tokio::io::{AsyncRead, BufReader};
use tokio::sync::mpsc;

use hearth_http::response::HttpServerResponse;
use hearth_http::server::HttpRequestParseError;
use hearth_io::BufReadLineExt;

use super::request::PipelinedRequest;
use crate::config::HttpServerConfig;

/// Read side of a connection: parses requests ahead of the writer task
/// up to the pipeline depth and queues them for in-order handling.
pub(crate) struct PipelineReaderTask<R> {
    config: Arc<HttpServerConfig>,
    task_queue: mpsc::Sender<Result<PipelinedRequest<R>, HttpServerResponse>>,
    stream_sender: mpsc::Sender<Option<BufReader<R>>>,
    stream_receiver: mpsc::Receiver<Option<BufReader<R>>>,
}

impl<R> PipelineReaderTask<R>
where
    R: AsyncRead + Send + Unpin,
{
    pub(crate) fn new(
        config: Arc<HttpServerConfig>,
        task_queue: mpsc::Sender<Result<PipelinedRequest<R>, HttpServerResponse>>,
    ) -> Self {
        let (stream_sender, stream_receiver) = mpsc::channel(1);
        PipelineReaderTask {
            config,
            task_queue,
            stream_sender,
            stream_receiver,
        }
    }

    pub(crate) async fn into_running(mut self, reader: R) {
        let mut reader = Some(BufReader::new(reader));
        loop {
            let Some(mut r) = reader.take() else {
                break;
            };
            tokio::select! {
                biased;
                _ = self.task_queue.closed() => {
                    trace!("writer side closed, quit pipeline reader");
                    break;
                }
                ret = tokio::time::timeout(
                    self.config.pipeline_read_idle_timeout,
                    r.wait_readable(),
                ) => {
                    match ret {
                        Ok(Ok(true)) => {}
                        Ok(Ok(false)) => {
                            trace!("connection closed by client");
                            break;
                        }
                        Ok(Err(e)) => {
                            trace!("connection read failed: {e:?}");
                            break;
                        }
                        Err(_) => {
                            debug!("connection idle timeout");
                            break;
                        }
                    }
                    reader = self.read_request(r).await;
                }
            }
        }
    }

    async fn read_request(&mut self, reader: BufReader<R>) -> Option<BufReader<R>> {
        let mut version = Version::HTTP_11;
        let parse = PipelinedRequest::parse(
            &self.config,
            reader,
            self.stream_sender.clone(),
            &mut version,
        );
        match tokio::time::timeout(self.config.recv_req_header_timeout, parse).await {
            Ok(Ok((req, kept_reader))) => {
                let keep_alive = req.inner.keep_alive();
                if self.task_queue.send(Ok(req)).await.is_err() {
                    return None;
                }
                if !keep_alive {
                    // the client asked for close, no more requests follow
                    return None;
                }
                match kept_reader {
                    Some(r) => Some(r),
                    None => self.wait_reader_back().await,
                }
            }
            Ok(Err(e)) => {
                match e {
                    HttpRequestParseError::ClientClosed => {}
                    HttpRequestParseError::IoFailed(_) => {}
                    _ => {
                        debug!("invalid request: {e}");
                        if let Some(rsp) = HttpServerResponse::from_request_error(&e, version) {
                            let _ = self.task_queue.send(Err(rsp)).await;
                        }
                    }
                }
                None
            }
            Err(_) => {
                debug!("timeout while reading request header");
                let rsp = HttpServerResponse::from_standard(
                    StatusCode::REQUEST_TIMEOUT,
                    version,
                    true,
                );
                let _ = self.task_queue.send(Err(rsp)).await;
                None
            }
        }
    }

    /// The writer task returns the reader once the request body has been
    /// fully consumed, or sends back None when the connection must close.
    async fn wait_reader_back(&mut self) -> Option<BufReader<R>> {
        tokio::select! {
            biased;
            r = self.stream_receiver.recv() => r.flatten(),
            _ = self.task_queue.closed() => None,
        }
    }
}
