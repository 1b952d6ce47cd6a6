/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 the hearth project authors
 */

use std::time::Instant;

use http::Version;
use tokio::io::{AsyncRead, BufReader};
use tokio::sync::mpsc;

use hearth_http::server::{HttpRequestParseError, HttpServerRequest};

use crate::config::HttpServerConfig;

/// A parsed request travelling from the pipeline reader task to the
/// writer task. When the request has a body the buffered reader travels
/// with it and comes back through `stream_sender` once the body is done.
pub(crate) struct PipelinedRequest<R> {
    pub(crate) inner: HttpServerRequest,
    pub(crate) time_received: Instant,
    pub(crate) body_reader: Option<BufReader<R>>,
    pub(crate) stream_sender: mpsc::Sender<Option<BufReader<R>>>,
}

impl<R> PipelinedRequest<R>
where
    R: AsyncRead + Unpin,
{
    /// Returns the reader alongside the request when it stays with the
    /// reader task, or embeds it in the request when the body (or an
    /// unsafe method) forbids read-ahead.
    pub(crate) async fn parse(
        config: &HttpServerConfig,
        mut reader: BufReader<R>,
        stream_sender: mpsc::Sender<Option<BufReader<R>>>,
        version: &mut Version,
    ) -> Result<(Self, Option<BufReader<R>>), HttpRequestParseError> {
        let inner =
            HttpServerRequest::parse(&mut reader, config.req_hdr_max_size, version).await?;
        let mut req = PipelinedRequest {
            inner,
            time_received: Instant::now(),
            body_reader: None,
            stream_sender,
        };
        if req.inner.pipeline_safe() {
            Ok((req, Some(reader)))
        } else {
            req.body_reader = Some(reader);
            Ok((req, None))
        }
    }
}
