/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 the hearth project authors
 */

use std::time::Duration;

use hearth_http::header::ForwardedHeaderConfig;

const DEFAULT_OUTPUT_AGGREGATE_SIZE: usize = 1024;
const DEFAULT_OUTPUT_BUFFER_SIZE: usize = 4096;

#[derive(Clone, Debug)]
pub struct HttpServerConfig {
    pub server_id: Option<String>,
    pub req_hdr_max_size: usize,
    pub body_line_max_len: usize,
    /// size below which response writes are aggregated before hitting
    /// the network, the "commit size"
    pub output_aggregate_size: usize,
    pub output_buffer_size: usize,
    pub pipeline_size: usize,
    pub pipeline_read_idle_timeout: Duration,
    pub recv_req_header_timeout: Duration,
    /// how long one blocked network flush of response bytes may stall
    pub send_rsp_timeout: Duration,
    pub forwarded: ForwardedHeaderConfig,
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        HttpServerConfig {
            server_id: None,
            req_hdr_max_size: 65536,
            body_line_max_len: 8192,
            output_aggregate_size: DEFAULT_OUTPUT_AGGREGATE_SIZE,
            output_buffer_size: DEFAULT_OUTPUT_BUFFER_SIZE,
            pipeline_size: 10,
            pipeline_read_idle_timeout: Duration::from_secs(300),
            recv_req_header_timeout: Duration::from_secs(30),
            send_rsp_timeout: Duration::from_secs(60),
            forwarded: ForwardedHeaderConfig::default(),
        }
    }
}

impl HttpServerConfig {
    pub fn set_server_id(&mut self, id: impl Into<String>) {
        self.server_id = Some(id.into());
    }

    pub fn set_req_hdr_max_size(&mut self, size: usize) {
        self.req_hdr_max_size = size;
    }

    pub fn set_body_line_max_len(&mut self, len: usize) {
        self.body_line_max_len = len;
    }

    pub fn set_output_aggregate_size(&mut self, size: usize) {
        self.output_aggregate_size = size;
    }

    pub fn set_output_buffer_size(&mut self, size: usize) {
        self.output_buffer_size = size;
    }

    pub fn set_pipeline_size(&mut self, size: usize) {
        self.pipeline_size = size.max(1);
    }

    pub fn set_pipeline_read_idle_timeout(&mut self, timeout: Duration) {
        self.pipeline_read_idle_timeout = timeout;
    }

    pub fn set_recv_req_header_timeout(&mut self, timeout: Duration) {
        self.recv_req_header_timeout = timeout;
    }

    pub fn set_send_rsp_timeout(&mut self, timeout: Duration) {
        self.send_rsp_timeout = timeout;
    }

    pub fn set_forwarded_config(&mut self, config: ForwardedHeaderConfig) {
        self.forwarded = config;
    }
}
