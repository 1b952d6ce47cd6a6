/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 the hearth project authors
 */

use std::io::Write;

/// Buffer level chunk framing for response bodies. The caller decides
/// when to cut a chunk, so one encoded chunk maps to one data buffer.
#[derive(Default)]
pub struct ChunkedEncoder {
    total_write: u64,
}

impl ChunkedEncoder {
    pub fn new() -> Self {
        ChunkedEncoder::default()
    }

    #[inline]
    pub fn total_write(&self) -> u64 {
        self.total_write
    }

    /// frame one non-empty data chunk, empty input emits nothing as an
    /// empty chunk would terminate the body
    pub fn encode_chunk(&mut self, data: &[u8], buf: &mut Vec<u8>) {
        if data.is_empty() {
            return;
        }
        let _ = write!(buf, "{:x}\r\n", data.len());
        buf.extend_from_slice(data);
        buf.extend_from_slice(b"\r\n");
        self.total_write += data.len() as u64;
    }

    pub fn encode_end(&mut self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(b"0\r\n\r\n");
    }
}
