/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 the hearth project authors
 */

use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt};

/// One piece of response content. `EndOfStream` and `Failed` are terminal:
/// a source that has yielded one keeps yielding it on every later poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamChunk {
    Data(Bytes),
    Last(Bytes),
    EndOfStream,
    Failed,
}

#[async_trait]
pub trait ContentSource: Send {
    async fn next_chunk(&mut self) -> StreamChunk;
}

/// A single in-memory payload.
pub struct BytesSource {
    data: Option<Bytes>,
}

impl BytesSource {
    pub fn new(data: Bytes) -> Self {
        BytesSource { data: Some(data) }
    }

    pub fn remaining(&self) -> Option<u64> {
        self.data.as_ref().map(|d| d.len() as u64)
    }
}

#[async_trait]
impl ContentSource for BytesSource {
    async fn next_chunk(&mut self) -> StreamChunk {
        match self.data.take() {
            Some(data) => StreamChunk::Last(data),
            None => StreamChunk::EndOfStream,
        }
    }
}

enum ReaderSourceState {
    Streaming,
    EndOfStream,
    Failed,
}

/// Streams from any `AsyncRead` in buffer sized pieces.
pub struct ReaderSource<'a> {
    reader: &'a mut (dyn AsyncRead + Send + Unpin),
    buf_size: usize,
    state: ReaderSourceState,
}

impl<'a> ReaderSource<'a> {
    pub fn new(reader: &'a mut (dyn AsyncRead + Send + Unpin), buf_size: usize) -> Self {
        ReaderSource {
            reader,
            buf_size,
            state: ReaderSourceState::Streaming,
        }
    }
}

#[async_trait]
impl ContentSource for ReaderSource<'_> {
    async fn next_chunk(&mut self) -> StreamChunk {
        match self.state {
            ReaderSourceState::EndOfStream => return StreamChunk::EndOfStream,
            ReaderSourceState::Failed => return StreamChunk::Failed,
            ReaderSourceState::Streaming => {}
        }

        let mut buf = vec![0u8; self.buf_size];
        match self.reader.read(&mut buf).await {
            Ok(0) => {
                self.state = ReaderSourceState::EndOfStream;
                StreamChunk::EndOfStream
            }
            Ok(n) => {
                buf.truncate(n);
                StreamChunk::Data(Bytes::from(buf))
            }
            Err(_) => {
                self.state = ReaderSourceState::Failed;
                StreamChunk::Failed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn bytes_source_terminal_is_sticky() {
        let mut source = BytesSource::new(Bytes::from_static(b"hello"));
        assert_eq!(source.remaining(), Some(5));
        assert_eq!(
            source.next_chunk().await,
            StreamChunk::Last(Bytes::from_static(b"hello"))
        );
        assert_eq!(source.next_chunk().await, StreamChunk::EndOfStream);
        assert_eq!(source.next_chunk().await, StreamChunk::EndOfStream);
    }

    #[tokio::test]
    async fn reader_source_terminal_is_sticky() {
        let mut data: &[u8] = b"abc";
        let mut source = ReaderSource::new(&mut data, 16);
        assert_eq!(
            source.next_chunk().await,
            StreamChunk::Data(Bytes::from_static(b"abc"))
        );
        assert_eq!(source.next_chunk().await, StreamChunk::EndOfStream);
        assert_eq!(source.next_chunk().await, StreamChunk::EndOfStream);
    }
}
