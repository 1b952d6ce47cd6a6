/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 the hearth project authors
 */

use std::io;
use std::pin::Pin;
use std::str::FromStr;
use std::task::{Context, Poll, ready};

use http::{HeaderMap, HeaderName, HeaderValue};
use tokio::io::{AsyncBufRead, AsyncRead, ReadBuf};

use super::HttpBodyType;
use crate::{ChunkSizeLine, HeaderLine};

enum NextReadType {
    EndOfFile,
    FixedLength,
    ChunkSize,
    ChunkDataEnd,
    Trailer,
}

/// Decoding body reader. Unlike a tunnel that relays the raw byte stream,
/// this strips the chunked framing so the caller only ever sees payload
/// bytes, and keeps the trailer section for inspection after the body
/// is finished.
pub struct HttpBodyReader<'a, R: ?Sized> {
    stream: &'a mut R,
    body_type: HttpBodyType,
    next_read_type: NextReadType,
    body_line_max_len: usize,

    next_read_size: usize,
    left_total_size: u64,

    line_cache: Vec<u8>,
    trailers: HeaderMap,
    /// error held back because the same poll already produced data
    pending_error: Option<io::Error>,

    finished: bool,
    read_content_length: u64,
}

impl<'a, R> HttpBodyReader<'a, R>
where
    R: AsyncBufRead + Unpin + ?Sized,
{
    const DEFAULT_LINE_SIZE: usize = 64;

    pub fn new(stream: &'a mut R, body_type: HttpBodyType, body_line_max_len: usize) -> Self {
        let mut content_length = 0u64;
        let next_read_type = match &body_type {
            HttpBodyType::ContentLength(size) => {
                content_length = *size;
                NextReadType::FixedLength
            }
            HttpBodyType::ChunkedWithoutTrailer | HttpBodyType::ChunkedWithTrailer => {
                NextReadType::ChunkSize
            }
        };
        let mut r = HttpBodyReader {
            stream,
            body_type,
            next_read_type,
            body_line_max_len,
            next_read_size: 0,
            left_total_size: content_length,
            line_cache: Vec::<u8>::with_capacity(Self::DEFAULT_LINE_SIZE),
            trailers: HeaderMap::new(),
            pending_error: None,
            finished: false,
            read_content_length: 0,
        };
        r.update_next_read_size();
        if content_length == 0 && matches!(r.next_read_type, NextReadType::FixedLength) {
            r.next_read_type = NextReadType::EndOfFile;
        }
        r
    }

    pub fn finished(&self) -> bool {
        self.finished
    }

    #[inline]
    pub fn read_content_length(&self) -> u64 {
        self.read_content_length
    }

    /// trailer fields seen after the last chunk, empty until finished
    pub fn trailers(&self) -> &HeaderMap {
        &self.trailers
    }

    pub fn take_trailers(&mut self) -> HeaderMap {
        std::mem::take(&mut self.trailers)
    }

    fn update_next_read_size(&mut self) {
        const MAX_USIZE: usize = usize::MAX;
        assert_eq!(self.next_read_size, 0);
        if self.left_total_size > MAX_USIZE as u64 {
            self.next_read_size = MAX_USIZE;
            self.left_total_size -= MAX_USIZE as u64;
        } else if self.left_total_size > 0 {
            self.next_read_size = self.left_total_size as usize;
            self.left_total_size = 0;
        }
    }

    fn poll_fixed(
        &mut self,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
        chunked: bool,
    ) -> Poll<io::Result<()>> {
        let buf_len = std::cmp::min(buf.remaining(), self.next_read_size);
        let mut limited_buf = ReadBuf::new(buf.initialize_unfilled_to(buf_len));
        ready!(Pin::new(&mut *self.stream).poll_read(cx, &mut limited_buf))?;
        let nr = limited_buf.filled().len();
        if nr == 0 {
            // io closed unexpectedly
            return Poll::Ready(Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "reader closed while reading fixed length body",
            )));
        }
        buf.advance(nr);

        self.read_content_length += nr as u64;
        self.next_read_size -= nr;

        if self.next_read_size == 0 {
            self.update_next_read_size();
            if self.next_read_size == 0 {
                // all data in this chunk/slice has been read out
                self.next_read_type = if chunked {
                    NextReadType::ChunkDataEnd
                } else {
                    NextReadType::EndOfFile
                };
            }
        }

        Poll::Ready(Ok(()))
    }

    /// read one full line (through b'\n') into the line cache, keeping
    /// partial progress across polls
    fn poll_line(&mut self, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        loop {
            let mut reader = Pin::new(&mut *self.stream);
            let cache = ready!(reader.as_mut().poll_fill_buf(cx))?;
            if cache.is_empty() {
                return Poll::Ready(Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "reader closed while reading body frame line",
                )));
            }

            match memchr::memchr(b'\n', cache) {
                Some(offset) => {
                    let nw = offset + 1;
                    if self.line_cache.len() + nw > self.body_line_max_len {
                        return Poll::Ready(Err(io::Error::new(
                            io::ErrorKind::InvalidData,
                            "body frame line too long",
                        )));
                    }
                    self.line_cache.extend_from_slice(&cache[0..nw]);
                    reader.as_mut().consume(nw);
                    return Poll::Ready(Ok(()));
                }
                None => {
                    let nw = cache.len();
                    if self.line_cache.len() + nw >= self.body_line_max_len {
                        return Poll::Ready(Err(io::Error::new(
                            io::ErrorKind::InvalidData,
                            "body frame line too long",
                        )));
                    }
                    self.line_cache.extend_from_slice(cache);
                    reader.as_mut().consume(nw);
                }
            }
        }
    }

    fn line_cache_is_empty_line(&self) -> bool {
        matches!(self.line_cache.as_slice(), b"\n" | b"\r\n")
    }

    fn parse_chunk_size(&mut self) -> io::Result<()> {
        let chunk_size = ChunkSizeLine::parse(self.line_cache.as_slice())
            .map(|chunk| chunk.chunk_size)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        self.line_cache.clear();
        if chunk_size == 0 {
            // trailer section follows the last chunk, an empty line ends it
            self.next_read_type = NextReadType::Trailer;
        } else {
            self.next_read_type = NextReadType::FixedLength;
            self.left_total_size = chunk_size;
            self.update_next_read_size();
        }
        Ok(())
    }

    fn parse_trailer_line(&mut self) -> io::Result<()> {
        let header = HeaderLine::parse(self.line_cache.as_slice())
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        let name = HeaderName::from_str(header.name)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        let value = HeaderValue::from_str(header.value)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        self.trailers.append(name, value);
        self.line_cache.clear();
        Ok(())
    }

    /// A poll that already moved bytes into `buf` must report them first,
    /// so the error is held back and surfaces on the next read.
    fn fail_or_latch(
        &mut self,
        e: io::Error,
        buf: &ReadBuf<'_>,
        start_filled: usize,
    ) -> Poll<io::Result<()>> {
        if buf.filled().len() > start_filled {
            self.pending_error = Some(e);
            Poll::Ready(Ok(()))
        } else {
            Poll::Ready(Err(e))
        }
    }

    fn poll_chunked(
        &mut self,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        if let Some(e) = self.pending_error.take() {
            return Poll::Ready(Err(e));
        }
        let start_filled = buf.filled().len();
        loop {
            match self.next_read_type {
                NextReadType::EndOfFile => {
                    self.finished = true;
                    return Poll::Ready(Ok(()));
                }
                NextReadType::FixedLength => {
                    if buf.remaining() == 0 {
                        return Poll::Ready(Ok(()));
                    }
                    match self.poll_fixed(cx, buf, true) {
                        Poll::Pending => {
                            return if buf.filled().len() > start_filled {
                                Poll::Ready(Ok(()))
                            } else {
                                Poll::Pending
                            };
                        }
                        Poll::Ready(Ok(())) => {}
                        Poll::Ready(Err(e)) => return self.fail_or_latch(e, buf, start_filled),
                    }
                }
                NextReadType::ChunkSize => match self.poll_line(cx) {
                    Poll::Pending => {
                        return if buf.filled().len() > start_filled {
                            Poll::Ready(Ok(()))
                        } else {
                            Poll::Pending
                        };
                    }
                    Poll::Ready(Ok(())) => {
                        if let Err(e) = self.parse_chunk_size() {
                            return self.fail_or_latch(e, buf, start_filled);
                        }
                    }
                    Poll::Ready(Err(e)) => return self.fail_or_latch(e, buf, start_filled),
                },
                NextReadType::ChunkDataEnd => match self.poll_line(cx) {
                    Poll::Pending => {
                        return if buf.filled().len() > start_filled {
                            Poll::Ready(Ok(()))
                        } else {
                            Poll::Pending
                        };
                    }
                    Poll::Ready(Ok(())) => {
                        if !self.line_cache_is_empty_line() {
                            let e =
                                io::Error::new(io::ErrorKind::InvalidData, "invalid chunk data ending");
                            return self.fail_or_latch(e, buf, start_filled);
                        }
                        self.line_cache.clear();
                        self.next_read_type = NextReadType::ChunkSize;
                    }
                    Poll::Ready(Err(e)) => return self.fail_or_latch(e, buf, start_filled),
                },
                NextReadType::Trailer => match self.poll_line(cx) {
                    Poll::Pending => {
                        return if buf.filled().len() > start_filled {
                            Poll::Ready(Ok(()))
                        } else {
                            Poll::Pending
                        };
                    }
                    Poll::Ready(Ok(())) => {
                        if self.line_cache_is_empty_line() {
                            self.line_cache.clear();
                            self.next_read_type = NextReadType::EndOfFile;
                        } else if let Err(e) = self.parse_trailer_line() {
                            return self.fail_or_latch(e, buf, start_filled);
                        }
                    }
                    Poll::Ready(Err(e)) => return self.fail_or_latch(e, buf, start_filled),
                },
            }
        }
    }
}

impl<'a, R> AsyncRead for HttpBodyReader<'a, R>
where
    R: AsyncBufRead + Unpin + ?Sized,
{
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.body_type {
            HttpBodyType::ContentLength(_) => match self.next_read_type {
                NextReadType::EndOfFile => {
                    self.finished = true;
                    Poll::Ready(Ok(()))
                }
                NextReadType::FixedLength => self.poll_fixed(cx, buf, false),
                _ => unreachable!(),
            },
            HttpBodyType::ChunkedWithoutTrailer | HttpBodyType::ChunkedWithTrailer => {
                self.poll_chunked(cx, buf)
            }
        }
    }
}
