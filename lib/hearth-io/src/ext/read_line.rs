/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 the hearth project authors
 */

use std::future::Future;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll, ready};

use tokio::io::AsyncBufRead;

/// Outcome of a limited line read.
#[derive(Clone, Copy, Debug)]
pub struct LineRecv {
    /// whether the delimiter was found within the limit
    pub complete: bool,
    /// number of bytes appended to the caller's buffer
    pub len: usize,
}

pub struct ReadLineLimited<'a, R: ?Sized> {
    reader: &'a mut R,
    delimiter: u8,
    limit: usize,
    buf: &'a mut Vec<u8>,
    read: usize,
}

impl<'a, R> ReadLineLimited<'a, R>
where
    R: AsyncBufRead + ?Sized + Unpin,
{
    pub(super) fn new(reader: &'a mut R, delimiter: u8, max_len: usize, buf: &'a mut Vec<u8>) -> Self {
        ReadLineLimited {
            reader,
            delimiter,
            limit: max_len,
            buf,
            read: 0,
        }
    }
}

fn read_line_internal<R: AsyncBufRead + ?Sized>(
    mut reader: Pin<&mut R>,
    cx: &mut Context<'_>,
    delimiter: u8,
    limit: usize,
    buf: &mut Vec<u8>,
    read: &mut usize,
) -> Poll<io::Result<LineRecv>> {
    loop {
        let (found, used) = {
            let available = ready!(reader.as_mut().poll_fill_buf(cx))?;
            if available.is_empty() {
                // clean close before the delimiter
                return Poll::Ready(Ok(LineRecv {
                    complete: false,
                    len: *read,
                }));
            }
            let left = limit - *read;
            if let Some(i) = memchr::memchr(delimiter, available) {
                if i >= left {
                    (false, left)
                } else {
                    buf.extend_from_slice(&available[..=i]);
                    (true, i + 1)
                }
            } else if available.len() >= left {
                (false, left)
            } else {
                buf.extend_from_slice(available);
                (false, available.len())
            }
        };
        if found {
            reader.as_mut().consume(used);
            *read += used;
            return Poll::Ready(Ok(LineRecv {
                complete: true,
                len: *read,
            }));
        }
        if *read + used >= limit {
            // limit reached, leave the partial tail unconsumed
            return Poll::Ready(Ok(LineRecv {
                complete: false,
                len: *read + used,
            }));
        }
        reader.as_mut().consume(used);
        *read += used;
    }
}

impl<R: AsyncBufRead + ?Sized + Unpin> Future for ReadLineLimited<'_, R> {
    type Output = io::Result<LineRecv>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let Self {
            reader,
            delimiter,
            limit,
            buf,
            read,
        } = &mut *self;
        read_line_internal(Pin::new(reader), cx, *delimiter, *limit, buf, read)
    }
}
