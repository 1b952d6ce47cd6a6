/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 the hearth project authors
 */

use std::future::Future;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll, ready};

use tokio::io::AsyncBufRead;

pub struct WaitReadable<'a, R: ?Sized> {
    reader: &'a mut R,
}

impl<'a, R> WaitReadable<'a, R>
where
    R: AsyncBufRead + ?Sized + Unpin,
{
    pub(super) fn new(reader: &'a mut R) -> Self {
        WaitReadable { reader }
    }
}

impl<R: AsyncBufRead + ?Sized + Unpin> Future for WaitReadable<'_, R> {
    type Output = io::Result<bool>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let buf = ready!(Pin::new(&mut *self.reader).poll_fill_buf(cx))?;
        Poll::Ready(Ok(!buf.is_empty()))
    }
}
