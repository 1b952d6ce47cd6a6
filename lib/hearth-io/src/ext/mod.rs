/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 the hearth project authors
 */

use tokio::io::{AsyncBufRead, AsyncWrite};

mod read_line;
use read_line::ReadLineLimited;
pub use read_line::LineRecv;

mod wait_readable;
use wait_readable::WaitReadable;

mod write_all_flush;
use write_all_flush::WriteAllFlush;

pub trait BufReadLineExt: AsyncBufRead {
    /// Read until `delimiter` is seen or `max_len` bytes have been copied
    /// into `buf`, whichever comes first.
    fn read_line_limited<'a>(
        &'a mut self,
        delimiter: u8,
        max_len: usize,
        buf: &'a mut Vec<u8>,
    ) -> ReadLineLimited<'a, Self>
    where
        Self: Unpin,
    {
        ReadLineLimited::new(self, delimiter, max_len, buf)
    }

    /// Resolve to Ok(true) once buffered data is available, Ok(false) on a
    /// clean close before any data.
    fn wait_readable(&mut self) -> WaitReadable<'_, Self>
    where
        Self: Unpin,
    {
        WaitReadable::new(self)
    }
}

impl<R: AsyncBufRead + ?Sized> BufReadLineExt for R {}

pub trait WriteFlushExt: AsyncWrite {
    fn write_all_flush<'a>(&'a mut self, buf: &'a [u8]) -> WriteAllFlush<'a, Self>
    where
        Self: Unpin,
    {
        WriteAllFlush::new(self, buf)
    }
}

impl<W: AsyncWrite + ?Sized> WriteFlushExt for W {}
