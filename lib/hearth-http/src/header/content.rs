/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 the hearth project authors
 */

use mime::Mime;

pub fn content_length(len: u64) -> String {
    let mut buf = itoa::Buffer::new();
    format!("Content-Length: {}\r\n", buf.format(len))
}

pub fn content_type(mime: &Mime) -> String {
    format!("Content-Type: {mime}\r\n")
}

pub const fn transfer_encoding_chunked() -> &'static str {
    "Transfer-Encoding: chunked\r\n"
}
