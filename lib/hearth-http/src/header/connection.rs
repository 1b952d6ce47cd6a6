/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 the hearth project authors
 */

pub const fn connection_as_bytes(close: bool) -> &'static [u8] {
    if close {
        b"Connection: Close\r\n"
    } else {
        b"Connection: Keep-Alive\r\n"
    }
}

/// Rewrite a `Connection` token list in place for the negotiated
/// persistence mode.
///
/// Token order and unrelated tokens are preserved. When closing,
/// `keep-alive` tokens are stripped and a `close` token is kept or
/// appended; when persisting, `close` tokens are stripped.
pub fn rewrite_connection_value(original: &str, close: bool) -> String {
    let mut tokens = Vec::new();
    let mut has_close = false;
    for v in original.split(',') {
        let t = v.trim();
        if t.is_empty() {
            continue;
        }
        if t.eq_ignore_ascii_case("keep-alive") {
            if !close {
                tokens.push(t);
            }
            continue;
        }
        if t.eq_ignore_ascii_case("close") {
            if close {
                has_close = true;
                tokens.push(t);
            }
            continue;
        }
        tokens.push(t);
    }
    if close && !has_close {
        tokens.push("close");
    }
    tokens.join(", ")
}
