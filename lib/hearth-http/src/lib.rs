/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 the hearth project authors
 */

//! HTTP/1.1 wire-protocol support for the hearth server engine: line
//! parsers, request head parsing, body decoding, chunk framing, response
//! head generation and forwarded-header resolution.

mod parse;
pub use parse::{ChunkSizeLine, HeaderLine, LineParseError, RequestLine};

mod types;
pub use types::{Host, HostAddr, HostParseError};

pub mod route;

pub mod header;

pub mod server;

pub mod body;
pub use body::HttpBodyType;

pub mod response;
