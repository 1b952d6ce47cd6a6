/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 the hearth project authors
 */

mod reader;
pub use reader::HttpBodyReader;

mod encoder;
pub use encoder::ChunkedEncoder;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpBodyType {
    ContentLength(u64),
    ChunkedWithoutTrailer,
    ChunkedWithTrailer,
}
