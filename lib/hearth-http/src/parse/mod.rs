/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 the hearth project authors
 */

mod error;
pub use error::LineParseError;

mod request_line;
pub use request_line::RequestLine;

mod header_line;
pub use header_line::HeaderLine;

mod chunk_size_line;
pub use chunk_size_line::ChunkSizeLine;
