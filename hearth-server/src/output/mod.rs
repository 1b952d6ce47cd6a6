/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 the hearth project authors
 */

mod error;
pub use error::OutputError;

mod source;
pub use source::{BytesSource, ContentSource, ReaderSource, StreamChunk};

mod interceptor;
pub use interceptor::{Forward, GzipOutputInterceptor, OutputInterceptor};

mod listener;
pub use listener::{WriteFlow, WriteListener};

mod http_output;
pub(crate) use http_output::SharedWriter;
pub use http_output::HttpOutput;
