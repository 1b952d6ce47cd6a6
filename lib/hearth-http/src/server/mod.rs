/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 the hearth project authors
 */

mod error;
pub use error::HttpRequestParseError;

mod request;
pub use request::HttpServerRequest;
