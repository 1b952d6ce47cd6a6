/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 the hearth project authors
 */

mod connection;
pub use connection::{connection_as_bytes, rewrite_connection_value};

mod content;
pub use content::{content_length, content_type, transfer_encoding_chunked};

mod forwarded;
pub use forwarded::{
    ForwardedHeaderConfig, ForwardedPortSemantics, ForwardedResolveError, ForwardedResolution,
};
