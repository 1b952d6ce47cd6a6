/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 the hearth project authors
 */

//! An embeddable HTTP/1.x server engine.
//!
//! The engine pairs a pipelining connection state machine with a
//! buffered, interceptable response output. Requests are parsed ahead on
//! a reader task and handled strictly in order on the connection task;
//! responses aggregate small writes until a commit threshold, then flow
//! through an interceptor chain into one terminal network stage.

mod config;
pub use config::HttpServerConfig;

mod handler;
pub use handler::{HandlerError, HttpHandler, ServerRequest};

pub mod output;

mod serve;
pub use serve::HttpServer;
