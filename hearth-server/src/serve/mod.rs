/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 the hearth project authors
 */

mod request;

mod pipeline;

mod server;
pub use server::HttpServer;
