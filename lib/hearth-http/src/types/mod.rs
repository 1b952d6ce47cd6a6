/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 the hearth project authors
 */

mod host;
pub use host::{Host, HostParseError};

mod host_addr;
pub use host_addr::HostAddr;
