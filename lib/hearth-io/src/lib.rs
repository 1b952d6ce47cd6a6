/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 the hearth project authors
 */

mod ext;
pub use ext::{BufReadLineExt, LineRecv, WriteFlushExt};
