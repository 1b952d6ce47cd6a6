/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 the hearth project authors
 */

use super::{HttpOutput, OutputError};
use crate::handler::HandlerError;

/// What a write listener wants next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteFlow {
    /// call again once the output is ready for more bytes
    Continue,
    /// response content fully produced, the engine will close the output
    Complete,
}

/// State of the async write path. `Pending` means buffered bytes need a
/// network flush before the listener may produce more; `is_ready()` is
/// false for exactly that window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WriteState {
    Idle,
    Ready,
    Pending,
    Closed,
}

/// Callback driven content producer. `on_write_possible` runs serialized
/// on the exchange task: it is never re-entered, and each invocation sees
/// `is_ready() == true` on entry.
pub trait WriteListener: Send {
    fn on_write_possible(&mut self, out: &mut HttpOutput) -> Result<WriteFlow, HandlerError>;

    fn on_error(&mut self, _e: &OutputError) {}
}
