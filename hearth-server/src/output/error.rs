/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 the hearth project authors
 */

use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("response already committed")]
    AlreadyCommitted,
    #[error("output closed")]
    Closed,
    #[error("output already failed")]
    Failed,
    #[error("content source failed")]
    SourceFailed,
    #[error("write listener already set")]
    ListenerAlreadySet,
    #[error("write failed: {0:?}")]
    WriteFailed(#[source] io::Error),
    #[error("write blocked past the configured timeout")]
    WriteTimeout,
}

impl From<io::Error> for OutputError {
    fn from(e: io::Error) -> Self {
        OutputError::WriteFailed(e)
    }
}
