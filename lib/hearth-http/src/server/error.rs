/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 the hearth project authors
 */

use std::io;

use http::{StatusCode, Version};
use thiserror::Error;

use crate::LineParseError;
use crate::header::ForwardedResolveError;

#[derive(Debug, Error)]
pub enum HttpRequestParseError {
    #[error("client closed")]
    ClientClosed,
    #[error("too large header, should be less than {0}")]
    TooLargeHeader(usize),
    #[error("too long request line, should be less than {0}")]
    TooLongRequestLine(usize),
    #[error("invalid request line: {0}")]
    InvalidRequestLine(LineParseError),
    #[error("unsupported method: {0}")]
    UnsupportedMethod(String),
    #[error("unsupported version: {0:?}")]
    UnsupportedVersion(Version),
    #[error("invalid request target")]
    InvalidRequestTarget,
    #[error("invalid header line: {0}")]
    InvalidHeaderLine(LineParseError),
    #[error("invalid host header")]
    InvalidHost,
    #[error("missed host header")]
    MissedHost,
    #[error("invalid chunked transfer-encoding")]
    InvalidChunkedTransferEncoding,
    #[error("invalid content length")]
    InvalidContentLength,
    #[error("unmet expectation: {0}")]
    UnmetExpectation(String),
    #[error("invalid forwarded header: {0}")]
    InvalidForwardedHeader(#[from] ForwardedResolveError),
    #[error("upgrade is not supported")]
    UpgradeIsNotSupported,
    #[error("io failed: {0:?}")]
    IoFailed(#[from] io::Error),
}

impl HttpRequestParseError {
    /// the status code of the canned error response, None means the
    /// connection should just be dropped with no response
    pub fn status_code(&self) -> Option<StatusCode> {
        match self {
            HttpRequestParseError::IoFailed(_) | HttpRequestParseError::ClientClosed => None,
            HttpRequestParseError::TooLargeHeader(_) => {
                Some(StatusCode::REQUEST_HEADER_FIELDS_TOO_LARGE)
            }
            HttpRequestParseError::TooLongRequestLine(_) => Some(StatusCode::URI_TOO_LONG),
            HttpRequestParseError::UnsupportedVersion(_) => {
                Some(StatusCode::HTTP_VERSION_NOT_SUPPORTED)
            }
            HttpRequestParseError::UpgradeIsNotSupported
            | HttpRequestParseError::UnsupportedMethod(_) => Some(StatusCode::NOT_IMPLEMENTED),
            HttpRequestParseError::UnmetExpectation(_) => Some(StatusCode::EXPECTATION_FAILED),
            _ => Some(StatusCode::BAD_REQUEST),
        }
    }
}
