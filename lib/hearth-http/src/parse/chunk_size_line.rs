/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 the hearth project authors
 */

use atoi::FromRadix16;

use super::LineParseError;

pub struct ChunkSizeLine<'a> {
    pub chunk_size: u64,
    pub extension: Option<&'a str>,
}

impl<'a> ChunkSizeLine<'a> {
    pub fn parse(buf: &'a [u8]) -> Result<ChunkSizeLine<'a>, LineParseError> {
        let (chunk_size, offset) = u64::from_radix_16(buf);
        if offset == 0 {
            return Err(LineParseError::InvalidChunkSize);
        }

        if buf.len() == offset {
            return Err(LineParseError::NotLongEnough);
        }

        match buf[offset] {
            b'\r' | b'\n' => Ok(ChunkSizeLine {
                chunk_size,
                extension: None,
            }),
            b';' => {
                let extension = std::str::from_utf8(&buf[offset + 1..])
                    .map_err(LineParseError::InvalidUtf8Encoding)?
                    .trim();
                Ok(ChunkSizeLine {
                    chunk_size,
                    extension: Some(extension),
                })
            }
            _ => Err(LineParseError::InvalidChunkSize),
        }
    }
}
