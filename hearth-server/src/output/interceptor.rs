/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 the hearth project authors
 */

use std::io::Write;

use flate2::Compression;
use flate2::write::GzEncoder;

use super::OutputError;

pub type Forward<'a> = dyn FnMut(&[u8], bool) -> Result<(), OutputError> + 'a;

/// A synchronous transform stage in the output chain. A stage must either
/// pass (possibly transformed) bytes on through `forward`, or hold them
/// back until a later call; the `last` flag must reach the next stage
/// exactly once.
pub trait OutputInterceptor: Send {
    fn intercept(
        &mut self,
        data: &[u8],
        last: bool,
        forward: &mut Forward<'_>,
    ) -> Result<(), OutputError>;
}

/// Run `data` through the stages in order, ending in `sink` which hands
/// the bytes to the endpoint writer stage.
pub(crate) fn run_chain(
    stages: &mut [Box<dyn OutputInterceptor>],
    data: &[u8],
    last: bool,
    sink: &mut Forward<'_>,
) -> Result<(), OutputError> {
    match stages.split_first_mut() {
        Some((head, rest)) => {
            let mut forward =
                |data: &[u8], last: bool| run_chain(&mut *rest, data, last, &mut *sink);
            head.intercept(data, last, &mut forward)
        }
        None => sink(data, last),
    }
}

/// Reference transforming stage: gzip via flate2. Compressed bytes are
/// forwarded as they become available, the gzip trailer goes out with the
/// last chunk.
pub struct GzipOutputInterceptor {
    encoder: Option<GzEncoder<Vec<u8>>>,
}

impl Default for GzipOutputInterceptor {
    fn default() -> Self {
        GzipOutputInterceptor {
            encoder: Some(GzEncoder::new(Vec::new(), Compression::default())),
        }
    }
}

impl GzipOutputInterceptor {
    pub fn new() -> Self {
        GzipOutputInterceptor::default()
    }
}

impl OutputInterceptor for GzipOutputInterceptor {
    fn intercept(
        &mut self,
        data: &[u8],
        last: bool,
        forward: &mut Forward<'_>,
    ) -> Result<(), OutputError> {
        let Some(mut encoder) = self.encoder.take() else {
            return Err(OutputError::Closed);
        };
        encoder.write_all(data)?;
        if last {
            let compressed = encoder.finish()?;
            forward(&compressed, true)
        } else {
            encoder.flush()?;
            let compressed = std::mem::take(encoder.get_mut());
            self.encoder = Some(encoder);
            if compressed.is_empty() {
                Ok(())
            } else {
                forward(&compressed, false)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    #[test]
    fn chain_order_and_last_flag() {
        struct Tag(u8);
        impl OutputInterceptor for Tag {
            fn intercept(
                &mut self,
                data: &[u8],
                last: bool,
                forward: &mut Forward<'_>,
            ) -> Result<(), OutputError> {
                let mut v = vec![self.0];
                v.extend_from_slice(data);
                forward(&v, last)
            }
        }

        let mut stages: Vec<Box<dyn OutputInterceptor>> = vec![Box::new(Tag(b'a')), Box::new(Tag(b'b'))];
        let mut out = Vec::new();
        let mut seen_last = false;
        let mut sink = |data: &[u8], last: bool| {
            out.extend_from_slice(data);
            seen_last = last;
            Ok(())
        };
        run_chain(&mut stages, b"x", true, &mut sink).unwrap();
        assert_eq!(out.as_slice(), b"bax");
        assert!(seen_last);
    }

    #[test]
    fn gzip_round_trip() {
        let mut stage = GzipOutputInterceptor::new();
        let mut compressed = Vec::new();
        let mut sink = |data: &[u8], _last: bool| {
            compressed.extend_from_slice(data);
            Ok(())
        };
        stage.intercept(b"hello ", false, &mut sink).unwrap();
        stage.intercept(b"world", true, &mut sink).unwrap();

        let mut decoder = flate2::read::GzDecoder::new(compressed.as_slice());
        let mut plain = String::new();
        decoder.read_to_string(&mut plain).unwrap();
        assert_eq!(plain, "hello world");
    }
}
