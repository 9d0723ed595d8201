//! Generic compressor stage (zlib-wrapped DEFLATE).

use std::io::{self, Write};

use flate2::write::ZlibEncoder;
use flate2::{Compression, Decompress, FlushDecompress, Status};

use crate::error::{KolibriError, Result};

/// Highest zlib level
pub const MAX_LEVEL: u32 = 9;

/// Default compression level (maximum)
pub const DEFAULT_LEVEL: u32 = MAX_LEVEL;

/// Output growth step while inflating
const INFLATE_CHUNK: usize = 16 * 1024;

/// DEFLATE codec
#[derive(Debug, Clone)]
pub struct DeflateCodec {
    /// Compression level (0-9)
    pub level: u32,
}

impl Default for DeflateCodec {
    fn default() -> Self {
        Self {
            level: DEFAULT_LEVEL,
        }
    }
}

impl DeflateCodec {
    /// Create new codec with maximum compression
    pub fn new() -> Self {
        Self::default()
    }

    /// Create codec with custom level
    pub fn with_level(level: u32) -> Self {
        Self {
            level: level.min(MAX_LEVEL),
        }
    }

    /// Compress bytes to a zlib stream
    pub fn compress(&self, data: &[u8]) -> Result<Vec<u8>> {
        let mut encoder = ZlibEncoder::new(
            Vec::with_capacity(data.len() / 2 + 16),
            Compression::new(self.level.min(MAX_LEVEL)),
        );
        encoder
            .write_all(data)
            .map_err(KolibriError::UnderlyingCodec)?;
        encoder.finish().map_err(KolibriError::UnderlyingCodec)
    }

    /// Decompress a zlib stream.
    pub fn decompress(&self, data: &[u8]) -> Result<Vec<u8>> {
        self.decompress_bounded(data, usize::MAX)
    }

    /// Decompress a zlib stream into at most `limit` bytes.
    ///
    /// Fails on malformed input, on streams that end before the final
    /// block, and with [`KolibriError::OutputLimit`] once the output grows
    /// past `limit`; partial output is never returned.
    pub fn decompress_bounded(&self, data: &[u8], limit: usize) -> Result<Vec<u8>> {
        let ceiling = limit.saturating_add(1);
        let mut inflater = Decompress::new(true);
        let mut out =
            Vec::with_capacity(data.len().saturating_mul(4).max(INFLATE_CHUNK).min(ceiling));

        loop {
            if out.len() == out.capacity() {
                let room = ceiling - out.len();
                out.reserve_exact(INFLATE_CHUNK.max(out.len()).min(room));
            }

            let consumed = inflater.total_in() as usize;
            let produced = inflater.total_out();
            let status = inflater
                .decompress_vec(&data[consumed..], &mut out, FlushDecompress::None)
                .map_err(|e| {
                    KolibriError::UnderlyingCodec(io::Error::new(io::ErrorKind::InvalidData, e))
                })?;

            if out.len() > limit {
                return Err(KolibriError::OutputLimit {
                    limit: limit as u64,
                });
            }

            match status {
                Status::StreamEnd => return Ok(out),
                Status::Ok | Status::BufError => {
                    let stalled = inflater.total_in() as usize == consumed
                        && inflater.total_out() == produced;
                    if stalled && out.len() < out.capacity() {
                        return Err(KolibriError::UnderlyingCodec(io::Error::new(
                            io::ErrorKind::UnexpectedEof,
                            "compressed stream ended before the final block",
                        )));
                    }
                },
            }
        }
    }
}
