//! Gzip helpers for inbound frames

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::{Read, Write};

use crate::error::ProtocolError;

/// Check if data is gzip compressed (magic bytes check)
#[inline]
pub fn is_gzip(data: &[u8]) -> bool {
    data.len() >= 2 && data[0] == 0x1f && data[1] == 0x8b
}

/// Compress data using gzip
pub fn compress_gzip(data: &[u8]) -> Result<Vec<u8>, ProtocolError> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::fast());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

/// Largest inflated frame accepted from the service (16 MiB)
pub const MAX_INFLATED_SIZE: usize = 16 * 1024 * 1024;

/// Inflate a gzip stream of at most [`MAX_INFLATED_SIZE`] bytes
pub fn decompress_gzip(data: &[u8]) -> Result<Vec<u8>, ProtocolError> {
    decompress_gzip_limited(data, MAX_INFLATED_SIZE)
}

/// Inflate a gzip stream, failing once the output would exceed `limit` bytes
pub fn decompress_gzip_limited(data: &[u8], limit: usize) -> Result<Vec<u8>, ProtocolError> {
    let decoder = GzDecoder::new(data);
    let mut out = Vec::with_capacity(data.len().saturating_mul(4).min(limit));
    decoder.take(limit as u64 + 1).read_to_end(&mut out)?;
    if out.len() > limit {
        return Err(ProtocolError::CompressionError(format!(
            "inflated frame exceeds {} bytes",
            limit
        )));
    }
    Ok(out)
}
