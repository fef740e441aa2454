//! Bounded compression and bomb-guarded decompression for SCP collections
//!
//! This module is the safety layer between untrusted input bytes and the
//! parser. It detects the container compression format from magic bytes,
//! compresses canonical documents for output, and decompresses input in
//! fixed-size chunks while watching for decompression bombs.
//!
//! ## Format detection
//!
//! Detection is always content-based; file extensions are advisory only:
//!
//! - `1F 8B` — gzip
//! - `28 B5 2F FD` — zstd
//! - anything else (or fewer than 4 bytes) — uncompressed
//!
//! ## Bomb detection
//!
//! Decompression runs in 8 KiB chunks. After every chunk two independent
//! guards are evaluated, so an adversarial stream cannot exceed limits
//! between checks:
//!
//! - **Ratio guard**: once at least [`MIN_SIZE_FOR_RATIO_CHECK`] bytes have
//!   been produced, the running ratio `decompressed/compressed` must stay at
//!   or below [`MAX_COMPRESSION_RATIO`]. The threshold keeps small,
//!   highly-repetitive legitimate payloads (tiny all-whitespace fixtures)
//!   from tripping the guard.
//! - **Absolute-size guard**: cumulative output must not exceed the caller's
//!   `max_size` (default [`MAX_DECOMPRESSED_SIZE`]).
//!
//! Both abort with [`ScpError::DecompressionBomb`]. Codec failures on
//! corrupt or truncated streams surface as [`ScpError::Decompression`]
//! instead, so callers can tell an attack from a bad file.
//!
//! ## Examples
//!
//! ```rust
//! use sitepack::compression::{self, CompressionFormat};
//!
//! let data = b"{\"collection\":{}}\n".repeat(100);
//! let packed = compression::compress(&data, CompressionFormat::Gzip, 6)?;
//! assert_eq!(CompressionFormat::detect(&packed), CompressionFormat::Gzip);
//!
//! let unpacked = compression::decompress(&packed, CompressionFormat::Gzip, None)?;
//! assert_eq!(unpacked, data);
//! # Ok::<(), sitepack::ScpError>(())
//! ```

use crate::error::{Result, ScpError};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::{Read, Write};
use tracing::{debug, trace};

/// Maximum accepted compressed input size (50 GB)
pub const MAX_COMPRESSED_SIZE: u64 = 50 * 1024 * 1024 * 1024;

/// Maximum decompressed output size (500 GB)
pub const MAX_DECOMPRESSED_SIZE: u64 = 500 * 1024 * 1024 * 1024;

/// Maximum decompression ratio (100:1)
pub const MAX_COMPRESSION_RATIO: u64 = 100;

/// Ratio guard only engages after this much output (1 MiB)
pub const MIN_SIZE_FOR_RATIO_CHECK: u64 = 1024 * 1024;

/// Decompression chunk size (8 KiB)
const CHUNK_SIZE: usize = 8192;

// Magic prefixes used by content-based detection
const GZIP_MAGIC: &[u8] = &[0x1f, 0x8b];
const ZSTD_MAGIC: &[u8] = &[0x28, 0xb5, 0x2f, 0xfd];

/// Container compression formats recognized by the codec
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionFormat {
    /// Uncompressed JSON Lines (`.scp`)
    None,
    /// gzip (`.scp.gz`)
    Gzip,
    /// zstd (`.scp.zst`)
    Zstd,
}

impl CompressionFormat {
    /// Detect compression format from the magic-byte prefix
    ///
    /// Inspects up to the first 4 bytes; buffers shorter than 4 bytes are
    /// reported as uncompressed.
    pub fn detect(data: &[u8]) -> CompressionFormat {
        if data.len() < 4 {
            return CompressionFormat::None;
        }
        if data.starts_with(GZIP_MAGIC) {
            return CompressionFormat::Gzip;
        }
        if data.starts_with(ZSTD_MAGIC) {
            return CompressionFormat::Zstd;
        }
        CompressionFormat::None
    }

    /// Conventional file extension for this format
    ///
    /// Advisory only; readers always detect by content.
    pub fn file_extension(&self) -> &'static str {
        match self {
            CompressionFormat::None => ".scp",
            CompressionFormat::Gzip => ".scp.gz",
            CompressionFormat::Zstd => ".scp.zst",
        }
    }

    /// Default compression level for this format
    pub fn default_level(&self) -> u32 {
        match self {
            CompressionFormat::None => 0,
            CompressionFormat::Gzip => 6,
            CompressionFormat::Zstd => 9,
        }
    }
}

impl std::fmt::Display for CompressionFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompressionFormat::None => write!(f, "none"),
            CompressionFormat::Gzip => write!(f, "gzip"),
            CompressionFormat::Zstd => write!(f, "zstd"),
        }
    }
}

/// Compress data in the given format
///
/// Input larger than [`MAX_DECOMPRESSED_SIZE`] is rejected before any work
/// starts. Level ranges are format-specific: gzip 1-9, zstd 1-22.
/// [`CompressionFormat::None`] copies the input through unchanged.
///
/// # Errors
///
/// - [`ScpError::DataTooLarge`] if the input exceeds the ceiling
/// - [`ScpError::UnsupportedCompression`] if the level is out of range
/// - [`ScpError::Compression`] if the underlying codec fails
pub fn compress(data: &[u8], format: CompressionFormat, level: u32) -> Result<Vec<u8>> {
    if data.len() as u64 > MAX_DECOMPRESSED_SIZE {
        return Err(ScpError::DataTooLarge {
            size: data.len() as u64,
            limit: MAX_DECOMPRESSED_SIZE,
        });
    }

    match format {
        CompressionFormat::None => Ok(data.to_vec()),
        CompressionFormat::Gzip => {
            if !(1..=9).contains(&level) {
                return Err(ScpError::UnsupportedCompression(format!(
                    "gzip level must be 1-9, got {level}"
                )));
            }
            let mut encoder = GzEncoder::new(Vec::new(), Compression::new(level));
            encoder
                .write_all(data)
                .map_err(|e| ScpError::compression(format!("gzip compression failed: {e}")))?;
            let compressed = encoder
                .finish()
                .map_err(|e| ScpError::compression(format!("gzip compression failed: {e}")))?;
            debug!(
                "gzip level {}: {} -> {} bytes",
                level,
                data.len(),
                compressed.len()
            );
            Ok(compressed)
        }
        CompressionFormat::Zstd => {
            if !(1..=22).contains(&level) {
                return Err(ScpError::UnsupportedCompression(format!(
                    "zstd level must be 1-22, got {level}"
                )));
            }
            let compressed = zstd::stream::encode_all(data, level as i32)
                .map_err(|e| ScpError::compression(format!("zstd compression failed: {e}")))?;
            debug!(
                "zstd level {}: {} -> {} bytes",
                level,
                data.len(),
                compressed.len()
            );
            Ok(compressed)
        }
    }
}

/// Decompress data with bomb detection
///
/// Rejects compressed input larger than [`MAX_COMPRESSED_SIZE`] before
/// starting, then streams the codec output through the chunked guard loop.
/// `max_size` caps the decompressed size; `None` uses
/// [`MAX_DECOMPRESSED_SIZE`]. [`CompressionFormat::None`] copies the input
/// through unchanged.
///
/// # Errors
///
/// - [`ScpError::CompressedTooLarge`] if the input exceeds the ceiling
/// - [`ScpError::DecompressionBomb`] if either bomb guard trips
/// - [`ScpError::Decompression`] on a corrupt or truncated stream
pub fn decompress(
    data: &[u8],
    format: CompressionFormat,
    max_size: Option<u64>,
) -> Result<Vec<u8>> {
    let max_size = max_size.unwrap_or(MAX_DECOMPRESSED_SIZE);
    let compressed_size = data.len() as u64;

    if compressed_size > MAX_COMPRESSED_SIZE {
        return Err(ScpError::CompressedTooLarge {
            size: compressed_size,
            limit: MAX_COMPRESSED_SIZE,
        });
    }

    match format {
        CompressionFormat::None => Ok(data.to_vec()),
        CompressionFormat::Gzip => {
            let decoder = GzDecoder::new(data);
            read_bounded(decoder, compressed_size, max_size, "gzip")
        }
        CompressionFormat::Zstd => {
            let decoder = zstd::stream::read::Decoder::new(data)
                .map_err(|e| ScpError::decompression(format!("zstd decompression failed: {e}")))?;
            read_bounded(decoder, compressed_size, max_size, "zstd")
        }
    }
}

/// Chunked read loop shared by both codecs
///
/// Evaluates the ratio and absolute-size guards after every chunk.
fn read_bounded<R: Read>(
    mut reader: R,
    compressed_size: u64,
    max_size: u64,
    codec: &str,
) -> Result<Vec<u8>> {
    let mut output = Vec::new();
    let mut buf = [0u8; CHUNK_SIZE];
    let mut total: u64 = 0;

    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) => {
                return Err(ScpError::decompression(format!(
                    "{codec} decompression failed: {e}"
                )))
            }
        };

        total += n as u64;

        if total >= MIN_SIZE_FOR_RATIO_CHECK
            && compressed_size > 0
            && total > MAX_COMPRESSION_RATIO * compressed_size
        {
            return Err(ScpError::bomb(format!(
                "decompression ratio exceeds {MAX_COMPRESSION_RATIO}:1 \
                 ({total} bytes from {compressed_size} compressed)"
            )));
        }

        if total > max_size {
            return Err(ScpError::bomb(format!(
                "decompressed size exceeds maximum {max_size}"
            )));
        }

        output.extend_from_slice(&buf[..n]);
    }

    trace!("{} decompressed {} -> {} bytes", codec, compressed_size, total);
    Ok(output)
}
