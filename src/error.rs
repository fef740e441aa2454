//! Error types for the sitepack library
//!
//! This module defines all error types that can occur while parsing or
//! generating SCP collections. The taxonomy distinguishes malformed input,
//! schema violations, integrity failures, and resource-limit rejections so
//! callers can react differently to each: a decompression bomb warrants an
//! alert, a corrupt stream is merely a bad file.

use thiserror::Error;

/// Type alias for Results in the sitepack library
pub type Result<T> = std::result::Result<T, ScpError>;

/// Main error type for all sitepack operations
#[derive(Debug, Error)]
pub enum ScpError {
    /// I/O errors during file operations
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid JSON in a document record
    #[error("invalid JSON at line {line}: {source}")]
    Json {
        /// 1-indexed line number within the decompressed document
        line: usize,
        /// Underlying JSON parse error
        source: serde_json::Error,
    },

    /// Unparseable bytes: empty document, non-UTF-8 payload, missing
    /// collection key, or zero pages at generation time
    #[error("malformed document: {0}")]
    Malformed(String),

    /// Structurally invalid collection metadata or page object
    #[error("schema violation: {0}")]
    SchemaViolation(String),

    /// Checksum tag does not match the `sha256:<64 hex>` syntax
    #[error("invalid checksum format: {0}")]
    ChecksumSyntax(String),

    /// Checksum digest mismatch during verification
    #[error("checksum mismatch - expected: {expected}, actual: {actual}")]
    ChecksumMismatch {
        /// Expected checksum tag (normalized lowercase)
        expected: String,
        /// Actual computed checksum tag
        actual: String,
    },

    /// A single record exceeds the per-record size ceiling
    #[error("record at line {line} exceeds maximum size ({size} > {limit} bytes)")]
    RecordTooLarge {
        /// 1-indexed line number of the oversize record
        line: usize,
        /// Record byte length
        size: usize,
        /// Configured ceiling
        limit: usize,
    },

    /// A page carries more content blocks than the format allows
    #[error("content array has {count} blocks, maximum is {limit}")]
    TooManyContentBlocks {
        /// Number of blocks in the page
        count: usize,
        /// Configured ceiling
        limit: usize,
    },

    /// Decompression aborted by the ratio or absolute-size guard
    #[error("decompression bomb detected: {0}")]
    DecompressionBomb(String),

    /// Compressed input rejected before decompression started
    #[error("compressed size {size} exceeds maximum {limit}")]
    CompressedTooLarge {
        /// Compressed input length
        size: u64,
        /// Configured ceiling
        limit: u64,
    },

    /// Uncompressed input rejected before compression started
    #[error("data size {size} exceeds maximum {limit}")]
    DataTooLarge {
        /// Input length
        size: u64,
        /// Configured ceiling
        limit: u64,
    },

    /// Compression codec failure
    #[error("compression failed: {0}")]
    Compression(String),

    /// Decompression codec failure (corrupt or truncated stream, not a bomb)
    #[error("decompression failed: {0}")]
    Decompression(String),

    /// Compression format not recognized or not usable here
    #[error("unsupported compression: {0}")]
    UnsupportedCompression(String),
}

impl ScpError {
    /// Create a malformed-document error with a custom message
    pub fn malformed(msg: impl Into<String>) -> Self {
        ScpError::Malformed(msg.into())
    }

    /// Create a schema-violation error with a custom message
    pub fn schema(msg: impl Into<String>) -> Self {
        ScpError::SchemaViolation(msg.into())
    }

    /// Create a compression error with a custom message
    pub fn compression(msg: impl Into<String>) -> Self {
        ScpError::Compression(msg.into())
    }

    /// Create a decompression error with a custom message
    pub fn decompression(msg: impl Into<String>) -> Self {
        ScpError::Decompression(msg.into())
    }

    /// Create a decompression-bomb error with a custom message
    pub fn bomb(msg: impl Into<String>) -> Self {
        ScpError::DecompressionBomb(msg.into())
    }

    /// Check if this error is a decompression bomb
    ///
    /// Bombs are distinguished from ordinary codec failures so ingestion
    /// pipelines can reject-and-alert instead of reject-as-malformed.
    pub fn is_bomb(&self) -> bool {
        matches!(self, ScpError::DecompressionBomb(_))
    }

    /// Check if this error is a resource-limit rejection
    pub fn is_resource_limit(&self) -> bool {
        matches!(
            self,
            ScpError::RecordTooLarge { .. }
                | ScpError::TooManyContentBlocks { .. }
                | ScpError::DecompressionBomb(_)
                | ScpError::CompressedTooLarge { .. }
                | ScpError::DataTooLarge { .. }
        )
    }

    /// Check if this error is an integrity (checksum) failure
    pub fn is_integrity(&self) -> bool {
        matches!(
            self,
            ScpError::ChecksumSyntax(_) | ScpError::ChecksumMismatch { .. }
        )
    }

    /// Check if this error kind is one a lenient parse can recover from
    /// by skipping the offending record
    ///
    /// Oversize records, bombs, and corrupt streams are never recoverable;
    /// recoverable kinds raised at the header level are still fatal.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ScpError::Json { .. }
                | ScpError::SchemaViolation(_)
                | ScpError::TooManyContentBlocks { .. }
                | ScpError::ChecksumSyntax(_)
                | ScpError::ChecksumMismatch { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ScpError::ChecksumMismatch {
            expected: "sha256:abc".to_string(),
            actual: "sha256:def".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "checksum mismatch - expected: sha256:abc, actual: sha256:def"
        );
    }

    #[test]
    fn test_error_classification() {
        assert!(ScpError::bomb("ratio").is_bomb());
        assert!(ScpError::bomb("ratio").is_resource_limit());
        assert!(!ScpError::decompression("corrupt").is_bomb());
        assert!(ScpError::ChecksumSyntax("md5:??".to_string()).is_integrity());
        assert!(!ScpError::malformed("empty").is_integrity());
    }

    #[test]
    fn test_error_recoverable() {
        assert!(ScpError::schema("page.url: not a string").is_recoverable());
        assert!(!ScpError::RecordTooLarge {
            line: 3,
            size: 200,
            limit: 100,
        }
        .is_recoverable());
        assert!(!ScpError::bomb("ratio").is_recoverable());
    }
}
