//! Content-addressed integrity tags for SCP collections
//!
//! Checksums are SHA-256 digests formatted as `sha256:<64 lowercase hex>`.
//! The tag lives inside the very metadata record it authenticates, so the
//! checksum domain is defined as the canonical document bytes *with the
//! checksum key absent* - generation computes over that domain before
//! stamping the tag, and verification reproduces the same domain by
//! stripping the tag back out (see [`crate::parser`]). Neither side ever
//! hashes the final tag-carrying byte stream; doing so could never
//! self-verify.
//!
//! ## Examples
//!
//! ```rust
//! use sitepack::checksum;
//!
//! let tag = checksum::compute(b"canonical document bytes");
//! assert!(tag.starts_with("sha256:"));
//! checksum::verify(b"canonical document bytes", &tag)?;
//! # Ok::<(), sitepack::ScpError>(())
//! ```

use crate::error::{Result, ScpError};
use once_cell::sync::Lazy;
use regex::Regex;
use sha2::{Digest, Sha256};

/// Tag syntax: `sha256:` followed by exactly 64 hex digits
static CHECKSUM_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^sha256:[a-fA-F0-9]{64}$").expect("checksum pattern is valid"));

/// Compute the SHA-256 checksum tag of data
pub fn compute(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("sha256:{}", hex::encode(hasher.finalize()))
}

/// Verify data against a checksum tag
///
/// Tag syntax is validated first; a syntactically invalid tag is a distinct
/// failure from a digest mismatch. On valid syntax the digest is recomputed
/// and compared case-insensitively.
///
/// # Errors
///
/// - [`ScpError::ChecksumSyntax`] if the tag does not match the pattern
/// - [`ScpError::ChecksumMismatch`] if the digests differ, reporting both
///   expected and actual values for diagnostics
pub fn verify(data: &[u8], tag: &str) -> Result<()> {
    let expected = normalize(tag)?;
    let actual = compute(data);
    if actual != expected {
        return Err(ScpError::ChecksumMismatch { expected, actual });
    }
    Ok(())
}

/// Validate tag syntax and normalize to lowercase
///
/// # Errors
///
/// Returns [`ScpError::ChecksumSyntax`] if the tag does not match
/// `sha256:` + 64 hex digits.
pub fn normalize(tag: &str) -> Result<String> {
    if !CHECKSUM_PATTERN.is_match(tag) {
        return Err(ScpError::ChecksumSyntax(tag.to_string()));
    }
    Ok(tag.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compute_format() {
        let tag = compute(b"hello");
        assert!(tag.starts_with("sha256:"));
        assert_eq!(tag.len(), "sha256:".len() + 64);
        // Known SHA-256 of "hello"
        assert_eq!(
            tag,
            "sha256:2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }

    #[test]
    fn test_verify_ok() {
        let data = b"some bytes";
        verify(data, &compute(data)).unwrap();
    }

    #[test]
    fn test_verify_case_insensitive() {
        let data = b"some bytes";
        let tag = compute(data).to_uppercase().replace("SHA256", "sha256");
        verify(data, &tag).unwrap();
    }

    #[test]
    fn test_verify_mismatch() {
        let err = verify(
            b"other bytes",
            "sha256:2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824",
        )
        .unwrap_err();
        assert!(matches!(err, ScpError::ChecksumMismatch { .. }));
    }

    #[test]
    fn test_bad_syntax_is_distinct() {
        for tag in ["md5:abcd", "sha256:tooshort", "sha256", ""] {
            let err = verify(b"x", tag).unwrap_err();
            assert!(matches!(err, ScpError::ChecksumSyntax(_)), "tag: {tag}");
        }
    }

    #[test]
    fn test_normalize() {
        let upper = "sha256:ABCDEF0123456789ABCDEF0123456789ABCDEF0123456789ABCDEF0123456789";
        assert_eq!(normalize(upper).unwrap(), upper.to_lowercase());
        assert!(normalize("sha512:ab").is_err());
    }
}
