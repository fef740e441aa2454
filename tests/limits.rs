//! Resource-limit and error-policy integration tests
//!
//! Covers the decompression-bomb guards, the always-fatal oversize-record
//! ceiling, and the strict/lenient divergence on per-record failures.

use sitepack::{
    compression::{self, CompressionFormat},
    parse_collection, ParseOptions, Parser, SchemaValidator, ScpError, Severity,
};

const HEADER: &str = concat!(
    r#"{"collection":{"id":"limits","section":"blog","type":"snapshot","#,
    r#""generated":"2025-01-15T12:00:00Z","version":"0.1"}}"#
);

fn page_line(url: &str) -> String {
    format!(
        concat!(
            r#"{{"url":"{}","title":"T","description":"D","#,
            r#""modified":"2025-01-15T12:00:00Z","language":"en","#,
            r#""content":[{{"type":"text","text":"body"}}]}}"#
        ),
        url
    )
}

#[test]
fn gzip_bomb_rejected_at_parse_time() {
    // A classic bomb: megabytes of a single repeated byte compress to a
    // couple of KiB. The compressed input itself is small, but past 1 MiB
    // of output the running ratio blows through 100:1.
    let payload = vec![b'0'; 2 * 1024 * 1024];
    let bomb = compression::compress(&payload, CompressionFormat::Gzip, 9).unwrap();
    assert!(bomb.len() < 64 * 1024);

    let err = parse_collection(&bomb, false).unwrap_err();
    assert!(err.is_bomb(), "expected bomb, got: {err}");
    assert!(err.is_resource_limit());
}

#[test]
fn zstd_bomb_rejected_at_parse_time() {
    let payload = vec![b'0'; 2 * 1024 * 1024];
    let bomb = compression::compress(&payload, CompressionFormat::Zstd, 19).unwrap();

    let err = parse_collection(&bomb, true).unwrap_err();
    assert!(err.is_bomb(), "expected bomb, got: {err}");
}

#[test]
fn caller_supplied_max_size_is_enforced() {
    let doc = format!("{HEADER}\n{}", page_line("https://example.com/a"));
    let compressed = compression::compress(doc.as_bytes(), CompressionFormat::Gzip, 6).unwrap();

    let validator = SchemaValidator::new();
    let parser = Parser::with_options(
        &validator,
        ParseOptions {
            strict: false,
            max_decompressed_size: 64,
        },
    );
    let err = parser.parse_bytes(&compressed).unwrap_err();
    assert!(err.is_bomb(), "expected bomb, got: {err}");

    // The same document passes with the default ceiling.
    parse_collection(&compressed, true).unwrap();
}

#[test]
fn oversize_record_is_fatal_in_both_modes() {
    // One page record just past the 100 MiB per-record ceiling.
    let big = "a".repeat(100 * 1024 * 1024 + 1024);
    let page = format!(
        concat!(
            r#"{{"url":"https://example.com/big","title":"T","description":"{}","#,
            r#""modified":"2025-01-15T12:00:00Z","language":"en","content":[]}}"#
        ),
        big
    );
    let doc = format!("{HEADER}\n{page}");

    for strict in [false, true] {
        let err = parse_collection(doc.as_bytes(), strict).unwrap_err();
        match err {
            ScpError::RecordTooLarge { line, .. } => assert_eq!(line, 2),
            other => panic!("strict={strict}: expected RecordTooLarge, got {other}"),
        }
    }
}

#[test]
fn lenient_and_strict_diverge_on_invalid_url() {
    // Three records: header, one bad page, one good page.
    let doc = format!(
        "{HEADER}\n{}\n{}",
        page_line("not-a-url"),
        page_line("https://example.com/good")
    );

    let outcome = parse_collection(doc.as_bytes(), false).unwrap();
    assert_eq!(outcome.collection.page_count(), 1);
    assert_eq!(outcome.collection.pages[0].url, "https://example.com/good");
    assert_eq!(outcome.diagnostics.len(), 1);
    assert_eq!(outcome.diagnostics[0].severity, Severity::Error);
    assert_eq!(outcome.diagnostics[0].line, 2);

    let err = parse_collection(doc.as_bytes(), true).unwrap_err();
    assert!(
        matches!(err, ScpError::SchemaViolation(_)),
        "expected schema violation, got: {err}"
    );
}

#[test]
fn too_many_content_blocks_is_recoverable_in_lenient_mode() {
    let block = r#"{"type":"text","text":"x"}"#;
    let blocks = vec![block; 1001].join(",");
    let page = format!(
        concat!(
            r#"{{"url":"https://example.com/a","title":"T","description":"D","#,
            r#""modified":"2025-01-15T12:00:00Z","language":"en","content":[{}]}}"#
        ),
        blocks
    );
    let doc = format!("{HEADER}\n{page}\n{}", page_line("https://example.com/b"));

    let err = parse_collection(doc.as_bytes(), true).unwrap_err();
    assert!(matches!(err, ScpError::TooManyContentBlocks { .. }));

    let outcome = parse_collection(doc.as_bytes(), false).unwrap();
    assert_eq!(outcome.collection.page_count(), 1);
    assert_eq!(outcome.diagnostics.len(), 1);
}

#[test]
fn corrupt_compressed_stream_is_malformed_not_bomb() {
    let doc = format!("{HEADER}\n{}", page_line("https://example.com/a"));
    let mut compressed = compression::compress(doc.as_bytes(), CompressionFormat::Gzip, 6).unwrap();
    let mid = compressed.len() / 2;
    compressed[mid] ^= 0xff;
    compressed.truncate(mid + 4);

    let err = parse_collection(&compressed, false).unwrap_err();
    assert!(matches!(err, ScpError::Decompression(_)), "got: {err}");
    assert!(!err.is_bomb());
}
