//! Streaming parser for SCP collection documents
//!
//! Turns a byte buffer (or file) into a validated [`Collection`] plus an
//! ordered list of non-fatal [`Diagnostic`]s. Parsing proceeds header
//! first, then record by record over the newline-delimited body, so a
//! consumer can recover per record without buffering any structure beyond
//! the decompressed byte buffer itself.
//!
//! ## Error policy
//!
//! Header-level failures - empty input, invalid header JSON, a missing
//! `collection` key, a header schema violation, a decompression bomb or a
//! corrupt stream - are always fatal: there is no valid document to
//! recover. Per-page failures follow the strict/lenient split:
//!
//! - **strict**: the first JSON-syntax or schema failure aborts the parse;
//! - **lenient**: the offending record is skipped, an error diagnostic is
//!   recorded, and parsing continues.
//!
//! Two rules hold in *both* modes: a record larger than
//! [`MAX_RECORD_SIZE`](crate::schema::MAX_RECORD_SIZE) is always fatal (a
//! resource-exhaustion guard, not a data-quality issue), and an unknown
//! content-block type is never fatal - the block is kept verbatim and a
//! warning diagnostic is recorded.
//!
//! ## Examples
//!
//! ```rust
//! use sitepack::parser::Parser;
//! use sitepack::schema::SchemaValidator;
//!
//! let doc = concat!(
//!     r#"{"collection":{"id":"blog","section":"blog","type":"snapshot","#,
//!     r#""generated":"2025-01-15T12:00:00Z","version":"0.1"}}"#,
//!     "\n",
//!     r#"{"url":"https://example.com/a","title":"A","description":"d","#,
//!     r#""modified":"2025-01-15T12:00:00Z","language":"en","content":[]}"#,
//! );
//!
//! let validator = SchemaValidator::new();
//! let outcome = Parser::new(&validator).parse_bytes(doc.as_bytes())?;
//! assert_eq!(outcome.collection.page_count(), 1);
//! assert!(outcome.diagnostics.is_empty());
//! # Ok::<(), sitepack::ScpError>(())
//! ```

use crate::checksum;
use crate::collection::{Collection, Diagnostic, HeaderRecord, Page};
use crate::compression::{self, CompressionFormat, MAX_DECOMPRESSED_SIZE};
use crate::error::{Result, ScpError};
use crate::schema::{BlockClass, SchemaValidator, MAX_RECORD_SIZE};
use serde_json::Value;
use std::path::Path;
use tracing::{debug, trace};

/// Parser configuration
#[derive(Debug, Clone)]
pub struct ParseOptions {
    /// Fail fast on the first per-record error instead of recovering
    pub strict: bool,
    /// Ceiling for the decompressed document size; callers processing very
    /// large collections on small machines should set this well below the
    /// library default
    pub max_decompressed_size: u64,
}

impl Default for ParseOptions {
    fn default() -> Self {
        ParseOptions {
            strict: false,
            max_decompressed_size: MAX_DECOMPRESSED_SIZE,
        }
    }
}

/// Result of a successful parse: the collection plus everything the lenient
/// policy recovered from
#[derive(Debug, Clone)]
pub struct ParseOutcome {
    /// The parsed, validated collection
    pub collection: Collection,
    /// Non-fatal diagnostics in document order; empty in the all-valid case
    pub diagnostics: Vec<Diagnostic>,
}

/// Parser for SCP collection files
///
/// Holds no per-parse state: each [`Parser::parse_bytes`] call is
/// independent, so one parser may be shared and run concurrently across
/// files by the caller.
#[derive(Debug)]
pub struct Parser<'a> {
    validator: &'a SchemaValidator,
    options: ParseOptions,
}

impl<'a> Parser<'a> {
    /// Create a lenient parser with default limits
    pub fn new(validator: &'a SchemaValidator) -> Self {
        Parser {
            validator,
            options: ParseOptions::default(),
        }
    }

    /// Create a parser with explicit options
    pub fn with_options(validator: &'a SchemaValidator, options: ParseOptions) -> Self {
        Parser { validator, options }
    }

    /// Parse an SCP collection file
    ///
    /// Compression is detected from content; the extension is ignored.
    pub fn parse_file(&self, path: impl AsRef<Path>) -> Result<ParseOutcome> {
        let path = path.as_ref();
        debug!("parsing collection file {:?}", path);
        let data = std::fs::read(path)?;
        self.parse_bytes(&data)
    }

    /// Parse an SCP collection from bytes
    ///
    /// # Errors
    ///
    /// Any fatal error per the module-level policy; lenient-mode recoveries
    /// surface in [`ParseOutcome::diagnostics`] instead.
    pub fn parse_bytes(&self, data: &[u8]) -> Result<ParseOutcome> {
        // Decompress; bombs and corrupt streams are terminal.
        let format = CompressionFormat::detect(data);
        let decompressed =
            compression::decompress(data, format, Some(self.options.max_decompressed_size))?;

        let text = std::str::from_utf8(&decompressed)
            .map_err(|_| ScpError::malformed("document is not valid UTF-8"))?
            .trim();
        if text.is_empty() {
            return Err(ScpError::malformed("empty document"));
        }
        let lines: Vec<&str> = text.split('\n').collect();

        let mut diagnostics = Vec::new();
        let metadata = self.parse_header(&lines, &mut diagnostics)?;

        // Body records; line numbers are 1-indexed from the header.
        let mut pages = Vec::new();
        'records: for (idx, line) in lines.iter().enumerate().skip(1) {
            let line_number = idx + 1;
            if line.trim().is_empty() {
                continue;
            }

            // The one per-record check that no mode relaxes.
            if line.len() > MAX_RECORD_SIZE {
                return Err(ScpError::RecordTooLarge {
                    line: line_number,
                    size: line.len(),
                    limit: MAX_RECORD_SIZE,
                });
            }

            let record: Value = match serde_json::from_str(line) {
                Ok(value) => value,
                Err(source) => {
                    if self.options.strict {
                        return Err(ScpError::Json {
                            line: line_number,
                            source,
                        });
                    }
                    diagnostics.push(Diagnostic::error(
                        line_number,
                        format!("invalid JSON: {source}"),
                    ));
                    continue;
                }
            };

            if let Err(err) = self.validator.validate_page(&record) {
                if self.options.strict {
                    return Err(at_line(line_number, err));
                }
                diagnostics.push(Diagnostic::error(line_number, err.to_string()));
                continue;
            }

            // Classify every block: unknown types are warnings in both
            // modes, known-type shape violations follow the record policy.
            if let Some(blocks) = record.get("content").and_then(Value::as_array) {
                let mut warnings = Vec::new();
                for (i, block) in blocks.iter().enumerate() {
                    match self.validator.classify_content_block(block) {
                        Ok(BlockClass::Known) => {}
                        Ok(BlockClass::Unknown) => {
                            let block_type = block
                                .get("type")
                                .and_then(Value::as_str)
                                .unwrap_or("unknown");
                            warnings.push(Diagnostic::warning(
                                line_number,
                                format!("unknown content block type \"{block_type}\" at content[{i}]"),
                            ));
                        }
                        Err(err) => {
                            if self.options.strict {
                                return Err(at_line(line_number, err));
                            }
                            diagnostics.push(Diagnostic::error(
                                line_number,
                                format!("content[{i}]: {err}"),
                            ));
                            continue 'records;
                        }
                    }
                }
                diagnostics.extend(warnings);
            }

            match serde_json::from_value::<Page>(record) {
                Ok(page) => {
                    trace!("line {}: page {}", line_number, page.url);
                    pages.push(page);
                }
                Err(err) => {
                    // Validation passed but the typed model refused; treat
                    // exactly like a schema failure.
                    let err = ScpError::schema(format!("page deserialization failed: {err}"));
                    if self.options.strict {
                        return Err(at_line(line_number, err));
                    }
                    diagnostics.push(Diagnostic::error(line_number, err.to_string()));
                }
            }
        }

        debug!(
            "parsed collection {}: {} pages, {} diagnostics",
            metadata.id,
            pages.len(),
            diagnostics.len()
        );
        Ok(ParseOutcome {
            collection: Collection { metadata, pages },
            diagnostics,
        })
    }

    /// Parse and validate the header record, verifying its checksum when
    /// one is present
    fn parse_header(
        &self,
        lines: &[&str],
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Result<crate::collection::CollectionMetadata> {
        let header: Value = serde_json::from_str(lines[0]).map_err(|source| ScpError::Json {
            line: 1,
            source,
        })?;
        if header.get("collection").is_none() {
            return Err(ScpError::malformed(
                "first record must contain collection metadata",
            ));
        }
        self.validator.validate_collection_metadata(&header)?;

        let record: HeaderRecord = serde_json::from_value(header)
            .map_err(|e| ScpError::malformed(format!("header deserialization failed: {e}")))?;
        let metadata = record.collection;

        // The checksum domain is the document with the checksum key absent:
        // canonical re-serialization of the stripped header, spliced onto
        // the body exactly as read. Hashing the raw on-disk bytes would
        // include the tag and could never match.
        if let Some(tag) = &metadata.checksum {
            let mut domain = metadata.canonical_header_line()?.into_bytes();
            if lines.len() > 1 {
                domain.push(b'\n');
                let body = lines[1..].join("\n");
                domain.extend_from_slice(body.as_bytes());
            }
            match checksum::verify(&domain, tag) {
                Ok(()) => trace!("checksum verified for collection {}", metadata.id),
                Err(err) if self.options.strict => return Err(err),
                Err(err) => {
                    diagnostics.push(Diagnostic::error(
                        1,
                        format!("checksum verification failed: {err}"),
                    ));
                }
            }
        }

        Ok(metadata)
    }
}

/// Prefix a line number onto a schema violation; other error kinds carry
/// their own context
fn at_line(line: usize, err: ScpError) -> ScpError {
    match err {
        ScpError::SchemaViolation(msg) => ScpError::SchemaViolation(format!("line {line}: {msg}")),
        other => other,
    }
}

/// Parse an SCP collection from bytes (convenience function)
///
/// Builds a throwaway [`SchemaValidator`]; construct one yourself and use
/// [`Parser`] when parsing many files.
pub fn parse_collection(data: &[u8], strict: bool) -> Result<ParseOutcome> {
    let validator = SchemaValidator::new();
    let parser = Parser::with_options(
        &validator,
        ParseOptions {
            strict,
            ..ParseOptions::default()
        },
    );
    parser.parse_bytes(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::Severity;

    const HEADER: &str = concat!(
        r#"{"collection":{"id":"blog-2025-01","section":"blog","type":"snapshot","#,
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

    fn parse(doc: &str, strict: bool) -> Result<ParseOutcome> {
        parse_collection(doc.as_bytes(), strict)
    }

    #[test]
    fn test_minimal_document() {
        let doc = format!("{HEADER}\n{}", page_line("https://example.com/a"));
        let outcome = parse(&doc, true).unwrap();
        assert_eq!(outcome.collection.page_count(), 1);
        assert_eq!(outcome.collection.metadata.id, "blog-2025-01");
        assert!(outcome.diagnostics.is_empty());
    }

    #[test]
    fn test_empty_document_fatal() {
        for doc in ["", "\n\n", "   "] {
            let err = parse(doc, false).unwrap_err();
            assert!(matches!(err, ScpError::Malformed(_)), "doc: {doc:?}");
        }
    }

    #[test]
    fn test_header_must_hold_collection_key() {
        let err = parse("{\"not_collection\":{}}", false).unwrap_err();
        assert!(matches!(err, ScpError::Malformed(_)));
    }

    #[test]
    fn test_header_json_failure_fatal_even_lenient() {
        let err = parse("{nope", false).unwrap_err();
        assert!(matches!(err, ScpError::Json { line: 1, .. }));
    }

    #[test]
    fn test_header_schema_violation_fatal_even_lenient() {
        let doc = r#"{"collection":{"id":"x","section":"s","type":"weird","generated":"2025-01-15T12:00:00Z","version":"0.1"}}"#;
        let err = parse(doc, false).unwrap_err();
        assert!(matches!(err, ScpError::SchemaViolation(_)));
    }

    #[test]
    fn test_blank_lines_skipped() {
        let doc = format!(
            "{HEADER}\n\n{}\n\n{}\n",
            page_line("https://example.com/a"),
            page_line("https://example.com/b")
        );
        let outcome = parse(&doc, true).unwrap();
        assert_eq!(outcome.collection.page_count(), 2);
    }

    #[test]
    fn test_lenient_recovers_bad_json() {
        let doc = format!(
            "{HEADER}\n{}\nnot json at all\n{}",
            page_line("https://example.com/a"),
            page_line("https://example.com/b")
        );
        let outcome = parse(&doc, false).unwrap();
        assert_eq!(outcome.collection.page_count(), 2);
        assert_eq!(outcome.diagnostics.len(), 1);
        assert_eq!(outcome.diagnostics[0].line, 3);
        assert_eq!(outcome.diagnostics[0].severity, Severity::Error);
    }

    #[test]
    fn test_strict_aborts_on_bad_json() {
        let doc = format!("{HEADER}\nnot json at all");
        let err = parse(&doc, true).unwrap_err();
        assert!(matches!(err, ScpError::Json { line: 2, .. }));
    }

    #[test]
    fn test_lenient_vs_strict_divergence_on_schema() {
        let doc = format!(
            "{HEADER}\n{}\n{}",
            page_line("not-a-url"),
            page_line("https://example.com/b")
        );

        let lenient = parse(&doc, false).unwrap();
        assert_eq!(lenient.collection.page_count(), 1);
        assert_eq!(lenient.diagnostics.len(), 1);

        let err = parse(&doc, true).unwrap_err();
        assert!(matches!(err, ScpError::SchemaViolation(_)));
    }

    #[test]
    fn test_unknown_block_kept_with_one_warning_in_both_modes() {
        let page = concat!(
            r#"{"url":"https://example.com/a","title":"T","description":"D","#,
            r#""modified":"2025-01-15T12:00:00Z","language":"en","#,
            r#""content":[{"type":"widget-v2","x":1}]}"#
        );
        let doc = format!("{HEADER}\n{page}");

        for strict in [false, true] {
            let outcome = parse(&doc, strict).unwrap();
            assert_eq!(outcome.collection.page_count(), 1);
            assert_eq!(outcome.diagnostics.len(), 1, "strict: {strict}");
            assert_eq!(outcome.diagnostics[0].severity, Severity::Warning);
            let block = &outcome.collection.pages[0].content[0];
            assert_eq!(block.block_type(), "widget-v2");
            assert!(!block.is_known());
        }
    }

    #[test]
    fn test_known_block_shape_violation_follows_mode() {
        let page = concat!(
            r#"{"url":"https://example.com/a","title":"T","description":"D","#,
            r#""modified":"2025-01-15T12:00:00Z","language":"en","#,
            r#""content":[{"type":"heading","level":9,"text":"H"}]}"#
        );
        let doc = format!("{HEADER}\n{page}");

        let err = parse(&doc, true).unwrap_err();
        assert!(matches!(err, ScpError::SchemaViolation(_)));

        let outcome = parse(&doc, false).unwrap();
        assert_eq!(outcome.collection.page_count(), 0);
        assert_eq!(outcome.diagnostics.len(), 1);
    }

    #[test]
    fn test_missing_block_type_is_hard_failure_lenient_skips_record() {
        let page = concat!(
            r#"{"url":"https://example.com/a","title":"T","description":"D","#,
            r#""modified":"2025-01-15T12:00:00Z","language":"en","#,
            r#""content":[{"x":1}]}"#
        );
        let doc = format!("{HEADER}\n{page}");
        let outcome = parse(&doc, false).unwrap();
        assert_eq!(outcome.collection.page_count(), 0);
        assert_eq!(outcome.diagnostics.len(), 1);
        assert_eq!(outcome.diagnostics[0].severity, Severity::Error);
    }

    #[test]
    fn test_checksum_mismatch_lenient_vs_strict() {
        let bogus = format!("sha256:{}", "0".repeat(64));
        let header = format!(
            concat!(
                r#"{{"collection":{{"id":"x","section":"s","type":"snapshot","#,
                r#""generated":"2025-01-15T12:00:00Z","version":"0.1","checksum":"{}"}}}}"#
            ),
            bogus
        );
        let doc = format!("{header}\n{}", page_line("https://example.com/a"));

        let outcome = parse(&doc, false).unwrap();
        assert_eq!(outcome.diagnostics.len(), 1);
        assert!(outcome.diagnostics[0].message.contains("checksum"));

        let err = parse(&doc, true).unwrap_err();
        assert!(err.is_integrity());
    }
}
