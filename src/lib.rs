//! # sitepack - SCP collection codec
//!
//! A streaming codec for SCP ("site content pack") collections: bundles of
//! web-page content optimized for cheap bulk transfer and fast re-parsing
//! by machines rather than browsers.
//!
//! ## Overview
//!
//! An SCP document is UTF-8 JSON Lines: record 0 carries the collection
//! metadata under a `collection` key, records 1..N carry one page each.
//! Documents ship uncompressed (`.scp`), gzipped (`.scp.gz`) or
//! zstd-compressed (`.scp.zst`); readers always detect the format from
//! magic bytes, never from the extension. The codec reconciles four
//! cross-cutting concerns:
//!
//! - **Untrusted-input safety**: decompression runs in bounded chunks with
//!   ratio- and absolute-size bomb detection
//! - **Data integrity**: an optional content-addressed SHA-256 checksum
//!   over the canonical document form
//! - **Schema conformance**: structural validation of the metadata header
//!   and every page record, with a forward-compatible content-block union
//! - **Partial-failure tolerance**: a strict/lenient error policy lets
//!   ingestion pipelines choose between fail-fast and
//!   best-effort-with-diagnostics without two code paths
//!
//! ## Quick Start
//!
//! ```rust
//! use sitepack::{
//!     CollectionType, ContentBlock, GenerateOptions, Generator, Page, Parser, SchemaValidator,
//! };
//!
//! # fn main() -> sitepack::Result<()> {
//! // Build and serialize a collection
//! let mut generator = Generator::new("blog-2025-01", "blog", CollectionType::Snapshot, None)?;
//! generator.add_page(Page {
//!     url: "https://example.com/hello".to_string(),
//!     title: "Hello".to_string(),
//!     description: "First post".to_string(),
//!     modified: "2025-01-15T12:00:00Z".to_string(),
//!     language: "en".to_string(),
//!     content: vec![
//!         ContentBlock::Heading { level: 1, text: "Hello".to_string() },
//!         ContentBlock::Text { text: "Welcome to the blog.".to_string() },
//!     ],
//!     author: None,
//!     published: None,
//!     canonical: None,
//!     robots: Vec::new(),
//!     schema_data: None,
//! });
//! let bytes = generator.generate(&GenerateOptions::default())?;
//!
//! // Parse it back; the validator is constructed once and shared
//! let validator = SchemaValidator::new();
//! let outcome = Parser::new(&validator).parse_bytes(&bytes)?;
//! assert_eq!(outcome.collection.page_count(), 1);
//! assert!(outcome.diagnostics.is_empty());
//! # Ok(())
//! # }
//! ```
//!
//! ## Key Concepts
//!
//! ### Collections
//!
//! A [`Collection`] is one document: a metadata header (id, section,
//! snapshot/delta type, generation timestamp, format version, optional
//! changes-since timestamp and checksum) plus ordered pages. Collections
//! are immutable value aggregates - constructed wholesale, never mutated.
//!
//! ### Forward compatibility
//!
//! Page content is a sequence of typed blocks. Types the codec knows are
//! shape-validated; any other type round-trips verbatim through
//! [`ContentBlock::Unknown`] and surfaces as a warning diagnostic, never an
//! error. Documents using block types invented after this parser was built
//! remain readable.
//!
//! ### Strict vs. lenient parsing
//!
//! In lenient mode (the default), a bad page record is skipped and
//! recorded in the returned diagnostics; in strict mode the first failure
//! aborts. Header failures, decompression bombs, and oversize records are
//! fatal in both modes.
//!
//! ## Concurrency
//!
//! The codec is synchronous and single-threaded: every parse or generate
//! call is independent bounded work over an in-memory buffer, with no
//! shared mutable state. Callers may freely parallelize across files.
//!
//! ## Error Handling
//!
//! All operations return [`Result<T, ScpError>`](ScpError). The taxonomy
//! separates malformed input, schema violations, integrity failures, and
//! resource-limit rejections; classification helpers such as
//! [`ScpError::is_bomb`] let callers alert on attacks while treating
//! corrupt files as ordinary bad data.
//!
//! ## Module Organization
//!
//! - [`collection`]: the data model - collections, pages, content blocks
//! - [`compression`]: format detection, bounded compression, bomb guard
//! - [`checksum`]: content-addressed integrity tags
//! - [`schema`]: structural validation and block classification
//! - [`parser`]: bytes to validated collection plus diagnostics
//! - [`generator`]: collection to canonical, compressed bytes
//! - [`sitemap`]: sitemap.xml advertisement of published collections
//! - [`error`]: error types and classification

pub mod checksum;
pub mod collection;
pub mod compression;
pub mod error;
pub mod generator;
pub mod parser;
pub mod schema;
pub mod sitemap;

// Re-export main types for convenience
pub use collection::{
    Collection, CollectionMetadata, CollectionType, ContentBlock, Diagnostic, ListStyle, Page,
    Severity, FORMAT_VERSION,
};
pub use compression::CompressionFormat;
pub use error::{Result, ScpError};
pub use generator::{GenerateOptions, Generator};
pub use parser::{parse_collection, ParseOptions, ParseOutcome, Parser};
pub use schema::{BlockClass, SchemaValidator};
pub use sitemap::SitemapGenerator;
