//! Generator for SCP collection documents
//!
//! Builds the canonical byte form of a collection - one metadata record and
//! one record per page, single-line JSON joined by newlines - then stamps
//! the integrity checksum and hands the result to the compression guard.
//!
//! ## Checksum stamping order
//!
//! The checksum lives inside the metadata record it authenticates, so the
//! tag is computed *before* it is stamped: serialize the whole document
//! with no checksum field, hash those bytes, set the tag, and re-serialize
//! the metadata record only. The page records are untouched by the stamp,
//! which is what lets the parser rebuild the identical domain at
//! verification time.
//!
//! ## Examples
//!
//! ```rust
//! use sitepack::collection::{CollectionType, ContentBlock, Page};
//! use sitepack::generator::{GenerateOptions, Generator};
//!
//! let mut generator = Generator::new("blog-2025-01", "blog", CollectionType::Snapshot, None)?;
//! generator.add_page(Page {
//!     url: "https://example.com/hello".to_string(),
//!     title: "Hello".to_string(),
//!     description: "First post".to_string(),
//!     modified: "2025-01-15T12:00:00Z".to_string(),
//!     language: "en".to_string(),
//!     content: vec![ContentBlock::Text { text: "Hi.".to_string() }],
//!     author: None,
//!     published: None,
//!     canonical: None,
//!     robots: Vec::new(),
//!     schema_data: None,
//! });
//!
//! let bytes = generator.generate(&GenerateOptions::default())?;
//! assert!(!bytes.is_empty());
//! # Ok::<(), sitepack::ScpError>(())
//! ```

use crate::checksum;
use crate::collection::{CollectionMetadata, CollectionType, Page, FORMAT_VERSION};
use crate::compression::{self, CompressionFormat};
use crate::error::{Result, ScpError};
use crate::schema::SchemaValidator;
use chrono::{SecondsFormat, Utc};
use serde_json::Value;
use std::path::Path;
use tracing::debug;

/// Output options for [`Generator::generate`]
#[derive(Debug, Clone)]
pub struct GenerateOptions {
    /// Stamp a SHA-256 checksum into the metadata record
    pub include_checksum: bool,
    /// Output compression format
    pub compression: CompressionFormat,
    /// Compression level; `None` uses the format default (gzip 6, zstd 9)
    pub level: Option<u32>,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        GenerateOptions {
            include_checksum: true,
            compression: CompressionFormat::Gzip,
            level: None,
        }
    }
}

/// Builder for SCP collection files
///
/// Collects a collection identity and an ordered list of pages, then
/// serializes them to the canonical byte form. Page order is preserved
/// into the document.
#[derive(Debug)]
pub struct Generator {
    id: String,
    section: String,
    collection_type: CollectionType,
    since: Option<String>,
    version: String,
    pages: Vec<Page>,
}

impl Generator {
    /// Create a generator for a collection identity
    ///
    /// # Errors
    ///
    /// [`ScpError::SchemaViolation`] if `collection_type` is
    /// [`CollectionType::Delta`] and `since` is absent, or
    /// [`CollectionType::Snapshot`] and `since` is present.
    pub fn new(
        id: impl Into<String>,
        section: impl Into<String>,
        collection_type: CollectionType,
        since: Option<String>,
    ) -> Result<Self> {
        match (collection_type, &since) {
            (CollectionType::Delta, None) => {
                return Err(ScpError::schema(
                    "delta collections require a 'since' timestamp",
                ))
            }
            (CollectionType::Snapshot, Some(_)) => {
                return Err(ScpError::schema(
                    "'since' is only valid for delta collections",
                ))
            }
            _ => {}
        }
        Ok(Generator {
            id: id.into(),
            section: section.into(),
            collection_type,
            since,
            version: FORMAT_VERSION.to_string(),
            pages: Vec::new(),
        })
    }

    /// Append a page; file order follows call order
    pub fn add_page(&mut self, page: Page) {
        self.pages.push(page);
    }

    /// Append a pre-shaped page record, validating it first
    ///
    /// # Errors
    ///
    /// [`ScpError::SchemaViolation`] or
    /// [`ScpError::TooManyContentBlocks`] if the record does not conform
    /// to the page schema.
    pub fn add_page_value(&mut self, validator: &SchemaValidator, record: Value) -> Result<()> {
        validator.validate_page(&record)?;
        let page: Page = serde_json::from_value(record)
            .map_err(|e| ScpError::schema(format!("page deserialization failed: {e}")))?;
        self.pages.push(page);
        Ok(())
    }

    /// Number of pages added so far
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Generate the collection document
    ///
    /// Stamps a fresh `generated` timestamp, serializes the canonical
    /// form, computes and stamps the checksum when requested, and
    /// compresses per the options.
    ///
    /// # Errors
    ///
    /// [`ScpError::Malformed`] if no pages were added; compression errors
    /// per [`crate::compression::compress`].
    pub fn generate(&self, options: &GenerateOptions) -> Result<Vec<u8>> {
        if self.pages.is_empty() {
            return Err(ScpError::malformed("no pages added to collection"));
        }

        let mut metadata = CollectionMetadata {
            id: self.id.clone(),
            section: self.section.clone(),
            collection_type: self.collection_type,
            generated: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
            version: self.version.clone(),
            since: self.since.clone(),
            checksum: None,
        };

        let mut lines = Vec::with_capacity(1 + self.pages.len());
        lines.push(metadata.header_line()?);
        for page in &self.pages {
            let line = serde_json::to_string(page)
                .map_err(|e| ScpError::malformed(format!("page serialization failed: {e}")))?;
            lines.push(line);
        }

        if options.include_checksum {
            // Hash the checksum-free document, then re-serialize only the
            // header record with the tag stamped in.
            let canonical = lines.join("\n");
            metadata.checksum = Some(checksum::compute(canonical.as_bytes()));
            lines[0] = metadata.header_line()?;
        }

        let document = lines.join("\n");
        let level = options
            .level
            .unwrap_or_else(|| options.compression.default_level());
        debug!(
            "generated collection {}: {} pages, {} bytes canonical, compression {}",
            self.id,
            self.pages.len(),
            document.len(),
            options.compression
        );
        compression::compress(document.as_bytes(), options.compression, level)
    }

    /// Generate and write the collection to a file, creating parent
    /// directories as needed
    pub fn write_to(&self, path: impl AsRef<Path>, options: &GenerateOptions) -> Result<()> {
        let path = path.as_ref();
        let data = self.generate(options)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, data)?;
        debug!("wrote collection {} to {:?}", self.id, path);
        Ok(())
    }
}
