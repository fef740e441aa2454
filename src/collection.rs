//! Core data model for SCP collections
//!
//! A [`Collection`] is one SCP document: a metadata header plus ordered
//! pages, each carrying an ordered sequence of content blocks. Collections
//! and pages are immutable value aggregates - they are constructed wholesale
//! by the [`crate::generator`] from caller-supplied data or by the
//! [`crate::parser`] from file bytes, then either serialized out or consumed
//! read-only. Nothing mutates them in place.
//!
//! ## Content blocks
//!
//! [`ContentBlock`] is a tagged union keyed by a `type` string. The known
//! variants are a closed, shape-checked set; everything else lands in
//! [`ContentBlock::Unknown`], which carries the original JSON payload
//! untouched. That is the format's forward-compatibility contract: parsers
//! built today must round-trip block types invented tomorrow, losslessly,
//! reporting a warning-level diagnostic rather than an error.

use serde::de::Error as _;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// SCP format version emitted by the generator
pub const FORMAT_VERSION: &str = "0.1";

/// Content block `type` values with a known, validated shape
pub const KNOWN_BLOCK_TYPES: &[&str] = &[
    "text",
    "heading",
    "link",
    "image",
    "list",
    "code",
    "table",
    "quote",
    "video",
    "audio",
    "structured",
];

/// Collection kind: full snapshot or changes since a timestamp
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectionType {
    /// Full point-in-time collection
    Snapshot,
    /// Collection scoped to changes since a given timestamp
    Delta,
}

impl std::fmt::Display for CollectionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CollectionType::Snapshot => write!(f, "snapshot"),
            CollectionType::Delta => write!(f, "delta"),
        }
    }
}

/// Collection metadata from the first record of an SCP document
///
/// Field declaration order is the canonical wire key order; the checksum
/// canonicalization contract depends on re-serialization being
/// deterministic, so new fields must be appended, not inserted.
///
/// Timestamps stay validated strings rather than parsed date types: a
/// foreign document's sub-second precision must survive re-serialization
/// byte-exactly for its checksum domain to be reproducible.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionMetadata {
    /// Unique collection identifier within its section
    pub id: String,
    /// Section name (e.g. blog, docs)
    pub section: String,
    /// Snapshot or delta
    #[serde(rename = "type")]
    pub collection_type: CollectionType,
    /// ISO-8601 UTC generation timestamp
    pub generated: String,
    /// SCP format version
    pub version: String,
    /// Changes-since timestamp; present exactly when `collection_type`
    /// is [`CollectionType::Delta`]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub since: Option<String>,
    /// Integrity tag (`sha256:<hex>`) over the canonical document form
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
}

/// Wire shape of the header record: `{"collection": {...}}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct HeaderRecord {
    pub collection: CollectionMetadata,
}

impl CollectionMetadata {
    /// Serialize this metadata as the single-line header record
    pub(crate) fn header_line(&self) -> crate::error::Result<String> {
        serde_json::to_string(&HeaderRecord {
            collection: self.clone(),
        })
        .map_err(|e| crate::error::ScpError::malformed(format!("header serialization failed: {e}")))
    }

    /// Serialize the header record with the checksum field absent
    ///
    /// This is the checksum domain: the bytes a tag describes never contain
    /// the tag itself.
    pub(crate) fn canonical_header_line(&self) -> crate::error::Result<String> {
        let mut stripped = self.clone();
        stripped.checksum = None;
        stripped.header_line()
    }
}

/// One page of web content within a collection
///
/// Page order within the document is significant and preserved. Field
/// declaration order is the wire key order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    /// Absolute page URL
    pub url: String,
    /// Page title
    pub title: String,
    /// Meta description
    pub description: String,
    /// ISO-8601 last-modified timestamp
    pub modified: String,
    /// Language code (e.g. "en")
    pub language: String,
    /// Ordered content blocks (at most 1000)
    pub content: Vec<ContentBlock>,
    /// Author name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    /// ISO-8601 publication timestamp
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published: Option<String>,
    /// Canonical URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub canonical: Option<String>,
    /// Robot directive strings
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub robots: Vec<String>,
    /// Opaque structured-data blob, passed through unvalidated
    #[serde(rename = "schema", default, skip_serializing_if = "Option::is_none")]
    pub schema_data: Option<Value>,
}

/// Ordered-list style marker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListStyle {
    /// Numbered list
    Ordered,
    /// Bulleted list
    Unordered,
}

impl ListStyle {
    fn as_str(&self) -> &'static str {
        match self {
            ListStyle::Ordered => "ordered",
            ListStyle::Unordered => "unordered",
        }
    }
}

/// One typed unit of page content
///
/// Known variants serialize internally tagged (`{"type": "heading", ...}`).
/// [`ContentBlock::Unknown`] holds the verbatim JSON object of a block whose
/// `type` is outside the known set and re-emits it unchanged.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentBlock {
    /// Plain text run
    Text {
        /// Text content
        text: String,
    },
    /// Section heading
    Heading {
        /// Heading level, 1-6
        level: u8,
        /// Heading text
        text: String,
    },
    /// Hyperlink
    Link {
        /// Link target
        url: String,
        /// Link text
        text: Option<String>,
    },
    /// Image reference
    Image {
        /// Image source URL
        url: String,
        /// Alternative text
        alt: Option<String>,
        /// Caption
        caption: Option<String>,
    },
    /// Ordered or unordered list
    List {
        /// List style
        style: ListStyle,
        /// List items
        items: Vec<String>,
    },
    /// Code snippet
    Code {
        /// Language tag
        language: Option<String>,
        /// Code text
        code: String,
    },
    /// Table of cells
    Table {
        /// Rows of cell text
        rows: Vec<Vec<String>>,
    },
    /// Block quotation
    Quote {
        /// Quoted text
        text: String,
        /// Citation
        citation: Option<String>,
    },
    /// Video with one or more sources
    Video {
        /// Source URIs
        sources: Vec<String>,
        /// Caption
        caption: Option<String>,
    },
    /// Audio with one or more sources
    Audio {
        /// Source URIs
        sources: Vec<String>,
    },
    /// Opaque structured payload with a format discriminator
    Structured {
        /// Payload format name
        format: String,
        /// Payload data
        data: Value,
    },
    /// Block of a type outside the known set, carried verbatim
    Unknown(Value),
}

impl ContentBlock {
    /// The block's `type` tag as it appears on the wire
    pub fn block_type(&self) -> &str {
        match self {
            ContentBlock::Text { .. } => "text",
            ContentBlock::Heading { .. } => "heading",
            ContentBlock::Link { .. } => "link",
            ContentBlock::Image { .. } => "image",
            ContentBlock::List { .. } => "list",
            ContentBlock::Code { .. } => "code",
            ContentBlock::Table { .. } => "table",
            ContentBlock::Quote { .. } => "quote",
            ContentBlock::Video { .. } => "video",
            ContentBlock::Audio { .. } => "audio",
            ContentBlock::Structured { .. } => "structured",
            ContentBlock::Unknown(value) => value
                .get("type")
                .and_then(Value::as_str)
                .unwrap_or("unknown"),
        }
    }

    /// Whether this block's type is in the known, shape-checked set
    pub fn is_known(&self) -> bool {
        !matches!(self, ContentBlock::Unknown(_))
    }
}

/// Mirror of the known variants for derived tagged deserialization
#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum TaggedBlock {
    Text {
        text: String,
    },
    Heading {
        level: u8,
        text: String,
    },
    Link {
        url: String,
        #[serde(default)]
        text: Option<String>,
    },
    Image {
        url: String,
        #[serde(default)]
        alt: Option<String>,
        #[serde(default)]
        caption: Option<String>,
    },
    List {
        style: ListStyle,
        items: Vec<String>,
    },
    Code {
        #[serde(default)]
        language: Option<String>,
        code: String,
    },
    Table {
        rows: Vec<Vec<String>>,
    },
    Quote {
        text: String,
        #[serde(default)]
        citation: Option<String>,
    },
    Video {
        sources: Vec<String>,
        #[serde(default)]
        caption: Option<String>,
    },
    Audio {
        sources: Vec<String>,
    },
    Structured {
        format: String,
        data: Value,
    },
}

impl From<TaggedBlock> for ContentBlock {
    fn from(tagged: TaggedBlock) -> Self {
        match tagged {
            TaggedBlock::Text { text } => ContentBlock::Text { text },
            TaggedBlock::Heading { level, text } => ContentBlock::Heading { level, text },
            TaggedBlock::Link { url, text } => ContentBlock::Link { url, text },
            TaggedBlock::Image { url, alt, caption } => ContentBlock::Image { url, alt, caption },
            TaggedBlock::List { style, items } => ContentBlock::List { style, items },
            TaggedBlock::Code { language, code } => ContentBlock::Code { language, code },
            TaggedBlock::Table { rows } => ContentBlock::Table { rows },
            TaggedBlock::Quote { text, citation } => ContentBlock::Quote { text, citation },
            TaggedBlock::Video { sources, caption } => ContentBlock::Video { sources, caption },
            TaggedBlock::Audio { sources } => ContentBlock::Audio { sources },
            TaggedBlock::Structured { format, data } => ContentBlock::Structured { format, data },
        }
    }
}

impl Serialize for ContentBlock {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        // Unknown blocks re-emit their payload verbatim; known blocks emit
        // the tag first, then fields in declaration order.
        if let ContentBlock::Unknown(value) = self {
            return value.serialize(serializer);
        }

        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("type", self.block_type())?;
        match self {
            ContentBlock::Text { text } => {
                map.serialize_entry("text", text)?;
            }
            ContentBlock::Heading { level, text } => {
                map.serialize_entry("level", level)?;
                map.serialize_entry("text", text)?;
            }
            ContentBlock::Link { url, text } => {
                map.serialize_entry("url", url)?;
                if let Some(text) = text {
                    map.serialize_entry("text", text)?;
                }
            }
            ContentBlock::Image { url, alt, caption } => {
                map.serialize_entry("url", url)?;
                if let Some(alt) = alt {
                    map.serialize_entry("alt", alt)?;
                }
                if let Some(caption) = caption {
                    map.serialize_entry("caption", caption)?;
                }
            }
            ContentBlock::List { style, items } => {
                map.serialize_entry("style", style.as_str())?;
                map.serialize_entry("items", items)?;
            }
            ContentBlock::Code { language, code } => {
                if let Some(language) = language {
                    map.serialize_entry("language", language)?;
                }
                map.serialize_entry("code", code)?;
            }
            ContentBlock::Table { rows } => {
                map.serialize_entry("rows", rows)?;
            }
            ContentBlock::Quote { text, citation } => {
                map.serialize_entry("text", text)?;
                if let Some(citation) = citation {
                    map.serialize_entry("citation", citation)?;
                }
            }
            ContentBlock::Video { sources, caption } => {
                map.serialize_entry("sources", sources)?;
                if let Some(caption) = caption {
                    map.serialize_entry("caption", caption)?;
                }
            }
            ContentBlock::Audio { sources } => {
                map.serialize_entry("sources", sources)?;
            }
            ContentBlock::Structured { format, data } => {
                map.serialize_entry("format", format)?;
                map.serialize_entry("data", data)?;
            }
            ContentBlock::Unknown(_) => unreachable!("handled above"),
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ContentBlock {
    fn deserialize<D: Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        let block_type = value
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| D::Error::custom("content block missing 'type' field"))?;

        if KNOWN_BLOCK_TYPES.contains(&block_type) {
            let tagged: TaggedBlock = serde_json::from_value(value).map_err(D::Error::custom)?;
            Ok(tagged.into())
        } else {
            Ok(ContentBlock::Unknown(value))
        }
    }
}

/// One complete SCP document: metadata header plus ordered pages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collection {
    /// Header metadata
    pub metadata: CollectionMetadata,
    /// Pages in file order
    pub pages: Vec<Page>,
}

impl Collection {
    /// Number of pages in the collection
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Whether this is a delta collection
    pub fn is_delta(&self) -> bool {
        self.metadata.collection_type == CollectionType::Delta
    }
}

/// Severity of a non-fatal parse diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational; the record was kept (e.g. unknown block type)
    Warning,
    /// A record was skipped or a check failed in lenient mode
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// A non-fatal problem recorded during a lenient parse
///
/// Diagnostics are returned alongside the parse result in document order,
/// never silently dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    /// 1-indexed line number within the decompressed document
    pub line: usize,
    /// Diagnostic severity
    pub severity: Severity,
    /// Human-readable message
    pub message: String,
}

impl Diagnostic {
    /// Create a warning-level diagnostic
    pub fn warning(line: usize, message: impl Into<String>) -> Self {
        Diagnostic {
            line,
            severity: Severity::Warning,
            message: message.into(),
        }
    }

    /// Create an error-level diagnostic
    pub fn error(line: usize, message: impl Into<String>) -> Self {
        Diagnostic {
            line,
            severity: Severity::Error,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}: {}: {}", self.line, self.severity, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_known_block_roundtrip() {
        let block = ContentBlock::Heading {
            level: 2,
            text: "Overview".to_string(),
        };
        let json = serde_json::to_string(&block).unwrap();
        assert_eq!(json, r#"{"type":"heading","level":2,"text":"Overview"}"#);
        let back: ContentBlock = serde_json::from_str(&json).unwrap();
        assert_eq!(back, block);
    }

    #[test]
    fn test_optional_fields_omitted() {
        let block = ContentBlock::Link {
            url: "https://example.com/a".to_string(),
            text: None,
        };
        let json = serde_json::to_string(&block).unwrap();
        assert_eq!(json, r#"{"type":"link","url":"https://example.com/a"}"#);
    }

    #[test]
    fn test_unknown_block_roundtrip_verbatim() {
        let raw = json!({"type": "widget-v2", "x": 1});
        let block: ContentBlock = serde_json::from_value(raw.clone()).unwrap();
        assert!(!block.is_known());
        assert_eq!(block.block_type(), "widget-v2");
        assert_eq!(serde_json::to_value(&block).unwrap(), raw);
    }

    #[test]
    fn test_block_without_type_rejected() {
        let err = serde_json::from_value::<ContentBlock>(json!({"text": "hi"})).unwrap_err();
        assert!(err.to_string().contains("type"));
    }

    #[test]
    fn test_metadata_wire_shape() {
        let metadata = CollectionMetadata {
            id: "blog-2025-01".to_string(),
            section: "blog".to_string(),
            collection_type: CollectionType::Delta,
            generated: "2025-01-15T12:00:00Z".to_string(),
            version: FORMAT_VERSION.to_string(),
            since: Some("2025-01-14T00:00:00Z".to_string()),
            checksum: None,
        };
        let line = metadata.header_line().unwrap();
        assert_eq!(
            line,
            r#"{"collection":{"id":"blog-2025-01","section":"blog","type":"delta","generated":"2025-01-15T12:00:00Z","version":"0.1","since":"2025-01-14T00:00:00Z"}}"#
        );
    }

    #[test]
    fn test_canonical_header_strips_checksum() {
        let metadata = CollectionMetadata {
            id: "docs".to_string(),
            section: "docs".to_string(),
            collection_type: CollectionType::Snapshot,
            generated: "2025-01-15T12:00:00Z".to_string(),
            version: FORMAT_VERSION.to_string(),
            since: None,
            checksum: Some("sha256:".to_string() + &"0".repeat(64)),
        };
        let canonical = metadata.canonical_header_line().unwrap();
        assert!(!canonical.contains("checksum"));
        let stamped = metadata.header_line().unwrap();
        assert!(stamped.contains("checksum"));
    }
}
