//! Structural validation for SCP collection metadata and page objects
//!
//! The format carries exactly two schemas - one for the collection header,
//! one for page records - plus a forward-compatible classifier for content
//! blocks. Validation is expressed directly against [`serde_json::Value`]
//! so it runs before any typed model is constructed, and failures name the
//! first structural violation with a human-readable path
//! (`collection.type: ...`, `page.content[3]: ...`).
//!
//! [`SchemaValidator`] is an explicit value: construct it once (at program
//! start or first use) and pass it by reference to parse and generate
//! calls. There is no process-global schema state and no hidden
//! initialization order.
//!
//! ## Forward compatibility
//!
//! [`SchemaValidator::classify_content_block`] is the extension point: a
//! block whose `type` is in the known set is shape-validated and any
//! violation is an error; a block whose `type` is outside the known set is
//! classified [`BlockClass::Unknown`] with no further validation. Old
//! parsers must accept documents containing block types invented after the
//! parser was built - a missing `type` field is the one hard failure that
//! permissive handling never excuses.

use crate::collection::KNOWN_BLOCK_TYPES;
use crate::error::{Result, ScpError};
use regex::Regex;
use serde_json::Value;

/// Maximum byte length of a single record (100 MiB)
pub const MAX_RECORD_SIZE: usize = 100 * 1024 * 1024;

/// Maximum number of content blocks per page
pub const MAX_CONTENT_BLOCKS: usize = 1000;

/// Classification result for one content block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockClass {
    /// The block's type is in the known set and its shape validated
    Known,
    /// The block's type is outside the known set; carried verbatim
    Unknown,
}

/// Validator for the two fixed SCP schemas
///
/// Cheap to construct and freely shareable; holds only compiled patterns.
#[derive(Debug)]
pub struct SchemaValidator {
    language_pattern: Regex,
}

impl SchemaValidator {
    /// Construct a validator with its patterns compiled
    pub fn new() -> Self {
        SchemaValidator {
            language_pattern: Regex::new(r"^[a-zA-Z]{2,3}(-[a-zA-Z0-9]+)*$")
                .expect("language pattern is valid"),
        }
    }

    /// Validate a collection-metadata record
    ///
    /// Checks the top-level `collection` key, required fields
    /// (`id, section, type, generated, version`), the conditional `since`
    /// requirement, and type/shape conformance of each field.
    ///
    /// # Errors
    ///
    /// [`ScpError::SchemaViolation`] naming the first violation found.
    pub fn validate_collection_metadata(&self, doc: &Value) -> Result<()> {
        let collection = doc
            .get("collection")
            .ok_or_else(|| ScpError::schema("collection: required key missing"))?;
        let obj = collection
            .as_object()
            .ok_or_else(|| ScpError::schema("collection: must be an object"))?;

        for key in ["id", "section", "version"] {
            require_nonempty_str(obj, "collection", key)?;
        }

        let collection_type = require_nonempty_str(obj, "collection", "type")?;
        if collection_type != "snapshot" && collection_type != "delta" {
            return Err(ScpError::schema(format!(
                "collection.type: expected \"snapshot\" or \"delta\", got \"{collection_type}\""
            )));
        }

        require_timestamp(obj, "collection", "generated")?;

        match (collection_type, obj.get("since")) {
            ("delta", None) => {
                return Err(ScpError::schema(
                    "collection.since: required for delta collections",
                ))
            }
            ("delta", Some(_)) => {
                require_timestamp(obj, "collection", "since")?;
            }
            (_, Some(_)) => {
                return Err(ScpError::schema(
                    "collection.since: only valid for delta collections",
                ))
            }
            (_, None) => {}
        }

        if let Some(checksum) = obj.get("checksum") {
            if !checksum.is_string() {
                return Err(ScpError::schema("collection.checksum: must be a string"));
            }
        }

        Ok(())
    }

    /// Validate a page record
    ///
    /// Checks required fields (`url, title, description, modified,
    /// language, content`), URL well-formedness, timestamp parseability,
    /// and the content-block-count ceiling. Exceeding the ceiling is a
    /// size-limit failure, distinct from a structural one. Individual block
    /// shapes are the classifier's concern, not this method's.
    ///
    /// # Errors
    ///
    /// [`ScpError::SchemaViolation`] for structural problems,
    /// [`ScpError::TooManyContentBlocks`] past the ceiling.
    pub fn validate_page(&self, doc: &Value) -> Result<()> {
        let obj = doc
            .as_object()
            .ok_or_else(|| ScpError::schema("page: must be an object"))?;

        for key in ["title", "description"] {
            require_str(obj, "page", key)?;
        }

        let url = require_nonempty_str(obj, "page", "url")?;
        require_absolute_url("page.url", url)?;

        require_timestamp(obj, "page", "modified")?;
        if obj.contains_key("published") {
            require_timestamp(obj, "page", "published")?;
        }

        let language = require_nonempty_str(obj, "page", "language")?;
        if !self.language_pattern.is_match(language) {
            return Err(ScpError::schema(format!(
                "page.language: \"{language}\" is not a language code"
            )));
        }

        if let Some(author) = obj.get("author") {
            if !author.is_string() {
                return Err(ScpError::schema("page.author: must be a string"));
            }
        }

        if let Some(canonical) = obj.get("canonical") {
            let canonical = canonical
                .as_str()
                .ok_or_else(|| ScpError::schema("page.canonical: must be a string"))?;
            require_absolute_url("page.canonical", canonical)?;
        }

        if let Some(robots) = obj.get("robots") {
            let entries = robots
                .as_array()
                .ok_or_else(|| ScpError::schema("page.robots: must be an array"))?;
            for (i, entry) in entries.iter().enumerate() {
                if !entry.is_string() {
                    return Err(ScpError::schema(format!(
                        "page.robots[{i}]: must be a string"
                    )));
                }
            }
        }

        let content = obj
            .get("content")
            .ok_or_else(|| ScpError::schema("page.content: required field missing"))?
            .as_array()
            .ok_or_else(|| ScpError::schema("page.content: must be an array"))?;

        if content.len() > MAX_CONTENT_BLOCKS {
            return Err(ScpError::TooManyContentBlocks {
                count: content.len(),
                limit: MAX_CONTENT_BLOCKS,
            });
        }

        Ok(())
    }

    /// Classify one content block as known or unknown
    ///
    /// A missing `type` field is a hard validation failure in every mode.
    /// Known types are validated against their variant's shape; unknown
    /// types return [`BlockClass::Unknown`] without further validation.
    ///
    /// # Errors
    ///
    /// [`ScpError::SchemaViolation`] for a missing `type` or a known-type
    /// shape violation.
    pub fn classify_content_block(&self, block: &Value) -> Result<BlockClass> {
        let obj = block
            .as_object()
            .ok_or_else(|| ScpError::schema("content block: must be an object"))?;

        let block_type = obj
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| ScpError::schema("content block: missing 'type' field"))?;

        if !KNOWN_BLOCK_TYPES.contains(&block_type) {
            return Ok(BlockClass::Unknown);
        }

        let path = format!("content block '{block_type}'");
        match block_type {
            "text" => {
                require_str(obj, &path, "text")?;
            }
            "heading" => {
                let level = obj
                    .get("level")
                    .and_then(Value::as_u64)
                    .ok_or_else(|| ScpError::schema(format!("{path}.level: must be an integer")))?;
                if !(1..=6).contains(&level) {
                    return Err(ScpError::schema(format!(
                        "{path}.level: must be between 1 and 6, got {level}"
                    )));
                }
                require_str(obj, &path, "text")?;
            }
            "link" => {
                require_str(obj, &path, "url")?;
            }
            "image" => {
                require_str(obj, &path, "url")?;
            }
            "list" => {
                let style = require_str(obj, &path, "style")?;
                if style != "ordered" && style != "unordered" {
                    return Err(ScpError::schema(format!(
                        "{path}.style: expected \"ordered\" or \"unordered\", got \"{style}\""
                    )));
                }
                require_string_array(obj, &path, "items")?;
            }
            "code" => {
                require_str(obj, &path, "code")?;
            }
            "table" => {
                let rows = obj
                    .get("rows")
                    .and_then(Value::as_array)
                    .ok_or_else(|| ScpError::schema(format!("{path}.rows: must be an array")))?;
                for (i, row) in rows.iter().enumerate() {
                    let cells = row.as_array().ok_or_else(|| {
                        ScpError::schema(format!("{path}.rows[{i}]: must be an array of cells"))
                    })?;
                    for (j, cell) in cells.iter().enumerate() {
                        if !cell.is_string() {
                            return Err(ScpError::schema(format!(
                                "{path}.rows[{i}][{j}]: must be a string"
                            )));
                        }
                    }
                }
            }
            "quote" => {
                require_str(obj, &path, "text")?;
            }
            "video" | "audio" => {
                require_string_array(obj, &path, "sources")?;
            }
            "structured" => {
                require_str(obj, &path, "format")?;
                if !obj.contains_key("data") {
                    return Err(ScpError::schema(format!(
                        "{path}.data: required field missing"
                    )));
                }
            }
            _ => unreachable!("type checked against known set"),
        }

        Ok(BlockClass::Known)
    }
}

impl Default for SchemaValidator {
    fn default() -> Self {
        Self::new()
    }
}

fn require_str<'a>(
    obj: &'a serde_json::Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<&'a str> {
    obj.get(key)
        .ok_or_else(|| ScpError::schema(format!("{path}.{key}: required field missing")))?
        .as_str()
        .ok_or_else(|| ScpError::schema(format!("{path}.{key}: must be a string")))
}

fn require_nonempty_str<'a>(
    obj: &'a serde_json::Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<&'a str> {
    let value = require_str(obj, path, key)?;
    if value.is_empty() {
        return Err(ScpError::schema(format!("{path}.{key}: must not be empty")));
    }
    Ok(value)
}

fn require_timestamp(obj: &serde_json::Map<String, Value>, path: &str, key: &str) -> Result<()> {
    let value = require_str(obj, path, key)?;
    chrono::DateTime::parse_from_rfc3339(value).map_err(|_| {
        ScpError::schema(format!(
            "{path}.{key}: \"{value}\" is not an ISO-8601 timestamp"
        ))
    })?;
    Ok(())
}

fn require_string_array(
    obj: &serde_json::Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<()> {
    let entries = obj
        .get(key)
        .ok_or_else(|| ScpError::schema(format!("{path}.{key}: required field missing")))?
        .as_array()
        .ok_or_else(|| ScpError::schema(format!("{path}.{key}: must be an array")))?;
    for (i, entry) in entries.iter().enumerate() {
        if !entry.is_string() {
            return Err(ScpError::schema(format!(
                "{path}.{key}[{i}]: must be a string"
            )));
        }
    }
    Ok(())
}

/// Absolute http(s) URI check: scheme, non-empty host part, no whitespace
fn require_absolute_url(path: &str, url: &str) -> Result<()> {
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"));
    let valid = match rest {
        Some(rest) => !rest.is_empty() && !url.chars().any(|c| c.is_whitespace() || c.is_control()),
        None => false,
    };
    if !valid {
        return Err(ScpError::schema(format!(
            "{path}: \"{url}\" is not an absolute http(s) URL"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn metadata(collection_type: &str, since: Option<&str>) -> Value {
        let mut collection = json!({
            "id": "blog-2025-01",
            "section": "blog",
            "type": collection_type,
            "generated": "2025-01-15T12:00:00Z",
            "version": "0.1",
        });
        if let Some(since) = since {
            collection["since"] = json!(since);
        }
        json!({ "collection": collection })
    }

    fn page() -> Value {
        json!({
            "url": "https://example.com/post",
            "title": "A post",
            "description": "About things",
            "modified": "2025-01-15T12:00:00Z",
            "language": "en",
            "content": [{"type": "text", "text": "hello"}],
        })
    }

    #[test]
    fn test_valid_metadata() {
        let validator = SchemaValidator::new();
        validator
            .validate_collection_metadata(&metadata("snapshot", None))
            .unwrap();
        validator
            .validate_collection_metadata(&metadata("delta", Some("2025-01-14T00:00:00Z")))
            .unwrap();
    }

    #[test]
    fn test_metadata_missing_field() {
        let validator = SchemaValidator::new();
        let mut doc = metadata("snapshot", None);
        doc["collection"].as_object_mut().unwrap().remove("id");
        let err = validator.validate_collection_metadata(&doc).unwrap_err();
        assert!(err.to_string().contains("collection.id"));
    }

    #[test]
    fn test_metadata_bad_type() {
        let validator = SchemaValidator::new();
        let err = validator
            .validate_collection_metadata(&metadata("incremental", None))
            .unwrap_err();
        assert!(err.to_string().contains("collection.type"));
    }

    #[test]
    fn test_delta_requires_since() {
        let validator = SchemaValidator::new();
        let err = validator
            .validate_collection_metadata(&metadata("delta", None))
            .unwrap_err();
        assert!(err.to_string().contains("collection.since"));
    }

    #[test]
    fn test_snapshot_rejects_since() {
        let validator = SchemaValidator::new();
        let err = validator
            .validate_collection_metadata(&metadata("snapshot", Some("2025-01-14T00:00:00Z")))
            .unwrap_err();
        assert!(err.to_string().contains("only valid for delta"));
    }

    #[test]
    fn test_metadata_bad_timestamp() {
        let validator = SchemaValidator::new();
        let mut doc = metadata("snapshot", None);
        doc["collection"]["generated"] = json!("yesterday");
        let err = validator.validate_collection_metadata(&doc).unwrap_err();
        assert!(err.to_string().contains("ISO-8601"));
    }

    #[test]
    fn test_valid_page() {
        SchemaValidator::new().validate_page(&page()).unwrap();
    }

    #[test]
    fn test_page_bad_url() {
        let validator = SchemaValidator::new();
        for bad in ["not-a-url", "ftp://example.com/x", "https://", "https://a b"] {
            let mut doc = page();
            doc["url"] = json!(bad);
            let err = validator.validate_page(&doc).unwrap_err();
            assert!(err.to_string().contains("page.url"), "url: {bad}");
        }
    }

    #[test]
    fn test_page_bad_language() {
        let validator = SchemaValidator::new();
        let mut doc = page();
        doc["language"] = json!("english language");
        assert!(validator.validate_page(&doc).is_err());
    }

    #[test]
    fn test_page_block_ceiling() {
        let validator = SchemaValidator::new();
        let mut doc = page();
        let block = json!({"type": "text", "text": "x"});
        doc["content"] = Value::Array(vec![block; MAX_CONTENT_BLOCKS + 1]);
        let err = validator.validate_page(&doc).unwrap_err();
        assert!(matches!(err, ScpError::TooManyContentBlocks { .. }));
        assert!(err.is_resource_limit());
    }

    #[test]
    fn test_classify_known() {
        let validator = SchemaValidator::new();
        let class = validator
            .classify_content_block(&json!({"type": "heading", "level": 3, "text": "H"}))
            .unwrap();
        assert_eq!(class, BlockClass::Known);
    }

    #[test]
    fn test_classify_unknown_skips_validation() {
        let validator = SchemaValidator::new();
        let class = validator
            .classify_content_block(&json!({"type": "widget-v2", "x": 1}))
            .unwrap();
        assert_eq!(class, BlockClass::Unknown);
    }

    #[test]
    fn test_classify_missing_type_is_hard_failure() {
        let validator = SchemaValidator::new();
        let err = validator
            .classify_content_block(&json!({"text": "no tag"}))
            .unwrap_err();
        assert!(err.to_string().contains("'type'"));
    }

    #[test]
    fn test_classify_heading_level_range() {
        let validator = SchemaValidator::new();
        for level in [0, 7] {
            let err = validator
                .classify_content_block(&json!({"type": "heading", "level": level, "text": "H"}))
                .unwrap_err();
            assert!(err.to_string().contains("level"), "level: {level}");
        }
    }

    #[test]
    fn test_classify_list_style() {
        let validator = SchemaValidator::new();
        validator
            .classify_content_block(&json!({"type": "list", "style": "ordered", "items": ["a"]}))
            .unwrap();
        let err = validator
            .classify_content_block(&json!({"type": "list", "style": "fancy", "items": []}))
            .unwrap_err();
        assert!(err.to_string().contains("style"));
    }
}
