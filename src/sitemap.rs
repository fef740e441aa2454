//! Sitemap generation with SCP extension elements
//!
//! Publishers advertise their collections through an ordinary
//! `sitemap.xml` extended with an `scp:` namespace: the protocol version,
//! the compression formats on offer, one element per section, and one
//! element per downloadable snapshot or delta collection. This is a flat
//! attribute-to-element serializer - no safety or validation concerns, and
//! entirely separate from the codec.
//!
//! ## Examples
//!
//! ```rust
//! use sitepack::sitemap::SitemapGenerator;
//!
//! let mut sitemap = SitemapGenerator::new("0.1", vec!["zstd".into(), "gzip".into()]);
//! sitemap.add_section("blog", "daily", "~5000");
//! sitemap.add_snapshot(
//!     "blog",
//!     "https://example.com/scp/blog.scp.zst",
//!     "2025-01-15T00:00:00Z",
//!     "2025-01-16T00:00:00Z",
//!     4987,
//!     52_428_800,
//! );
//!
//! let xml = sitemap.generate()?;
//! assert!(xml.contains("scp:collection"));
//! # Ok::<(), sitepack::ScpError>(())
//! ```

use crate::error::{Result, ScpError};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io::Cursor;
use std::path::Path;

const SITEMAP_NS: &str = "http://www.sitemaps.org/schemas/sitemap/0.9";
const SCP_NS: &str = "https://scp-protocol.org/schemas/sitemap/1.0";

/// Section advertisement: update cadence and approximate size
#[derive(Debug, Clone)]
struct Section {
    name: String,
    update_freq: String,
    pages: String,
}

/// Downloadable snapshot collection entry
#[derive(Debug, Clone)]
struct SnapshotEntry {
    section: String,
    url: String,
    generated: String,
    expires: String,
    pages: u64,
    size: u64,
}

/// Downloadable delta collection entry
#[derive(Debug, Clone)]
struct DeltaEntry {
    section: String,
    period: String,
    url: String,
    generated: String,
    expires: String,
    pages: u64,
    size: u64,
    since: String,
}

/// Generator for `sitemap.xml` with SCP extensions
#[derive(Debug)]
pub struct SitemapGenerator {
    version: String,
    compression: Vec<String>,
    sections: Vec<Section>,
    snapshots: Vec<SnapshotEntry>,
    deltas: Vec<DeltaEntry>,
}

impl SitemapGenerator {
    /// Create a sitemap generator
    ///
    /// `version` is the SCP protocol version; `compression` lists the
    /// formats the publisher serves, in preference order.
    pub fn new(version: impl Into<String>, compression: Vec<String>) -> Self {
        SitemapGenerator {
            version: version.into(),
            compression,
            sections: Vec::new(),
            snapshots: Vec::new(),
            deltas: Vec::new(),
        }
    }

    /// Add a section definition
    ///
    /// `pages` is an approximate count, e.g. `"~5000"`.
    pub fn add_section(
        &mut self,
        name: impl Into<String>,
        update_freq: impl Into<String>,
        pages: impl Into<String>,
    ) {
        self.sections.push(Section {
            name: name.into(),
            update_freq: update_freq.into(),
            pages: pages.into(),
        });
    }

    /// Add a snapshot collection entry
    ///
    /// `size` is the compressed file size in bytes.
    pub fn add_snapshot(
        &mut self,
        section: impl Into<String>,
        url: impl Into<String>,
        generated: impl Into<String>,
        expires: impl Into<String>,
        pages: u64,
        size: u64,
    ) {
        self.snapshots.push(SnapshotEntry {
            section: section.into(),
            url: url.into(),
            generated: generated.into(),
            expires: expires.into(),
            pages,
            size,
        });
    }

    /// Add a delta collection entry
    #[allow(clippy::too_many_arguments)]
    pub fn add_delta(
        &mut self,
        section: impl Into<String>,
        period: impl Into<String>,
        url: impl Into<String>,
        generated: impl Into<String>,
        expires: impl Into<String>,
        pages: u64,
        size: u64,
        since: impl Into<String>,
    ) {
        self.deltas.push(DeltaEntry {
            section: section.into(),
            period: period.into(),
            url: url.into(),
            generated: generated.into(),
            expires: expires.into(),
            pages,
            size,
            since: since.into(),
        });
    }

    /// Generate the sitemap XML document
    pub fn generate(&self) -> Result<String> {
        let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);

        emit(&mut writer, Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

        let mut urlset = BytesStart::new("urlset");
        urlset.push_attribute(("xmlns", SITEMAP_NS));
        urlset.push_attribute(("xmlns:scp", SCP_NS));
        emit(&mut writer, Event::Start(urlset))?;

        write_text_element(&mut writer, "scp:version", &self.version)?;
        write_text_element(&mut writer, "scp:compression", &self.compression.join(","))?;

        for section in &self.sections {
            write_empty_element(
                &mut writer,
                "scp:section",
                &[
                    ("name", section.name.as_str()),
                    ("updateFreq", section.update_freq.as_str()),
                    ("pages", section.pages.as_str()),
                ],
            )?;
        }

        for entry in &self.snapshots {
            write_empty_element(
                &mut writer,
                "scp:collection",
                &[
                    ("section", entry.section.as_str()),
                    ("type", "snapshot"),
                    ("url", entry.url.as_str()),
                    ("generated", entry.generated.as_str()),
                    ("expires", entry.expires.as_str()),
                    ("pages", &entry.pages.to_string()),
                    ("size", &entry.size.to_string()),
                ],
            )?;
        }

        for entry in &self.deltas {
            write_empty_element(
                &mut writer,
                "scp:delta",
                &[
                    ("section", entry.section.as_str()),
                    ("period", entry.period.as_str()),
                    ("url", entry.url.as_str()),
                    ("generated", entry.generated.as_str()),
                    ("expires", entry.expires.as_str()),
                    ("pages", &entry.pages.to_string()),
                    ("size", &entry.size.to_string()),
                    ("since", entry.since.as_str()),
                ],
            )?;
        }

        emit(&mut writer, Event::End(BytesEnd::new("urlset")))?;

        let bytes = writer.into_inner().into_inner();
        String::from_utf8(bytes)
            .map_err(|e| ScpError::malformed(format!("sitemap is not valid UTF-8: {e}")))
    }

    /// Generate and save `sitemap.xml`, creating parent directories as
    /// needed
    pub fn write_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let xml = self.generate()?;
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, xml)?;
        Ok(())
    }
}

/// Write one event, folding writer failures into the crate error type
fn emit(writer: &mut Writer<Cursor<Vec<u8>>>, event: Event<'_>) -> Result<()> {
    writer
        .write_event(event)
        .map_err(|e| ScpError::Io(std::io::Error::other(e.to_string())))
}

/// Write `<tag>text</tag>`
fn write_text_element(
    writer: &mut Writer<Cursor<Vec<u8>>>,
    tag: &str,
    text: &str,
) -> Result<()> {
    emit(writer, Event::Start(BytesStart::new(tag)))?;
    emit(writer, Event::Text(BytesText::new(text)))?;
    emit(writer, Event::End(BytesEnd::new(tag)))?;
    Ok(())
}

/// Write `<tag attr="value" ... />`
fn write_empty_element(
    writer: &mut Writer<Cursor<Vec<u8>>>,
    tag: &str,
    attrs: &[(&str, &str)],
) -> Result<()> {
    let mut elem = BytesStart::new(tag);
    for (key, value) in attrs {
        elem.push_attribute((*key, *value));
    }
    emit(writer, Event::Empty(elem))?;
    Ok(())
}
