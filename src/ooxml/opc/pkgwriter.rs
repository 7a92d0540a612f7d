//! Writing an OPC package back to a ZIP archive.
//!
//! Members are written in a deterministic order: `[Content_Types].xml`, the
//! package relationships, then every part sorted by partname, each followed by
//! its relationships part when it has any.
use crate::common::error::Result;
use crate::common::xml::XmlElement;
use crate::ooxml::opc::constants::{content_type as CT, is_default_content_type, namespace};
use crate::ooxml::opc::packuri::{CONTENT_TYPES_URI, PACKAGE_URI, PackURI};
use crate::ooxml::opc::part::Part;
use crate::ooxml::opc::rel::Relationships;
use std::collections::BTreeMap;
use std::io::{Seek, Write};
use zip::write::{SimpleFileOptions, ZipWriter};

/// ZIP compression applied to every member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Compression {
    /// Deflate, what Office writes
    #[default]
    Deflated,
    /// No compression
    Stored,
}

/// Options controlling how a presentation is saved.
///
/// ```
/// use slidetree::{Compression, SaveOptions};
///
/// let options = SaveOptions::default()
///     .with_compression(Compression::Stored)
///     .with_prune_unused_media(false);
/// assert_eq!(options.compression, Compression::Stored);
/// assert!(!options.prune_unused_media);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveOptions {
    /// Compression method for the archive members
    pub compression: Compression,
    /// Drop image parts that no shape references any more
    pub prune_unused_media: bool,
}

impl Default for SaveOptions {
    fn default() -> Self {
        Self {
            compression: Compression::Deflated,
            prune_unused_media: true,
        }
    }
}

impl SaveOptions {
    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    pub fn with_prune_unused_media(mut self, prune: bool) -> Self {
        self.prune_unused_media = prune;
        self
    }

    fn file_options(&self) -> SimpleFileOptions {
        let method = match self.compression {
            Compression::Deflated => zip::CompressionMethod::Deflated,
            Compression::Stored => zip::CompressionMethod::Stored,
        };
        SimpleFileOptions::default().compression_method(method)
    }
}

/// Serializes package relationships and parts into a ZIP stream.
pub(crate) struct PackageWriter;

impl PackageWriter {
    pub(crate) fn write<'a, W, I>(
        writer: W,
        rels: &Relationships,
        parts: I,
        options: &SaveOptions,
    ) -> Result<W>
    where
        W: Write + Seek,
        I: IntoIterator<Item = &'a Part>,
    {
        let mut parts: Vec<&Part> = parts.into_iter().collect();
        parts.sort_by(|a, b| a.partname().cmp(b.partname()));

        let file_options = options.file_options();
        let mut zip = ZipWriter::new(writer);

        let content_types = content_types_xml(&parts);
        write_member(&mut zip, CONTENT_TYPES_URI, content_types.as_bytes(), file_options)?;

        let package_uri = PackURI::new(PACKAGE_URI)?;
        write_member(
            &mut zip,
            package_uri.rels_uri().as_str(),
            rels.to_xml().as_bytes(),
            file_options,
        )?;

        for part in &parts {
            write_member(&mut zip, part.partname().as_str(), part.blob(), file_options)?;
            if !part.rels().is_empty() {
                write_member(
                    &mut zip,
                    part.partname().rels_uri().as_str(),
                    part.rels().to_xml().as_bytes(),
                    file_options,
                )?;
            }
        }

        Ok(zip.finish()?)
    }
}

fn write_member<W: Write + Seek>(
    zip: &mut ZipWriter<W>,
    partname: &str,
    blob: &[u8],
    options: SimpleFileOptions,
) -> Result<()> {
    zip.start_file(partname.trim_start_matches('/'), options)?;
    zip.write_all(blob)?;
    Ok(())
}

/// Build `[Content_Types].xml` for the given parts.
fn content_types_xml(parts: &[&Part]) -> String {
    let mut defaults: BTreeMap<String, &str> = BTreeMap::new();
    defaults.insert("rels".to_string(), CT::OPC_RELATIONSHIPS);
    defaults.insert("xml".to_string(), CT::XML);
    let mut overrides: Vec<(&str, &str)> = Vec::new();

    for part in parts {
        let ext = part.partname().ext().to_ascii_lowercase();
        if is_default_content_type(&ext, part.content_type()) {
            defaults.entry(ext).or_insert(part.content_type());
        } else {
            overrides.push((part.partname().as_str(), part.content_type()));
        }
    }

    let mut types = XmlElement::new("Types").with_attr("xmlns", namespace::OPC_CONTENT_TYPES);
    for (ext, content_type) in &defaults {
        types.push(
            XmlElement::new("Default")
                .with_attr("Extension", ext.as_str())
                .with_attr("ContentType", *content_type),
        );
    }
    for (partname, content_type) in overrides {
        types.push(
            XmlElement::new("Override")
                .with_attr("PartName", partname)
                .with_attr("ContentType", content_type),
        );
    }

    let mut xml = String::with_capacity(1024);
    xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
    xml.push('\n');
    types.write_to(&mut xml);
    xml
}
