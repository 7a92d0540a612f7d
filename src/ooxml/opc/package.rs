//! In-memory OPC package.
//!
//! [`OpcPackage`] holds every part of a `.pptx` archive keyed by partname,
//! together with the package-level relationships. Parts that the presentation
//! layer does not understand are carried through a save unchanged.
use crate::common::error::{Error, Result};
use crate::ooxml::opc::constants::relationship_type as RT;
use crate::ooxml::opc::packuri::{PACKAGE_URI, PackURI};
use crate::ooxml::opc::part::Part;
use crate::ooxml::opc::pkgreader::PackageReader;
use crate::ooxml::opc::pkgwriter::{PackageWriter, SaveOptions};
use crate::ooxml::opc::rel::Relationships;
use std::collections::BTreeMap;
use std::io::{Cursor, Read, Seek, Write};
use std::path::Path;

/// An Open Packaging Convention package held in memory.
#[derive(Debug, Clone)]
pub struct OpcPackage {
    rels: Relationships,
    parts: BTreeMap<String, Part>,
}

impl OpcPackage {
    /// Empty package.
    pub fn new() -> Self {
        Self {
            rels: Relationships::new(PACKAGE_URI),
            parts: BTreeMap::new(),
        }
    }

    /// Open a package from a file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(std::io::BufReader::new(file))
    }

    /// Load a package from an in-memory archive.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::from_reader(Cursor::new(bytes))
    }

    /// Load a package from any seekable reader.
    pub fn from_reader<R: Read + Seek>(reader: R) -> Result<Self> {
        let PackageReader { rels, parts } = PackageReader::read(reader)?;
        let parts = parts
            .into_iter()
            .map(|part| (part.partname().as_str().to_string(), part))
            .collect();
        Ok(Self { rels, parts })
    }

    /// Partname of the main document (`/ppt/presentation.xml`).
    pub fn main_document_partname(&self) -> Result<PackURI> {
        self.rels
            .part_with_reltype(RT::OFFICE_DOCUMENT)?
            .target_partname()
    }

    /// Look up a part.
    pub fn part(&self, partname: &PackURI) -> Result<&Part> {
        self.parts
            .get(partname.as_str())
            .ok_or_else(|| Error::PartNotFound(partname.to_string()))
    }

    /// Look up a part for mutation.
    pub fn part_mut(&mut self, partname: &PackURI) -> Result<&mut Part> {
        self.parts
            .get_mut(partname.as_str())
            .ok_or_else(|| Error::PartNotFound(partname.to_string()))
    }

    /// Add a part, replacing any part with the same name.
    pub fn add_part(&mut self, part: Part) {
        self.parts.insert(part.partname().as_str().to_string(), part);
    }

    /// Remove a part from the package.
    pub fn remove_part(&mut self, partname: &PackURI) -> Option<Part> {
        self.parts.remove(partname.as_str())
    }

    #[inline]
    pub fn contains_part(&self, partname: &PackURI) -> bool {
        self.parts.contains_key(partname.as_str())
    }

    /// Parts in partname order.
    pub fn parts(&self) -> impl Iterator<Item = &Part> {
        self.parts.values()
    }

    pub fn parts_mut(&mut self) -> impl Iterator<Item = &mut Part> {
        self.parts.values_mut()
    }

    #[inline]
    pub fn part_count(&self) -> usize {
        self.parts.len()
    }

    #[inline]
    pub fn rels(&self) -> &Relationships {
        &self.rels
    }

    #[inline]
    pub fn rels_mut(&mut self) -> &mut Relationships {
        &mut self.rels
    }

    /// First free partname for a `%d` template, e.g. `/ppt/media/image%d.png`.
    ///
    /// A number already used by a part with the same stem and any extension is
    /// skipped, so `image3.jpeg` blocks `image3.png`.
    pub fn next_partname(&self, template: &str) -> Result<PackURI> {
        let stem_of = |name: &str| name.rsplit_once('.').map_or(name, |(stem, _)| stem).to_string();
        for n in 1..=u16::MAX as u32 {
            let candidate = template.replace("%d", &n.to_string());
            let stem = stem_of(&candidate);
            if !self.parts.keys().any(|name| stem_of(name) == stem) {
                return PackURI::new(candidate);
            }
        }
        Err(Error::InvalidPackUri(format!(
            "no free partname for template '{}'",
            template
        )))
    }

    /// Write the package to a file.
    pub fn save<P: AsRef<Path>>(&self, path: P, options: &SaveOptions) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let mut writer = self.write_to(std::io::BufWriter::new(file), options)?;
        writer.flush()?;
        Ok(())
    }

    /// Write the package to a seekable writer, returning the writer.
    pub fn write_to<W: Write + Seek>(&self, writer: W, options: &SaveOptions) -> Result<W> {
        PackageWriter::write(writer, &self.rels, self.parts.values(), options)
    }

    /// Serialize the package to an in-memory archive.
    pub fn to_bytes(&self, options: &SaveOptions) -> Result<Vec<u8>> {
        Ok(self.write_to(Cursor::new(Vec::new()), options)?.into_inner())
    }
}

impl Default for OpcPackage {
    fn default() -> Self {
        Self::new()
    }
}
