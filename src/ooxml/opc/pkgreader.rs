//! Reading a serialized OPC package from a ZIP archive.
//!
//! Every archive member other than `[Content_Types].xml` and the `.rels` streams
//! becomes a [`Part`]; its content type is resolved through the `Override` and
//! `Default` entries of the content types stream.
use crate::common::error::{Error, Result};
use crate::common::xml::XmlDocument;
use crate::ooxml::opc::constants::content_type as CT;
use crate::ooxml::opc::packuri::{CONTENT_TYPES_URI, PACKAGE_URI, PackURI};
use crate::ooxml::opc::part::Part;
use crate::ooxml::opc::rel::Relationships;
use std::collections::HashMap;
use std::io::{Read, Seek};

/// Content type lookup built from `[Content_Types].xml`.
#[derive(Debug, Default)]
pub(crate) struct ContentTypeMap {
    /// Lowercased extension to content type
    defaults: HashMap<String, String>,
    /// Lowercased partname to content type
    overrides: HashMap<String, String>,
}

impl ContentTypeMap {
    pub(crate) fn from_xml(xml: &[u8]) -> Result<Self> {
        let mut map = Self::default();
        let doc = XmlDocument::parse(xml)?;
        for el in doc.root().elements() {
            let Some(content_type) = el.attr("ContentType") else {
                continue;
            };
            match el.local_name() {
                "Default" => {
                    if let Some(ext) = el.attr("Extension") {
                        map.defaults
                            .insert(ext.to_ascii_lowercase(), content_type.to_string());
                    }
                },
                "Override" => {
                    if let Some(partname) = el.attr("PartName") {
                        map.overrides
                            .insert(partname.to_ascii_lowercase(), content_type.to_string());
                    }
                },
                _ => {},
            }
        }
        Ok(map)
    }

    /// Content type of `partname`: override first, then default by extension.
    pub(crate) fn get(&self, partname: &PackURI) -> Option<&str> {
        self.overrides
            .get(&partname.as_str().to_ascii_lowercase())
            .or_else(|| self.defaults.get(&partname.ext().to_ascii_lowercase()))
            .map(String::as_str)
    }
}

/// The contents of an archive: package relationships plus every part.
pub(crate) struct PackageReader {
    pub(crate) rels: Relationships,
    pub(crate) parts: Vec<Part>,
}

impl PackageReader {
    pub(crate) fn read<R: Read + Seek>(reader: R) -> Result<Self> {
        let mut archive = zip::ZipArchive::new(reader)
            .map_err(|e| Error::InvalidFormat(format!("not a ZIP archive: {}", e)))?;

        let mut members: HashMap<String, Vec<u8>> = HashMap::with_capacity(archive.len());
        for idx in 0..archive.len() {
            let mut file = archive.by_index(idx)?;
            if file.is_dir() {
                continue;
            }
            let name = format!("/{}", file.name().trim_start_matches('/'));
            let mut blob = Vec::with_capacity(file.size() as usize);
            file.read_to_end(&mut blob)?;
            members.insert(name, blob);
        }

        let content_types = members.remove(CONTENT_TYPES_URI).ok_or_else(|| {
            Error::InvalidFormat("package has no [Content_Types].xml".to_string())
        })?;
        let content_types = ContentTypeMap::from_xml(&content_types)?;

        let package_uri = PackURI::new(PACKAGE_URI)?;
        let rels = match members.remove(package_uri.rels_uri().as_str()) {
            Some(xml) => Relationships::from_xml(PACKAGE_URI, &xml)?,
            None => Relationships::new(PACKAGE_URI),
        };

        let mut partnames: Vec<String> = members
            .keys()
            .filter(|name| !is_rels_member(name))
            .cloned()
            .collect();
        partnames.sort();

        let mut parts = Vec::with_capacity(partnames.len());
        for name in partnames {
            let Some(blob) = members.remove(&name) else {
                continue;
            };
            let partname = PackURI::new(name)?;
            let content_type = content_types.get(&partname).unwrap_or(CT::OCTET_STREAM);
            let part_rels = match members.remove(partname.rels_uri().as_str()) {
                Some(xml) => Relationships::from_xml(partname.base_uri(), &xml)?,
                None => Relationships::new(partname.base_uri()),
            };
            parts.push(Part::new(partname, content_type, blob).with_rels(part_rels));
        }

        Ok(Self { rels, parts })
    }
}

fn is_rels_member(name: &str) -> bool {
    name.ends_with(".rels") && name.contains("/_rels/")
}
