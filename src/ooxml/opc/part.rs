//! A single part of an OPC package.
use crate::ooxml::opc::packuri::PackURI;
use crate::ooxml::opc::rel::Relationships;

/// A part: partname, content type, raw bytes and outgoing relationships.
///
/// XML parts are held as bytes here; the presentation layer parses the ones it
/// edits and writes them back with [`Part::set_blob`] before saving.
#[derive(Debug, Clone)]
pub struct Part {
    partname: PackURI,
    content_type: String,
    blob: Vec<u8>,
    rels: Relationships,
}

impl Part {
    pub fn new(partname: PackURI, content_type: impl Into<String>, blob: Vec<u8>) -> Self {
        let rels = Relationships::new(partname.base_uri());
        Self {
            partname,
            content_type: content_type.into(),
            blob,
            rels,
        }
    }

    /// Build a part with already-loaded relationships.
    pub fn with_rels(mut self, rels: Relationships) -> Self {
        self.rels = rels;
        self
    }

    #[inline]
    pub fn partname(&self) -> &PackURI {
        &self.partname
    }

    #[inline]
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    #[inline]
    pub fn blob(&self) -> &[u8] {
        &self.blob
    }

    /// Consume the part, keeping only its bytes.
    pub fn into_blob(self) -> Vec<u8> {
        self.blob
    }

    pub fn set_blob(&mut self, blob: Vec<u8>) {
        self.blob = blob;
    }

    pub fn set_content_type(&mut self, content_type: impl Into<String>) {
        self.content_type = content_type.into();
    }

    #[inline]
    pub fn rels(&self) -> &Relationships {
        &self.rels
    }

    #[inline]
    pub fn rels_mut(&mut self) -> &mut Relationships {
        &mut self.rels
    }

    /// Absolute partname targeted by relationship `r_id`.
    pub fn related_partname(&self, r_id: &str) -> crate::common::Result<PackURI> {
        self.rels
            .get(r_id)
            .ok_or_else(|| {
                crate::common::Error::RelationshipNotFound(format!(
                    "{} on {}",
                    r_id, self.partname
                ))
            })?
            .target_partname()
    }
}
