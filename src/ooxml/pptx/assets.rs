//! Deck-wide store of embedded images.
//!
//! Image parts are shared: two pictures showing the same picture reference
//! one part. Every part carries the number of shape references to it, and
//! writing to a shared part forks a private copy for the writer instead of
//! changing what the other shapes show.
use crate::common::error::{Error, Result};
use crate::ooxml::opc::PackURI;
use crate::ooxml::opc::constants::image_extension;
use crate::ooxml::pptx::format::ImageFormat;
use std::collections::BTreeMap;
use tracing::debug;

/// An embedded image part with its reference count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePart {
    partname: PackURI,
    content_type: String,
    bytes: Vec<u8>,
    ref_count: usize,
}

impl ImagePart {
    pub fn new(partname: PackURI, content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            partname,
            content_type: content_type.into(),
            bytes,
            ref_count: 0,
        }
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
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Number of shape references to this part.
    #[inline]
    pub fn ref_count(&self) -> usize {
        self.ref_count
    }
}

/// Where [`AssetStore::write`] put the new bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum AssetWrite {
    /// The part had a single user and was overwritten
    InPlace,
    /// The part is shared; the bytes went to this new part
    Forked(PackURI),
}

/// Image parts keyed by partname.
#[derive(Debug, Default, Clone)]
pub struct AssetStore {
    parts: BTreeMap<PackURI, ImagePart>,
}

impl AssetStore {
    pub(crate) fn insert(&mut self, part: ImagePart) {
        self.parts.insert(part.partname.clone(), part);
    }

    /// Look up an image part.
    pub fn get(&self, partname: &PackURI) -> Option<&ImagePart> {
        self.parts.get(partname)
    }

    /// Image parts in partname order.
    pub fn iter(&self) -> impl Iterator<Item = &ImagePart> {
        self.parts.values()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    #[inline]
    pub fn contains(&self, partname: &PackURI) -> bool {
        self.parts.contains_key(partname)
    }

    /// Record one more reference. Unknown partnames are ignored.
    pub(crate) fn acquire(&mut self, partname: &PackURI) {
        if let Some(part) = self.parts.get_mut(partname) {
            part.ref_count += 1;
        }
    }

    /// Drop one reference. Unknown partnames are ignored.
    pub(crate) fn release(&mut self, partname: &PackURI) {
        if let Some(part) = self.parts.get_mut(partname) {
            part.ref_count = part.ref_count.saturating_sub(1);
        }
    }

    /// Replace the bytes a reference to `partname` sees.
    ///
    /// A part with at most one reference is overwritten. A shared part stays
    /// untouched: the bytes go to a new part with one reference, named by the
    /// first `/ppt/media/image{n}` that neither the store nor `taken` knows,
    /// and the shared part loses a reference.
    pub(crate) fn write<F>(
        &mut self,
        partname: &PackURI,
        bytes: Vec<u8>,
        taken: F,
    ) -> Result<AssetWrite>
    where
        F: Fn(&PackURI) -> bool,
    {
        let detected = ImageFormat::detect_from_bytes(&bytes);
        let part = self
            .parts
            .get_mut(partname)
            .ok_or_else(|| Error::PartNotFound(partname.to_string()))?;

        if part.ref_count <= 1 {
            if let Some(format) = detected {
                part.content_type = format.content_type().to_string();
            }
            part.bytes = bytes;
            return Ok(AssetWrite::InPlace);
        }

        part.ref_count -= 1;
        let content_type = detected.map_or_else(
            || part.content_type.clone(),
            |format| format.content_type().to_string(),
        );
        let ext = detected.map_or_else(|| image_extension(&content_type), |format| format.extension());
        let fork = self.free_partname(ext, taken)?;

        debug!(shared = %partname, %fork, "shared image forked on write");
        self.insert(ImagePart {
            partname: fork.clone(),
            content_type,
            bytes,
            ref_count: 1,
        });
        Ok(AssetWrite::Forked(fork))
    }

    fn free_partname<F>(&self, ext: &str, taken: F) -> Result<PackURI>
    where
        F: Fn(&PackURI) -> bool,
    {
        let used = |candidate: &PackURI| {
            let stem = |uri: &PackURI| {
                let name = uri.as_str();
                name.rsplit_once('.').map_or(name, |(stem, _)| stem).to_string()
            };
            taken(candidate) || self.parts.keys().any(|name| stem(name) == stem(candidate))
        };
        for n in 1..=u16::MAX as u32 {
            let candidate = PackURI::new(format!("/ppt/media/image{}.{}", n, ext))?;
            if !used(&candidate) {
                return Ok(candidate);
            }
        }
        Err(Error::InvalidPackUri(
            "no free media partname left".to_string(),
        ))
    }

    /// Parts still referenced by at least one shape.
    pub(crate) fn live(&self) -> impl Iterator<Item = &ImagePart> {
        self.parts.values().filter(|part| part.ref_count > 0)
    }

    /// Parts no shape references any longer.
    pub(crate) fn orphans(&self) -> impl Iterator<Item = &ImagePart> {
        self.parts.values().filter(|part| part.ref_count == 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";
    const JPEG: &[u8] = b"\xff\xd8\xff\xe0\0\x10JFIF";

    fn uri(s: &str) -> PackURI {
        PackURI::new(s).unwrap()
    }

    fn store_with(count: usize) -> AssetStore {
        let mut store = AssetStore::default();
        store.insert(ImagePart::new(uri("/ppt/media/image1.png"), "image/png", PNG.to_vec()));
        for _ in 0..count {
            store.acquire(&uri("/ppt/media/image1.png"));
        }
        store
    }

    #[test]
    fn test_single_reference_writes_in_place() {
        let mut store = store_with(1);
        let outcome = store
            .write(&uri("/ppt/media/image1.png"), JPEG.to_vec(), |_| false)
            .unwrap();
        assert_eq!(outcome, AssetWrite::InPlace);
        let part = store.get(&uri("/ppt/media/image1.png")).unwrap();
        assert_eq!(part.bytes(), JPEG);
        assert_eq!(part.content_type(), "image/jpeg");
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_shared_part_forks() {
        let mut store = store_with(2);
        let outcome = store
            .write(&uri("/ppt/media/image1.png"), JPEG.to_vec(), |candidate| {
                candidate.as_str() == "/ppt/media/image2.jpeg"
            })
            .unwrap();
        assert_eq!(outcome, AssetWrite::Forked(uri("/ppt/media/image3.jpeg")));

        let original = store.get(&uri("/ppt/media/image1.png")).unwrap();
        assert_eq!(original.bytes(), PNG);
        assert_eq!(original.ref_count(), 1);

        let fork = store.get(&uri("/ppt/media/image3.jpeg")).unwrap();
        assert_eq!(fork.bytes(), JPEG);
        assert_eq!(fork.ref_count(), 1);
        assert_eq!(fork.content_type(), "image/jpeg");
    }

    #[test]
    fn test_release_and_orphans() {
        let mut store = store_with(1);
        store.release(&uri("/ppt/media/image1.png"));
        store.release(&uri("/ppt/media/image1.png"));
        assert_eq!(store.live().count(), 0);
        assert_eq!(store.orphans().count(), 1);
        assert!(matches!(
            store.write(&uri("/ppt/media/missing.png"), PNG.to_vec(), |_| false),
            Err(Error::PartNotFound(_))
        ));
    }

    #[test]
    fn test_unknown_bytes_keep_content_type() {
        let mut store = store_with(2);
        let outcome = store
            .write(&uri("/ppt/media/image1.png"), b"not an image".to_vec(), |_| false)
            .unwrap();
        assert_eq!(outcome, AssetWrite::Forked(uri("/ppt/media/image2.png")));
        assert_eq!(
            store.get(&uri("/ppt/media/image2.png")).unwrap().content_type(),
            "image/png"
        );
    }
}
