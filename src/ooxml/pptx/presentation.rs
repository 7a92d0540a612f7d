//! Main presentation object - the high-level API for editing presentations.
use crate::common::error::{Error, Result};
use crate::common::unit::{DEFAULT_SLIDE_HEIGHT, DEFAULT_SLIDE_WIDTH, parse_emu};
use crate::common::xml::{XmlDocument, XmlElement};
use crate::ooxml::opc::constants::relationship_type as RT;
use crate::ooxml::opc::{OpcPackage, PackURI, Part, Relationships, SaveOptions};
use crate::ooxml::pptx::assets::{AssetStore, AssetWrite, ImagePart};
use crate::ooxml::pptx::geometry::GeometryBox;
use crate::ooxml::pptx::shapes::base::{relationship_refs, shape_id};
use crate::ooxml::pptx::shapes::shape::{Shape, ShapeMut};
use crate::ooxml::pptx::shapes::tree::{ShapeEntry, ShapeRef};
use crate::ooxml::pptx::slide::{SlideTier, SlideTierMut};
use crate::ooxml::pptx::tier::{Deck, TierId, TierKind, TierPart};
use std::io::{Read, Seek};
use std::path::Path;
use tracing::debug;

/// A PowerPoint presentation loaded for editing.
///
/// Slides, layouts and masters are parsed once on load. Shapes are addressed
/// through [`ShapeRef`] handles; a handle of a removed shape fails with
/// [`Error::ElementRemoved`].
///
/// # Examples
///
/// ```rust,no_run
/// use slidetree::Presentation;
///
/// let mut pres = Presentation::open("deck.pptx")?;
/// let slide = pres.slide(0).expect("deck has a slide");
/// let title = slide.find_shape("Title 1").map(|shape| shape.handle());
///
/// if let Some(title) = title {
///     let mut shape = pres.shape_mut(title)?;
///     shape.materialize_transform()?;
///     shape.set_width(6_000_000)?;
/// }
/// pres.save("edited.pptx")?;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug)]
pub struct Presentation {
    /// Every part except images; tier part bytes are refreshed on save
    pub(crate) package: OpcPackage,
    pub(crate) presentation_part: PackURI,
    pub(crate) deck: Deck,
    pub(crate) assets: AssetStore,
    slides: Vec<TierId>,
    layouts: Vec<TierId>,
    masters: Vec<TierId>,
    slide_size: Option<(i64, i64)>,
}

impl Presentation {
    /// Open a presentation file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_package(OpcPackage::open(path)?)
    }

    /// Load a presentation from an in-memory archive.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::from_package(OpcPackage::from_bytes(bytes)?)
    }

    /// Load a presentation from any seekable reader.
    pub fn from_reader<R: Read + Seek>(reader: R) -> Result<Self> {
        Self::from_package(OpcPackage::from_reader(reader)?)
    }

    /// Build the object model over an already loaded package.
    pub fn from_package(mut package: OpcPackage) -> Result<Self> {
        let presentation_part = package.main_document_partname()?;
        let main = XmlDocument::parse(package.part(&presentation_part)?.blob())?;
        if main.root().local_name() != "presentation" {
            return Err(Error::InvalidFormat(format!(
                "{} is a <{}>, not a presentation",
                presentation_part,
                main.root().name()
            )));
        }

        let slide_size = main.root().child("sldSz").and_then(|size| {
            Some((parse_emu(size.attr("cx")?)?, parse_emu(size.attr("cy")?)?))
        });
        let (width, height) = slide_size.unwrap_or((DEFAULT_SLIDE_WIDTH, DEFAULT_SLIDE_HEIGHT));

        let mut loader = TierLoader {
            package: &package,
            deck: Deck::new(GeometryBox::new(0, 0, width, height)),
        };
        let main_rels = package.part(&presentation_part)?.rels();

        let mut masters = Vec::new();
        for r_id in id_list(main.root(), "sldMasterIdLst") {
            let partname = main_rels_target(main_rels, r_id, &presentation_part)?;
            masters.push(loader.load(&partname, TierKind::SlideMaster)?);
        }
        for master in masters.clone() {
            loader.load_layouts_of(master)?;
        }
        let mut slides = Vec::new();
        for r_id in id_list(main.root(), "sldIdLst") {
            let partname = main_rels_target(main_rels, r_id, &presentation_part)?;
            slides.push(loader.load(&partname, TierKind::Slide)?);
        }

        let deck = loader.deck;
        let layouts = deck
            .tiers()
            .filter(|(_, tier)| tier.kind == TierKind::SlideLayout)
            .map(|(id, _)| id)
            .collect();
        // Masters only reachable from a layout still count as masters
        for (id, tier) in deck.tiers() {
            if tier.kind == TierKind::SlideMaster && !masters.contains(&id) {
                masters.push(id);
            }
        }

        let assets = take_images(&mut package, &deck)?;
        debug!(
            slides = slides.len(),
            tiers = deck.tiers().count(),
            images = assets.len(),
            "presentation loaded"
        );

        Ok(Self {
            package,
            presentation_part,
            deck,
            assets,
            slides,
            layouts,
            masters,
            slide_size,
        })
    }

    /// Save to a file with default options.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.save_with(path, &SaveOptions::default())
    }

    pub fn save_with<P: AsRef<Path>>(&self, path: P, options: &SaveOptions) -> Result<()> {
        self.assemble(options)?.save(path, options)
    }

    /// Serialize to an in-memory archive with default options.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        self.to_bytes_with(&SaveOptions::default())
    }

    pub fn to_bytes_with(&self, options: &SaveOptions) -> Result<Vec<u8>> {
        self.assemble(options)?.to_bytes(options)
    }

    /// The package as it would be saved.
    fn assemble(&self, options: &SaveOptions) -> Result<OpcPackage> {
        let mut package = self.package.clone();
        for (_, tier) in self.deck.tiers() {
            package.part_mut(&tier.partname)?.set_blob(tier.to_xml());
        }

        let (written, pruned): (Vec<&ImagePart>, Vec<&ImagePart>) = if options.prune_unused_media {
            (self.assets.live().collect(), self.assets.orphans().collect())
        } else {
            (self.assets.iter().collect(), Vec::new())
        };
        for image in &pruned {
            for part in package.parts_mut() {
                part.rels_mut().remove_targeting(image.partname());
            }
        }
        for image in written {
            package.add_part(Part::new(
                image.partname().clone(),
                image.content_type(),
                image.bytes().to_vec(),
            ));
        }
        let pruned = pruned.len();
        debug!(parts = package.part_count(), pruned, "presentation assembled");
        Ok(package)
    }

    /// Partname of the main presentation part.
    #[inline]
    pub fn partname(&self) -> &PackURI {
        &self.presentation_part
    }

    /// `p:sldSz` as (width, height) in EMU, if declared.
    #[inline]
    pub fn slide_size(&self) -> Option<(i64, i64)> {
        self.slide_size
    }

    #[inline]
    pub fn slide_count(&self) -> usize {
        self.slides.len()
    }

    /// Slides in presentation order.
    pub fn slides(&self) -> Vec<SlideTier<'_>> {
        self.views(&self.slides)
    }

    pub fn slide(&self, index: usize) -> Option<SlideTier<'_>> {
        self.tier(*self.slides.get(index)?)
    }

    /// Slide layouts, grouped by master.
    pub fn layouts(&self) -> Vec<SlideTier<'_>> {
        self.views(&self.layouts)
    }

    pub fn masters(&self) -> Vec<SlideTier<'_>> {
        self.views(&self.masters)
    }

    fn views(&self, ids: &[TierId]) -> Vec<SlideTier<'_>> {
        ids.iter().filter_map(|id| self.tier(*id)).collect()
    }

    /// Any tier by id.
    pub fn tier(&self, id: TierId) -> Option<SlideTier<'_>> {
        SlideTier::new(self, id)
    }

    pub fn tier_mut(&mut self, id: TierId) -> Option<SlideTierMut<'_>> {
        SlideTierMut::new(self, id)
    }

    pub fn shape(&self, handle: ShapeRef) -> Result<Shape<'_>> {
        Shape::new(self, handle)
    }

    pub fn shape_mut(&mut self, handle: ShapeRef) -> Result<ShapeMut<'_>> {
        ShapeMut::new(self, handle)
    }

    /// Remove a shape from its tier.
    ///
    /// The handle and every copy of it fail with [`Error::ElementRemoved`]
    /// afterwards. Images only this shape referenced are dropped on save.
    pub fn remove_shape(&mut self, handle: ShapeRef) -> Result<()> {
        let tier = self
            .deck
            .tier_mut(handle.tier)
            .ok_or_else(|| Error::ElementRemoved(format!("tier {}", handle.tier.index())))?;
        let entry = tier.shapes.remove(handle.slot).ok_or_else(|| {
            Error::ElementRemoved(format!("shape slot {} of {}", handle.slot, tier.partname))
        })?;
        let partname = tier.partname.clone();

        for image in self.image_targets(&partname, &entry)? {
            self.assets.release(&image);
        }
        self.deck.invalidate_dependents(handle.tier);
        debug!(shape = shape_id(&entry.element), %partname, "shape removed");
        Ok(())
    }

    /// Copy a shape onto the top of its tier under a fresh id.
    ///
    /// Images are shared with the original until either shape replaces its
    /// image.
    pub fn duplicate_shape(&mut self, handle: ShapeRef) -> Result<ShapeRef> {
        let entry = self.deck.entry(handle)?;
        let tier = self
            .deck
            .tier(handle.tier)
            .ok_or_else(|| Error::ElementRemoved(format!("tier {}", handle.tier.index())))?;

        let mut element = entry.element.clone();
        let mut next_id = tier.shapes.next_shape_id(tier.tree_frame());
        element.visit_mut(&mut |e| {
            if e.local_name() == "cNvPr" {
                e.set_attr("id", next_id.to_string());
                next_id = next_id.saturating_add(1);
            }
        });
        let copy = ShapeEntry::new(element);
        let partname = tier.partname.clone();

        for image in self.image_targets(&partname, &copy)? {
            self.assets.acquire(&image);
        }
        let slot = self
            .deck
            .tier_mut(handle.tier)
            .map(|tier| tier.shapes.push(copy))
            .ok_or_else(|| Error::ElementRemoved(format!("tier {}", handle.tier.index())))?;
        self.deck.invalidate_dependents(handle.tier);
        Ok(ShapeRef::new(handle.tier, slot))
    }

    /// Image partnames referenced from a shape, one per reference.
    fn image_targets(&self, tier_partname: &PackURI, entry: &ShapeEntry) -> Result<Vec<PackURI>> {
        let rels = self.package.part(tier_partname)?.rels();
        Ok(relationship_refs(&entry.element)
            .iter()
            .filter_map(|r_id| image_target(rels, r_id))
            .collect())
    }

    /// Embedded images with their reference counts.
    #[inline]
    pub fn assets(&self) -> &AssetStore {
        &self.assets
    }

    /// Zero-based position of a slide in presentation order.
    pub(crate) fn slide_index(&self, id: TierId) -> Option<usize> {
        self.slides.iter().position(|slide| *slide == id)
    }

    /// Move the slide at `from` to `to`, both zero-based, shifting the slides
    /// in between. `p:sldIdLst` is reordered to match.
    pub(crate) fn move_slide(&mut self, from: usize, to: usize) -> Result<()> {
        let count = self.slides.len();
        if from >= count || to >= count {
            return Err(Error::SlideOutOfRange {
                number: to.saturating_add(1),
                count,
            });
        }
        if from == to {
            return Ok(());
        }

        let part = self.package.part_mut(&self.presentation_part)?;
        let mut main = XmlDocument::parse(part.blob())?;
        let list = main.root_mut().child_mut("sldIdLst").ok_or_else(|| {
            Error::InvalidFormat(format!("{} has no slide id list", self.presentation_part))
        })?;
        let mut entries = list.remove_children(|e| e.local_name() == "sldId");
        if entries.len() != count {
            return Err(Error::InvalidFormat(format!(
                "slide id list has {} entries for {} slides",
                entries.len(),
                count
            )));
        }
        let entry = entries.remove(from);
        entries.insert(to, entry);
        for (position, entry) in entries.into_iter().enumerate() {
            list.insert_child(position, entry);
        }
        part.set_blob(main.to_bytes());

        let id = self.slides.remove(from);
        self.slides.insert(to, id);
        debug!(from = from + 1, to = to + 1, "slide moved");
        Ok(())
    }
}

/// Give the image a tier part references under `r_id` new bytes.
///
/// A shared image is forked, see [`AssetStore`]; the tier part then gains an
/// image relationship to the fork, whose id is returned so the caller can
/// repoint its `a:blip`.
pub(crate) fn replace_image(
    package: &mut OpcPackage,
    assets: &mut AssetStore,
    tier_partname: &PackURI,
    r_id: &str,
    bytes: Vec<u8>,
) -> Result<Option<String>> {
    let target = image_target(package.part(tier_partname)?.rels(), r_id).ok_or_else(|| {
        Error::RelationshipNotFound(format!("image {} on {}", r_id, tier_partname))
    })?;
    let outcome = assets.write(&target, bytes, |candidate| {
        media_name_taken(package, candidate)
    })?;
    match outcome {
        AssetWrite::InPlace => Ok(None),
        AssetWrite::Forked(fork) => {
            let rels = package.part_mut(tier_partname)?.rels_mut();
            let new_r_id = rels.add(RT::IMAGE, &fork.relative_ref(tier_partname.base_uri()));
            debug!(%fork, r_id = %new_r_id, "image reference repointed to fork");
            Ok(Some(new_r_id))
        },
    }
}

/// Target of an internal image relationship.
pub(crate) fn image_target(rels: &Relationships, r_id: &str) -> Option<PackURI> {
    let rel = rels.get(r_id)?;
    if rel.reltype() != RT::IMAGE || rel.is_external() {
        return None;
    }
    rel.target_partname().ok()
}

/// Whether a partname with the same stem as `candidate` is already in use.
pub(crate) fn media_name_taken(package: &OpcPackage, candidate: &PackURI) -> bool {
    let stem = |uri: &PackURI| {
        let name = uri.as_str();
        name.rsplit_once('.').map_or(name, |(stem, _)| stem).to_string()
    };
    let wanted = stem(candidate);
    package.parts().any(|part| stem(part.partname()) == wanted)
}

/// Relationship ids of a `p:sldIdLst`-style list, in order.
fn id_list<'a>(root: &'a XmlElement, list: &str) -> Vec<&'a str> {
    root.child(list)
        .map(|list| {
            list.elements()
                .filter_map(|item| {
                    item.attributes()
                        .find(|(key, _)| key.split_once(':').is_some_and(|(_, local)| local == "id"))
                        .map(|(_, value)| value)
                })
                .collect()
        })
        .unwrap_or_default()
}

fn main_rels_target(rels: &Relationships, r_id: &str, source: &PackURI) -> Result<PackURI> {
    rels.get(r_id)
        .ok_or_else(|| Error::RelationshipNotFound(format!("{} on {}", r_id, source)))?
        .target_partname()
}

/// Loads tier parts on first reference, parents first.
struct TierLoader<'p> {
    package: &'p OpcPackage,
    deck: Deck,
}

impl TierLoader<'_> {
    fn load(&mut self, partname: &PackURI, kind: TierKind) -> Result<TierId> {
        if let Some(id) = self.deck.find(partname) {
            return Ok(id);
        }
        let package = self.package;
        let part = package.part(partname)?;
        if part.content_type() != kind.content_type() {
            debug!(%partname, content_type = part.content_type(), ?kind, "unexpected tier content type");
        }

        let parent = match kind.parent() {
            Some((parent_kind, reltype)) => {
                let target = part.rels().part_with_reltype(reltype)?.target_partname()?;
                Some(self.load(&target, parent_kind)?)
            },
            None => None,
        };
        Ok(self
            .deck
            .push(TierPart::load(kind, partname.clone(), parent, part.blob())?))
    }

    /// Load the layouts a master lists, in list order.
    fn load_layouts_of(&mut self, master: TierId) -> Result<()> {
        let Some(tier) = self.deck.tier(master) else {
            return Ok(());
        };
        let package = self.package;
        let rels = package.part(&tier.partname)?.rels();
        let listed: Vec<PackURI> = id_list(tier.document.root(), "sldLayoutIdLst")
            .into_iter()
            .filter_map(|r_id| rels.get(r_id))
            .chain(rels.with_reltype(RT::SLIDE_LAYOUT))
            .filter_map(|rel| rel.target_partname().ok())
            .collect();
        for partname in listed {
            self.load(&partname, TierKind::SlideLayout)?;
        }
        Ok(())
    }
}

/// Move image parts out of the package and count the references to them.
///
/// Tier parts count every reference in their XML. Parts outside the tier
/// hierarchy (notes, handouts, themes) count each image relationship once.
fn take_images(package: &mut OpcPackage, deck: &Deck) -> Result<AssetStore> {
    let mut assets = AssetStore::default();
    let images: Vec<PackURI> = package
        .parts()
        .filter(|part| part.content_type().starts_with("image/"))
        .map(|part| part.partname().clone())
        .collect();
    for partname in images {
        if let Some(part) = package.remove_part(&partname) {
            let content_type = part.content_type().to_string();
            assets.insert(ImagePart::new(partname, content_type, part.into_blob()));
        }
    }

    for (_, tier) in deck.tiers() {
        let rels = package.part(&tier.partname)?.rels();
        let mut refs = relationship_refs(tier.document.root());
        for (_, entry) in tier.shapes.iter() {
            refs.extend(relationship_refs(&entry.element));
        }
        for r_id in refs {
            if let Some(target) = image_target(rels, &r_id) {
                assets.acquire(&target);
            }
        }
    }

    for part in package.parts() {
        if deck.find(part.partname()).is_some() {
            continue;
        }
        for rel in part.rels().with_reltype(RT::IMAGE) {
            if !rel.is_external()
                && let Ok(target) = rel.target_partname()
            {
                assets.acquire(&target);
            }
        }
    }
    Ok(assets)
}
