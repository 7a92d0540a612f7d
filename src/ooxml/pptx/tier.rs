//! Slide, layout and master tiers and the deck-wide tier store.
//!
//! Each tier part is parsed once into an element tree whose `p:spTree` shapes
//! are moved into a [`ShapeTree`]. Tiers link to their parent by [`TierId`]:
//! a slide to its layout, a layout to its master. The [`Deck`] owns every tier
//! and answers the [`DocumentTree`] queries the resolvers are written against.
use crate::common::error::{Error, Result};
use crate::common::xml::{XmlDocument, XmlElement};
use crate::ooxml::opc::PackURI;
use crate::ooxml::opc::constants::content_type as CT;
use crate::ooxml::opc::constants::relationship_type as RT;
use crate::ooxml::pptx::geometry::GeometryBox;
use crate::ooxml::pptx::placeholder::{self, PlaceholderType};
use crate::ooxml::pptx::shapes::base::{ShapeKind, is_tree_frame_element};
use crate::ooxml::pptx::shapes::tree::{ShapeEntry, ShapeRef, ShapeTree};
use tracing::trace;

/// Index of a tier in its [`Deck`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TierId(usize);

impl TierId {
    #[inline]
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0
    }
}

/// Which level of the inheritance chain a tier is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TierKind {
    Slide,
    SlideLayout,
    SlideMaster,
}

impl TierKind {
    /// Content type of the tier's part.
    pub fn content_type(self) -> &'static str {
        match self {
            TierKind::Slide => CT::PML_SLIDE,
            TierKind::SlideLayout => CT::PML_SLIDE_LAYOUT,
            TierKind::SlideMaster => CT::PML_SLIDE_MASTER,
        }
    }

    /// Kind of the parent tier and the relationship type leading to it.
    pub(crate) fn parent(self) -> Option<(TierKind, &'static str)> {
        match self {
            TierKind::Slide => Some((TierKind::SlideLayout, RT::SLIDE_LAYOUT)),
            TierKind::SlideLayout => Some((TierKind::SlideMaster, RT::SLIDE_MASTER)),
            TierKind::SlideMaster => None,
        }
    }
}

/// Read access to the tier hierarchy, as needed by placeholder resolution.
pub trait DocumentTree {
    /// Kind of a tier, `None` for an unknown id.
    fn tier_kind(&self, tier: TierId) -> Option<TierKind>;

    /// The tier a tier inherits from; masters have none.
    fn parent_tier(&self, tier: TierId) -> Option<TierId>;

    /// Shape elements of a tier in document order, optionally of one kind only.
    fn elements_of_type(&self, tier: TierId, kind: Option<ShapeKind>) -> Vec<&XmlElement>;

    /// Box used when nothing along the chain defines one.
    fn default_box(&self) -> GeometryBox;
}

/// One slide, layout or master part.
#[derive(Debug)]
pub(crate) struct TierPart {
    pub(crate) kind: TierKind,
    pub(crate) partname: PackURI,
    pub(crate) parent: Option<TierId>,
    /// Part XML with the shapes taken out of `p:spTree`
    pub(crate) document: XmlDocument,
    pub(crate) shapes: ShapeTree,
}

impl TierPart {
    /// Parse a tier part and detach its shapes.
    pub(crate) fn load(
        kind: TierKind,
        partname: PackURI,
        parent: Option<TierId>,
        xml: &[u8],
    ) -> Result<Self> {
        let mut document = XmlDocument::parse(xml)?;
        let sp_tree = document
            .root_mut()
            .find_mut(&["cSld", "spTree"])
            .ok_or_else(|| Error::InvalidFormat(format!("{} has no shape tree", partname)))?;

        let mut shapes = ShapeTree::default();
        for element in sp_tree.remove_children(|e| !is_tree_frame_element(e)) {
            shapes.push(ShapeEntry::new(element));
        }
        trace!(%partname, shapes = shapes.len(), "tier loaded");

        Ok(Self {
            kind,
            partname,
            parent,
            document,
            shapes,
        })
    }

    /// `p:spTree` without its shapes.
    pub(crate) fn tree_frame(&self) -> Option<&XmlElement> {
        self.document.root().find(&["cSld", "spTree"])
    }

    /// `p:cSld/@name`.
    pub(crate) fn name(&self) -> Option<&str> {
        self.document
            .root()
            .child("cSld")
            .and_then(|c_sld| c_sld.attr("name"))
            .filter(|name| !name.is_empty())
    }

    /// Serialize the part with its live shapes put back into `p:spTree`.
    pub(crate) fn to_xml(&self) -> Vec<u8> {
        let mut document = self.document.clone();
        if let Some(sp_tree) = document.root_mut().find_mut(&["cSld", "spTree"]) {
            let position = sp_tree
                .elements()
                .position(|e| e.local_name() == "extLst")
                .unwrap_or_else(|| sp_tree.elements().count());
            for (offset, (_, entry)) in self.shapes.iter().enumerate() {
                sp_tree.insert_child(position + offset, entry.element.clone());
            }
        }
        document.to_bytes()
    }
}

/// Every loaded tier of a presentation.
#[derive(Debug)]
pub(crate) struct Deck {
    tiers: Vec<TierPart>,
    default_box: GeometryBox,
}

impl Deck {
    pub(crate) fn new(default_box: GeometryBox) -> Self {
        Self {
            tiers: Vec::new(),
            default_box,
        }
    }

    pub(crate) fn push(&mut self, tier: TierPart) -> TierId {
        self.tiers.push(tier);
        TierId::new(self.tiers.len() - 1)
    }

    #[inline]
    pub(crate) fn tier(&self, id: TierId) -> Option<&TierPart> {
        self.tiers.get(id.index())
    }

    #[inline]
    pub(crate) fn tier_mut(&mut self, id: TierId) -> Option<&mut TierPart> {
        self.tiers.get_mut(id.index())
    }

    pub(crate) fn tiers(&self) -> impl Iterator<Item = (TierId, &TierPart)> {
        self.tiers
            .iter()
            .enumerate()
            .map(|(idx, tier)| (TierId::new(idx), tier))
    }

    /// Tier holding a part, if loaded.
    pub(crate) fn find(&self, partname: &PackURI) -> Option<TierId> {
        self.tiers()
            .find(|(_, tier)| &tier.partname == partname)
            .map(|(id, _)| id)
    }

    pub(crate) fn entry(&self, shape: ShapeRef) -> Result<&ShapeEntry> {
        self.tier(shape.tier)
            .and_then(|tier| tier.shapes.get(shape.slot))
            .ok_or_else(|| removed(shape))
    }

    pub(crate) fn entry_mut(&mut self, shape: ShapeRef) -> Result<&mut ShapeEntry> {
        self.tier_mut(shape.tier)
            .and_then(|tier| tier.shapes.get_mut(shape.slot))
            .ok_or_else(|| removed(shape))
    }

    /// Tiers inheriting from `tier`, directly or transitively.
    pub(crate) fn descendants(&self, tier: TierId) -> Vec<TierId> {
        let mut found = Vec::new();
        let mut frontier = vec![tier];
        while let Some(current) = frontier.pop() {
            for (id, part) in self.tiers() {
                if part.parent == Some(current) {
                    found.push(id);
                    frontier.push(id);
                }
            }
        }
        found
    }

    /// Reset the inherited state of every shape that may inherit from `tier`.
    pub(crate) fn invalidate_dependents(&mut self, tier: TierId) {
        let dependents = self.descendants(tier);
        for id in &dependents {
            if let Some(part) = self.tier_mut(*id) {
                part.shapes.iter_mut().for_each(ShapeEntry::reset_resolved);
            }
        }
        if !dependents.is_empty() {
            trace!(?tier, dependents = dependents.len(), "inherited state reset");
        }
    }

    /// Effective box of a shape: its local transform, else the inherited one.
    ///
    /// A non-placeholder shape without a transform has an empty box at the
    /// origin.
    pub(crate) fn box_of(&self, tier: TierId, entry: &ShapeEntry) -> GeometryBox {
        if let Some(local) = GeometryBox::from_element(&entry.element) {
            return local;
        }
        match &entry.placeholder {
            Some(source) => *entry
                .resolved_box
                .get_or_init(|| placeholder::resolve_transform(self, tier, source)),
            None => GeometryBox::default(),
        }
    }

    /// Effective placeholder type, `None` for a shape that is no placeholder.
    pub(crate) fn type_of(&self, tier: TierId, entry: &ShapeEntry) -> Option<PlaceholderType> {
        entry.placeholder.as_ref().map(|source| {
            *entry
                .resolved_type
                .get_or_init(|| placeholder::resolve_type(self, tier, source))
        })
    }

    pub(crate) fn resolve_box(&self, shape: ShapeRef) -> Result<GeometryBox> {
        Ok(self.box_of(shape.tier, self.entry(shape)?))
    }

    pub(crate) fn resolve_type(&self, shape: ShapeRef) -> Result<Option<PlaceholderType>> {
        Ok(self.type_of(shape.tier, self.entry(shape)?))
    }
}

fn removed(shape: ShapeRef) -> Error {
    Error::ElementRemoved(format!(
        "shape slot {} of tier {}",
        shape.slot,
        shape.tier.index()
    ))
}

impl DocumentTree for Deck {
    fn tier_kind(&self, tier: TierId) -> Option<TierKind> {
        self.tier(tier).map(|part| part.kind)
    }

    fn parent_tier(&self, tier: TierId) -> Option<TierId> {
        self.tier(tier).and_then(|part| part.parent)
    }

    fn elements_of_type(&self, tier: TierId, kind: Option<ShapeKind>) -> Vec<&XmlElement> {
        self.tier(tier)
            .map(|part| {
                part.shapes
                    .iter()
                    .filter(|(_, entry)| kind.is_none_or(|kind| entry.kind == kind))
                    .map(|(_, entry)| &entry.element)
                    .collect()
            })
            .unwrap_or_default()
    }

    fn default_box(&self) -> GeometryBox {
        self.default_box
    }
}
