//! Placeholder roles and their inheritance across slide, layout and master.
//!
//! A placeholder shape on a slide takes whatever it does not declare locally
//! from the matching placeholder on its layout, and from the master after that.
//! Matching at each step prefers the placeholder type and falls back to the
//! placeholder index.
use crate::common::xml::XmlElement;
use crate::ooxml::pptx::geometry::GeometryBox;
use crate::ooxml::pptx::shapes::base::placeholder_element;
use crate::ooxml::pptx::tier::{DocumentTree, TierId};
use tracing::debug;

/// Placeholder type, from the `type` attribute of `p:ph`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlaceholderType {
    Title,
    CenteredTitle,
    Subtitle,
    Body,
    Object,
    Chart,
    Table,
    ClipArt,
    Diagram,
    Media,
    Picture,
    SlideImage,
    Header,
    Footer,
    DateAndTime,
    SlideNumber,
    /// No recognised type, or nothing to inherit one from
    Custom,
}

impl PlaceholderType {
    /// Parse an ST_PlaceholderType value.
    pub fn from_ooxml(value: &str) -> Self {
        match value {
            "title" => Self::Title,
            "ctrTitle" => Self::CenteredTitle,
            "subTitle" => Self::Subtitle,
            "body" => Self::Body,
            "obj" => Self::Object,
            "chart" => Self::Chart,
            "tbl" => Self::Table,
            "clipArt" => Self::ClipArt,
            "dgm" => Self::Diagram,
            "media" => Self::Media,
            "pic" => Self::Picture,
            "sldImg" => Self::SlideImage,
            "hdr" => Self::Header,
            "ftr" => Self::Footer,
            "dt" => Self::DateAndTime,
            "sldNum" => Self::SlideNumber,
            _ => Self::Custom,
        }
    }

    /// Type reported to callers; a centered title is a title.
    #[inline]
    pub fn effective(self) -> Self {
        match self {
            Self::CenteredTitle => Self::Title,
            other => other,
        }
    }
}

/// A shape's placeholder role as declared in its own `p:ph` element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PlaceholderRef {
    /// Declared type, `None` when `p:ph` has no `type` attribute
    pub declared_type: Option<PlaceholderType>,
    /// Declared `idx`
    pub index: Option<u32>,
}

impl PlaceholderRef {
    /// Read the placeholder role of a shape element, if it has one.
    pub fn from_shape(element: &XmlElement) -> Option<Self> {
        let ph = placeholder_element(element)?;
        Some(Self {
            declared_type: ph.attr("type").map(PlaceholderType::from_ooxml),
            index: ph
                .attr("idx")
                .and_then(|idx| atoi_simd::parse::<u32, false, false>(idx.as_bytes()).ok()),
        })
    }

    /// Fill whatever this reference leaves undeclared from a matched ancestor.
    fn inherit_from(self, ancestor: PlaceholderRef) -> Self {
        Self {
            declared_type: self.declared_type.or(ancestor.declared_type),
            index: self.index.or(ancestor.index),
        }
    }
}

/// Find the placeholder among `candidates` that `source` inherits from.
///
/// A declared type other than Custom matches first (title and centered title
/// are equivalent); the index is used otherwise. Among several candidates of
/// the wanted type the first in document order wins, whatever its index.
pub fn find_match<'a, I>(candidates: I, source: &PlaceholderRef) -> Option<&'a XmlElement>
where
    I: IntoIterator<Item = &'a XmlElement>,
{
    let placeholders: Vec<(&XmlElement, PlaceholderRef)> = candidates
        .into_iter()
        .filter_map(|el| PlaceholderRef::from_shape(el).map(|ph| (el, ph)))
        .collect();

    if let Some(wanted) = source
        .declared_type
        .map(PlaceholderType::effective)
        .filter(|t| *t != PlaceholderType::Custom)
        && let Some((el, _)) = placeholders
            .iter()
            .find(|(_, ph)| ph.declared_type.map(PlaceholderType::effective) == Some(wanted))
    {
        return Some(*el);
    }

    let index = source.index?;
    placeholders
        .iter()
        .find(|(_, ph)| ph.index == Some(index))
        .map(|(el, _)| *el)
}

/// Effective placeholder type of a placeholder shape living on `tier`.
///
/// A declared type is final. An undeclared type is taken from the first
/// ancestor match that declares one; with none the type is Custom.
pub fn resolve_type<T>(tree: &T, tier: TierId, source: &PlaceholderRef) -> PlaceholderType
where
    T: DocumentTree + ?Sized,
{
    if let Some(declared) = source.declared_type {
        return declared.effective();
    }

    let mut current = tier;
    let mut wanted = *source;
    while let Some(parent) = tree.parent_tier(current) {
        if let Some(matched) = find_match(tree.elements_of_type(parent, None), &wanted)
            .and_then(PlaceholderRef::from_shape)
        {
            if let Some(declared) = matched.declared_type {
                return declared.effective();
            }
            wanted = wanted.inherit_from(matched);
        }
        current = parent;
    }

    debug!(?tier, index = ?source.index, "placeholder type unresolved, using Custom");
    PlaceholderType::Custom
}

/// Inherited position and size of a placeholder shape living on `tier`.
///
/// Walks the ancestors until a matched placeholder carries its own transform.
/// A match without a transform passes its role on and the walk continues.
/// Exhausting the chain yields the tree's default box.
pub fn resolve_transform<T>(tree: &T, tier: TierId, source: &PlaceholderRef) -> GeometryBox
where
    T: DocumentTree + ?Sized,
{
    let mut current = tier;
    let mut wanted = *source;
    while let Some(parent) = tree.parent_tier(current) {
        if let Some(matched) = find_match(tree.elements_of_type(parent, None), &wanted) {
            if let Some(found) = GeometryBox::from_element(matched) {
                return found;
            }
            if let Some(role) = PlaceholderRef::from_shape(matched) {
                wanted = wanted.inherit_from(role);
            }
        }
        current = parent;
    }

    let fallback = tree.default_box();
    debug!(?tier, ?fallback, "placeholder transform unresolved, using default box");
    fallback
}
