//! Ordered, index-stable shape collection of one tier.
//!
//! Shapes are detached from `p:spTree` on load and kept in slots. A removed
//! shape leaves an empty slot behind, so handles to the remaining shapes stay
//! valid and a handle to the removed one reports [`Error::ElementRemoved`].
//!
//! [`Error::ElementRemoved`]: crate::common::Error::ElementRemoved
use crate::common::xml::XmlElement;
use crate::ooxml::pptx::cache::ResettableCache;
use crate::ooxml::pptx::geometry::GeometryBox;
use crate::ooxml::pptx::placeholder::{PlaceholderRef, PlaceholderType};
use crate::ooxml::pptx::shapes::base::{ShapeKind, collect_ids};
use crate::ooxml::pptx::table::TableState;
use crate::ooxml::pptx::tier::TierId;

/// Handle to a shape: its tier and its slot in the tier's shape tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShapeRef {
    pub(crate) tier: TierId,
    pub(crate) slot: usize,
}

impl ShapeRef {
    pub(crate) fn new(tier: TierId, slot: usize) -> Self {
        Self { tier, slot }
    }

    /// Tier the shape lives on.
    #[inline]
    pub fn tier(&self) -> TierId {
        self.tier
    }
}

/// One shape element with its derived state.
#[derive(Debug)]
pub(crate) struct ShapeEntry {
    pub(crate) element: XmlElement,
    pub(crate) kind: ShapeKind,
    pub(crate) placeholder: Option<PlaceholderRef>,
    pub(crate) resolved_type: ResettableCache<PlaceholderType>,
    pub(crate) resolved_box: ResettableCache<GeometryBox>,
    pub(crate) table: Option<TableState>,
}

impl ShapeEntry {
    pub(crate) fn new(element: XmlElement) -> Self {
        let kind = ShapeKind::detect(&element);
        Self {
            placeholder: PlaceholderRef::from_shape(&element),
            table: (kind == ShapeKind::Table).then(TableState::default),
            kind,
            element,
            resolved_type: ResettableCache::new(),
            resolved_box: ResettableCache::new(),
        }
    }

    /// Drop everything inherited from ancestor tiers.
    pub(crate) fn reset_resolved(&mut self) {
        self.resolved_type.reset();
        self.resolved_box.reset();
    }
}

#[derive(Debug, Default)]
pub(crate) struct ShapeTree {
    slots: Vec<Option<ShapeEntry>>,
}

impl ShapeTree {
    /// Append a shape on top of the z-order, returning its slot.
    pub(crate) fn push(&mut self, entry: ShapeEntry) -> usize {
        self.slots.push(Some(entry));
        self.slots.len() - 1
    }

    #[inline]
    pub(crate) fn get(&self, slot: usize) -> Option<&ShapeEntry> {
        self.slots.get(slot)?.as_ref()
    }

    #[inline]
    pub(crate) fn get_mut(&mut self, slot: usize) -> Option<&mut ShapeEntry> {
        self.slots.get_mut(slot)?.as_mut()
    }

    /// Take a shape out, leaving its slot empty for good.
    pub(crate) fn remove(&mut self, slot: usize) -> Option<ShapeEntry> {
        self.slots.get_mut(slot)?.take()
    }

    /// Live shapes in document order with their slots.
    pub(crate) fn iter(&self) -> impl Iterator<Item = (usize, &ShapeEntry)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(slot, entry)| entry.as_ref().map(|entry| (slot, entry)))
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut ShapeEntry> {
        self.slots.iter_mut().flatten()
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    /// Smallest id above every shape id in use, group members included.
    pub(crate) fn next_shape_id(&self, frame: Option<&XmlElement>) -> u32 {
        let mut ids = Vec::new();
        if let Some(frame) = frame {
            collect_ids(frame, &mut ids);
        }
        for (_, entry) in self.iter() {
            collect_ids(&entry.element, &mut ids);
        }
        ids.into_iter().max().map_or(1, |max| max.saturating_add(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::xml::XmlDocument;

    fn shape(id: u32) -> ShapeEntry {
        let xml = format!(
            r#"<p:sp xmlns:p="p"><p:nvSpPr><p:cNvPr id="{id}" name="Shape {id}"/></p:nvSpPr></p:sp>"#
        );
        ShapeEntry::new(XmlDocument::parse(xml.as_bytes()).unwrap().root().clone())
    }

    #[test]
    fn test_slots_are_stable_across_removal() {
        let mut tree = ShapeTree::default();
        let a = tree.push(shape(2));
        let b = tree.push(shape(3));
        let c = tree.push(shape(4));

        assert!(tree.remove(b).is_some());
        assert!(tree.get(b).is_none());
        assert!(tree.remove(b).is_none());
        assert_eq!(tree.iter().map(|(slot, _)| slot).collect::<Vec<_>>(), [a, c]);
        assert_eq!(tree.len(), 2);

        // Slots are never reused
        let d = tree.push(shape(5));
        assert_eq!(d, 3);
    }

    #[test]
    fn test_next_shape_id() {
        let mut tree = ShapeTree::default();
        let frame = XmlElement::new("p:nvGrpSpPr")
            .with_child(XmlElement::new("p:cNvPr").with_attr("id", "1").with_attr("name", ""));
        assert_eq!(tree.next_shape_id(Some(&frame)), 2);
        assert_eq!(tree.next_shape_id(None), 1);
        tree.push(shape(7));
        tree.push(shape(3));
        assert_eq!(tree.next_shape_id(Some(&frame)), 8);
    }

    #[test]
    fn test_entry_detects_kind_and_placeholder() {
        let entry = shape(2);
        assert_eq!(entry.kind, ShapeKind::AutoShape);
        assert!(entry.placeholder.is_none());
        assert!(entry.table.is_none());
    }
}
