//! Shape views handed out by [`Presentation`].
//!
//! [`Shape`] reads a shape, resolving inherited geometry and placeholder type
//! on demand. [`ShapeMut`] writes to it and resets whatever other shapes have
//! cached from it.
use crate::common::error::{Error, Result};
use crate::ooxml::opc::PackURI;
use crate::ooxml::pptx::geometry::{self, Dimension, GeometryBox};
use crate::ooxml::pptx::placeholder::{PlaceholderRef, PlaceholderType};
use crate::ooxml::pptx::presentation::{Presentation, image_target, replace_image};
use crate::ooxml::pptx::shapes::base::{
    self, ShapeKind, c_nv_pr_mut, image_r_id, set_image_r_id, shape_id, text_body_text,
};
use crate::ooxml::pptx::shapes::tree::{ShapeEntry, ShapeRef};
use crate::ooxml::pptx::table::{Table, TableMut, table_element, table_element_mut};
use tracing::debug;

/// Read-only view of one shape.
#[derive(Debug, Clone, Copy)]
pub struct Shape<'a> {
    pres: &'a Presentation,
    handle: ShapeRef,
    entry: &'a ShapeEntry,
}

impl<'a> Shape<'a> {
    pub(crate) fn new(pres: &'a Presentation, handle: ShapeRef) -> Result<Self> {
        Ok(Self {
            entry: pres.deck.entry(handle)?,
            pres,
            handle,
        })
    }

    /// Handle for later lookups and mutation.
    #[inline]
    pub fn handle(&self) -> ShapeRef {
        self.handle
    }

    /// `cNvPr/@id`, unique within the tier.
    pub fn id(&self) -> u32 {
        shape_id(&self.entry.element)
    }

    pub fn name(&self) -> &'a str {
        base::shape_name(&self.entry.element)
    }

    pub fn is_hidden(&self) -> bool {
        base::is_hidden(&self.entry.element)
    }

    #[inline]
    pub fn kind(&self) -> ShapeKind {
        self.entry.kind
    }

    /// Position and size: the local transform, else the inherited one.
    pub fn geometry(&self) -> GeometryBox {
        self.pres.deck.box_of(self.handle.tier, self.entry)
    }

    pub fn x(&self) -> i64 {
        self.geometry().x
    }

    pub fn y(&self) -> i64 {
        self.geometry().y
    }

    pub fn width(&self) -> i64 {
        self.geometry().width
    }

    pub fn height(&self) -> i64 {
        self.geometry().height
    }

    /// Whether the shape carries a complete transform of its own rather than
    /// inheriting one.
    pub fn has_local_transform(&self) -> bool {
        GeometryBox::from_element(&self.entry.element).is_some()
    }

    #[inline]
    pub fn is_placeholder(&self) -> bool {
        self.entry.placeholder.is_some()
    }

    /// The placeholder role as declared on the shape itself.
    #[inline]
    pub fn placeholder(&self) -> Option<PlaceholderRef> {
        self.entry.placeholder
    }

    /// Effective placeholder type after inheritance; `None` for other shapes.
    pub fn placeholder_type(&self) -> Option<PlaceholderType> {
        self.pres.deck.type_of(self.handle.tier, self.entry)
    }

    /// Caller-defined data stored alongside the shape.
    pub fn custom_data(&self) -> Option<String> {
        base::custom_data(&self.entry.element)
    }

    /// Text of the shape's text body, paragraphs joined by newlines.
    pub fn text(&self) -> Option<String> {
        self.entry.element.child("txBody").map(text_body_text)
    }

    /// Partname of the embedded image the shape shows.
    pub fn image_partname(&self) -> Option<PackURI> {
        let r_id = image_r_id(&self.entry.element)?;
        let tier = self.pres.deck.tier(self.handle.tier)?;
        let part = self.pres.package.part(&tier.partname).ok()?;
        image_target(part.rels(), &r_id)
    }

    /// Bytes of the embedded image. Never changes reference counts.
    pub fn image_bytes(&self) -> Result<&'a [u8]> {
        let pres = self.pres;
        self.image_partname()
            .and_then(|partname| pres.assets.get(&partname))
            .map(|part| part.bytes())
            .ok_or_else(|| Error::NoImage(self.id()))
    }

    /// Grid view of a table shape.
    pub fn table(&self) -> Result<Table<'a>> {
        let not_a_table = || Error::NotATable(self.id());
        let state = self.entry.table.as_ref().ok_or_else(not_a_table)?;
        let tbl = table_element(&self.entry.element).ok_or_else(not_a_table)?;
        Table::new(tbl, state)
    }
}

/// Mutable view of one shape.
pub struct ShapeMut<'a> {
    pres: &'a mut Presentation,
    handle: ShapeRef,
}

impl<'a> ShapeMut<'a> {
    pub(crate) fn new(pres: &'a mut Presentation, handle: ShapeRef) -> Result<Self> {
        pres.deck.entry(handle)?;
        Ok(Self { pres, handle })
    }

    #[inline]
    pub fn handle(&self) -> ShapeRef {
        self.handle
    }

    /// Read-only view of the current state.
    pub fn shape(&self) -> Result<Shape<'_>> {
        Shape::new(self.pres, self.handle)
    }

    fn entry_mut(&mut self) -> Result<&mut ShapeEntry> {
        self.pres.deck.entry_mut(self.handle)
    }

    /// Drop cached inherited state of this shape and of everything inheriting
    /// from its tier.
    fn invalidate(&mut self) -> Result<()> {
        self.entry_mut()?.reset_resolved();
        self.pres.deck.invalidate_dependents(self.handle.tier);
        Ok(())
    }

    fn set_dimension(&mut self, dimension: Dimension, value: i64) -> Result<()> {
        let entry = self.entry_mut()?;
        let is_placeholder = entry.placeholder.is_some();
        geometry::set_dimension(&mut entry.element, is_placeholder, dimension, value)?;
        self.invalidate()
    }

    /// Fails with [`Error::UnsupportedMutation`] on inherited geometry.
    pub fn set_x(&mut self, x: i64) -> Result<()> {
        self.set_dimension(Dimension::X, x)
    }

    pub fn set_y(&mut self, y: i64) -> Result<()> {
        self.set_dimension(Dimension::Y, y)
    }

    pub fn set_width(&mut self, width: i64) -> Result<()> {
        self.set_dimension(Dimension::Width, width)
    }

    pub fn set_height(&mut self, height: i64) -> Result<()> {
        self.set_dimension(Dimension::Height, height)
    }

    /// Write the currently effective box as the shape's own transform.
    ///
    /// Afterwards the geometry setters work on a placeholder that used to
    /// inherit its box. Shapes with a complete local transform are unchanged.
    pub fn materialize_transform(&mut self) -> Result<GeometryBox> {
        let resolved = self.pres.deck.resolve_box(self.handle)?;
        let entry = self.entry_mut()?;
        if GeometryBox::from_element(&entry.element).is_none() {
            geometry::write_box(&mut entry.element, resolved)?;
            self.invalidate()?;
        }
        Ok(resolved)
    }

    pub fn set_name(&mut self, name: &str) -> Result<()> {
        let entry = self.entry_mut()?;
        let id = shape_id(&entry.element);
        c_nv_pr_mut(&mut entry.element)
            .ok_or_else(|| {
                Error::UnsupportedMutation(format!("shape {} has no non-visual properties", id))
            })?
            .set_attr("name", name);
        Ok(())
    }

    pub fn set_hidden(&mut self, hidden: bool) -> Result<()> {
        let entry = self.entry_mut()?;
        let id = shape_id(&entry.element);
        let props = c_nv_pr_mut(&mut entry.element).ok_or_else(|| {
            Error::UnsupportedMutation(format!("shape {} has no non-visual properties", id))
        })?;
        if hidden {
            props.set_attr("hidden", "1");
        } else {
            props.remove_attr("hidden");
        }
        Ok(())
    }

    /// Store caller-defined data with the shape; `None` clears it.
    pub fn set_custom_data(&mut self, value: Option<&str>) -> Result<()> {
        base::set_custom_data(&mut self.entry_mut()?.element, value);
        Ok(())
    }

    /// Replace the embedded image of the shape.
    ///
    /// An image part shared with other shapes is left as is; the shape is
    /// repointed at a private copy holding the new bytes.
    pub fn set_image(&mut self, bytes: Vec<u8>) -> Result<()> {
        let handle = self.handle;
        let Presentation {
            package,
            deck,
            assets,
            ..
        } = &mut *self.pres;

        let tier_partname = deck
            .tier(handle.tier)
            .map(|tier| tier.partname.clone())
            .ok_or_else(|| Error::ElementRemoved(format!("tier {}", handle.tier.index())))?;
        let entry = deck.entry_mut(handle)?;
        let id = shape_id(&entry.element);
        let r_id = image_r_id(&entry.element).ok_or(Error::NoImage(id))?;

        if let Some(new_r_id) = replace_image(package, assets, &tier_partname, &r_id, bytes)? {
            set_image_r_id(&mut entry.element, &new_r_id);
            debug!(shape = id, r_id = %new_r_id, "shape repointed to forked image");
        }
        Ok(())
    }

    /// Mutable grid view of a table shape.
    pub fn table_mut(&mut self) -> Result<TableMut<'_>> {
        let entry = self.entry_mut()?;
        let id = shape_id(&entry.element);
        let ShapeEntry { element, table, .. } = entry;
        match (table.as_mut(), table_element_mut(element)) {
            (Some(state), Some(tbl)) => Ok(TableMut::new(tbl, state)),
            _ => Err(Error::NotATable(id)),
        }
    }
}
