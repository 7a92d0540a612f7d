//! Slides, slide layouts and slide masters.
use crate::common::error::{Error, Result};
use crate::common::xml::XmlElement;
use crate::ooxml::opc::PackURI;
use crate::ooxml::pptx::presentation::{Presentation, image_target, replace_image};
use crate::ooxml::pptx::shapes::base::{
    custom_data, image_r_id, parse_bool, set_custom_data, set_image_r_id,
};
use crate::ooxml::pptx::shapes::shape::Shape;
use crate::ooxml::pptx::shapes::tree::ShapeRef;
use crate::ooxml::pptx::tier::{TierId, TierKind, TierPart};

/// A slide, slide layout or slide master.
///
/// # Examples
///
/// ```rust,no_run
/// use slidetree::Presentation;
///
/// let pres = Presentation::open("deck.pptx")?;
/// for slide in pres.slides() {
///     println!("{} shapes on {}", slide.shapes().len(), slide.partname());
///     if let Some(layout) = slide.parent().and_then(|id| pres.tier(id)) {
///         println!("  layout: {}", layout.name().unwrap_or("(unnamed)"));
///     }
/// }
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone, Copy)]
pub struct SlideTier<'a> {
    pres: &'a Presentation,
    id: TierId,
    part: &'a TierPart,
}

impl<'a> SlideTier<'a> {
    pub(crate) fn new(pres: &'a Presentation, id: TierId) -> Option<Self> {
        Some(Self {
            part: pres.deck.tier(id)?,
            pres,
            id,
        })
    }

    #[inline]
    pub fn id(&self) -> TierId {
        self.id
    }

    #[inline]
    pub fn kind(&self) -> TierKind {
        self.part.kind
    }

    #[inline]
    pub fn partname(&self) -> &'a PackURI {
        &self.part.partname
    }

    /// The layout of a slide, the master of a layout; `None` for a master.
    #[inline]
    pub fn parent(&self) -> Option<TierId> {
        self.part.parent
    }

    /// `p:cSld/@name`, if set.
    pub fn name(&self) -> Option<&'a str> {
        self.part.name()
    }

    /// Live shapes in document order.
    pub fn shapes(&self) -> Vec<Shape<'a>> {
        self.part
            .shapes
            .iter()
            .filter_map(|(slot, _)| Shape::new(self.pres, ShapeRef::new(self.id, slot)).ok())
            .collect()
    }

    /// First shape with the given name.
    pub fn find_shape(&self, name: &str) -> Option<Shape<'a>> {
        self.shapes().into_iter().find(|shape| shape.name() == name)
    }

    /// Placeholder shapes only.
    pub fn placeholders(&self) -> Vec<Shape<'a>> {
        self.shapes()
            .into_iter()
            .filter(|shape| shape.is_placeholder())
            .collect()
    }

    /// `show="0"` on the slide root. Layouts and masters are never hidden.
    pub fn is_hidden(&self) -> bool {
        self.part
            .document
            .root()
            .attr("show")
            .is_some_and(|show| !parse_bool(show))
    }

    /// Caller-defined data stored with the tier.
    pub fn custom_data(&self) -> Option<String> {
        custom_data(self.part.document.root())
    }

    /// One-based position in the slide show; `None` for layouts and masters.
    pub fn number(&self) -> Option<usize> {
        self.pres.slide_index(self.id).map(|index| index + 1)
    }

    /// Partname of the picture filling the background, if the tier has one.
    pub fn background_partname(&self) -> Option<PackURI> {
        let r_id = image_r_id(background(self.part.document.root())?)?;
        let part = self.pres.package.part(&self.part.partname).ok()?;
        image_target(part.rels(), &r_id)
    }

    /// Bytes of the background picture. Tiers filled with a colour, or
    /// inheriting their background, have none.
    pub fn background_image(&self) -> Option<&'a [u8]> {
        let pres = self.pres;
        self.background_partname()
            .and_then(|partname| pres.assets.get(&partname))
            .map(|part| part.bytes())
    }
}

/// `p:cSld/p:bg` of a tier root.
fn background(root: &XmlElement) -> Option<&XmlElement> {
    root.find(&["cSld", "bg"])
}

/// Mutable access to the tier-level properties of a slide.
pub struct SlideTierMut<'a> {
    pres: &'a mut Presentation,
    id: TierId,
}

impl<'a> SlideTierMut<'a> {
    pub(crate) fn new(pres: &'a mut Presentation, id: TierId) -> Option<Self> {
        pres.deck.tier(id)?;
        Some(Self { pres, id })
    }

    pub fn tier(&self) -> Option<SlideTier<'_>> {
        SlideTier::new(self.pres, self.id)
    }

    fn part_mut(&mut self) -> Option<&mut TierPart> {
        self.pres.deck.tier_mut(self.id)
    }

    /// Hide the slide from the slide show, or show it again.
    pub fn set_hidden(&mut self, hidden: bool) {
        if let Some(part) = self.part_mut() {
            let root = part.document.root_mut();
            if hidden {
                root.set_attr("show", "0");
            } else {
                root.remove_attr("show");
            }
        }
    }

    /// Store caller-defined data with the tier; `None` clears it.
    pub fn set_custom_data(&mut self, value: Option<&str>) {
        if let Some(part) = self.part_mut() {
            set_custom_data(part.document.root_mut(), value);
        }
    }

    /// Move the slide to a one-based position, shifting the slides between
    /// its old and new place by one.
    pub fn set_number(&mut self, number: usize) -> Result<()> {
        let from = self.pres.slide_index(self.id).ok_or_else(|| {
            Error::UnsupportedMutation("layouts and masters have no slide number".to_string())
        })?;
        let count = self.pres.slide_count();
        if number == 0 || number > count {
            return Err(Error::SlideOutOfRange { number, count });
        }
        self.pres.move_slide(from, number - 1)
    }

    /// Replace the background picture.
    ///
    /// Follows the same sharing rule as [`ShapeMut::set_image`]: a picture
    /// other shapes or slides show is forked for this tier.
    ///
    /// [`ShapeMut::set_image`]: crate::ooxml::pptx::shapes::ShapeMut::set_image
    pub fn set_background_image(&mut self, bytes: Vec<u8>) -> Result<()> {
        let id = self.id;
        let Presentation {
            package,
            deck,
            assets,
            ..
        } = &mut *self.pres;
        let part = deck
            .tier_mut(id)
            .ok_or_else(|| Error::ElementRemoved(format!("tier {}", id.index())))?;
        let bg = part
            .document
            .root_mut()
            .find_mut(&["cSld", "bg"])
            .ok_or_else(|| no_background(&part.partname))?;
        let r_id = image_r_id(bg).ok_or_else(|| no_background(&part.partname))?;

        if let Some(new_r_id) = replace_image(package, assets, &part.partname, &r_id, bytes)? {
            set_image_r_id(bg, &new_r_id);
        }
        Ok(())
    }
}

fn no_background(partname: &PackURI) -> Error {
    Error::UnsupportedMutation(format!("{} has no background picture", partname))
}
