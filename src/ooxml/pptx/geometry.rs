//! Shape position and size.
//!
//! A shape's box comes from its local transform (`a:xfrm` with `a:off` and
//! `a:ext`) when it has one. Placeholders without one inherit theirs, see
//! [`placeholder::resolve_transform`](crate::ooxml::pptx::placeholder::resolve_transform).
use crate::common::error::{Error, Result};
use crate::common::unit::parse_emu;
use crate::common::xml::XmlElement;

/// Position and size in EMU.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct GeometryBox {
    pub x: i64,
    pub y: i64,
    pub width: i64,
    pub height: i64,
}

/// One coordinate of a [`GeometryBox`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    X,
    Y,
    Width,
    Height,
}

impl GeometryBox {
    pub const fn new(x: i64, y: i64, width: i64, height: i64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// The box of a shape's local transform, if it has a complete one.
    pub fn from_element(shape: &XmlElement) -> Option<Self> {
        let xfrm = local_transform(shape)?;
        let off = xfrm.child("off")?;
        let ext = xfrm.child("ext")?;
        Some(Self {
            x: parse_emu(off.attr("x")?)?,
            y: parse_emu(off.attr("y")?)?,
            width: parse_emu(ext.attr("cx")?)?,
            height: parse_emu(ext.attr("cy")?)?,
        })
    }

    #[inline]
    pub fn get(&self, dimension: Dimension) -> i64 {
        match dimension {
            Dimension::X => self.x,
            Dimension::Y => self.y,
            Dimension::Width => self.width,
            Dimension::Height => self.height,
        }
    }

    #[inline]
    pub fn set(&mut self, dimension: Dimension, value: i64) {
        match dimension {
            Dimension::X => self.x = value,
            Dimension::Y => self.y = value,
            Dimension::Width => self.width = value,
            Dimension::Height => self.height = value,
        }
    }
}

/// Where a shape kind keeps its transform: optional properties wrapper and
/// the qualified name of the transform element.
fn transform_location(shape: &XmlElement) -> Option<(Option<&'static str>, &'static str)> {
    match shape.local_name() {
        "sp" | "pic" | "cxnSp" => Some((Some("p:spPr"), "a:xfrm")),
        "grpSp" => Some((Some("p:grpSpPr"), "a:xfrm")),
        "graphicFrame" => Some((None, "p:xfrm")),
        _ => None,
    }
}

/// The shape's own transform element, if present.
pub(crate) fn local_transform(shape: &XmlElement) -> Option<&XmlElement> {
    match transform_location(shape)? {
        (Some(props), _) => shape.child(local(props))?.child("xfrm"),
        (None, _) => shape.child("xfrm"),
    }
}

#[inline]
fn local(qualified: &str) -> &str {
    crate::common::xml::local_name(qualified)
}

/// Get or create the transform element with `a:off` and `a:ext` children.
fn ensure_transform(shape: &mut XmlElement) -> Result<&mut XmlElement> {
    let Some((props, xfrm_name)) = transform_location(shape) else {
        return Err(Error::UnsupportedMutation(format!(
            "<{}> has no transform",
            shape.name()
        )));
    };
    let is_group = shape.local_name() == "grpSp";

    // Properties and transform both follow the non-visual properties element
    let container = match props {
        Some(props) => shape.ensure_child_at(props, 1),
        None => shape,
    };
    let xfrm = container.ensure_child_at(xfrm_name, if props.is_some() { 0 } else { 1 });
    xfrm.ensure_child_at("a:off", 0).set_default_attrs(&[("x", "0"), ("y", "0")]);
    xfrm.ensure_child_at("a:ext", 1).set_default_attrs(&[("cx", "0"), ("cy", "0")]);
    if is_group {
        xfrm.ensure_child_at("a:chOff", 2).set_default_attrs(&[("x", "0"), ("y", "0")]);
        xfrm.ensure_child_at("a:chExt", 3).set_default_attrs(&[("cx", "0"), ("cy", "0")]);
    }
    Ok(xfrm)
}

trait DefaultAttrs {
    fn set_default_attrs(&mut self, attrs: &[(&str, &str)]);
}

impl DefaultAttrs for XmlElement {
    fn set_default_attrs(&mut self, attrs: &[(&str, &str)]) {
        for (name, value) in attrs {
            if self.attr(name).is_none() {
                self.set_attr(*name, *value);
            }
        }
    }
}

fn write_dimension(xfrm: &mut XmlElement, dimension: Dimension, value: i64) {
    let (child, attr) = match dimension {
        Dimension::X => ("off", "x"),
        Dimension::Y => ("off", "y"),
        Dimension::Width => ("ext", "cx"),
        Dimension::Height => ("ext", "cy"),
    };
    if let Some(el) = xfrm.child_mut(child) {
        el.set_attr(attr, value.to_string());
    }
}

/// Write one coordinate to a shape's local transform.
///
/// A placeholder without a complete local transform inherits its box, and writing to it
/// fails with [`Error::UnsupportedMutation`] until the transform has been
/// materialized. Other shapes get a transform created on demand.
pub(crate) fn set_dimension(
    shape: &mut XmlElement,
    is_placeholder: bool,
    dimension: Dimension,
    value: i64,
) -> Result<()> {
    if is_placeholder && GeometryBox::from_element(shape).is_none() {
        return Err(Error::UnsupportedMutation(format!(
            "placeholder '{}' inherits its geometry; materialize its transform first",
            crate::ooxml::pptx::shapes::base::shape_name(shape)
        )));
    }
    let xfrm = ensure_transform(shape)?;
    write_dimension(xfrm, dimension, value);
    Ok(())
}

/// Write a complete box as the shape's local transform.
pub(crate) fn write_box(shape: &mut XmlElement, geometry: GeometryBox) -> Result<()> {
    let xfrm = ensure_transform(shape)?;
    for dimension in [Dimension::X, Dimension::Y, Dimension::Width, Dimension::Height] {
        write_dimension(xfrm, dimension, geometry.get(dimension));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::xml::XmlDocument;

    fn parse(xml: &str) -> XmlElement {
        XmlDocument::parse(xml.as_bytes()).unwrap().root().clone()
    }

    #[test]
    fn test_reads_local_transform() {
        let sp = parse(
            r#"<p:sp xmlns:p="p" xmlns:a="a"><p:nvSpPr/><p:spPr><a:xfrm><a:off x="100" y="200"/><a:ext cx="300" cy="400"/></a:xfrm></p:spPr></p:sp>"#,
        );
        assert_eq!(GeometryBox::from_element(&sp), Some(GeometryBox::new(100, 200, 300, 400)));

        let frame = parse(
            r#"<p:graphicFrame xmlns:p="p" xmlns:a="a"><p:nvGraphicFramePr/><p:xfrm><a:off x="1" y="2"/><a:ext cx="3" cy="4"/></p:xfrm></p:graphicFrame>"#,
        );
        assert_eq!(GeometryBox::from_element(&frame), Some(GeometryBox::new(1, 2, 3, 4)));
    }

    #[test]
    fn test_placeholder_without_transform_rejects_writes() {
        let mut sp = parse(
            r#"<p:sp xmlns:p="p"><p:nvSpPr><p:cNvPr id="2" name="Title 1"/></p:nvSpPr><p:spPr/></p:sp>"#,
        );
        let err = set_dimension(&mut sp, true, Dimension::X, 5).unwrap_err();
        assert!(matches!(err, Error::UnsupportedMutation(_)));
        assert!(local_transform(&sp).is_none());
    }

    #[test]
    fn test_placeholder_with_partial_transform_still_inherits() {
        let mut sp = parse(
            r#"<p:sp xmlns:p="p" xmlns:a="a"><p:nvSpPr><p:cNvPr id="2" name="Title 1"/></p:nvSpPr><p:spPr><a:xfrm><a:off x="5" y="6"/></a:xfrm></p:spPr></p:sp>"#,
        );
        assert_eq!(GeometryBox::from_element(&sp), None);
        let before = sp.clone();
        assert!(matches!(
            set_dimension(&mut sp, true, Dimension::X, 100),
            Err(Error::UnsupportedMutation(_))
        ));
        assert_eq!(sp, before);

        // Materializing completes the transform; the setters work afterwards
        write_box(&mut sp, GeometryBox::new(5, 6, 700, 800)).unwrap();
        set_dimension(&mut sp, true, Dimension::X, 100).unwrap();
        assert_eq!(GeometryBox::from_element(&sp), Some(GeometryBox::new(100, 6, 700, 800)));
    }

    #[test]
    fn test_plain_shape_gets_transform_on_demand() {
        let mut sp = parse(r#"<p:sp xmlns:p="p"><p:nvSpPr/><p:txBody/></p:sp>"#);
        set_dimension(&mut sp, false, Dimension::Width, 1234).unwrap();
        assert_eq!(GeometryBox::from_element(&sp), Some(GeometryBox::new(0, 0, 1234, 0)));

        let names: Vec<&str> = sp.elements().map(|e| e.name()).collect();
        assert_eq!(names, ["p:nvSpPr", "p:spPr", "p:txBody"]);
    }

    #[test]
    fn test_write_box_on_group() {
        let mut grp = parse(r#"<p:grpSp xmlns:p="p"><p:nvGrpSpPr/><p:grpSpPr/></p:grpSp>"#);
        write_box(&mut grp, GeometryBox::new(1, 2, 3, 4)).unwrap();
        assert_eq!(GeometryBox::from_element(&grp), Some(GeometryBox::new(1, 2, 3, 4)));
        assert!(local_transform(&grp).unwrap().child("chExt").is_some());
    }

    #[test]
    fn test_unknown_element_has_no_transform() {
        let mut part = XmlElement::new("p:contentPart");
        assert!(matches!(
            write_box(&mut part, GeometryBox::default()),
            Err(Error::UnsupportedMutation(_))
        ));
    }
}
