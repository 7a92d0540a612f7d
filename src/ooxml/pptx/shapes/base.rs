//! Shape classification and accessors over a shape's XML element.
//!
//! Every top-level child of `p:spTree` other than the tree's own properties is a
//! shape. Its identity lives in `p:nvXxPr/p:cNvPr` and its placeholder role in
//! `p:nvXxPr/p:nvPr/p:ph`.
use crate::common::xml::XmlElement;
use smallvec::SmallVec;

/// Relationship ids referenced from one element; shapes rarely hold more than a few.
pub(crate) type RelRefs = SmallVec<[String; 4]>;

/// Name of the sidecar element holding caller-defined custom data.
pub(crate) const CUSTOM_DATA_ELEMENT: &str = "ctd";

/// Shape kind enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShapeKind {
    /// An auto shape or text box (p:sp)
    AutoShape,
    /// A picture (p:pic)
    Picture,
    /// A graphic frame holding a table
    Table,
    /// A graphic frame holding a chart
    Chart,
    /// A group shape (p:grpSp)
    Group,
    /// A graphic frame holding an embedded OLE object
    OleObject,
    /// A connector (p:cxnSp)
    Connector,
    /// Anything else: diagrams, content parts, alternate content
    Unknown,
}

impl ShapeKind {
    /// Classify a shape element.
    pub fn detect(element: &XmlElement) -> Self {
        match element.local_name() {
            "sp" => ShapeKind::AutoShape,
            "pic" => ShapeKind::Picture,
            "grpSp" => ShapeKind::Group,
            "cxnSp" => ShapeKind::Connector,
            "graphicFrame" => {
                let uri = element
                    .find(&["graphic", "graphicData"])
                    .and_then(|data| data.attr("uri"))
                    .unwrap_or_default();
                if uri.ends_with("/drawingml/2006/table") {
                    ShapeKind::Table
                } else if uri.ends_with("/drawingml/2006/chart") {
                    ShapeKind::Chart
                } else if uri.ends_with("/presentationml/2006/ole") {
                    ShapeKind::OleObject
                } else {
                    ShapeKind::Unknown
                }
            },
            _ => ShapeKind::Unknown,
        }
    }
}

/// Whether a `p:spTree` child is part of the tree frame rather than a shape.
pub(crate) fn is_tree_frame_element(element: &XmlElement) -> bool {
    matches!(element.local_name(), "nvGrpSpPr" | "grpSpPr" | "extLst")
}

/// The `p:nvXxPr` element of a shape.
pub(crate) fn non_visual_props(element: &XmlElement) -> Option<&XmlElement> {
    element.elements().find(|e| {
        let name = e.local_name();
        name.starts_with("nv") && name.ends_with("Pr")
    })
}

fn non_visual_props_mut(element: &mut XmlElement) -> Option<&mut XmlElement> {
    element.elements_mut().find(|e| {
        let name = e.local_name();
        name.starts_with("nv") && name.ends_with("Pr")
    })
}

/// The `p:cNvPr` element carrying id, name and hidden flag.
pub(crate) fn c_nv_pr(element: &XmlElement) -> Option<&XmlElement> {
    non_visual_props(element)?.child("cNvPr")
}

pub(crate) fn c_nv_pr_mut(element: &mut XmlElement) -> Option<&mut XmlElement> {
    non_visual_props_mut(element)?.child_mut("cNvPr")
}

/// The `p:ph` element of a placeholder shape.
pub(crate) fn placeholder_element(element: &XmlElement) -> Option<&XmlElement> {
    non_visual_props(element)?.find(&["nvPr", "ph"])
}

pub(crate) fn shape_id(element: &XmlElement) -> u32 {
    c_nv_pr(element)
        .and_then(|props| props.attr("id"))
        .and_then(|id| atoi_simd::parse::<u32, false, false>(id.as_bytes()).ok())
        .unwrap_or_default()
}

pub(crate) fn shape_name(element: &XmlElement) -> &str {
    c_nv_pr(element)
        .and_then(|props| props.attr("name"))
        .unwrap_or_default()
}

pub(crate) fn is_hidden(element: &XmlElement) -> bool {
    c_nv_pr(element)
        .and_then(|props| props.attr("hidden"))
        .is_some_and(parse_bool)
}

/// Every shape id used in a subtree, including group members.
pub(crate) fn collect_ids(element: &XmlElement, ids: &mut Vec<u32>) {
    element.visit(&mut |e| {
        if e.local_name() == "cNvPr"
            && let Some(id) = e.attr("id").and_then(|id| atoi_simd::parse::<u32, false, false>(id.as_bytes()).ok())
        {
            ids.push(id);
        }
    });
}

/// Relationship id of the first embedded image (`a:blip r:embed`).
pub(crate) fn image_r_id(element: &XmlElement) -> Option<String> {
    let mut found = None;
    element.visit(&mut |e| {
        if found.is_none() && e.local_name() == "blip" {
            found = e.attr("r:embed").map(str::to_string);
        }
    });
    found
}

/// Point the first `a:blip` at a different relationship.
pub(crate) fn set_image_r_id(element: &mut XmlElement, r_id: &str) -> bool {
    let mut done = false;
    element.visit_mut(&mut |e| {
        if !done && e.local_name() == "blip" && e.attr("r:embed").is_some() {
            e.set_attr("r:embed", r_id);
            done = true;
        }
    });
    done
}

/// Every relationship id referenced from a subtree.
///
/// Relationship references are namespace-prefixed attributes named `embed`,
/// `link`, `id` or `pict` (`r:embed`, `r:id`, ...); unprefixed `id` is a shape id.
pub(crate) fn relationship_refs(element: &XmlElement) -> RelRefs {
    let mut refs = RelRefs::new();
    element.visit(&mut |e| {
        for (key, value) in e.attributes() {
            if let Some((_, local)) = key.split_once(':')
                && matches!(local, "embed" | "link" | "id" | "pict")
            {
                refs.push(value.to_string());
            }
        }
    });
    refs
}

/// Text of the sidecar custom data element, `None` when absent or empty.
pub(crate) fn custom_data(element: &XmlElement) -> Option<String> {
    element
        .child(CUSTOM_DATA_ELEMENT)
        .map(XmlElement::text)
        .filter(|text| !text.is_empty())
}

/// Replace the sidecar custom data element.
pub(crate) fn set_custom_data(element: &mut XmlElement, value: Option<&str>) {
    element.remove_children(|e| e.name() == CUSTOM_DATA_ELEMENT);
    if let Some(value) = value {
        element.push(XmlElement::new(CUSTOM_DATA_ELEMENT).with_text(value));
    }
}

/// Paragraph texts of a `p:txBody`/`a:txBody`, joined by newlines.
pub(crate) fn text_body_text(body: &XmlElement) -> String {
    body.children_named("p")
        .map(XmlElement::text)
        .collect::<Vec<_>>()
        .join("\n")
}

#[inline]
pub(crate) fn parse_bool(value: &str) -> bool {
    matches!(value, "1" | "true" | "on")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::xml::XmlDocument;

    fn parse(xml: &str) -> XmlElement {
        XmlDocument::parse(xml.as_bytes()).unwrap().root().clone()
    }

    #[test]
    fn test_detect_kinds() {
        let table = parse(
            r#"<p:graphicFrame xmlns:p="p" xmlns:a="a"><a:graphic><a:graphicData uri="http://schemas.openxmlformats.org/drawingml/2006/table"/></a:graphic></p:graphicFrame>"#,
        );
        assert_eq!(ShapeKind::detect(&table), ShapeKind::Table);

        let chart = parse(
            r#"<p:graphicFrame xmlns:p="p" xmlns:a="a"><a:graphic><a:graphicData uri="http://schemas.openxmlformats.org/drawingml/2006/chart"/></a:graphic></p:graphicFrame>"#,
        );
        assert_eq!(ShapeKind::detect(&chart), ShapeKind::Chart);

        assert_eq!(ShapeKind::detect(&XmlElement::new("p:pic")), ShapeKind::Picture);
        assert_eq!(ShapeKind::detect(&XmlElement::new("p:cxnSp")), ShapeKind::Connector);
        assert_eq!(
            ShapeKind::detect(&XmlElement::new("p:contentPart")),
            ShapeKind::Unknown
        );
    }

    #[test]
    fn test_identity() {
        let sp = parse(
            r#"<p:sp xmlns:p="p"><p:nvSpPr><p:cNvPr id="7" name="Box" hidden="1"/><p:cNvSpPr/><p:nvPr><p:ph type="title"/></p:nvPr></p:nvSpPr></p:sp>"#,
        );
        assert_eq!(shape_id(&sp), 7);
        assert_eq!(shape_name(&sp), "Box");
        assert!(is_hidden(&sp));
        assert_eq!(placeholder_element(&sp).and_then(|ph| ph.attr("type")), Some("title"));
    }

    #[test]
    fn test_image_refs() {
        let mut pic = parse(
            r#"<p:pic xmlns:p="p" xmlns:a="a" xmlns:r="r"><p:nvPicPr><p:cNvPr id="4" name="Picture 3"/></p:nvPicPr><p:blipFill><a:blip r:embed="rId2"/></p:blipFill></p:pic>"#,
        );
        assert_eq!(image_r_id(&pic).as_deref(), Some("rId2"));
        assert_eq!(&relationship_refs(&pic)[..], &["rId2".to_string()]);

        assert!(set_image_r_id(&mut pic, "rId5"));
        assert_eq!(image_r_id(&pic).as_deref(), Some("rId5"));
    }

    #[test]
    fn test_custom_data_sidecar() {
        let mut sp = XmlElement::new("p:sp");
        assert_eq!(custom_data(&sp), None);

        set_custom_data(&mut sp, Some("first"));
        set_custom_data(&mut sp, Some("second & more"));
        assert_eq!(custom_data(&sp).as_deref(), Some("second & more"));
        assert_eq!(sp.children_named(CUSTOM_DATA_ELEMENT).count(), 1);

        set_custom_data(&mut sp, None);
        assert_eq!(custom_data(&sp), None);
    }
}
