//! In-memory `.pptx` fixture shared by the integration tests.
//!
//! One master, one layout, two slides. Slide 1 holds placeholders that resolve
//! at each tier, a text box, a picture and a 3x2 table; slide 2 holds a title,
//! a picture sharing slide 1's image and a placeholder whose transform lacks
//! its extent.
#![allow(dead_code)]

use slidetree::{Presentation, ShapeRef};
use std::io::{Cursor, Write};
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

pub const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR\0\0\0\x01\0\0\0\x01";
pub const JPEG: &[u8] = b"\xff\xd8\xff\xe0\0\x10JFIF\0\x01\x01";
pub const BACKDROP: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR\0\0\x07\x80\0\0\x04\x38";

pub const SLIDE_WIDTH: i64 = 12_192_000;
pub const SLIDE_HEIGHT: i64 = 6_858_000;

const NS: &str = concat!(
    r#"xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" "#,
    r#"xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" "#,
    r#"xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main""#
);

const RT: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Default Extension="png" ContentType="image/png"/><Override PartName="/ppt/presentation.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.presentation.main+xml"/><Override PartName="/ppt/slideMasters/slideMaster1.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slideMaster+xml"/><Override PartName="/ppt/slideLayouts/slideLayout1.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slideLayout+xml"/><Override PartName="/ppt/slides/slide1.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slide+xml"/><Override PartName="/ppt/slides/slide2.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slide+xml"/><Override PartName="/ppt/theme/theme1.xml" ContentType="application/vnd.openxmlformats-officedocument.theme+xml"/></Types>"#;

fn rels(entries: &[(&str, &str, &str)]) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
    );
    for (id, kind, target) in entries {
        xml.push_str(&format!(
            r#"<Relationship Id="{id}" Type="{RT}/{kind}" Target="{target}"/>"#
        ));
    }
    xml.push_str("</Relationships>");
    xml
}

fn xfrm(x: i64, y: i64, cx: i64, cy: i64) -> String {
    format!(r#"<a:xfrm><a:off x="{x}" y="{y}"/><a:ext cx="{cx}" cy="{cy}"/></a:xfrm>"#)
}

fn sp(id: u32, name: &str, ph: &str, sp_pr: &str, text: &str) -> String {
    let body = if text.is_empty() {
        String::new()
    } else {
        format!(r#"<p:txBody><a:bodyPr/><a:lstStyle/><a:p><a:r><a:t>{text}</a:t></a:r></a:p></p:txBody>"#)
    };
    format!(
        r#"<p:sp><p:nvSpPr><p:cNvPr id="{id}" name="{name}"/><p:cNvSpPr/><p:nvPr>{ph}</p:nvPr></p:nvSpPr><p:spPr>{sp_pr}</p:spPr>{body}</p:sp>"#
    )
}

fn pic(id: u32, name: &str, r_id: &str) -> String {
    format!(
        r#"<p:pic><p:nvPicPr><p:cNvPr id="{id}" name="{name}"/><p:cNvPicPr/><p:nvPr/></p:nvPicPr><p:blipFill><a:blip r:embed="{r_id}"/><a:stretch><a:fillRect/></a:stretch></p:blipFill><p:spPr>{}<a:prstGeom prst="rect"><a:avLst/></a:prstGeom></p:spPr></p:pic>"#,
        xfrm(1_000_000, 1_000_000, 2_000_000, 1_500_000)
    )
}

fn table(id: u32, name: &str) -> String {
    let mut rows = String::new();
    for (r, h) in [10, 20].iter().enumerate() {
        rows.push_str(&format!(r#"<a:tr h="{h}">"#));
        for c in 0..3 {
            rows.push_str(&format!(
                r#"<a:tc><a:txBody><a:bodyPr/><a:lstStyle/><a:p><a:r><a:t>R{r}C{c}</a:t></a:r></a:p></a:txBody><a:tcPr/></a:tc>"#
            ));
        }
        rows.push_str("</a:tr>");
    }
    format!(
        r#"<p:graphicFrame><p:nvGraphicFramePr><p:cNvPr id="{id}" name="{name}"/><p:cNvGraphicFramePr><a:graphicFrameLocks noGrp="1"/></p:cNvGraphicFramePr><p:nvPr/></p:nvGraphicFramePr><p:xfrm><a:off x="500" y="500"/><a:ext cx="450" cy="30"/></p:xfrm><a:graphic><a:graphicData uri="http://schemas.openxmlformats.org/drawingml/2006/table"><a:tbl><a:tblPr firstRow="1"/><a:tblGrid><a:gridCol w="100"/><a:gridCol w="200"/><a:gridCol w="150"/></a:tblGrid>{rows}</a:tbl></a:graphicData></a:graphic></p:graphicFrame>"#
    )
}

fn tier(root: &str, name: &str, shapes: &str, tail: &str) -> String {
    tier_with_background(root, name, "", shapes, tail)
}

fn tier_with_background(root: &str, name: &str, bg: &str, shapes: &str, tail: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:{root} {NS}><p:cSld name="{name}">{bg}<p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/>{shapes}</p:spTree></p:cSld>{tail}</p:{root}>"#
    )
}

/// The fixture package.
pub fn deck_bytes() -> Vec<u8> {
    build(false)
}

/// The fixture with both slides filling their background with one shared
/// picture.
pub fn deck_with_backgrounds() -> Presentation {
    Presentation::from_bytes(&build(true)).unwrap()
}

fn build(backgrounds: bool) -> Vec<u8> {
    let bg = if backgrounds {
        r#"<p:bg><p:bgPr><a:blipFill dpi="0" rotWithShape="1"><a:blip r:embed="rId3"/><a:stretch><a:fillRect/></a:stretch></a:blipFill><a:effectLst/></p:bgPr></p:bg>"#
    } else {
        ""
    };
    let presentation = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:presentation {NS}><p:sldMasterIdLst><p:sldMasterId id="2147483648" r:id="rId1"/></p:sldMasterIdLst><p:sldIdLst><p:sldId id="256" r:id="rId2"/><p:sldId id="257" r:id="rId3"/></p:sldIdLst><p:sldSz cx="{SLIDE_WIDTH}" cy="{SLIDE_HEIGHT}"/><p:notesSz cx="6858000" cy="9144000"/></p:presentation>"#
    );

    let master = tier(
        "sldMaster",
        "",
        &[
            sp(2, "Title Placeholder 1", r#"<p:ph type="title"/>"#, &xfrm(100, 100, 8000, 1000), ""),
            sp(3, "Text Placeholder 2", r#"<p:ph type="body" idx="1"/>"#, &xfrm(100, 1500, 8000, 4000), ""),
            sp(4, "Footer Placeholder 3", r#"<p:ph type="ftr" sz="quarter" idx="11"/>"#, &xfrm(3000, 6000, 3000, 300), ""),
        ]
        .concat(),
        r#"<p:sldLayoutIdLst><p:sldLayoutId id="2147483649" r:id="rId1"/></p:sldLayoutIdLst>"#,
    );

    let layout = tier(
        "sldLayout",
        "Title and Content",
        &[
            sp(2, "Title 1", r#"<p:ph type="ctrTitle"/>"#, &xfrm(200, 200, 7000, 900), ""),
            sp(3, "Content Placeholder 2", r#"<p:ph idx="1"/>"#, "", ""),
        ]
        .concat(),
        "",
    );

    let slide1 = tier_with_background(
        "sld",
        "",
        bg,
        &[
            sp(2, "Title 1", r#"<p:ph type="title"/>"#, "", "Quarterly review"),
            sp(3, "Content Placeholder 2", r#"<p:ph idx="1"/>"#, "", "First point"),
            sp(4, "Footer 3", r#"<p:ph type="ftr" sz="quarter" idx="11"/>"#, "", ""),
            sp(5, "Mystery 4", r#"<p:ph idx="42"/>"#, "", ""),
            sp(6, "TextBox 5", "", &xfrm(10, 20, 30, 40), "Hello"),
            pic(7, "Picture 6", "rId2"),
            table(8, "Table 7"),
        ]
        .concat(),
        "",
    );

    let slide2 = tier_with_background(
        "sld",
        "",
        bg,
        &[
            sp(2, "Title 1", r#"<p:ph type="title"/>"#, "", "Appendix"),
            pic(3, "Picture 2", "rId2"),
            sp(4, "Notes 3", r#"<p:ph idx="1"/>"#, r#"<a:xfrm><a:off x="5" y="6"/></a:xfrm>"#, ""),
        ]
        .concat(),
        "",
    );

    let theme = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<a:theme xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" name="Office Theme"/>"#;

    let mut slide_entries = vec![
        ("rId1", "slideLayout", "../slideLayouts/slideLayout1.xml"),
        ("rId2", "image", "../media/image1.png"),
    ];
    if backgrounds {
        slide_entries.push(("rId3", "image", "../media/image2.png"));
    }
    let slide_rels = rels(&slide_entries);

    let mut parts: Vec<(&str, Vec<u8>)> = vec![
        ("[Content_Types].xml", CONTENT_TYPES.as_bytes().to_vec()),
        ("_rels/.rels", rels(&[("rId1", "officeDocument", "ppt/presentation.xml")]).into_bytes()),
        ("ppt/presentation.xml", presentation.into_bytes()),
        (
            "ppt/_rels/presentation.xml.rels",
            rels(&[
                ("rId1", "slideMaster", "slideMasters/slideMaster1.xml"),
                ("rId2", "slide", "slides/slide1.xml"),
                ("rId3", "slide", "slides/slide2.xml"),
                ("rId4", "theme", "theme/theme1.xml"),
            ])
            .into_bytes(),
        ),
        ("ppt/slideMasters/slideMaster1.xml", master.into_bytes()),
        (
            "ppt/slideMasters/_rels/slideMaster1.xml.rels",
            rels(&[
                ("rId1", "slideLayout", "../slideLayouts/slideLayout1.xml"),
                ("rId2", "theme", "../theme/theme1.xml"),
            ])
            .into_bytes(),
        ),
        ("ppt/slideLayouts/slideLayout1.xml", layout.into_bytes()),
        (
            "ppt/slideLayouts/_rels/slideLayout1.xml.rels",
            rels(&[("rId1", "slideMaster", "../slideMasters/slideMaster1.xml")]).into_bytes(),
        ),
        ("ppt/slides/slide1.xml", slide1.into_bytes()),
        (
            "ppt/slides/_rels/slide1.xml.rels",
            slide_rels.clone().into_bytes(),
        ),
        ("ppt/slides/slide2.xml", slide2.into_bytes()),
        (
            "ppt/slides/_rels/slide2.xml.rels",
            slide_rels.clone().into_bytes(),
        ),
        ("ppt/theme/theme1.xml", theme.as_bytes().to_vec()),
        ("ppt/media/image1.png", PNG.to_vec()),
    ];
    if backgrounds {
        parts.push(("ppt/media/image2.png", BACKDROP.to_vec()));
    }

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, data) in parts {
        zip.start_file(name, SimpleFileOptions::default()).unwrap();
        zip.write_all(&data).unwrap();
    }
    zip.finish().unwrap().into_inner()
}

/// The fixture, loaded.
pub fn deck() -> Presentation {
    Presentation::from_bytes(&deck_bytes()).unwrap()
}

/// Handle of the shape named `name` on slide `index`.
pub fn shape_named(pres: &Presentation, index: usize, name: &str) -> ShapeRef {
    pres.slide(index)
        .and_then(|slide| slide.find_shape(name))
        .map(|shape| shape.handle())
        .unwrap_or_else(|| panic!("no shape '{name}' on slide {index}"))
}

/// Save and load again.
pub fn reopen(pres: &Presentation) -> Presentation {
    Presentation::from_bytes(&pres.to_bytes().unwrap()).unwrap()
}
