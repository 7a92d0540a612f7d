//! Constant values related to the Open Packaging Convention and PresentationML.
//!
//! Content type URIs (like MIME-types) that specify a part's format, relationship
//! type URIs and XML namespaces used while reading and writing `.pptx` packages.

/// Content type URIs
pub mod content_type {
    // Images
    pub const BMP: &str = "image/bmp";
    pub const GIF: &str = "image/gif";
    pub const JPEG: &str = "image/jpeg";
    pub const PNG: &str = "image/png";
    pub const TIFF: &str = "image/tiff";
    pub const X_EMF: &str = "image/x-emf";
    pub const X_WMF: &str = "image/x-wmf";
    pub const SVG: &str = "image/svg+xml";

    // Package plumbing
    pub const OPC_RELATIONSHIPS: &str = "application/vnd.openxmlformats-package.relationships+xml";
    pub const OPC_CORE_PROPERTIES: &str =
        "application/vnd.openxmlformats-package.core-properties+xml";
    pub const OFC_THEME: &str = "application/vnd.openxmlformats-officedocument.theme+xml";

    // PresentationML
    pub const PML_PRESENTATION_MAIN: &str =
        "application/vnd.openxmlformats-officedocument.presentationml.presentation.main+xml";
    pub const PML_SLIDE: &str =
        "application/vnd.openxmlformats-officedocument.presentationml.slide+xml";
    pub const PML_SLIDE_LAYOUT: &str =
        "application/vnd.openxmlformats-officedocument.presentationml.slideLayout+xml";
    pub const PML_SLIDE_MASTER: &str =
        "application/vnd.openxmlformats-officedocument.presentationml.slideMaster+xml";

    pub const XML: &str = "application/xml";
    pub const OCTET_STREAM: &str = "application/octet-stream";
}

/// XML namespace URIs
pub mod namespace {
    pub const OPC_RELATIONSHIPS: &str =
        "http://schemas.openxmlformats.org/package/2006/relationships";
    pub const OPC_CONTENT_TYPES: &str =
        "http://schemas.openxmlformats.org/package/2006/content-types";
    pub const OFC_RELATIONSHIPS: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
    pub const DML_MAIN: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
    pub const PML_MAIN: &str = "http://schemas.openxmlformats.org/presentationml/2006/main";
}

/// Relationship target modes
pub mod target_mode {
    pub const INTERNAL: &str = "Internal";
    pub const EXTERNAL: &str = "External";
}

/// Relationship type URIs
pub mod relationship_type {
    pub const OFFICE_DOCUMENT: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument";
    pub const SLIDE: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide";
    pub const SLIDE_LAYOUT: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideLayout";
    pub const SLIDE_MASTER: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideMaster";
    pub const IMAGE: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image";
    pub const THEME: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/theme";
}

/// Whether `content_type` is the conventional `Default` mapping for `ext`.
///
/// Parts matching a default are written as `<Default>` entries in
/// `[Content_Types].xml`, everything else as `<Override>`.
pub fn is_default_content_type(ext: &str, content_type: &str) -> bool {
    matches!(
        (ext.to_ascii_lowercase().as_str(), content_type),
        ("rels", content_type::OPC_RELATIONSHIPS)
            | ("xml", content_type::XML)
            | ("png", content_type::PNG)
            | ("jpeg" | "jpg" | "jpe", content_type::JPEG)
            | ("gif", content_type::GIF)
            | ("bmp", content_type::BMP)
            | ("tif" | "tiff", content_type::TIFF)
            | ("emf", content_type::X_EMF)
            | ("wmf", content_type::X_WMF)
            | ("svg", content_type::SVG)
    )
}

/// File extension used for a new image part of the given content type.
pub fn image_extension(content_type: &str) -> &'static str {
    match content_type {
        content_type::JPEG => "jpeg",
        content_type::GIF => "gif",
        content_type::BMP => "bmp",
        content_type::TIFF => "tiff",
        content_type::X_EMF => "emf",
        content_type::X_WMF => "wmf",
        content_type::SVG => "svg",
        _ => "png",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_content_types() {
        assert!(is_default_content_type("PNG", content_type::PNG));
        assert!(is_default_content_type("jpg", content_type::JPEG));
        assert!(!is_default_content_type("xml", content_type::PML_SLIDE));
    }

    #[test]
    fn test_image_extension() {
        assert_eq!(image_extension(content_type::JPEG), "jpeg");
        assert_eq!(image_extension("application/unknown"), "png");
    }
}
