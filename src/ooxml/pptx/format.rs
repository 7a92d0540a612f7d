//! Image formats embedded in presentations.
use crate::ooxml::opc::constants::content_type as CT;

/// Image format types found in `/ppt/media`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Png,
    Jpeg,
    Gif,
    Bmp,
    Tiff,
    Emf,
    Wmf,
    Svg,
}

impl ImageFormat {
    /// Content type written to `[Content_Types].xml`.
    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Png => CT::PNG,
            Self::Jpeg => CT::JPEG,
            Self::Gif => CT::GIF,
            Self::Bmp => CT::BMP,
            Self::Tiff => CT::TIFF,
            Self::Emf => CT::X_EMF,
            Self::Wmf => CT::X_WMF,
            Self::Svg => CT::SVG,
        }
    }

    /// Extension used for new partnames.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpeg",
            Self::Gif => "gif",
            Self::Bmp => "bmp",
            Self::Tiff => "tiff",
            Self::Emf => "emf",
            Self::Wmf => "wmf",
            Self::Svg => "svg",
        }
    }

    /// Detect the format from its magic number.
    pub fn detect_from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < 4 {
            return None;
        }

        if bytes.starts_with(&[0x89, 0x50, 0x4E, 0x47]) {
            return Some(Self::Png);
        }
        if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Some(Self::Jpeg);
        }
        if bytes.starts_with(b"GIF8") {
            return Some(Self::Gif);
        }
        if bytes.starts_with(b"BM") {
            return Some(Self::Bmp);
        }
        if bytes.starts_with(&[0x49, 0x49, 0x2A, 0x00]) || bytes.starts_with(&[0x4D, 0x4D, 0x00, 0x2A])
        {
            return Some(Self::Tiff);
        }
        // EMR_HEADER record type 1, " EMF" signature at offset 40
        if bytes.starts_with(&[0x01, 0x00, 0x00, 0x00]) && bytes.get(40..44) == Some(&b" EMF"[..]) {
            return Some(Self::Emf);
        }
        // Placeable metafile key, or a bare METAHEADER
        if bytes.starts_with(&[0xD7, 0xCD, 0xC6, 0x9A]) || bytes.starts_with(&[0x01, 0x00, 0x09, 0x00])
        {
            return Some(Self::Wmf);
        }

        let head = &bytes[..bytes.len().min(512)];
        if memchr::memmem::find(head, b"<svg").is_some() {
            return Some(Self::Svg);
        }

        None
    }
}
