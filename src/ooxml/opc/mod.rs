//! Open Packaging Convention (OPC) layer.
//!
//! Reads a `.pptx` ZIP archive into an [`OpcPackage`] of parts and
//! relationships, and writes it back.

pub mod constants;
pub mod package;
pub mod packuri;
pub mod part;
pub mod pkgreader;
pub mod pkgwriter;
pub mod rel;

pub use package::OpcPackage;
pub use packuri::PackURI;
pub use part::Part;
pub use pkgwriter::{Compression, SaveOptions};
pub use rel::{Relationship, Relationships};
