//! Minimal mutable XML element tree used to hold presentation parts in memory.
//!
//! Parts are parsed with quick-xml into [`XmlElement`] trees, edited through the
//! accessors below and serialized back when the package is saved. Element names
//! keep their namespace prefix (`p:sp`, `a:off`); lookups by local name ignore it.

mod element;
mod escape;

pub use element::{XmlDocument, XmlElement, XmlNode, local_name};
pub use escape::{escape_text, escape_xml, resolve_reference, unescape_xml};
