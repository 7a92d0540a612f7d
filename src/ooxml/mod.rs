//! Office Open XML (OOXML) support.
//!
//! 1. **OPC layer** (`opc`): ZIP container, parts, relationships and content types
//! 2. **PresentationML** (`pptx`): the slide, layout and master object model
pub mod opc;
pub mod pptx;

pub use opc::{OpcPackage, PackURI};
