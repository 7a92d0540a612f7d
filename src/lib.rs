//! Slidetree - an editable object model for PowerPoint (.pptx) presentations
//!
//! Slidetree loads a `.pptx` package, lets callers read and edit shapes, text,
//! tables and images without touching the underlying XML, and writes the
//! package back.
//!
//! # Features
//!
//! - **Placeholder inheritance**: a placeholder's type and position resolve
//!   through the slide, layout and master chain
//! - **Table merging**: cell merges keep the table grid consistent, fold
//!   redundant rows and columns, and roll back on failure
//! - **Shared images**: image parts are reference counted, and replacing a
//!   shared image copies it for the writer only
//! - **Lossless round trips**: parts the model does not understand are saved
//!   unchanged
//!
//! # Example - Resizing a placeholder
//!
//! ```no_run
//! use slidetree::{Presentation, PlaceholderType};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut pres = Presentation::open("deck.pptx")?;
//!
//! let title = pres
//!     .slide(0)
//!     .and_then(|slide| {
//!         slide
//!             .placeholders()
//!             .into_iter()
//!             .find(|shape| shape.placeholder_type() == Some(PlaceholderType::Title))
//!     })
//!     .map(|shape| shape.handle());
//!
//! if let Some(title) = title {
//!     let mut shape = pres.shape_mut(title)?;
//!     // Inherited geometry must become local before it can change
//!     shape.materialize_transform()?;
//!     shape.set_height(1_000_000)?;
//! }
//! pres.save("resized.pptx")?;
//! # Ok(())
//! # }
//! ```
//!
//! # Example - Merging table cells
//!
//! ```no_run
//! use slidetree::{Presentation, ShapeKind};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut pres = Presentation::open("deck.pptx")?;
//! let table = pres
//!     .slide(0)
//!     .and_then(|slide| slide.shapes().into_iter().find(|s| s.kind() == ShapeKind::Table))
//!     .map(|shape| shape.handle());
//!
//! if let Some(table) = table {
//!     let mut shape = pres.shape_mut(table)?;
//!     let mut grid = shape.table_mut()?;
//!     let (a, b) = (grid.cell(0, 0)?, grid.cell(0, 1)?);
//!     grid.merge_cells(a, b)?;
//! }
//! pres.save("merged.pptx")?;
//! # Ok(())
//! # }
//! ```

/// Error type, unit conversions and the XML element tree
pub mod common;

/// OOXML packaging and the PresentationML object model
pub mod ooxml;

pub use common::{Error, Result};
pub use ooxml::opc::{Compression, SaveOptions};
pub use ooxml::pptx::{
    AssetStore, Cell, CellRef, Column, DocumentTree, GeometryBox, ImagePart, MergeOutcome,
    PlaceholderRef, PlaceholderType, Presentation, Row, Shape, ShapeKind, ShapeMut, ShapeRef,
    SlideTier, SlideTierMut, Table, TableMut, TierId, TierKind,
};
