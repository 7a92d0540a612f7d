//! PowerPoint (.pptx) presentation object model.
//!
//! A presentation is a hierarchy of tiers: slides inherit from slide layouts,
//! layouts from slide masters. Placeholder shapes take their type and position
//! from the matching placeholder further up that chain.
//!
//! - [`presentation`]: loading, saving and shape handles
//! - [`tier`]: tier storage and the [`DocumentTree`](tier::DocumentTree) seam
//! - [`placeholder`] and [`geometry`]: inherited placeholder type and box
//! - [`table`]: table grid model and cell merging
//! - [`assets`]: shared image parts with copy-on-write
//!
//! # Example
//!
//! ```rust,no_run
//! use slidetree::Presentation;
//!
//! let pres = Presentation::open("deck.pptx")?;
//! for slide in pres.slides() {
//!     for shape in slide.placeholders() {
//!         println!(
//!             "{:?} at ({}, {}) size {}x{}",
//!             shape.placeholder_type(),
//!             shape.x(),
//!             shape.y(),
//!             shape.width(),
//!             shape.height()
//!         );
//!     }
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
pub mod assets;
pub mod cache;
pub mod format;
pub mod geometry;
pub mod placeholder;
pub mod presentation;
pub mod shapes;
pub mod slide;
pub mod table;
pub mod tier;

pub use assets::{AssetStore, ImagePart};
pub use format::ImageFormat;
pub use geometry::{Dimension, GeometryBox};
pub use placeholder::{PlaceholderRef, PlaceholderType};
pub use presentation::Presentation;
pub use shapes::{Shape, ShapeKind, ShapeMut, ShapeRef};
pub use slide::{SlideTier, SlideTierMut};
pub use table::{Cell, CellRef, Column, GridRect, MergeOutcome, Row, Table, TableGrid, TableMut};
pub use tier::{DocumentTree, TierId, TierKind};
