//! Shapes of a slide tier.
//!
//! `base` classifies shape elements and reads their identity, `tree` keeps a
//! tier's shapes in index-stable slots, and `shape` provides the views handed
//! out to callers.
pub mod base;
pub mod shape;
pub mod tree;

pub use base::ShapeKind;
pub use shape::{Shape, ShapeMut};
pub use tree::ShapeRef;
