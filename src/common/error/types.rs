//! Unified error types for slidetree.
//!
//! Errors raised by the object model fall into two groups: container errors
//! (I/O, ZIP, XML, missing parts) and model errors that report misuse of the
//! editing API (removed elements, writes on inherited properties, grid
//! invariant violations).
use thiserror::Error;

/// Main error type for slidetree operations.
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// XML parsing error
    #[error("XML error: {0}")]
    Xml(String),

    /// ZIP archive error
    #[error("ZIP error: {0}")]
    Zip(String),

    /// Invalid pack URI
    #[error("Invalid pack URI: {0}")]
    InvalidPackUri(String),

    /// Part not found in the package
    #[error("Part not found: {0}")]
    PartNotFound(String),

    /// Relationship not found on a part
    #[error("Relationship not found: {0}")]
    RelationshipNotFound(String),

    /// The package is structurally not a presentation
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    /// The shape, cell or other element was structurally removed from its tree.
    ///
    /// Every operation on a removed element fails with this error.
    #[error("Element removed: {0}")]
    ElementRemoved(String),

    /// A write was attempted on a derived or inherited property that has no
    /// local override.
    #[error("Unsupported mutation: {0}")]
    UnsupportedMutation(String),

    /// Declared cell spans disagree with grid occupancy.
    ///
    /// The mutating call that detected it has been rolled back.
    #[error("Table grid inconsistency: {0}")]
    GridInconsistency(String),

    /// Cell coordinates outside the table grid
    #[error("Cell ({row}, {col}) is outside a {rows}x{cols} table")]
    CellOutOfRange {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    /// Slide number outside `1..=count`
    #[error("Slide number {number} is outside 1..={count}")]
    SlideOutOfRange { number: usize, count: usize },

    /// Table operation on a shape that does not hold a table
    #[error("Shape {0} is not a table")]
    NotATable(u32),

    /// Image operation on a shape that does not reference an image
    #[error("Shape {0} has no image")]
    NoImage(u32),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

/// Result type for slidetree operations.
pub type Result<T> = std::result::Result<T, Error>;
