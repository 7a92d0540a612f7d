//! Unified error types for slidetree.
//!
//! This module provides the single error type used across the package layer,
//! the XML element tree and the presentation object model.

// Submodule declarations
pub mod conversions;
pub mod types;

// Re-exports
pub use types::{Error, Result};
