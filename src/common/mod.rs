//! Common types and utilities shared by the package layer and the
//! presentation object model.

pub mod error;
pub mod unit;
pub mod xml;

pub use error::{Error, Result};
