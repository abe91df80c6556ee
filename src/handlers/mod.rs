//! HTTP handlers for catalog records.

pub mod catalog;
pub use catalog::*;
