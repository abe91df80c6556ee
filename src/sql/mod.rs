//! Statement model, query builder and PostgreSQL rendering. Identifiers come from the
//! catalog only; values are always bound as parameters.

mod builder;
pub mod params;
mod render;
mod statement;

pub use builder::*;
pub use params::*;
pub use render::*;
pub use statement::*;
