//! Common types and helpers shared across strata.

mod constants;
mod id;
mod security;
mod value;

pub use constants::*;
pub use id::*;
pub use security::*;
pub use value::*;
