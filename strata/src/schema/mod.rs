mod builder;
mod collection;
mod field;
mod rules;

pub use builder::*;
pub use collection::*;
pub use field::*;
pub use rules::*;
