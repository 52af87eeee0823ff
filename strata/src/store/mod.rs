pub mod memory;
mod operations;
mod strata_store;
mod transaction;

pub use operations::*;
pub use strata_store::*;
pub use transaction::*;
