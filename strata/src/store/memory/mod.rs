mod state;
mod store;
mod transaction;

pub use store::*;
pub use transaction::*;
