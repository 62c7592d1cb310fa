//! Request types for HTTP handlers.

mod batches;
mod paths;

pub use batches::*;
pub use paths::*;
