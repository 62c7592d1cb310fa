//! Response types for HTTP handlers.

mod batches;
mod error_response;
mod monitors;

pub use batches::*;
pub use error_response::ErrorResponse;
pub use monitors::*;
