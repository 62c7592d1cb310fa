//! Path parameter types for HTTP handlers.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Path parameters for batch operations.
///
/// The id is kept as received; ids that can never name a batch are handled
/// by each operation.
#[must_use]
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BatchPathParams {
    /// Identifier returned when the batch was submitted.
    pub batch_id: String,
}
