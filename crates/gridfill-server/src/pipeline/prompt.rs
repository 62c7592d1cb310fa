//! Prompt templates for job entries.

use gridfill_completion::Prompt;
use gridfill_nats::stream::JobEntry;

/// Template used for autofill jobs.
pub const LABEL_TEMPLATE: &str = "What is the {attribute} of {item}?";

/// Template used for table cell jobs.
pub const CELL_TEMPLATE: &str = "Analyze this spreadsheet cell value and provide insights: {cell_value}";

/// Builds the prompt for a job.
///
/// The same entry always yields the same prompt, so a redelivered job asks
/// the same question again.
pub fn prompt_for(job: &JobEntry) -> Prompt {
    match job {
        JobEntry::Cell { value, .. } => Prompt::new(CELL_TEMPLATE).with_input("cell_value", value),
        JobEntry::Label {
            row_label,
            col_label,
            ..
        } => Prompt::new(LABEL_TEMPLATE)
            .with_input("attribute", col_label)
            .with_input("item", row_label),
    }
}
