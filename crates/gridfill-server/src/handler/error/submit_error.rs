//! Batch submission error to HTTP error conversion.

use super::http_error::{Error as HttpError, ErrorKind};
use crate::pipeline::SubmitError;

impl From<SubmitError> for HttpError<'static> {
    fn from(error: SubmitError) -> Self {
        match error {
            SubmitError::EmptyBatch => ErrorKind::BadRequest
                .with_message("Batch has no cells to process")
                .with_resource("batch"),

            SubmitError::InvalidId(source) => ErrorKind::InternalServerError
                .with_message("Failed to allocate a batch id")
                .with_context(source.to_string()),

            SubmitError::Metadata(source) => HttpError::from(source)
                .with_message("Failed to store batch; no jobs were queued")
                .with_resource("batch"),

            SubmitError::Partial {
                batch_id,
                queued,
                total,
                source,
            } => ErrorKind::InternalServerError
                .with_message(format!(
                    "Queued {queued} of {total} jobs for batch {batch_id} before failing"
                ))
                .with_resource("batch")
                .with_context(source.to_string())
                .with_suggestion("Queued jobs will still be processed; resubmit to retry the rest"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_batch_is_bad_request() {
        let error: HttpError = SubmitError::EmptyBatch.into();
        assert_eq!(error.kind(), ErrorKind::BadRequest);
    }

    #[test]
    fn test_partial_failure_reports_count() -> anyhow::Result<()> {
        let error: HttpError = SubmitError::Partial {
            batch_id: "0123456789abcdef".parse()?,
            queued: 3,
            total: 8,
            source: gridfill_nats::Error::delivery_failed("cell.jobs", "timeout"),
        }
        .into();

        assert_eq!(error.kind(), ErrorKind::InternalServerError);
        assert!(error.message().is_some_and(|m| m.contains("Queued 3 of 8")));
        assert!(error.suggestion().is_some());
        Ok(())
    }
}
