//! Autofill batch handlers.
//!
//! An autofill batch asks one question per `(row label, column label)` pair,
//! filling a grid of attributes for a list of items.

use aide::axum::ApiRouter;
use aide::transform::TransformOperation;
use axum::extract::State;
use axum::http::StatusCode;
use gridfill_nats::kv::BatchKey;

use crate::extract::{Json, Path, ValidateJson};
use crate::handler::request::{BatchPathParams, SubmitAutofill};
use crate::handler::response::{AutofillAccepted, BatchResults, ErrorResponse, StoredAutofill};
use crate::handler::{ErrorKind, Result};
use crate::pipeline::{JobProducer, collect_results, is_autofill_id};
use crate::service::{BatchStorage, ServiceState};

/// Tracing target for autofill operations.
const TRACING_TARGET: &str = "gridfill_server::handler::autofill";

/// Queues one job per label pair.
#[tracing::instrument(
    skip_all,
    fields(rows = request.rows.len(), cols = request.cols.len())
)]
async fn submit_autofill(
    State(producer): State<JobProducer>,
    ValidateJson(request): ValidateJson<SubmitAutofill>,
) -> Result<(StatusCode, Json<AutofillAccepted>)> {
    tracing::debug!(target: TRACING_TARGET, "Submitting autofill batch");

    let submission = producer.submit(request.into_shape()).await?;

    tracing::info!(
        target: TRACING_TARGET,
        autofill_id = %submission.batch_id,
        job_count = submission.job_count,
        "Autofill batch accepted"
    );

    Ok((StatusCode::ACCEPTED, Json(submission.into())))
}

fn submit_autofill_docs(op: TransformOperation) -> TransformOperation {
    op.summary("Submit autofill batch")
        .description(
            "Queues one completion job per (row, column) label pair. Results are keyed \
             by the zero-based index of each label.",
        )
        .response::<202, Json<AutofillAccepted>>()
        .response::<400, Json<ErrorResponse>>()
        .response::<413, Json<ErrorResponse>>()
        .response::<500, Json<ErrorResponse>>()
        .response::<503, Json<ErrorResponse>>()
}

/// Returns the results recorded so far for an autofill batch.
#[tracing::instrument(skip_all, fields(autofill_id = %path_params.batch_id))]
async fn get_autofill_status(
    State(storage): State<BatchStorage>,
    Path(path_params): Path<BatchPathParams>,
) -> Result<(StatusCode, Json<BatchResults>)> {
    if !is_autofill_id(&path_params.batch_id) {
        tracing::debug!(target: TRACING_TARGET, "Table batch id on autofill route, no results");
        return Ok((StatusCode::OK, Json(BatchResults::default())));
    }

    let results = collect_results(&storage, &path_params.batch_id).await?;

    tracing::debug!(
        target: TRACING_TARGET,
        result_count = results.len(),
        "Autofill status read"
    );

    Ok((StatusCode::OK, Json(BatchResults { results })))
}

fn get_autofill_status_docs(op: TransformOperation) -> TransformOperation {
    op.summary("Get autofill status")
        .description(
            "Returns every result recorded so far, keyed by `row:col`. Unknown batches \
             and table batch ids return an empty map.",
        )
        .response::<200, Json<BatchResults>>()
        .response::<503, Json<ErrorResponse>>()
}

/// Returns the labels stored for an autofill batch.
#[tracing::instrument(skip_all, fields(autofill_id = %path_params.batch_id))]
async fn get_autofill(
    State(storage): State<BatchStorage>,
    Path(path_params): Path<BatchPathParams>,
) -> Result<(StatusCode, Json<StoredAutofill>)> {
    let not_found = || {
        ErrorKind::NotFound
            .with_message("Autofill batch not found")
            .with_resource("autofill_batch")
    };

    let batch_id: BatchKey = path_params.batch_id.parse().map_err(|_| not_found())?;
    let record = storage.get_batch(&batch_id).await?.ok_or_else(not_found)?;
    let stored =
        StoredAutofill::from_record(path_params.batch_id, record).ok_or_else(not_found)?;

    Ok((StatusCode::OK, Json(stored)))
}

fn get_autofill_docs(op: TransformOperation) -> TransformOperation {
    op.summary("Get autofill batch")
        .description("Returns the labels submitted for an autofill batch.")
        .response::<200, Json<StoredAutofill>>()
        .response::<404, Json<ErrorResponse>>()
        .response::<503, Json<ErrorResponse>>()
}

/// Returns routes for autofill batches.
pub fn routes() -> ApiRouter<ServiceState> {
    use aide::axum::routing::*;

    ApiRouter::new()
        .api_route(
            "/autofill-batches",
            post_with(submit_autofill, submit_autofill_docs),
        )
        .api_route(
            "/autofill-batches/{batchId}",
            get_with(get_autofill, get_autofill_docs),
        )
        .api_route(
            "/autofill-batches/{batchId}/status",
            get_with(get_autofill_status, get_autofill_status_docs),
        )
        .with_path_items(|item| item.tag("Autofill"))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use gridfill_nats::stream::JobEntry;
    use serde_json::json;

    use super::*;
    use crate::handler::test::{create_test_server_with_router, create_test_server_with_state};
    use crate::pipeline::{AUTOFILL_PREFIX, JobProcessor, JobOutcome};
    use crate::service::MemoryBackend;

    fn labels() -> serde_json::Value {
        json!({
            "rows": ["Paris", "Tokyo"],
            "cols": ["Country", "Population"],
        })
    }

    #[tokio::test]
    async fn submit_returns_autofill_id() -> anyhow::Result<()> {
        let server = create_test_server_with_router(|_| routes()).await?;

        let response = server.post("/autofill-batches").json(&labels()).await;
        response.assert_status(StatusCode::ACCEPTED);

        let body = response.json::<serde_json::Value>();
        let autofill_id = body["autofillId"].as_str().unwrap_or_default();
        assert!(autofill_id.starts_with(AUTOFILL_PREFIX));
        assert_eq!(body["jobCount"], 4);
        Ok(())
    }

    #[tokio::test]
    async fn submit_rejects_missing_labels() -> anyhow::Result<()> {
        let server = create_test_server_with_router(|_| routes()).await?;

        let request = json!({ "rows": ["Paris"], "cols": [] });
        let response = server.post("/autofill-batches").json(&request).await;
        response.assert_status_bad_request();

        let body = response.json::<serde_json::Value>();
        let message = body["message"].as_str().unwrap_or_default();
        assert!(message.contains("cols"));
        Ok(())
    }

    #[tokio::test]
    async fn processed_labels_show_in_status() -> anyhow::Result<()> {
        let backend = MemoryBackend::new();
        let completion = gridfill_completion::MockProvider::new("France")
            .failing_on("Tokyo")
            .into_service();
        let state = ServiceState::new(backend.storage(), completion.clone());
        let server = create_test_server_with_state(routes(), state.clone()).await?;

        let accepted = server
            .post("/autofill-batches")
            .json(&labels())
            .await
            .json::<AutofillAccepted>();

        let processor = JobProcessor::new(state.storage.clone(), completion);
        for job in backend.jobs() {
            let outcome = processor.process(&job, 1).await;
            match &job {
                JobEntry::Label { row_label, .. } if row_label == "Tokyo" => {
                    assert_eq!(outcome, JobOutcome::Failed);
                }
                _ => assert_eq!(outcome, JobOutcome::Completed),
            }
        }

        let results = server
            .get(&format!("/autofill-batches/{}/status", accepted.autofill_id))
            .await
            .json::<BatchResults>()
            .results;

        assert_eq!(results.len(), 2);
        assert!(results.contains_key("0:0"));
        assert!(results.contains_key("0:1"));
        Ok(())
    }

    #[tokio::test]
    async fn get_autofill_rejects_table_batch() -> anyhow::Result<()> {
        let server = create_test_server_with_router(|_| {
            crate::handler::batches::routes().merge(routes())
        })
        .await?;

        let table = json!({ "table": [["", "", "Area"], ["Europe", "France", "551k"]] });
        let body = server
            .post("/batches")
            .json(&table)
            .await
            .json::<serde_json::Value>();
        let batch_id = body["batchId"].as_str().unwrap_or_default();

        server
            .get(&format!("/autofill-batches/{batch_id}"))
            .await
            .assert_status_not_found();
        Ok(())
    }

    #[tokio::test]
    async fn status_ignores_table_batch_results() -> anyhow::Result<()> {
        let backend = MemoryBackend::new();
        let completion = gridfill_completion::MockProvider::new("insight").into_service();
        let state = ServiceState::new(backend.storage(), completion.clone());
        let router = crate::handler::batches::routes().merge(routes());
        let server = create_test_server_with_state(router, state.clone()).await?;

        let table = json!({ "table": [["", "", "Area"], ["Europe", "France", "551k"]] });
        let body = server
            .post("/batches")
            .json(&table)
            .await
            .json::<serde_json::Value>();
        let batch_id = body["batchId"].as_str().unwrap_or_default().to_owned();

        let processor = JobProcessor::new(state.storage.clone(), completion);
        for job in backend.jobs() {
            assert_eq!(processor.process(&job, 1).await, JobOutcome::Completed);
        }

        let table_results = server
            .get(&format!("/batches/{batch_id}/status"))
            .await
            .json::<BatchResults>()
            .results;
        assert_eq!(table_results.len(), 1);

        let autofill_results = server
            .get(&format!("/autofill-batches/{batch_id}/status"))
            .await
            .json::<BatchResults>()
            .results;
        assert!(autofill_results.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn get_autofill_returns_labels() -> anyhow::Result<()> {
        let server = create_test_server_with_router(|_| routes()).await?;

        let accepted = server
            .post("/autofill-batches")
            .json(&labels())
            .await
            .json::<AutofillAccepted>();

        let stored = server
            .get(&format!("/autofill-batches/{}", accepted.autofill_id))
            .await
            .json::<StoredAutofill>();
        assert_eq!(stored.rows, ["Paris", "Tokyo"]);
        assert_eq!(stored.cols, ["Country", "Population"]);
        Ok(())
    }
}
