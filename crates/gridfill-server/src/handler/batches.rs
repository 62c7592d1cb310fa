//! Table batch handlers.
//!
//! A table batch turns every data cell of a submitted spreadsheet into one
//! job. Submission returns as soon as the jobs are queued; clients poll the
//! status endpoint for results.

use aide::axum::ApiRouter;
use aide::transform::TransformOperation;
use axum::extract::State;
use axum::http::StatusCode;
use gridfill_nats::kv::BatchKey;

use crate::extract::{Json, Path, ValidateJson};
use crate::handler::request::{BatchPathParams, SubmitTable};
use crate::handler::response::{BatchAccepted, BatchResults, ErrorResponse, StoredTable};
use crate::handler::{ErrorKind, Result};
use crate::pipeline::{JobProducer, collect_results, is_autofill_id};
use crate::service::{BatchStorage, ServiceState};

/// Tracing target for table batch operations.
const TRACING_TARGET: &str = "gridfill_server::handler::batches";

/// Queues one job per data cell of the submitted table.
#[tracing::instrument(skip_all, fields(rows = request.table.len()))]
async fn submit_batch(
    State(producer): State<JobProducer>,
    ValidateJson(request): ValidateJson<SubmitTable>,
) -> Result<(StatusCode, Json<BatchAccepted>)> {
    tracing::debug!(target: TRACING_TARGET, "Submitting table batch");

    let submission = producer.submit(request.into_shape()).await?;

    tracing::info!(
        target: TRACING_TARGET,
        batch_id = %submission.batch_id,
        job_count = submission.job_count,
        "Table batch accepted"
    );

    Ok((StatusCode::ACCEPTED, Json(submission.into())))
}

fn submit_batch_docs(op: TransformOperation) -> TransformOperation {
    op.summary("Submit table batch")
        .description(
            "Queues one completion job per data cell. Row 0 holds column headers and \
             columns 0 and 1 hold row labels; those cells are never processed.",
        )
        .response::<202, Json<BatchAccepted>>()
        .response::<400, Json<ErrorResponse>>()
        .response::<413, Json<ErrorResponse>>()
        .response::<500, Json<ErrorResponse>>()
        .response::<503, Json<ErrorResponse>>()
}

/// Returns the results recorded so far for a table batch.
#[tracing::instrument(skip_all, fields(batch_id = %path_params.batch_id))]
async fn get_batch_status(
    State(storage): State<BatchStorage>,
    Path(path_params): Path<BatchPathParams>,
) -> Result<(StatusCode, Json<BatchResults>)> {
    tracing::debug!(target: TRACING_TARGET, "Reading batch status");

    if is_autofill_id(&path_params.batch_id) {
        tracing::debug!(target: TRACING_TARGET, "Autofill id on table route, no results");
        return Ok((StatusCode::OK, Json(BatchResults::default())));
    }

    let results = collect_results(&storage, &path_params.batch_id).await?;

    tracing::debug!(
        target: TRACING_TARGET,
        result_count = results.len(),
        "Batch status read"
    );

    Ok((StatusCode::OK, Json(BatchResults { results })))
}

fn get_batch_status_docs(op: TransformOperation) -> TransformOperation {
    op.summary("Get batch status")
        .description(
            "Returns every result recorded so far, keyed by `row:col`. Each value is a \
             JSON-encoded result record. Unknown batches and autofill ids return an \
             empty map.",
        )
        .response::<200, Json<BatchResults>>()
        .response::<503, Json<ErrorResponse>>()
}

/// Returns the table stored for a batch.
#[tracing::instrument(skip_all, fields(batch_id = %path_params.batch_id))]
async fn get_batch(
    State(storage): State<BatchStorage>,
    Path(path_params): Path<BatchPathParams>,
) -> Result<(StatusCode, Json<StoredTable>)> {
    tracing::debug!(target: TRACING_TARGET, "Reading batch");

    let not_found = || {
        ErrorKind::NotFound
            .with_message("Batch not found")
            .with_resource("batch")
    };

    let batch_id: BatchKey = path_params.batch_id.parse().map_err(|_| not_found())?;
    let record = storage.get_batch(&batch_id).await?.ok_or_else(not_found)?;
    let stored = StoredTable::from_record(path_params.batch_id, record).ok_or_else(not_found)?;

    Ok((StatusCode::OK, Json(stored)))
}

fn get_batch_docs(op: TransformOperation) -> TransformOperation {
    op.summary("Get batch")
        .description("Returns the table submitted for a batch while its metadata is retained.")
        .response::<200, Json<StoredTable>>()
        .response::<404, Json<ErrorResponse>>()
        .response::<503, Json<ErrorResponse>>()
}

/// Returns routes for table batches.
pub fn routes() -> ApiRouter<ServiceState> {
    use aide::axum::routing::*;

    ApiRouter::new()
        .api_route("/batches", post_with(submit_batch, submit_batch_docs))
        .api_route("/batches/{batchId}", get_with(get_batch, get_batch_docs))
        .api_route(
            "/batches/{batchId}/status",
            get_with(get_batch_status, get_batch_status_docs),
        )
        .with_path_items(|item| item.tag("Batches"))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use gridfill_nats::kv::ResultRecord;
    use serde_json::json;

    use super::*;
    use crate::handler::response::SubmissionStatus;
    use crate::handler::test::{create_test_server_with_router, create_test_server_with_state};
    use crate::service::MemoryBackend;

    fn table() -> serde_json::Value {
        json!({
            "table": [
                ["", "", "Population", "Area"],
                ["Europe", "France", "67M", "551k"],
                ["Asia", "Japan", "125M", "378k"],
            ]
        })
    }

    #[tokio::test]
    async fn submit_returns_accepted() -> anyhow::Result<()> {
        let server = create_test_server_with_router(|_| routes()).await?;

        let response = server.post("/batches").json(&table()).await;
        response.assert_status(StatusCode::ACCEPTED);

        let accepted = response.json::<BatchAccepted>();
        assert_eq!(accepted.job_count, 4);
        assert_eq!(accepted.batch_id.len(), 16);
        Ok(())
    }

    #[tokio::test]
    async fn submit_uses_camel_case() -> anyhow::Result<()> {
        let server = create_test_server_with_router(|_| routes()).await?;

        let body = server.post("/batches").json(&table()).await.json::<serde_json::Value>();
        assert!(body.get("batchId").is_some());
        assert_eq!(body["jobCount"], 4);
        assert_eq!(body["status"], "accepted");
        Ok(())
    }

    #[tokio::test]
    async fn submit_rejects_empty_table() -> anyhow::Result<()> {
        let server = create_test_server_with_router(|_| routes()).await?;

        let response = server.post("/batches").json(&json!({ "table": [] })).await;
        response.assert_status_bad_request();
        Ok(())
    }

    #[tokio::test]
    async fn submit_accepts_header_only_table() -> anyhow::Result<()> {
        let server = create_test_server_with_router(|_| routes()).await?;

        let request = json!({ "table": [["", "", "Population"]] });
        let response = server.post("/batches").json(&request).await;
        response.assert_status(StatusCode::ACCEPTED);

        let body = response.json::<BatchAccepted>();
        assert_eq!(body.job_count, 0);
        assert_eq!(body.status, SubmissionStatus::Accepted);
        Ok(())
    }

    #[tokio::test]
    async fn submit_rejects_malformed_json() -> anyhow::Result<()> {
        let server = create_test_server_with_router(|_| routes()).await?;

        let response = server
            .post("/batches")
            .bytes("{\"table\": [".into())
            .content_type("application/json")
            .await;
        response.assert_status_bad_request();
        Ok(())
    }

    #[tokio::test]
    async fn status_of_unknown_batch_is_empty() -> anyhow::Result<()> {
        let server = create_test_server_with_router(|_| routes()).await?;

        let response = server.get("/batches/ffffffffffffffff/status").await;
        response.assert_status_ok();
        assert!(response.json::<BatchResults>().results.is_empty());

        let response = server.get("/batches/bad.id/status").await;
        response.assert_status_ok();
        Ok(())
    }

    #[tokio::test]
    async fn status_returns_recorded_results() -> anyhow::Result<()> {
        let backend = MemoryBackend::new();
        let state = ServiceState::new(
            backend.storage(),
            gridfill_completion::MockProvider::default().into_service(),
        );
        let server = create_test_server_with_state(routes(), state.clone()).await?;

        let accepted = server
            .post("/batches")
            .json(&table())
            .await
            .json::<BatchAccepted>();

        let job = backend
            .jobs()
            .into_iter()
            .next()
            .ok_or_else(|| anyhow::anyhow!("no job queued"))?;
        state
            .storage
            .put_result(
                &job.result_key(),
                &ResultRecord::completed("insight", "trace-1"),
            )
            .await?;

        let results = server
            .get(&format!("/batches/{}/status", accepted.batch_id))
            .await
            .json::<BatchResults>()
            .results;
        assert_eq!(results.len(), 1);

        let record: ResultRecord = serde_json::from_str(&results[&job.result_key().coordinate()])?;
        assert_eq!(record.result, "insight");
        Ok(())
    }

    #[tokio::test]
    async fn get_batch_returns_table() -> anyhow::Result<()> {
        let server = create_test_server_with_router(|_| routes()).await?;

        let accepted = server
            .post("/batches")
            .json(&table())
            .await
            .json::<BatchAccepted>();

        let response = server.get(&format!("/batches/{}", accepted.batch_id)).await;
        response.assert_status_ok();
        let stored = response.json::<StoredTable>();
        assert_eq!(stored.table.len(), 3);
        assert_eq!(stored.batch_id, accepted.batch_id);
        Ok(())
    }

    #[tokio::test]
    async fn get_unknown_batch_is_not_found() -> anyhow::Result<()> {
        let server = create_test_server_with_router(|_| routes()).await?;

        server
            .get("/batches/0123456789abcdef")
            .await
            .assert_status_not_found();
        server.get("/batches/bad.id").await.assert_status_not_found();
        Ok(())
    }
}
