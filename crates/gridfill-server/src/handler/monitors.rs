//! Service health and description handlers.

use aide::axum::ApiRouter;
use aide::transform::TransformOperation;
use axum::extract::State;
use axum::http::StatusCode;
use jiff::Timestamp;

use crate::extract::Json;
use crate::handler::Result;
use crate::handler::response::{
    BrokerStatus, HealthState, HealthStatus, SERVICE_NAME, ServiceInfo,
};
use crate::service::ServiceState;

/// Tracing target for monitor operations.
const TRACING_TARGET: &str = "gridfill_server::handler::monitors";

/// Pings the broker and reports whether it answered.
#[tracing::instrument(skip_all)]
async fn health_status(
    State(state): State<ServiceState>,
) -> Result<(StatusCode, Json<HealthStatus>)> {
    let latency = match state.storage.ping().await {
        Ok(latency) => Some(latency),
        Err(error) => {
            tracing::warn!(target: TRACING_TARGET, error = %error, "Broker ping failed");
            None
        }
    };
    let connected = latency.is_some();
    let latency_ms = latency.map(|latency| u64::try_from(latency.as_millis()).unwrap_or(u64::MAX));
    let (status, status_code) = if connected {
        (HealthState::Healthy, StatusCode::OK)
    } else {
        (HealthState::Unhealthy, StatusCode::SERVICE_UNAVAILABLE)
    };

    let response = HealthStatus {
        status,
        service: SERVICE_NAME.to_owned(),
        broker: BrokerStatus {
            backend: state.storage.name().to_owned(),
            connected,
            latency_ms,
        },
        completion: state.completion.provider_name().to_owned(),
        checked_at: Timestamp::now(),
    };

    tracing::debug!(
        target: TRACING_TARGET,
        connected,
        status_code = status_code.as_u16(),
        "Health status prepared"
    );

    Ok((status_code, Json(response)))
}

fn health_status_docs(op: TransformOperation) -> TransformOperation {
    op.summary("Get health status")
        .description("Reports the service and broker connection state.")
        .response::<200, Json<HealthStatus>>()
        .response::<503, Json<HealthStatus>>()
}

/// Describes the service and its endpoints.
async fn service_info() -> Json<ServiceInfo> {
    Json(ServiceInfo::default())
}

fn service_info_docs(op: TransformOperation) -> TransformOperation {
    op.summary("Describe service")
        .description("Returns the service name, version and public endpoints.")
        .response::<200, Json<ServiceInfo>>()
}

/// Returns routes for service monitoring.
pub fn routes() -> ApiRouter<ServiceState> {
    use aide::axum::routing::*;

    ApiRouter::new()
        .api_route("/", get_with(service_info, service_info_docs))
        .api_route("/health", get_with(health_status, health_status_docs))
        .with_path_items(|item| item.tag("Monitors"))
}

#[cfg(test)]
mod tests {
    use gridfill_completion::MockProvider;

    use super::*;
    use crate::handler::test::{create_test_server_with_router, create_test_server_with_state};
    use crate::service::MemoryBackend;

    #[tokio::test]
    async fn health_reports_healthy() -> anyhow::Result<()> {
        let server = create_test_server_with_router(|_| routes()).await?;

        let response = server.get("/health").await;
        response.assert_status_ok();

        let body = response.json::<serde_json::Value>();
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["service"], "gridfill");
        assert_eq!(body["broker"]["connected"], true);
        assert_eq!(body["broker"]["latencyMs"], 0);
        Ok(())
    }

    #[tokio::test]
    async fn health_reports_disconnected_broker() -> anyhow::Result<()> {
        let backend = MemoryBackend::new().disconnected();
        let state = ServiceState::new(backend.storage(), MockProvider::default().into_service());
        let server = create_test_server_with_state(routes(), state).await?;

        let response = server.get("/health").await;
        response.assert_status(StatusCode::SERVICE_UNAVAILABLE);

        let status = response.json::<HealthStatus>();
        assert_eq!(status.status, HealthState::Unhealthy);
        assert!(!status.broker.connected);
        assert_eq!(status.broker.latency_ms, None);
        Ok(())
    }

    #[tokio::test]
    async fn root_lists_endpoints() -> anyhow::Result<()> {
        let server = create_test_server_with_router(|_| routes()).await?;

        let info = server.get("/").await.json::<ServiceInfo>();
        assert_eq!(info.service, "gridfill");
        assert!(info.endpoints.iter().any(|e| e.path == "/batches"));
        Ok(())
    }
}
