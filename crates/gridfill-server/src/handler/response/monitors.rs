//! Monitor response types.

use jiff::Timestamp;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Name reported by the monitoring endpoints.
pub const SERVICE_NAME: &str = "gridfill";

/// Overall health of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum HealthState {
    /// The broker is reachable.
    Healthy,
    /// The broker is unreachable; submissions and polls will fail.
    Unhealthy,
}

/// Broker connection state.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BrokerStatus {
    /// Storage backend name.
    pub backend: String,
    /// Whether the backend answered a ping.
    pub connected: bool,
    /// Round-trip time of the ping, when it succeeded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
}

/// Health check response.
#[must_use]
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct HealthStatus {
    /// Overall health.
    pub status: HealthState,
    /// Service name.
    pub service: String,
    /// Broker connection state.
    pub broker: BrokerStatus,
    /// Completion provider in use.
    pub completion: String,
    /// Timestamp when this status was generated.
    pub checked_at: Timestamp,
}

/// One documented endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct EndpointInfo {
    /// HTTP method.
    pub method: String,
    /// Route path.
    pub path: String,
}

impl EndpointInfo {
    fn new(method: &str, path: &str) -> Self {
        Self {
            method: method.to_owned(),
            path: path.to_owned(),
        }
    }
}

/// Service description returned at the root path.
#[must_use]
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ServiceInfo {
    /// Service name.
    pub service: String,
    /// Application version.
    pub version: String,
    /// Public endpoints.
    pub endpoints: Vec<EndpointInfo>,
}

impl Default for ServiceInfo {
    fn default() -> Self {
        Self {
            service: SERVICE_NAME.to_owned(),
            version: env!("CARGO_PKG_VERSION").to_owned(),
            endpoints: vec![
                EndpointInfo::new("POST", "/batches"),
                EndpointInfo::new("GET", "/batches/{batchId}"),
                EndpointInfo::new("GET", "/batches/{batchId}/status"),
                EndpointInfo::new("POST", "/autofill-batches"),
                EndpointInfo::new("GET", "/autofill-batches/{batchId}"),
                EndpointInfo::new("GET", "/autofill-batches/{batchId}/status"),
                EndpointInfo::new("GET", "/health"),
            ],
        }
    }
}
