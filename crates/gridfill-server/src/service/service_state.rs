use gridfill_completion::CompletionService;
use gridfill_nats::NatsClient;

use crate::Result;
use crate::pipeline::JobProducer;
use crate::service::{BatchStorage, ServiceConfig};

/// Application state.
///
/// Used for the [`State`] extraction (dependency injection).
///
/// [`State`]: axum::extract::State
#[must_use = "state does nothing unless you use it"]
#[derive(Debug, Clone)]
pub struct ServiceState {
    // External services:
    pub storage: BatchStorage,
    pub completion: CompletionService,

    // Internal services:
    pub producer: JobProducer,
}

impl ServiceState {
    /// Creates state over already opened services.
    pub fn new(storage: BatchStorage, completion: CompletionService) -> Self {
        Self {
            producer: JobProducer::new(storage.clone()),
            storage,
            completion,
        }
    }

    /// Initializes application state from configuration.
    ///
    /// Opens the batch stores on the given connection and builds the
    /// configured completion backend.
    pub async fn from_config(config: &ServiceConfig, nats: &NatsClient) -> Result<Self> {
        let storage = config.open_storage(nats).await?;
        let completion = config.create_completion()?;
        Ok(Self::new(storage, completion))
    }
}

macro_rules! impl_di {
    ($($f:ident: $t:ty),+) => {$(
        impl axum::extract::FromRef<ServiceState> for $t {
            fn from_ref(state: &ServiceState) -> Self {
                state.$f.clone()
            }
        }
    )+};
}

// External services:
impl_di!(storage: BatchStorage);
impl_di!(completion: CompletionService);

// Internal services:
impl_di!(producer: JobProducer);
