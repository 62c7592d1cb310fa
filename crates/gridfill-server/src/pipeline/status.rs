//! Point-in-time view of a batch's recorded results.

use std::collections::BTreeMap;

use gridfill_nats::kv::BatchKey;

use crate::service::BatchStorage;
use crate::{Error, Result};

/// Tracing target for status queries.
const TRACING_TARGET: &str = "gridfill_server::pipeline::status";

/// Returns every recorded result of a batch keyed by `"{row}:{col}"`.
///
/// Each value is the JSON-encoded result record. Unknown batches, batches
/// still in flight and ids that can never name a batch all return an empty
/// map.
#[tracing::instrument(skip(storage), target = TRACING_TARGET)]
pub async fn collect_results(
    storage: &BatchStorage,
    batch_id: &str,
) -> Result<BTreeMap<String, String>> {
    let Ok(batch_id) = batch_id.parse::<BatchKey>() else {
        tracing::debug!(target: TRACING_TARGET, "Batch id cannot exist, no results");
        return Ok(BTreeMap::new());
    };

    let records = storage.batch_results(&batch_id).await?;

    let results = records
        .into_iter()
        .map(|(coordinate, record)| {
            serde_json::to_string(&record)
                .map(|json| (coordinate, json))
                .map_err(|e| Error::internal("status", "Failed to encode result").with_source(e))
        })
        .collect::<Result<BTreeMap<_, _>>>()?;

    tracing::debug!(
        target: TRACING_TARGET,
        batch_id = %batch_id,
        result_count = results.len(),
        "Collected batch results"
    );

    Ok(results)
}

#[cfg(test)]
mod tests {
    use gridfill_nats::kv::{ResultKey, ResultRecord};

    use super::*;
    use crate::service::MemoryBackend;

    #[tokio::test]
    async fn test_unknown_batch_is_empty() -> anyhow::Result<()> {
        let storage = MemoryBackend::new().storage();

        assert!(collect_results(&storage, "feedfacefeedface").await?.is_empty());
        assert!(collect_results(&storage, "not a valid id!").await?.is_empty());
        assert!(collect_results(&storage, "").await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_results_are_scoped_to_batch() -> anyhow::Result<()> {
        let storage = MemoryBackend::new().storage();
        let mine: BatchKey = "aaaaaaaaaaaaaaaa".parse()?;
        let other: BatchKey = "bbbbbbbbbbbbbbbb".parse()?;

        let record = ResultRecord::completed("France", "trace-1");
        storage
            .put_result(&ResultKey::new(mine.clone(), 0, 0), &record)
            .await?;
        storage
            .put_result(&ResultKey::new(other, 0, 1), &record)
            .await?;

        let results = collect_results(&storage, mine.as_str()).await?;
        assert_eq!(results.len(), 1);

        let decoded: ResultRecord = serde_json::from_str(&results["0:0"])?;
        assert_eq!(decoded, record);
        Ok(())
    }
}
