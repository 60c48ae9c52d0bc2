//! Orchestration: pull raw records from each source, normalize them, and
//! hand them to the deduplicator.

use std::collections::HashMap;

use tracing::{error, info};

use crate::dedup::store::AssetStore;
use crate::dedup::Deduplicator;
use crate::domain::SourceTag;
use crate::normalize::normalize_host;
use crate::source_client::SourceClient;

/// Runs every configured source to completion against one deduplicator,
/// logging and moving to the next source on an unhandled error.
pub struct PipelineDriver<S: AssetStore> {
    deduplicator: Deduplicator<S>,
}

impl<S: AssetStore> PipelineDriver<S> {
    #[must_use]
    pub fn new(deduplicator: Deduplicator<S>) -> Self {
        Self { deduplicator }
    }

    /// Drives `sources` to exhaustion and returns the number of records
    /// successfully normalized and handed to the deduplicator, per source.
    pub async fn run(
        &self,
        mut sources: Vec<(SourceTag, Box<dyn SourceClient>)>,
    ) -> HashMap<SourceTag, usize> {
        let mut counts = HashMap::new();

        for (tag, client) in &mut sources {
            let count = self.process_source(*tag, client.as_mut()).await;
            info!(source = %tag, count, "finished source");
            counts.insert(*tag, count);
        }

        counts
    }

    async fn process_source(&self, tag: SourceTag, client: &mut dyn SourceClient) -> usize {
        let mut count = 0;
        loop {
            let raw = match client.next_record().await {
                Ok(Some(raw)) => raw,
                Ok(None) => break,
                Err(err) => {
                    error!(source = %tag, error = %err, "source stream terminated with an error");
                    break;
                }
            };

            let Some(host) = normalize_host(&raw, tag) else {
                continue;
            };

            if let Err(err) = self.deduplicator.upsert_host(host).await {
                error!(source = %tag, error = %err, "store I/O failed for this record, continuing");
                continue;
            }
            count += 1;
        }
        count
    }
}
