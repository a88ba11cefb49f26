use pvlive_client::{GenerationTable, PvLive, PvLiveError};
use time::OffsetDateTime;

use crate::pipeline::Source;

/// Live PV_Live API as a pipeline source.
#[derive(Debug, Clone)]
pub struct PvLiveSource {
    api: PvLive,
}

impl PvLiveSource {
    pub fn new(api: PvLive) -> Self {
        Self { api }
    }
}

#[async_trait::async_trait]
impl Source for PvLiveSource {
    async fn between(
        &self,
        start: OffsetDateTime,
        end: OffsetDateTime,
        period_minutes: u32,
    ) -> Result<GenerationTable, PvLiveError> {
        metrics::counter!("pvlive_fetch_total").increment(1);

        match self.api.between(start, end, period_minutes).await {
            Ok(table) => {
                tracing::debug!(rows = table.len(), columns = ?table.meta, "PV_Live window fetched");
                Ok(table)
            }
            Err(e) => {
                metrics::counter!("pvlive_fetch_errors_total").increment(1);
                Err(e)
            }
        }
    }
}
