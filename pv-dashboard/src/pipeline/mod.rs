use std::sync::Arc;

use pvlive_client::{GenerationSample, GenerationTable, PvLiveError};
use serde::Serialize;
use time::{Duration as TimeDuration, OffsetDateTime, Time, UtcOffset};
use tokio::{sync::watch, time::Duration};

use crate::{
    cache::TtlCache,
    transform::{self, DisplayZone, RefreshError, NO_DATA_MESSAGE},
};

/// What the display surface currently shows.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Panel {
    /// Nothing fetched yet.
    Pending,
    Chart {
        series: Vec<GenerationSample>,
        #[serde(with = "time::serde::rfc3339")]
        last_updated: OffsetDateTime,
    },
    NoData {
        message: String,
        /// Time of the last successful refresh, if there was one.
        #[serde(with = "time::serde::rfc3339::option")]
        last_updated: Option<OffsetDateTime>,
    },
}

#[async_trait::async_trait]
pub trait Source: Send + Sync {
    async fn between(
        &self,
        start: OffsetDateTime,
        end: OffsetDateTime,
        period_minutes: u32,
    ) -> Result<GenerationTable, PvLiveError>;
}

#[async_trait::async_trait]
pub trait Sink: Send + Sync {
    async fn publish(&self, panel: Panel);
}

/// The reporting day containing `now`: UTC midnight to the next UTC midnight.
pub fn day_window(now: OffsetDateTime) -> (OffsetDateTime, OffsetDateTime) {
    let start = now.to_offset(UtcOffset::UTC).replace_time(Time::MIDNIGHT);
    (start, start + TimeDuration::DAY)
}

/// Fetch → reshape → publish, forever, sleeping for the refresh interval in between.
pub struct RefreshLoop<S, K> {
    source: S,
    sink: K,
    zone: DisplayZone,
    period_minutes: u32,
    interval: watch::Receiver<Duration>,
    cache: TtlCache<Arc<GenerationTable>>,
    last_updated: Option<OffsetDateTime>,
}

impl<S, K> RefreshLoop<S, K>
where
    S: Source,
    K: Sink,
{
    pub fn new(
        source: S,
        sink: K,
        zone: DisplayZone,
        period_minutes: u32,
        interval: watch::Receiver<Duration>,
    ) -> Self {
        let ttl = *interval.borrow();
        Self {
            source,
            sink,
            zone,
            period_minutes,
            interval,
            cache: TtlCache::new(ttl),
            last_updated: None,
        }
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }

    async fn fetch_window(&mut self, now: OffsetDateTime) -> Result<Arc<GenerationTable>, PvLiveError> {
        let (start, end) = day_window(now);
        let source = &self.source;
        let period = self.period_minutes;

        self.cache
            .get_or_fetch(|| async move { source.between(start, end, period).await.map(Arc::new) })
            .await
    }

    /// One refresh: always ends with a panel published to the sink.
    pub async fn run_cycle(&mut self, now: OffsetDateTime) -> Panel {
        let ttl = *self.interval.borrow_and_update();
        self.cache.set_ttl(ttl);

        let outcome = match self.fetch_window(now).await {
            Ok(table) => transform::reshape(&table, &self.zone),
            Err(e) => Err(RefreshError::from(e)),
        };

        let panel = match outcome {
            Ok(series) => {
                let last_updated = self.zone.convert(now);
                self.last_updated = Some(last_updated);
                tracing::info!(samples = series.len(), "generation chart refreshed");
                Panel::Chart { series, last_updated }
            }
            Err(e) => {
                metrics::counter!("dashboard_no_data_total").increment(1);
                tracing::warn!(error = %e, "no usable generation data this cycle");
                Panel::NoData {
                    message: NO_DATA_MESSAGE.to_string(),
                    last_updated: self.last_updated,
                }
            }
        };

        self.sink.publish(panel.clone()).await;
        panel
    }

    /// Sleep out the current interval; a new interval from the dashboard ends the wait early.
    async fn wait(&mut self) {
        let interval = *self.interval.borrow();
        let sleep = tokio::time::sleep(interval);
        tokio::pin!(sleep);

        tokio::select! {
            _ = &mut sleep => {}
            changed = self.interval.changed() => match changed {
                Ok(()) => {
                    tracing::info!(interval_secs = self.interval.borrow().as_secs(), "refresh interval changed");
                }
                // Nobody can change the interval any more.
                Err(_) => sleep.await,
            },
        }
    }

    pub async fn run(mut self) {
        tracing::info!(
            interval_secs = self.interval.borrow().as_secs(),
            zone = self.zone.name(),
            "refresh loop started"
        );

        loop {
            self.run_cycle(OffsetDateTime::now_utc()).await;
            self.wait().await;
        }
    }
}
