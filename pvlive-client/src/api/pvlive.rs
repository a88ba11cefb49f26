use std::time::Duration;

use serde::{Deserialize, Serialize};
use time::{macros::format_description, OffsetDateTime, UtcOffset};

use crate::domain::GenerationTable;

pub const DEFAULT_BASE_URL: &str = "https://api.pvlive.uk/pvlive/api/v4";

/// Aggregation level the figures are reported for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    /// Public Electricity Supply region; id 0 is the national total.
    #[default]
    Pes,
    /// Grid Supply Point.
    Gsp,
}

impl EntityType {
    fn as_path(self) -> &'static str {
        match self {
            Self::Pes => "pes",
            Self::Gsp => "gsp",
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum PvLiveError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected status {status} from {url}")]
    Status {
        status: reqwest::StatusCode,
        url: String,
    },
    #[error("failed to decode response: {0}")]
    Decode(String),
    #[error("invalid query: {0}")]
    Query(String),
}

#[derive(Debug, Clone)]
pub struct PvLiveConfig {
    pub base_url: String,
    pub entity_type: EntityType,
    pub entity_id: u32,
    pub ssl_verify: bool,
    /// `None` leaves the HTTP client's own behaviour in place.
    pub timeout: Option<Duration>,
}

impl Default for PvLiveConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            entity_type: EntityType::Pes,
            entity_id: 0,
            ssl_verify: true,
            timeout: None,
        }
    }
}

/// Thin client for the PV_Live generation API.
#[derive(Debug, Clone)]
pub struct PvLive {
    http: reqwest::Client,
    cfg: PvLiveConfig,
}

impl PvLive {
    pub fn new(cfg: PvLiveConfig) -> Result<Self, PvLiveError> {
        let mut builder = reqwest::Client::builder().danger_accept_invalid_certs(!cfg.ssl_verify);
        if let Some(timeout) = cfg.timeout {
            builder = builder.timeout(timeout);
        }

        if !cfg.ssl_verify {
            tracing::warn!(base_url = %cfg.base_url, "TLS certificate verification disabled for PV_Live");
        }

        Ok(Self {
            http: builder.build()?,
            cfg,
        })
    }

    pub fn endpoint(&self) -> String {
        format!(
            "{}/{}/{}",
            self.cfg.base_url.trim_end_matches('/'),
            self.cfg.entity_type.as_path(),
            self.cfg.entity_id
        )
    }

    /// Fetch readings in `[start, end]` sampled every `period_minutes`.
    pub async fn between(
        &self,
        start: OffsetDateTime,
        end: OffsetDateTime,
        period_minutes: u32,
    ) -> Result<GenerationTable, PvLiveError> {
        let params = query_params(start, end, period_minutes)?;
        let url = self.endpoint();

        tracing::debug!(%url, ?params, "requesting PV_Live window");

        let resp = self.http.get(&url).query(&params).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(PvLiveError::Status { status, url });
        }

        let body = resp.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| PvLiveError::Decode(e.to_string()))
    }
}

/// Query string for a window request.
///
/// Instants are sent in UTC with a `Z` suffix, the form the API documents.
pub fn query_params(
    start: OffsetDateTime,
    end: OffsetDateTime,
    period_minutes: u32,
) -> Result<Vec<(&'static str, String)>, PvLiveError> {
    if end <= start {
        return Err(PvLiveError::Query(format!("end {end} is not after start {start}")));
    }
    if period_minutes == 0 {
        return Err(PvLiveError::Query("period must be at least one minute".to_string()));
    }

    Ok(vec![
        ("start", format_instant(start)?),
        ("end", format_instant(end)?),
        ("period", period_minutes.to_string()),
    ])
}

fn format_instant(ts: OffsetDateTime) -> Result<String, PvLiveError> {
    let fmt = format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]Z");
    ts.to_offset(UtcOffset::UTC)
        .format(&fmt)
        .map_err(|e| PvLiveError::Query(format!("cannot format {ts}: {e}")))
}
