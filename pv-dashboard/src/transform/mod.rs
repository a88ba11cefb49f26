use std::fmt;

use pvlive_client::{GenerationSample, GenerationTable, PvLiveError};
use serde_json::Value;
use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use time_tz::{timezones, OffsetDateTimeExt, TimeZone, Tz};

pub const TIME_COLUMN: &str = "datetime_gmt";
pub const VALUE_COLUMN: &str = "generation_mw";

/// Shown on the dashboard whenever a cycle yields nothing to draw.
pub const NO_DATA_MESSAGE: &str = "No generation data available. Please check the data source or time range.";

/// Anything that leaves a refresh cycle without a series to draw.
///
/// All variants are presented the same way on the dashboard.
#[derive(thiserror::Error, Debug)]
pub enum RefreshError {
    #[error("provider returned no rows")]
    Empty,
    #[error("provider table is missing column '{0}'")]
    MissingColumn(&'static str),
    #[error("row {row}: {reason}")]
    BadRow { row: usize, reason: String },
    #[error("provider request failed: {0}")]
    Provider(#[from] PvLiveError),
}

/// Named IANA zone the chart is drawn in.
#[derive(Clone, Copy)]
pub struct DisplayZone {
    name: &'static str,
    tz: &'static Tz,
}

impl DisplayZone {
    pub fn by_name(name: &str) -> Option<Self> {
        let tz = timezones::get_by_name(name)?;
        Some(Self { name: tz.name(), tz })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn convert(&self, ts: OffsetDateTime) -> OffsetDateTime {
        ts.to_timezone(self.tz)
    }
}

impl fmt::Debug for DisplayZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("DisplayZone").field(&self.name).finish()
    }
}

/// Project provider rows to `{time in zone, generation_mw}`, keeping row order.
pub fn reshape(table: &GenerationTable, zone: &DisplayZone) -> Result<Vec<GenerationSample>, RefreshError> {
    let value_idx = table
        .column(VALUE_COLUMN)
        .ok_or(RefreshError::MissingColumn(VALUE_COLUMN))?;
    let time_idx = table
        .column(TIME_COLUMN)
        .ok_or(RefreshError::MissingColumn(TIME_COLUMN))?;

    if table.is_empty() {
        return Err(RefreshError::Empty);
    }

    table
        .data
        .iter()
        .enumerate()
        .map(|(row, cells)| {
            let ts = parse_ts(cells.get(time_idx)).map_err(|reason| RefreshError::BadRow { row, reason })?;
            let generation_mw =
                parse_mw(cells.get(value_idx)).map_err(|reason| RefreshError::BadRow { row, reason })?;

            Ok(GenerationSample {
                ts: zone.convert(ts),
                generation_mw,
            })
        })
        .collect()
}

fn parse_ts(cell: Option<&Value>) -> Result<OffsetDateTime, String> {
    match cell {
        Some(Value::String(s)) => {
            OffsetDateTime::parse(s, &Rfc3339).map_err(|e| format!("invalid {TIME_COLUMN} '{s}': {e}"))
        }
        Some(other) => Err(format!("{TIME_COLUMN} is not a string: {other}")),
        None => Err(format!("{TIME_COLUMN} cell missing")),
    }
}

fn parse_mw(cell: Option<&Value>) -> Result<Option<f64>, String> {
    match cell {
        Some(Value::Null) | None => Ok(None),
        Some(Value::Number(n)) => n
            .as_f64()
            .map(Some)
            .ok_or_else(|| format!("{VALUE_COLUMN} out of range: {n}")),
        Some(other) => Err(format!("{VALUE_COLUMN} is not numeric: {other}")),
    }
}
