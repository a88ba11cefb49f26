use time::OffsetDateTime;

/// One point of the generation curve.
///
/// `ts` carries the offset of the zone it is displayed in. A `None` value is a
/// slot the provider reported without a reading.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct GenerationSample {
    #[serde(with = "time::serde::rfc3339")]
    pub ts: OffsetDateTime,
    pub generation_mw: Option<f64>,
}
