use serde_json::Value;

/// Tabular response of the PV_Live API.
///
/// The API answers with column names in `meta` and positional rows in `data`:
///
/// ```json
/// {"data": [[0, "2024-06-01T00:00:00Z", 0.0]], "meta": ["pes_id", "datetime_gmt", "generation_mw"]}
/// ```
#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize)]
pub struct GenerationTable {
    #[serde(default)]
    pub meta: Vec<String>,
    #[serde(default)]
    pub data: Vec<Vec<Value>>,
}

impl GenerationTable {
    /// Position of a named column, if the provider returned it.
    pub fn column(&self, name: &str) -> Option<usize> {
        self.meta.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
