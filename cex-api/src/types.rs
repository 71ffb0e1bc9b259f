use crate::error::ApiError;
use cex_core::meta::DatasetMeta;
use cex_core::time::{parse_timestamp, TimeKey, Timescale};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One file's entry in the nested `multimeta` response. The `variables`
/// sub-map carries one (id, long name) pair per variable stored in the
/// file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultimetaEntry {
    pub model_id: String,
    pub experiment: String,
    pub variables: BTreeMap<String, String>,
    pub ensemble_member: String,
    pub start_date: String,
    pub end_date: String,
    pub timescale: Timescale,
    pub multi_year_mean: bool,
}

/// The `multimeta` response: entries keyed by `unique_id`.
pub type MultimetaResponse = BTreeMap<String, MultimetaEntry>;

/// Flatten a nested multimeta response into one [`DatasetMeta`] record
/// per variable-within-file, sorted by `unique_id` then `variable_id`.
pub fn flatten_multimeta(response: &MultimetaResponse) -> Result<Vec<DatasetMeta>, ApiError> {
    let mut records = Vec::new();
    for (unique_id, entry) in response {
        let start_date = parse_timestamp(&entry.start_date)?;
        let end_date = parse_timestamp(&entry.end_date)?;
        for (variable_id, variable_name) in &entry.variables {
            records.push(DatasetMeta {
                unique_id: unique_id.clone(),
                model_id: entry.model_id.clone(),
                experiment: entry.experiment.clone(),
                variable_id: variable_id.clone(),
                variable_name: variable_name.clone(),
                ensemble_member: entry.ensemble_member.clone(),
                start_date,
                end_date,
                timescale: entry.timescale,
                multi_year_mean: entry.multi_year_mean,
            });
        }
    }
    records.sort_by(|a, b| {
        a.unique_id
            .cmp(&b.unique_id)
            .then_with(|| a.variable_id.cmp(&b.variable_id))
    });
    Ok(records)
}

/// One file's entry in the `metadata` response: available timestamps
/// keyed by time-index string, plus the file's timescale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileMetadata {
    pub times: BTreeMap<String, String>,
    pub timescale: Timescale,
}

/// The `metadata` response: per-file time metadata keyed by `unique_id`.
pub type MetadataResponse = BTreeMap<String, FileMetadata>;

impl FileMetadata {
    /// The file's available times as typed keys. Indices that are not
    /// non-negative integers, or that are out of range for the file's
    /// timescale, make the whole response malformed.
    pub fn available_times(&self) -> Result<BTreeMap<TimeKey, String>, ApiError> {
        self.times
            .iter()
            .map(|(index, timestamp)| {
                let idx: u32 = index
                    .parse()
                    .map_err(|_| ApiError::Malformed(format!("bad time index: {}", index)))?;
                let key = TimeKey::new(self.timescale, idx)?;
                Ok((key, timestamp.clone()))
            })
            .collect()
    }
}

/// Per-file summary statistics from the `multistats` endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryStats {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub median: f64,
    pub stdev: f64,
    pub ncells: u64,
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub units: Option<String>,
}

/// The `multistats` response, keyed by `unique_id`.
pub type MultistatsResponse = BTreeMap<String, SummaryStats>;

/// Query parameters for the `multimeta` endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MultimetaQuery {
    pub ensemble_name: String,
    pub model: Option<String>,
}

/// Query parameters shared by the `data` and `multistats` endpoints.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DataQuery {
    pub ensemble_name: String,
    pub model: String,
    pub variable: String,
    pub emission: String,
    pub timescale: String,
    pub time: u32,
    /// WKT polygon, or empty for the whole spatial extent.
    pub area: String,
}

/// Query parameters for the `timeseries` endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TimeseriesQuery {
    /// The dataset's `unique_id`.
    pub id: String,
    /// WKT polygon, or empty for the whole spatial extent.
    pub area: String,
}

impl MultimetaQuery {
    pub fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![("ensemble_name", self.ensemble_name.clone())];
        if let Some(model) = &self.model {
            params.push(("model", model.clone()));
        }
        params
    }
}

impl DataQuery {
    pub fn params(&self) -> Vec<(&'static str, String)> {
        vec![
            ("ensemble_name", self.ensemble_name.clone()),
            ("model", self.model.clone()),
            ("variable", self.variable.clone()),
            ("emission", self.emission.clone()),
            ("timescale", self.timescale.clone()),
            ("time", self.time.to_string()),
            ("area", self.area.clone()),
        ]
    }

    /// The context object stored alongside this query's result, used to
    /// label series when several queries feed one graph.
    pub fn context(&self) -> cex_core::payload::QueryContext {
        self.params()
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect()
    }
}

impl TimeseriesQuery {
    pub fn params(&self) -> Vec<(&'static str, String)> {
        vec![("id_", self.id.clone()), ("area", self.area.clone())]
    }
}
