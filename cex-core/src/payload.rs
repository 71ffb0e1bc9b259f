use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Raw result of a timeseries query for one dataset: values keyed by
/// ISO timestamp. `id` joins back to [`crate::meta::DatasetMeta`] via
/// `unique_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeseriesResult {
    pub id: String,
    pub units: String,
    pub data: BTreeMap<String, f64>,
}

/// One run's values within a long-term-average query result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunData {
    pub data: BTreeMap<String, f64>,
    pub units: String,
}

/// Long-term-average query result: values keyed by run name.
pub type DataResult = BTreeMap<String, RunData>;

/// The query parameters used to fetch one [`DataResult`], kept alongside
/// the result so multi-query charts can label their series by what
/// differed between the queries.
pub type QueryContext = BTreeMap<String, String>;
