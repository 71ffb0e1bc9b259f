use crate::time::Timescale;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// Errors raised when deriving series names from metadata.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MetaError {
    #[error("no datasets were given")]
    EmptyInput,
    #[error("datasets are indistinguishable by any metadata field")]
    Indistinguishable,
}

/// One dataset-variable record, flattened from the backend's nested
/// metadata response (one record per variable within each file).
///
/// `unique_id` is the stable join key against backend query results.
/// Records are immutable once produced; a new selection re-fetches the
/// whole list rather than patching it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetMeta {
    pub unique_id: String,
    pub model_id: String,
    pub experiment: String,
    pub variable_id: String,
    pub variable_name: String,
    pub ensemble_member: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub timescale: Timescale,
    pub multi_year_mean: bool,
}

/// The run+period tuple identifying one dataset instance independent of
/// variable, so two variables (raster vs isoline, variable vs comparand)
/// can be paired to the same period.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DataSpec {
    pub ensemble_member: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl fmt::Display for DataSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}-{}",
            self.ensemble_member,
            self.start_date.format("%Y"),
            self.end_date.format("%Y")
        )
    }
}

/// The metadata fields a series name can be built from. `unique_id` is
/// deliberately not a member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetaField {
    VariableId,
    ModelId,
    Experiment,
    EnsembleMember,
    Timescale,
    StartDate,
    EndDate,
    MultiYearMean,
    VariableName,
}

/// Candidate ordering for name derivation: the most discriminating,
/// shortest labels first. `VariableName` comes last so it can be dropped
/// when `VariableId` already distinguishes the series.
const NAME_FIELDS: [MetaField; 9] = [
    MetaField::VariableId,
    MetaField::ModelId,
    MetaField::Experiment,
    MetaField::EnsembleMember,
    MetaField::Timescale,
    MetaField::StartDate,
    MetaField::EndDate,
    MetaField::MultiYearMean,
    MetaField::VariableName,
];

impl MetaField {
    /// The attribute key this field is matched by in filter constraints.
    pub fn key(&self) -> &'static str {
        match self {
            MetaField::VariableId => "variable_id",
            MetaField::ModelId => "model_id",
            MetaField::Experiment => "experiment",
            MetaField::EnsembleMember => "ensemble_member",
            MetaField::Timescale => "timescale",
            MetaField::StartDate => "start_date",
            MetaField::EndDate => "end_date",
            MetaField::MultiYearMean => "multi_year_mean",
            MetaField::VariableName => "variable_name",
        }
    }
}

impl DatasetMeta {
    /// Project out the run+period instance tuple.
    pub fn data_spec(&self) -> DataSpec {
        DataSpec {
            ensemble_member: self.ensemble_member.clone(),
            start_date: self.start_date,
            end_date: self.end_date,
        }
    }

    /// Display value for a name field.
    pub fn field_value(&self, field: MetaField) -> String {
        match field {
            MetaField::VariableId => self.variable_id.clone(),
            MetaField::ModelId => self.model_id.clone(),
            MetaField::Experiment => self.experiment.clone(),
            MetaField::EnsembleMember => self.ensemble_member.clone(),
            MetaField::Timescale => self.timescale.to_string(),
            MetaField::StartDate => self.start_date.format("%Y-%m-%d").to_string(),
            MetaField::EndDate => self.end_date.format("%Y-%m-%d").to_string(),
            MetaField::MultiYearMean => self.multi_year_mean.to_string(),
            MetaField::VariableName => self.variable_name.clone(),
        }
    }

    /// Attribute lookup by key, for filter-constraint matching. Unknown
    /// keys yield `None`, which never matches.
    pub fn attr(&self, key: &str) -> Option<Value> {
        match key {
            "unique_id" => Some(Value::String(self.unique_id.clone())),
            "model_id" => Some(Value::String(self.model_id.clone())),
            "experiment" => Some(Value::String(self.experiment.clone())),
            "variable_id" => Some(Value::String(self.variable_id.clone())),
            "variable_name" => Some(Value::String(self.variable_name.clone())),
            "ensemble_member" => Some(Value::String(self.ensemble_member.clone())),
            "start_date" => Some(Value::String(self.start_date.format("%Y-%m-%d").to_string())),
            "end_date" => Some(Value::String(self.end_date.format("%Y-%m-%d").to_string())),
            "timescale" => Some(Value::String(self.timescale.to_string())),
            "multi_year_mean" => Some(Value::Bool(self.multi_year_mean)),
            _ => None,
        }
    }
}

/// The minimal set of metadata fields whose values are not identical
/// across the given records.
///
/// `unique_id` is never considered, and `variable_name` is dropped when
/// `variable_id` already differs (the id is the shorter label for the
/// same distinction). Errors when given no records, or when no field at
/// all differs (the caller is trying to plot duplicate series).
pub fn differing_fields(records: &[&DatasetMeta]) -> Result<Vec<MetaField>, MetaError> {
    let first = records.first().ok_or(MetaError::EmptyInput)?;
    let mut differing: Vec<MetaField> = NAME_FIELDS
        .iter()
        .copied()
        .filter(|field| {
            records
                .iter()
                .any(|r| r.field_value(*field) != first.field_value(*field))
        })
        .collect();
    if differing.contains(&MetaField::VariableId) {
        differing.retain(|f| *f != MetaField::VariableName);
    }
    if differing.is_empty() {
        return Err(MetaError::Indistinguishable);
    }
    Ok(differing)
}

/// Join a record's values for the given fields into a display label.
pub fn label_for(record: &DatasetMeta, fields: &[MetaField]) -> String {
    fields
        .iter()
        .map(|f| record.field_value(*f))
        .collect::<Vec<_>>()
        .join(" ")
}
