use cex_core::meta::DatasetMeta;
use serde_json::Value;
use std::collections::BTreeMap;

/// The attribute map of a settled selector choice: the metadata
/// attributes the choice stands for (`model_id`, `experiment`,
/// `variable_id`, ...), with the same value shapes the dataset records
/// carry.
pub type Representative = BTreeMap<String, Value>;

/// The state of a cascading selector chain. A selector is either unset
/// or settled on a representative.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectorState {
    selections: BTreeMap<String, Representative>,
}

impl SelectorState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Settle a selector on a representative.
    pub fn settle(&mut self, selector: &str, representative: Representative) {
        self.selections.insert(selector.to_string(), representative);
    }

    /// Unset a selector (for example when its options were invalidated
    /// by an upstream change).
    pub fn clear(&mut self, selector: &str) {
        self.selections.remove(selector);
    }

    pub fn is_settled(&self, selector: &str) -> bool {
        self.selections.contains_key(selector)
    }

    /// An attribute of the named selector's representative, or `None`
    /// when the selector is unset or lacks the attribute.
    pub fn representative_value(&self, selector: &str, attr: &str) -> Option<&Value> {
        self.selections.get(selector)?.get(attr)
    }

    /// The union of the named selectors' representative attributes.
    /// Later selectors overwrite earlier ones on key collision.
    pub fn constraints_for(&self, selectors: &[&str]) -> Representative {
        let mut merged = Representative::new();
        for selector in selectors {
            if let Some(representative) = self.selections.get(*selector) {
                for (k, v) in representative {
                    merged.insert(k.clone(), v.clone());
                }
            }
        }
        merged
    }

    /// Filter a metadata list by the named selectors' merged constraints,
    /// but only once every named selector has settled. A chain with any
    /// unset member yields an empty list: a partially-chosen filter must
    /// not produce a plausible-looking graph of the wrong datasets.
    /// Results are sorted by `unique_id` for deterministic ordering.
    pub fn filter_meta<'a>(
        &self,
        selectors: &[&str],
        meta: &'a [DatasetMeta],
    ) -> Vec<&'a DatasetMeta> {
        if !selectors.iter().all(|s| self.is_settled(s)) {
            log::debug!("filter_meta: selector chain not settled, returning nothing");
            return Vec::new();
        }
        let constraints = self.constraints_for(selectors);
        let mut matched: Vec<&DatasetMeta> = meta
            .iter()
            .filter(|m| matches_constraints(m, &constraints))
            .collect();
        matched.sort_by(|a, b| a.unique_id.cmp(&b.unique_id));
        matched
    }
}

/// A record matches when every constraint key is present on the record
/// with an equal value. Unknown keys never match.
pub fn matches_constraints(meta: &DatasetMeta, constraints: &Representative) -> bool {
    constraints
        .iter()
        .all(|(key, expected)| meta.attr(key).as_ref() == Some(expected))
}

/// One entry of a selector's option list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorOption {
    pub value: String,
    pub disabled: bool,
}

impl SelectorOption {
    pub fn enabled(value: impl Into<String>) -> Self {
        SelectorOption { value: value.into(), disabled: false }
    }

    pub fn disabled(value: impl Into<String>) -> Self {
        SelectorOption { value: value.into(), disabled: true }
    }
}

/// Whether two variables' annual cycles may be overlaid as a shifted
/// comparison. Conflicts are configured per variable and apply in both
/// directions.
pub fn annual_cycle_shift_allowed(variable_id: &str, comparand_id: &str) -> bool {
    let conflicts = |a: &str, b: &str| cex_config::conflicts_for(a).iter().any(|c| c == b);
    !conflicts(variable_id, comparand_id) && !conflicts(comparand_id, variable_id)
}

/// Pick a valid replacement when a selector's current value may have
/// been invalidated by an upstream change.
///
/// Keeps a current value that is still present and enabled; otherwise
/// takes the configured default when present and enabled; otherwise the
/// first enabled option; otherwise nothing. Never lands on a disabled or
/// absent option, so downstream renders cannot loop on an invalid
/// selection.
pub fn repair_selection(
    current: Option<&str>,
    options: &[SelectorOption],
    default: Option<&str>,
) -> Option<String> {
    let valid = |value: &str| {
        options
            .iter()
            .any(|o| o.value == value && !o.disabled)
    };
    if let Some(current) = current {
        if valid(current) {
            return Some(current.to_string());
        }
    }
    if let Some(default) = default {
        if valid(default) {
            return Some(default.to_string());
        }
    }
    options
        .iter()
        .find(|o| !o.disabled)
        .map(|o| o.value.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cex_core::time::Timescale;
    use chrono::NaiveDate;
    use serde_json::json;

    fn meta_record(unique_id: &str, model: &str, experiment: &str, variable: &str) -> DatasetMeta {
        DatasetMeta {
            unique_id: unique_id.to_string(),
            model_id: model.to_string(),
            experiment: experiment.to_string(),
            variable_id: variable.to_string(),
            variable_name: variable.to_string(),
            ensemble_member: "r1i1p1".to_string(),
            start_date: NaiveDate::from_ymd_opt(1961, 1, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(1990, 12, 31).unwrap(),
            timescale: Timescale::Monthly,
            multi_year_mean: true,
        }
    }

    fn representative(pairs: &[(&str, &str)]) -> Representative {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), json!(v)))
            .collect()
    }

    #[test]
    fn test_representative_value() {
        let mut state = SelectorState::new();
        state.settle("model", representative(&[("model_id", "CanESM2")]));
        assert_eq!(
            state.representative_value("model", "model_id"),
            Some(&json!("CanESM2"))
        );
        assert_eq!(state.representative_value("model", "experiment"), None);
        assert_eq!(state.representative_value("scenario", "experiment"), None);
    }

    #[test]
    fn test_constraints_for_later_selectors_win() {
        let mut state = SelectorState::new();
        state.settle(
            "model",
            representative(&[("model_id", "CanESM2"), ("experiment", "stale")]),
        );
        state.settle("scenario", representative(&[("experiment", "rcp85")]));
        let constraints = state.constraints_for(&["model", "scenario"]);
        assert_eq!(constraints["model_id"], json!("CanESM2"));
        assert_eq!(constraints["experiment"], json!("rcp85"));
    }

    #[test]
    fn test_filter_meta_requires_every_selector_settled() {
        let meta = vec![
            meta_record("b", "CanESM2", "rcp85", "tasmax"),
            meta_record("a", "CanESM2", "rcp85", "tasmax"),
            meta_record("c", "CanESM2", "rcp85", "pr"),
        ];
        let mut state = SelectorState::new();
        state.settle("model", representative(&[("model_id", "CanESM2")]));
        state.settle("scenario", representative(&[("experiment", "rcp85")]));

        // variable is still unset: nothing matches, no matter how many
        // records the settled selectors alone would select
        assert!(state
            .filter_meta(&["model", "scenario", "variable"], &meta)
            .is_empty());

        state.settle("variable", representative(&[("variable_id", "tasmax")]));
        let filtered = state.filter_meta(&["model", "scenario", "variable"], &meta);
        let ids: Vec<&str> = filtered.iter().map(|m| m.unique_id.as_str()).collect();
        // Sorted by unique_id
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn test_filter_meta_unknown_constraint_key_matches_nothing() {
        let meta = vec![meta_record("a", "CanESM2", "rcp85", "tasmax")];
        let mut state = SelectorState::new();
        state.settle("model", representative(&[("no_such_attr", "x")]));
        assert!(state.filter_meta(&["model"], &meta).is_empty());
    }

    #[test]
    fn test_repair_selection_prefers_current_then_default() {
        let options = vec![
            SelectorOption::disabled("ACCESS1-0"),
            SelectorOption::enabled("CanESM2"),
            SelectorOption::enabled("CNRM-CM5"),
        ];
        // Valid current survives
        assert_eq!(
            repair_selection(Some("CNRM-CM5"), &options, Some("CanESM2")),
            Some("CNRM-CM5".to_string())
        );
        // Invalid current falls back to the configured default
        assert_eq!(
            repair_selection(Some("GFDL-ESM2G"), &options, Some("CanESM2")),
            Some("CanESM2".to_string())
        );
        // Disabled default falls through to the first enabled option
        assert_eq!(
            repair_selection(Some("GFDL-ESM2G"), &options, Some("ACCESS1-0")),
            Some("CanESM2".to_string())
        );
        // No valid option at all
        let all_disabled = vec![SelectorOption::disabled("ACCESS1-0")];
        assert_eq!(repair_selection(Some("x"), &all_disabled, None), None);
    }

    #[test]
    fn test_annual_cycle_shift_allowed_without_configured_conflicts() {
        // Nothing installs variable options in this test binary, so no
        // pair conflicts.
        assert!(annual_cycle_shift_allowed("tasmax", "pr"));
        assert!(annual_cycle_shift_allowed("pr", "pr"));
    }
}
