use cex_core::time::TimeKey;
use std::collections::BTreeMap;

/// Map-rendering modes for a variable. Annotated isolines share the
/// raster layer's time control instead of carrying their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerKind {
    Raster,
    Isoline,
    Annotated,
}

/// Per-layer map state. Owned exclusively by one map controller; every
/// change goes through the `with_*` constructors, which return a new
/// state value.
///
/// Lifecycle: rebuilt from defaults when the user switches variable or
/// comparand; the time fields are repopulated when the backing dataset's
/// time metadata arrives; `range` is updated independently as tiles
/// report their min/max.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerState {
    pub kind: LayerKind,
    pub variable_id: String,
    /// Available times of the backing dataset, keyed by time index.
    pub times: BTreeMap<TimeKey, String>,
    /// The selected time index, when times are known.
    pub time_idx: Option<TimeKey>,
    /// The WMS timestamp matching `time_idx`.
    pub wms_time: Option<String>,
    pub palette: String,
    pub logscale: bool,
    /// Data min/max discovered from rendered tiles.
    pub range: Option<(f64, f64)>,
}

impl LayerState {
    /// Fresh layer state for a variable, with the palette default drawn
    /// from the variable's display configuration. The time fields stay
    /// empty until time metadata is fetched.
    pub fn for_variable(kind: LayerKind, variable_id: &str) -> Self {
        LayerState {
            kind,
            variable_id: variable_id.to_string(),
            times: BTreeMap::new(),
            time_idx: None,
            wms_time: None,
            palette: cex_config::palette_for(variable_id),
            logscale: false,
            range: None,
        }
    }

    /// Repopulate the time fields from freshly fetched time metadata.
    /// Selection defaults to the origin key (January / Winter / first
    /// year) when available, otherwise the lowest key present.
    pub fn with_times(&self, times: BTreeMap<TimeKey, String>) -> Self {
        let time_idx = times
            .keys()
            .find(|k| k.is_origin())
            .or_else(|| times.keys().next())
            .copied();
        let wms_time = time_idx.and_then(|k| times.get(&k).cloned());
        LayerState {
            times,
            time_idx,
            wms_time,
            ..self.clone()
        }
    }

    /// Select a different time index. Unknown keys leave the state
    /// unchanged rather than pointing the layer at a time it cannot
    /// render.
    pub fn with_time_index(&self, key: TimeKey) -> Self {
        match self.times.get(&key) {
            Some(timestamp) => LayerState {
                time_idx: Some(key),
                wms_time: Some(timestamp.clone()),
                ..self.clone()
            },
            None => {
                log::warn!(
                    "layer {}: ignoring unknown time index {}",
                    self.variable_id,
                    key.encode()
                );
                self.clone()
            }
        }
    }

    /// Record the data range discovered from map tiles.
    pub fn with_range(&self, min: f64, max: f64) -> Self {
        LayerState {
            range: Some((min, max)),
            ..self.clone()
        }
    }

    /// Whether the variable may be switched to a logarithmic palette.
    pub fn logscale_eligible(&self) -> bool {
        cex_config::logscale_eligible(&self.variable_id)
    }
}
