use cex_core::precision::{format_with, DEFAULT_PRECISION};
use cex_core::time::TimeError;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Errors raised across the chart-spec pipeline. Generators and
/// transformers validate their inputs synchronously; a `ChartError`
/// means the input violated an invariant, never that rendering failed.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ChartError {
    #[error("too many axes: chart already displays two unit systems, cannot add {units}")]
    TooManyAxes { units: String },
    #[error(transparent)]
    Time(#[from] TimeError),
    #[error("no data series were given")]
    EmptyInput,
    #[error("duplicate series: inputs are indistinguishable by any metadata field")]
    DuplicateSeries,
    #[error("multiple data results require a parallel list of query contexts")]
    MissingContexts,
    #[error("identical query contexts cannot label distinct series")]
    DuplicateContexts,
    #[error("query contexts differ by area; geometry cannot be rendered as a series label")]
    AreaContextDiffers,
    #[error("no dataset metadata found for id {0}")]
    UnknownDataset(String),
    #[error("too many categories: classifier produced more than {max} groups")]
    TooManyCategories { max: usize },
    #[error("no such axis: {0}")]
    NoSuchAxis(&'static str),
    #[error("axis padding applies to the top or bottom of a vertical axis, not {0}")]
    NotVerticalSide(String),
    #[error("padding fraction must be positive, got {0}")]
    NonPositivePadding(f64),
    #[error("series {other} has {other_len} points but reference {base} has {base_len}")]
    SeriesLengthMismatch {
        base: String,
        other: String,
        base_len: usize,
        other_len: usize,
    },
    #[error("no series pair found for variable {0}")]
    NoMatchingSeries(String),
    #[error("no series named {0}")]
    NoSuchSeries(String),
    #[error("series {0} has no axis assignment")]
    UnassignedSeries(String),
    #[error("series color {0} is not a #rrggbb color")]
    BadColor(String),
}

/// Which vertical axis a series is plotted against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AxisId {
    Y,
    Y2,
}

impl AxisId {
    pub fn as_str(&self) -> &'static str {
        match self {
            AxisId::Y => "y",
            AxisId::Y2 => "y2",
        }
    }
}

impl fmt::Display for AxisId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One named data series. Values are positional against the chart's
/// shared x axis; `None` marks a missing point.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub name: String,
    pub values: Vec<Option<f64>>,
}

impl Series {
    pub fn new(name: impl Into<String>, values: Vec<Option<f64>>) -> Self {
        Series { name: name.into(), values }
    }
}

/// Line styles understood by the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesStyle {
    Line,
    Step,
}

impl SeriesStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            SeriesStyle::Line => "line",
            SeriesStyle::Step => "step",
        }
    }
}

/// Tick rendering for one axis: fixed decimal precision, optionally
/// blanking ticks outside a visible range.
#[derive(Debug, Clone, PartialEq)]
pub struct TickFormat {
    pub precision: usize,
    pub visible_range: Option<(f64, f64)>,
}

impl Default for TickFormat {
    fn default() -> Self {
        TickFormat { precision: DEFAULT_PRECISION, visible_range: None }
    }
}

impl TickFormat {
    /// Render a tick value; values outside the visible range render as
    /// the empty string.
    pub fn format(&self, value: f64) -> String {
        if let Some((lo, hi)) = self.visible_range {
            if value < lo || value > hi {
                return String::new();
            }
        }
        format_with(value, self.precision)
    }
}

/// One vertical axis: label text, display units, tick formatting, and
/// optional display bounds.
#[derive(Debug, Clone, PartialEq)]
pub struct Axis {
    pub label: String,
    pub units: String,
    pub tick: TickFormat,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl Axis {
    pub fn for_units(units: impl Into<String>) -> Self {
        let units = units.into();
        Axis {
            label: units.clone(),
            units,
            tick: TickFormat::default(),
            min: None,
            max: None,
        }
    }
}

/// Tooltip formatting state. When `anomaly_base` is set, values of every
/// series other than the base render as `absolute (anomaly) units`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Tooltip {
    pub disabled: bool,
    pub precision_by_series: BTreeMap<String, usize>,
    pub anomaly_base: Option<Series>,
}

/// The shared x axis of a chart.
#[derive(Debug, Clone, PartialEq)]
pub enum XAxis {
    /// Categorical x values (the 12 representative-year months).
    Categories(Vec<String>),
    /// Temporal x values, serialized as the reserved `x` column of ISO
    /// timestamps.
    Timestamps(Vec<String>),
    /// Numeric x values (scatter emulation).
    Values(Vec<f64>),
}

impl XAxis {
    pub fn len(&self) -> usize {
        match self {
            XAxis::Categories(v) => v.len(),
            XAxis::Timestamps(v) => v.len(),
            XAxis::Values(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The renderer-agnostic chart description handed to the charting
/// component. Immutable: every pipeline stage returns a new value.
///
/// Invariants, enforced by the generators: at most two distinct unit
/// systems (one per vertical axis), and every series carries an entry in
/// `axes`.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSpec {
    pub x: XAxis,
    pub x_label: Option<String>,
    pub x_tick: Option<TickFormat>,
    pub columns: Vec<Series>,
    pub axes: BTreeMap<String, AxisId>,
    pub y: Axis,
    pub y2: Option<Axis>,
    pub colors: BTreeMap<String, String>,
    pub types: BTreeMap<String, SeriesStyle>,
    pub legend_hidden: Vec<String>,
    pub legend_disabled: bool,
    pub tooltip: Tooltip,
    pub connect_nulls: bool,
    pub subchart: bool,
}

impl ChartSpec {
    pub fn new(x: XAxis, y: Axis) -> Self {
        ChartSpec {
            x,
            x_label: None,
            x_tick: None,
            columns: Vec::new(),
            axes: BTreeMap::new(),
            y,
            y2: None,
            colors: BTreeMap::new(),
            types: BTreeMap::new(),
            legend_hidden: Vec::new(),
            legend_disabled: false,
            tooltip: Tooltip::default(),
            connect_nulls: false,
            subchart: false,
        }
    }

    /// Look up a series by name.
    pub fn series(&self, name: &str) -> Option<&Series> {
        self.columns.iter().find(|s| s.name == name)
    }

    /// The axis a series is assigned to.
    pub fn axis_for_series(&self, name: &str) -> Result<AxisId, ChartError> {
        self.axes
            .get(name)
            .copied()
            .ok_or_else(|| ChartError::UnassignedSeries(name.to_string()))
    }

    /// The axis definition for an id, when that axis exists.
    pub fn axis(&self, id: AxisId) -> Option<&Axis> {
        match id {
            AxisId::Y => Some(&self.y),
            AxisId::Y2 => self.y2.as_ref(),
        }
    }

    /// Displayed extent of an axis: the min/max over all data assigned
    /// to it, overridden by any explicit axis bounds. `None` when the
    /// axis has no finite data and no bounds.
    pub fn extent(&self, id: AxisId) -> Option<(f64, f64)> {
        let mut lo = f64::INFINITY;
        let mut hi = f64::NEG_INFINITY;
        for series in &self.columns {
            if self.axes.get(&series.name) != Some(&id) {
                continue;
            }
            for v in series.values.iter().flatten() {
                lo = lo.min(*v);
                hi = hi.max(*v);
            }
        }
        let axis = self.axis(id)?;
        if let Some(min) = axis.min {
            lo = min;
        }
        if let Some(max) = axis.max {
            hi = max;
        }
        (lo <= hi).then_some((lo, hi))
    }

    /// Render one tooltip value: rounded to the series' configured
    /// precision, suffixed with its axis's display units. Under an
    /// anomaly base, non-base series render `absolute (anomaly) units`.
    pub fn tooltip_value(&self, series: &str, index: usize, value: f64) -> String {
        let precision = self
            .tooltip
            .precision_by_series
            .get(series)
            .copied()
            .unwrap_or(DEFAULT_PRECISION);
        let units = self
            .axes
            .get(series)
            .and_then(|id| self.axis(*id))
            .map(|a| a.units.as_str())
            .unwrap_or("");
        if let Some(base) = &self.tooltip.anomaly_base {
            if base.name != series {
                if let Some(Some(reference)) = base.values.get(index) {
                    let absolute = value + reference;
                    return format!(
                        "{} ({}) {}",
                        format_with(absolute, precision),
                        format_with(value, precision),
                        units
                    )
                    .trim_end()
                    .to_string();
                }
            }
        }
        format!("{} {}", format_with(value, precision), units)
            .trim_end()
            .to_string()
    }

    /// Serialize into the JSON structure the charting component consumes:
    /// `data.columns` with the reserved `x` column first when the x axis
    /// is temporal, `data.axes`, axis definitions, and display flags.
    pub fn to_render_json(&self) -> Value {
        let mut columns: Vec<Value> = Vec::with_capacity(self.columns.len() + 1);
        match &self.x {
            XAxis::Timestamps(ts) => {
                let mut col: Vec<Value> = vec![json!("x")];
                col.extend(ts.iter().map(|t| json!(t)));
                columns.push(Value::Array(col));
            }
            XAxis::Values(xs) => {
                let mut col: Vec<Value> = vec![json!("x")];
                col.extend(xs.iter().map(|v| json!(v)));
                columns.push(Value::Array(col));
            }
            XAxis::Categories(_) => {}
        }
        for series in &self.columns {
            let mut col: Vec<Value> = vec![json!(series.name)];
            col.extend(series.values.iter().map(|v| match v {
                Some(v) => json!(v),
                None => Value::Null,
            }));
            columns.push(Value::Array(col));
        }

        let mut data = Map::new();
        data.insert("columns".to_string(), Value::Array(columns));
        data.insert(
            "axes".to_string(),
            Value::Object(
                self.axes
                    .iter()
                    .map(|(name, id)| (name.clone(), json!(id.as_str())))
                    .collect(),
            ),
        );
        if !matches!(self.x, XAxis::Categories(_)) {
            data.insert("x".to_string(), json!("x"));
        }
        if !self.colors.is_empty() {
            data.insert(
                "colors".to_string(),
                Value::Object(self.colors.iter().map(|(k, v)| (k.clone(), json!(v))).collect()),
            );
        }
        if !self.types.is_empty() {
            data.insert(
                "types".to_string(),
                Value::Object(
                    self.types
                        .iter()
                        .map(|(k, v)| (k.clone(), json!(v.as_str())))
                        .collect(),
                ),
            );
        }

        let mut x_axis = Map::new();
        match &self.x {
            XAxis::Categories(labels) => {
                x_axis.insert("type".to_string(), json!("category"));
                x_axis.insert("categories".to_string(), json!(labels));
            }
            XAxis::Timestamps(_) => {
                x_axis.insert("type".to_string(), json!("timeseries"));
            }
            XAxis::Values(_) => {
                x_axis.insert("type".to_string(), json!("indexed"));
            }
        }
        if let Some(label) = &self.x_label {
            x_axis.insert("label".to_string(), json!(label));
        }

        let axis_json = |axis: &Axis| {
            json!({
                "label": axis.label,
                "units": axis.units,
                "tick": {
                    "precision": axis.tick.precision,
                    "visibleRange": axis.tick.visible_range,
                },
                "min": axis.min,
                "max": axis.max,
            })
        };
        let mut axis = Map::new();
        axis.insert("x".to_string(), Value::Object(x_axis));
        axis.insert("y".to_string(), axis_json(&self.y));
        if let Some(y2) = &self.y2 {
            let mut y2_json = axis_json(y2);
            if let Some(obj) = y2_json.as_object_mut() {
                obj.insert("show".to_string(), json!(true));
            }
            axis.insert("y2".to_string(), y2_json);
        }

        let legend = if self.legend_disabled {
            json!({"show": false})
        } else {
            json!({"hide": self.legend_hidden})
        };

        json!({
            "data": Value::Object(data),
            "axis": Value::Object(axis),
            "legend": legend,
            "tooltip": {"show": !self.tooltip.disabled},
            "line": {"connectNull": self.connect_nulls},
            "subchart": {"show": self.subchart},
        })
    }
}

/// Tracks the "at most two unit systems" invariant while series are
/// added. The first unit system claims `y`; the second distinct one
/// claims `y2`; a third is an error.
#[derive(Debug, Default)]
pub(crate) struct AxisAllocator {
    y_units: Option<String>,
    y2_units: Option<String>,
}

impl AxisAllocator {
    pub(crate) fn assign(&mut self, units: &str) -> Result<AxisId, ChartError> {
        match (&self.y_units, &self.y2_units) {
            (None, _) => {
                self.y_units = Some(units.to_string());
                Ok(AxisId::Y)
            }
            (Some(y), _) if y == units => Ok(AxisId::Y),
            (Some(_), None) => {
                self.y2_units = Some(units.to_string());
                Ok(AxisId::Y2)
            }
            (Some(_), Some(y2)) if y2 == units => Ok(AxisId::Y2),
            _ => Err(ChartError::TooManyAxes { units: units.to_string() }),
        }
    }

    pub(crate) fn finish(self) -> (Axis, Option<Axis>) {
        let y = Axis::for_units(self.y_units.unwrap_or_default());
        let y2 = self.y2_units.map(Axis::for_units);
        (y, y2)
    }
}
