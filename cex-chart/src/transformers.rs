//! Higher-level chart reshapes built on top of generated specs.

use crate::spec::{Axis, AxisId, ChartError, ChartSpec, Series, TickFormat, XAxis};
use cex_core::precision::DEFAULT_PRECISION;

/// Prefix an axis label with a variable keyword unless the label already
/// mentions it.
fn labelled_with(keyword: &str, label: &str) -> String {
    if label.to_lowercase().contains(&keyword.to_lowercase()) {
        label.to_string()
    } else if label.is_empty() {
        keyword.to_string()
    } else {
        format!("{} {}", keyword, label)
    }
}

/// Build a variable-response scatter from a chart containing paired
/// series of two variables.
///
/// Each series whose name mentions `x_keyword` is matched to the series
/// whose name is identical except for `y_keyword` substituted in
/// (case-insensitive search, exact match on the substituted name).
/// Matched pairs contribute one (x, y) tuple per timestamp where both
/// series are non-null. Tuples are sorted ascending by x, and a
/// null-valued midpoint is interposed between consecutive points so the
/// line renderer draws isolated markers instead of connecting them.
pub fn variable_response_graph(
    x_keyword: &str,
    y_keyword: &str,
    spec: &ChartSpec,
) -> Result<ChartSpec, ChartError> {
    let x_lower = x_keyword.to_lowercase();
    let mut tuples: Vec<(f64, f64)> = Vec::new();
    let mut x_source: Option<AxisId> = None;
    let mut y_source: Option<AxisId> = None;
    let mut found_pair = false;

    for x_series in &spec.columns {
        let name_lower = x_series.name.to_lowercase();
        let Some(pos) = name_lower.find(&x_lower) else {
            continue;
        };
        let end = pos + x_lower.len();
        if end > x_series.name.len()
            || !x_series.name.is_char_boundary(pos)
            || !x_series.name.is_char_boundary(end)
        {
            continue;
        }
        let candidate = format!(
            "{}{}{}",
            &x_series.name[..pos],
            y_keyword,
            &x_series.name[end..]
        );
        let Some(y_series) = spec.series(&candidate) else {
            continue;
        };
        found_pair = true;
        x_source = spec.axes.get(&x_series.name).copied();
        y_source = spec.axes.get(&y_series.name).copied();
        for (xv, yv) in x_series.values.iter().zip(&y_series.values) {
            if let (Some(x), Some(y)) = (xv, yv) {
                tuples.push((*x, *y));
            }
        }
    }
    if !found_pair {
        // A single-variable chart has nothing to respond to
        return Err(ChartError::NoMatchingSeries(y_keyword.to_string()));
    }
    tuples.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut xs: Vec<f64> = Vec::with_capacity(tuples.len().saturating_mul(2));
    let mut ys: Vec<Option<f64>> = Vec::with_capacity(xs.capacity());
    for (i, (x, y)) in tuples.iter().enumerate() {
        if i > 0 {
            xs.push((tuples[i - 1].0 + x) / 2.0);
            ys.push(None);
        }
        xs.push(*x);
        ys.push(Some(*y));
    }

    let x_axis = x_source.and_then(|id| spec.axis(id));
    let y_axis = y_source.and_then(|id| spec.axis(id));
    let fixed = TickFormat { precision: DEFAULT_PRECISION, visible_range: None };

    let mut out = ChartSpec::new(
        XAxis::Values(xs),
        Axis {
            label: labelled_with(y_keyword, y_axis.map(|a| a.label.as_str()).unwrap_or("")),
            units: y_axis.map(|a| a.units.clone()).unwrap_or_default(),
            tick: fixed.clone(),
            min: None,
            max: None,
        },
    );
    out.x_label = Some(labelled_with(
        x_keyword,
        x_axis.map(|a| a.label.as_str()).unwrap_or(""),
    ));
    out.x_tick = Some(fixed);
    let name = format!("{} vs {}", y_keyword, x_keyword);
    out.axes.insert(name.clone(), AxisId::Y);
    out.columns.push(Series::new(name, ys));
    out.tooltip.disabled = true;
    out.legend_disabled = true;
    Ok(out)
}

/// Re-express every series as its pointwise difference from a reference
/// series.
///
/// The reference stays as-is; all other series must have the same
/// length. The result carries a second y axis scaled to
/// percent-of-reference, and tooltips render `absolute (anomaly)` by
/// adding the reference back per point.
pub fn anomaly_graph(base_name: &str, spec: &ChartSpec) -> Result<ChartSpec, ChartError> {
    let base = spec
        .series(base_name)
        .ok_or_else(|| ChartError::NoSuchSeries(base_name.to_string()))?
        .clone();
    if spec.y2.is_some() {
        return Err(ChartError::TooManyAxes { units: "%".to_string() });
    }

    let mut out = spec.clone();
    for series in &mut out.columns {
        if series.name == base_name {
            continue;
        }
        if series.values.len() != base.values.len() {
            return Err(ChartError::SeriesLengthMismatch {
                base: base_name.to_string(),
                other: series.name.clone(),
                base_len: base.values.len(),
                other_len: series.values.len(),
            });
        }
        series.values = series
            .values
            .iter()
            .zip(&base.values)
            .map(|(v, b)| match (v, b) {
                (Some(v), Some(b)) => Some(v - b),
                _ => None,
            })
            .collect();
    }

    let mut y2 = Axis::for_units("%");
    y2.label = format!("% of {}", base_name);
    y2.tick = TickFormat { precision: 1, visible_range: None };
    let reference: Vec<f64> = base.values.iter().flatten().copied().collect();
    if !reference.is_empty() {
        let mean = reference.iter().sum::<f64>() / reference.len() as f64;
        if mean != 0.0 {
            let mut lo = f64::INFINITY;
            let mut hi = f64::NEG_INFINITY;
            for series in out.columns.iter().filter(|s| s.name != base_name) {
                for v in series.values.iter().flatten() {
                    lo = lo.min(*v);
                    hi = hi.max(*v);
                }
            }
            if lo <= hi {
                y2.min = Some(lo / mean * 100.0);
                y2.max = Some(hi / mean * 100.0);
            }
        }
    }
    out.y2 = Some(y2);
    out.tooltip.anomaly_base = Some(base);
    Ok(out)
}
