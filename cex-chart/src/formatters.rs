//! Pure chart-spec formatters.
//!
//! Each function consumes a spec plus a typed classifier and returns a
//! new spec; none consults state outside its arguments. Classifiers see
//! one [`Series`] at a time and map it to a group key, a rank, or a
//! visibility flag.

use crate::spec::{AxisId, ChartError, ChartSpec, Series};
use std::collections::BTreeMap;
use std::fmt;

/// The fixed categorical palette. Classifiers may produce at most this
/// many distinct groups.
pub const CATEGORICAL_PALETTE: [&str; 10] = [
    "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#7f7f7f",
    "#bcbd22", "#17becf",
];

/// Which edge of an axis to pad. Only the vertical sides are accepted by
/// [`pad_y_axis`]; `Left` and `Right` exist so callers wired to a
/// four-sided UI control get a typed rejection instead of silence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Top,
    Bottom,
    Left,
    Right,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Side::Top => "top",
            Side::Bottom => "bottom",
            Side::Left => "left",
            Side::Right => "right",
        };
        write!(f, "{}", s)
    }
}

/// Assign one palette color per group: series the classifier maps to the
/// same key share a color. More than ten distinct groups is an error.
/// For a fixed classifier the assignment is deterministic (first-seen
/// group order), so re-applying is a no-op.
pub fn assign_colors_by_group<K: Ord>(
    spec: &ChartSpec,
    classify: impl Fn(&Series) -> K,
) -> Result<ChartSpec, ChartError> {
    let mut group_colors: BTreeMap<K, &str> = BTreeMap::new();
    let mut next = 0usize;
    let mut colors = BTreeMap::new();
    for series in &spec.columns {
        let key = classify(series);
        let color = match group_colors.get(&key) {
            Some(c) => *c,
            None => {
                if next >= CATEGORICAL_PALETTE.len() {
                    return Err(ChartError::TooManyCategories {
                        max: CATEGORICAL_PALETTE.len(),
                    });
                }
                let c = CATEGORICAL_PALETTE[next];
                next += 1;
                group_colors.insert(key, c);
                c
            }
        };
        colors.insert(series.name.clone(), color.to_string());
    }
    let mut out = spec.clone();
    out.colors = colors;
    Ok(out)
}

fn parse_hex(color: &str) -> Result<(u8, u8, u8), ChartError> {
    let hex = color
        .strip_prefix('#')
        .filter(|h| h.len() == 6)
        .ok_or_else(|| ChartError::BadColor(color.to_string()))?;
    let byte = |i: usize| {
        u8::from_str_radix(&hex[i..i + 2], 16)
            .map_err(|_| ChartError::BadColor(color.to_string()))
    };
    Ok((byte(0)?, byte(2)?, byte(4)?))
}

/// Fade each series' color toward white as its rank falls from 1 to 0.
/// Rank 1 leaves the color exactly as it was; rank 0 is fully white.
/// Ranks outside [0, 1] are clamped. Series without an assigned color
/// are left alone.
pub fn fade_series_by_rank(
    spec: &ChartSpec,
    rank: impl Fn(&Series) -> f64,
) -> Result<ChartSpec, ChartError> {
    let mut out = spec.clone();
    for series in &spec.columns {
        let Some(color) = spec.colors.get(&series.name) else {
            continue;
        };
        let r = rank(series).clamp(0.0, 1.0);
        if r >= 1.0 {
            continue;
        }
        let (red, green, blue) = parse_hex(color)?;
        let lerp = |c: u8| -> u8 {
            let c = c as f64;
            (c + (255.0 - c) * (1.0 - r)).round() as u8
        };
        out.colors.insert(
            series.name.clone(),
            format!("#{:02x}{:02x}{:02x}", lerp(red), lerp(green), lerp(blue)),
        );
    }
    Ok(out)
}

/// Collect every series the classifier marks into the legend's hidden
/// list.
pub fn hide_series_in_legend(spec: &ChartSpec, hide: impl Fn(&Series) -> bool) -> ChartSpec {
    let mut out = spec.clone();
    out.legend_hidden = spec
        .columns
        .iter()
        .filter(|s| hide(s))
        .map(|s| s.name.clone())
        .collect();
    out
}

/// Stable ascending sort of the data columns by rank. The renderer draws
/// columns in order, so later columns sit visually on top.
pub fn sort_series_by_rank(spec: &ChartSpec, rank: impl Fn(&Series) -> f64) -> ChartSpec {
    let mut out = spec.clone();
    out.columns.sort_by(|a, b| rank(a).total_cmp(&rank(b)));
    out
}

/// Extend one end of a vertical axis outward by `fraction` of its data
/// extent. Horizontal sides, non-positive fractions, and a `y2` that
/// does not exist are rejected. An axis with no finite data is returned
/// unchanged.
pub fn pad_y_axis(
    spec: &ChartSpec,
    axis: AxisId,
    side: Side,
    fraction: f64,
) -> Result<ChartSpec, ChartError> {
    if matches!(side, Side::Left | Side::Right) {
        return Err(ChartError::NotVerticalSide(side.to_string()));
    }
    if !(fraction > 0.0) {
        return Err(ChartError::NonPositivePadding(fraction));
    }
    if axis == AxisId::Y2 && spec.y2.is_none() {
        return Err(ChartError::NoSuchAxis("y2"));
    }
    let Some((lo, hi)) = spec.extent(axis) else {
        log::debug!("pad_y_axis: axis {} has no data to pad around", axis);
        return Ok(spec.clone());
    };
    let pad = fraction * (hi - lo);
    let mut out = spec.clone();
    let target = match axis {
        AxisId::Y => Some(&mut out.y),
        AxisId::Y2 => out.y2.as_mut(),
    };
    // presence was checked above, so target is always Some here
    if let Some(target) = target {
        match side {
            Side::Top => target.max = Some(hi + pad),
            Side::Bottom => target.min = Some(lo - pad),
            Side::Left | Side::Right => {}
        }
    }
    Ok(out)
}

/// Blank an axis's ticks outside `[lo, hi]`; ticks inside render
/// normally. The bounds are normalized so argument order does not
/// matter.
pub fn hide_ticks_by_range(
    spec: &ChartSpec,
    axis: AxisId,
    lo: f64,
    hi: f64,
) -> Result<ChartSpec, ChartError> {
    if axis == AxisId::Y2 && spec.y2.is_none() {
        return Err(ChartError::NoSuchAxis("y2"));
    }
    let range = (lo.min(hi), lo.max(hi));
    let mut out = spec.clone();
    match axis {
        AxisId::Y => out.y.tick.visible_range = Some(range),
        AxisId::Y2 => {
            if let Some(y2) = out.y2.as_mut() {
                y2.tick.visible_range = Some(range);
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::{Axis, XAxis};

    fn spec_with_series(names: &[&str]) -> ChartSpec {
        let mut spec = ChartSpec::new(
            XAxis::Timestamps(vec!["1977-01-15T00:00:00Z".into()]),
            Axis::for_units("degC"),
        );
        for (i, name) in names.iter().enumerate() {
            spec.columns.push(Series::new(*name, vec![Some(i as f64)]));
            spec.axes.insert(name.to_string(), AxisId::Y);
        }
        spec
    }

    fn variable_of(series: &Series) -> String {
        series.name.split(' ').next().unwrap_or("").to_string()
    }

    #[test]
    fn test_group_coloring_shares_colors_within_group() {
        let spec = spec_with_series(&["tasmax r1", "tasmax r2", "pr r1"]);
        let colored = assign_colors_by_group(&spec, variable_of).unwrap();
        assert_eq!(colored.colors["tasmax r1"], colored.colors["tasmax r2"]);
        assert_ne!(colored.colors["tasmax r1"], colored.colors["pr r1"]);
    }

    #[test]
    fn test_group_coloring_is_idempotent() {
        let spec = spec_with_series(&["tasmax r1", "tasmax r2", "pr r1"]);
        let once = assign_colors_by_group(&spec, variable_of).unwrap();
        let twice = assign_colors_by_group(&once, variable_of).unwrap();
        assert_eq!(once.colors, twice.colors);
    }

    #[test]
    fn test_group_coloring_rejects_more_than_ten_groups() {
        let names: Vec<String> = (0..11).map(|i| format!("v{} r1", i)).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let spec = spec_with_series(&refs);
        assert_eq!(
            assign_colors_by_group(&spec, variable_of),
            Err(ChartError::TooManyCategories { max: 10 })
        );
    }

    #[test]
    fn test_fade_rank_one_is_identity() {
        let spec = spec_with_series(&["a", "b"]);
        let colored = assign_colors_by_group(&spec, |s| s.name.clone()).unwrap();
        let faded = fade_series_by_rank(&colored, |_| 1.0).unwrap();
        assert_eq!(faded.colors, colored.colors);
    }

    #[test]
    fn test_fade_rank_zero_is_white() {
        let spec = spec_with_series(&["a"]);
        let colored = assign_colors_by_group(&spec, |s| s.name.clone()).unwrap();
        let faded = fade_series_by_rank(&colored, |_| 0.0).unwrap();
        assert_eq!(faded.colors["a"], "#ffffff");
    }

    #[test]
    fn test_fade_interpolates_linearly() {
        let mut spec = spec_with_series(&["a"]);
        spec.colors.insert("a".to_string(), "#000000".to_string());
        let faded = fade_series_by_rank(&spec, |_| 0.5).unwrap();
        // Halfway between black and white
        assert_eq!(faded.colors["a"], "#808080");
    }

    #[test]
    fn test_hide_series_in_legend() {
        let spec = spec_with_series(&["keep", "hide me", "also hide"]);
        let hidden = hide_series_in_legend(&spec, |s| s.name.contains("hide"));
        assert_eq!(hidden.legend_hidden, vec!["hide me", "also hide"]);
    }

    #[test]
    fn test_sort_series_by_rank_is_stable() {
        let spec = spec_with_series(&["c", "a", "b", "d"]);
        let sorted = sort_series_by_rank(&spec, |s| match s.name.as_str() {
            "a" => 0.0,
            "b" => 0.0,
            _ => 1.0,
        });
        let names: Vec<&str> = sorted.columns.iter().map(|s| s.name.as_str()).collect();
        // Equal ranks keep their input order
        assert_eq!(names, vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_pad_y_axis_extends_requested_side() {
        let mut spec = spec_with_series(&["a", "b"]);
        spec.columns[0].values = vec![Some(0.0)];
        spec.columns[1].values = vec![Some(10.0)];
        let padded = pad_y_axis(&spec, AxisId::Y, Side::Top, 0.2).unwrap();
        assert_eq!(padded.y.max, Some(12.0));
        assert_eq!(padded.y.min, None);
        let padded = pad_y_axis(&spec, AxisId::Y, Side::Bottom, 0.5).unwrap();
        assert_eq!(padded.y.min, Some(-5.0));
    }

    #[test]
    fn test_pad_y_axis_rejections() {
        let spec = spec_with_series(&["a"]);
        assert!(matches!(
            pad_y_axis(&spec, AxisId::Y, Side::Left, 0.1),
            Err(ChartError::NotVerticalSide(_))
        ));
        assert!(matches!(
            pad_y_axis(&spec, AxisId::Y, Side::Right, 0.1),
            Err(ChartError::NotVerticalSide(_))
        ));
        assert_eq!(
            pad_y_axis(&spec, AxisId::Y, Side::Top, -0.1),
            Err(ChartError::NonPositivePadding(-0.1))
        );
        assert_eq!(
            pad_y_axis(&spec, AxisId::Y, Side::Top, 0.0),
            Err(ChartError::NonPositivePadding(0.0))
        );
        assert_eq!(
            pad_y_axis(&spec, AxisId::Y2, Side::Top, 0.1),
            Err(ChartError::NoSuchAxis("y2"))
        );
    }

    #[test]
    fn test_hide_ticks_by_range() {
        let spec = spec_with_series(&["a"]);
        let wrapped = hide_ticks_by_range(&spec, AxisId::Y, 5.0, 0.0).unwrap();
        assert_eq!(wrapped.y.tick.visible_range, Some((0.0, 5.0)));
        assert_eq!(wrapped.y.tick.format(2.5), "2.50");
        assert_eq!(wrapped.y.tick.format(6.0), "");
        assert_eq!(
            hide_ticks_by_range(&spec, AxisId::Y2, 0.0, 1.0),
            Err(ChartError::NoSuchAxis("y2"))
        );
    }
}
