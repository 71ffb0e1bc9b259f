//! Chart-spec generators: raw query results plus dataset metadata in,
//! a [`ChartSpec`] out.
//!
//! All three generators share the axis/units rule (first unit system on
//! `y`, a second on `y2`, a third is an error) and the naming rule for
//! multiple series (join the values of the minimal set of metadata
//! fields that differ across the inputs).

use crate::spec::{Axis, AxisAllocator, ChartError, ChartSpec, Series, SeriesStyle, XAxis};
use cex_core::meta::{differing_fields, label_for, DatasetMeta, MetaError};
use cex_core::payload::{DataResult, QueryContext, TimeseriesResult};
use cex_core::time::{
    parse_timestamp, resolution_of, season_of_month, Timescale, MONTHS,
};
use chrono::Datelike;
use itertools::Itertools;
use std::collections::BTreeSet;

impl From<MetaError> for ChartError {
    fn from(e: MetaError) -> Self {
        match e {
            MetaError::EmptyInput => ChartError::EmptyInput,
            MetaError::Indistinguishable => ChartError::DuplicateSeries,
        }
    }
}

/// Look up the metadata record for each payload by `unique_id`.
fn resolve_meta<'m>(
    meta: &'m [DatasetMeta],
    payloads: &[TimeseriesResult],
) -> Result<Vec<&'m DatasetMeta>, ChartError> {
    payloads
        .iter()
        .map(|p| {
            meta.iter()
                .find(|m| m.unique_id == p.id)
                .ok_or_else(|| ChartError::UnknownDataset(p.id.clone()))
        })
        .collect()
}

/// Series names for a set of payloads: a lone payload is named
/// `"<timescale> mean"`; several are told apart by the metadata fields
/// that actually differ between them.
fn series_names(
    metas: &[&DatasetMeta],
    timescales: &[Timescale],
) -> Result<Vec<String>, ChartError> {
    let names: Vec<String> = if metas.len() == 1 {
        vec![format!("{} mean", timescales[0])]
    } else {
        let fields = differing_fields(metas)?;
        metas
            .iter()
            .map(|m| format!("{} mean", label_for(m, &fields)))
            .collect()
    };
    let distinct: BTreeSet<&String> = names.iter().collect();
    if distinct.len() != names.len() {
        return Err(ChartError::DuplicateSeries);
    }
    Ok(names)
}

/// Project one payload onto the fixed 12-slot representative year.
///
/// Monthly values land on their own month. Seasonal values cover their
/// three months, with the December-adjacent winter value wrapping around
/// to both ends of the year (slot 0 and slot 11 always agree). A yearly
/// value fills all twelve slots.
fn representative_year(
    resolution: Timescale,
    payload: &TimeseriesResult,
) -> Result<Vec<Option<f64>>, ChartError> {
    match resolution {
        Timescale::Monthly => {
            let mut slots = vec![None; 12];
            for (ts, value) in &payload.data {
                let month0 = parse_timestamp(ts)?.month0() as usize;
                slots[month0] = Some(*value);
            }
            Ok(slots)
        }
        Timescale::Seasonal => {
            let mut seasons = [None; 4];
            for (ts, value) in &payload.data {
                let season = season_of_month(parse_timestamp(ts)?.month0()) as usize;
                seasons[season] = Some(*value);
            }
            Ok((0..12u32)
                .map(|m| seasons[season_of_month(m) as usize])
                .collect())
        }
        Timescale::Yearly => {
            let value = payload.data.values().next().copied();
            Ok(vec![value; 12])
        }
    }
}

/// Build an annual-cycle graph: every input series is projected onto a
/// single representative year of 12 monthly slots.
///
/// Each payload must hold exactly 1, 4, or 12 points (yearly, seasonal,
/// monthly); anything else, including the known malformed 17-point
/// concatenation, is rejected. Monthly series render as lines, seasonal
/// and yearly as steps.
pub fn annual_cycle_graph(
    meta: &[DatasetMeta],
    payloads: &[TimeseriesResult],
) -> Result<ChartSpec, ChartError> {
    if payloads.is_empty() {
        return Err(ChartError::EmptyInput);
    }
    let metas = resolve_meta(meta, payloads)?;
    let resolutions = payloads
        .iter()
        .map(|p| resolution_of(p.data.len()))
        .collect::<Result<Vec<_>, _>>()?;
    let names = series_names(&metas, &resolutions)?;

    let mut allocator = AxisAllocator::default();
    let mut spec = ChartSpec::new(
        XAxis::Categories(MONTHS.iter().map(|m| m.to_string()).collect()),
        Axis::for_units(""),
    );
    for (((payload, meta), resolution), name) in payloads
        .iter()
        .zip(&metas)
        .zip(&resolutions)
        .zip(&names)
    {
        let axis = allocator.assign(&payload.units)?;
        let values = representative_year(*resolution, payload)?;
        spec.columns.push(Series::new(name.clone(), values));
        spec.axes.insert(name.clone(), axis);
        let style = match resolution {
            Timescale::Monthly => SeriesStyle::Line,
            Timescale::Seasonal | Timescale::Yearly => SeriesStyle::Step,
        };
        spec.types.insert(name.clone(), style);
        spec.tooltip
            .precision_by_series
            .insert(name.clone(), cex_config::precision_for(&meta.variable_id));
    }
    let (y, y2) = allocator.finish();
    spec.y = y;
    spec.y2 = y2;
    log::debug!(
        "annual cycle graph: {} series over 12 representative months",
        spec.columns.len()
    );
    Ok(spec)
}

/// Context keys whose values are not identical across all contexts.
fn differing_context_keys(contexts: &[QueryContext]) -> Vec<String> {
    let first = &contexts[0];
    let all_keys: BTreeSet<&String> = contexts.iter().flat_map(|c| c.keys()).collect();
    all_keys
        .into_iter()
        .filter(|k| contexts.iter().any(|c| c.get(*k) != first.get(*k)))
        .cloned()
        .collect()
}

/// Build a long-term-average graph from one or more `data` query
/// results.
///
/// The x axis is the union of all timestamps across all runs,
/// deduplicated by string equality in first-seen order; series missing a
/// timestamp carry a null there and the chart connects across nulls.
/// With more than one result, a parallel list of query contexts is
/// required and series names gain a prefix built from the context keys
/// that differ between queries. Contexts that differ by `area` cannot be
/// labelled (geometry is not a name) and identical contexts cannot label
/// distinct series.
pub fn long_term_average_graph(
    results: &[DataResult],
    contexts: Option<&[QueryContext]>,
) -> Result<ChartSpec, ChartError> {
    if results.is_empty() {
        return Err(ChartError::EmptyInput);
    }

    let prefixes: Vec<Option<String>> = if results.len() == 1 {
        vec![None]
    } else {
        let contexts = contexts.ok_or(ChartError::MissingContexts)?;
        if contexts.len() != results.len() {
            return Err(ChartError::MissingContexts);
        }
        let keys = differing_context_keys(contexts);
        if keys.is_empty() {
            return Err(ChartError::DuplicateContexts);
        }
        if keys.iter().any(|k| k == "area") {
            return Err(ChartError::AreaContextDiffers);
        }
        contexts
            .iter()
            .map(|c| {
                Some(
                    keys.iter()
                        .map(|k| c.get(k).map(String::as_str).unwrap_or(""))
                        .collect::<Vec<_>>()
                        .join(" "),
                )
            })
            .collect()
    };

    let timestamps: Vec<String> = results
        .iter()
        .flat_map(|r| r.values().flat_map(|run| run.data.keys()))
        .unique()
        .cloned()
        .collect();

    let mut allocator = AxisAllocator::default();
    let mut spec = ChartSpec::new(XAxis::Timestamps(timestamps.clone()), Axis::for_units(""));
    spec.connect_nulls = true;

    for (i, result) in results.iter().enumerate() {
        let precision = contexts
            .and_then(|cs| cs.get(i))
            .and_then(|c| c.get("variable"))
            .map(|v| cex_config::precision_for(v))
            .unwrap_or_else(|| cex_config::precision_for(""));
        for (run, run_data) in result {
            let name = match &prefixes[i] {
                Some(prefix) => format!("{} {}", prefix, run),
                None => run.clone(),
            };
            if spec.axes.contains_key(&name) {
                return Err(ChartError::DuplicateSeries);
            }
            let axis = allocator.assign(&run_data.units)?;
            let values = timestamps
                .iter()
                .map(|ts| run_data.data.get(ts).copied())
                .collect();
            spec.columns.push(Series::new(name.clone(), values));
            spec.axes.insert(name.clone(), axis);
            spec.tooltip.precision_by_series.insert(name, precision);
        }
    }
    let (y, y2) = allocator.finish();
    spec.y = y;
    spec.y2 = y2;
    Ok(spec)
}

/// Build an open timeseries graph: real timestamps on the x axis, no
/// bucketing into a representative year, and a zoomable sub-range
/// selector enabled. Naming follows the annual-cycle rules.
pub fn timeseries_graph(
    meta: &[DatasetMeta],
    payloads: &[TimeseriesResult],
) -> Result<ChartSpec, ChartError> {
    if payloads.is_empty() {
        return Err(ChartError::EmptyInput);
    }
    let metas = resolve_meta(meta, payloads)?;
    let timescales: Vec<Timescale> = metas.iter().map(|m| m.timescale).collect();
    let names = series_names(&metas, &timescales)?;

    let timestamps: Vec<String> = payloads
        .iter()
        .flat_map(|p| p.data.keys())
        .unique()
        .cloned()
        .collect();

    let mut allocator = AxisAllocator::default();
    let mut spec = ChartSpec::new(XAxis::Timestamps(timestamps.clone()), Axis::for_units(""));
    spec.subchart = true;

    for ((payload, meta), name) in payloads.iter().zip(&metas).zip(&names) {
        let axis = allocator.assign(&payload.units)?;
        let values = timestamps
            .iter()
            .map(|ts| payload.data.get(ts).copied())
            .collect();
        spec.columns.push(Series::new(name.clone(), values));
        spec.axes.insert(name.clone(), axis);
        spec.tooltip
            .precision_by_series
            .insert(name.clone(), cex_config::precision_for(&meta.variable_id));
    }
    let (y, y2) = allocator.finish();
    spec.y = y;
    spec.y2 = y2;
    Ok(spec)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::AxisId;
    use cex_core::payload::RunData;
    use chrono::NaiveDate;
    use std::collections::BTreeMap;

    fn meta_record(
        unique_id: &str,
        variable_id: &str,
        timescale: Timescale,
    ) -> DatasetMeta {
        DatasetMeta {
            unique_id: unique_id.to_string(),
            model_id: "CanESM2".to_string(),
            experiment: "rcp85".to_string(),
            variable_id: variable_id.to_string(),
            variable_name: format!("{} long name", variable_id),
            ensemble_member: "r1i1p1".to_string(),
            start_date: NaiveDate::from_ymd_opt(1961, 1, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(1990, 12, 31).unwrap(),
            timescale,
            multi_year_mean: true,
        }
    }

    fn monthly_payload(id: &str, units: &str) -> TimeseriesResult {
        let data = (1..=12u32)
            .map(|m| (format!("1977-{:02}-15T00:00:00Z", m), m as f64))
            .collect();
        TimeseriesResult { id: id.to_string(), units: units.to_string(), data }
    }

    fn seasonal_payload(id: &str, units: &str) -> TimeseriesResult {
        let data = [(1u32, -2.0), (4, 8.0), (7, 18.0), (10, 6.0)]
            .iter()
            .map(|(m, v)| (format!("1977-{:02}-15T00:00:00Z", m), *v))
            .collect();
        TimeseriesResult { id: id.to_string(), units: units.to_string(), data }
    }

    fn yearly_payload(id: &str, units: &str) -> TimeseriesResult {
        let data = BTreeMap::from([("1977-07-02T00:00:00Z".to_string(), 7.5)]);
        TimeseriesResult { id: id.to_string(), units: units.to_string(), data }
    }

    #[test]
    fn test_annual_cycle_three_resolutions_of_tasmax() {
        let meta = vec![
            meta_record("tasmax_mClim", "tasmax", Timescale::Monthly),
            meta_record("tasmax_sClim", "tasmax", Timescale::Seasonal),
            meta_record("tasmax_aClim", "tasmax", Timescale::Yearly),
        ];
        let payloads = vec![
            monthly_payload("tasmax_mClim", "degC"),
            seasonal_payload("tasmax_sClim", "degC"),
            yearly_payload("tasmax_aClim", "degC"),
        ];
        let spec = annual_cycle_graph(&meta, &payloads).unwrap();

        // 3 series of exactly 12 values each, one unit system
        assert_eq!(spec.columns.len(), 3);
        for series in &spec.columns {
            assert_eq!(series.values.len(), 12);
        }
        assert_eq!(spec.y.units, "degC");
        assert!(spec.y2.is_none());

        // Renderer hand-off: 3 columns of name + 12 values
        let rendered = spec.to_render_json();
        let columns = rendered["data"]["columns"].as_array().unwrap();
        assert_eq!(columns.len(), 3);
        for col in columns {
            assert_eq!(col.as_array().unwrap().len(), 13);
        }

        // Differentiated by the only differing field, the timescale
        assert_eq!(spec.columns[0].name, "monthly mean");
        assert_eq!(spec.columns[1].name, "seasonal mean");
        assert_eq!(spec.columns[2].name, "yearly mean");

        // Line style per resolution
        assert_eq!(spec.types["monthly mean"], SeriesStyle::Line);
        assert_eq!(spec.types["seasonal mean"], SeriesStyle::Step);
        assert_eq!(spec.types["yearly mean"], SeriesStyle::Step);
    }

    #[test]
    fn test_annual_cycle_seasonal_winter_wraparound() {
        let meta = vec![meta_record("tasmax_sClim", "tasmax", Timescale::Seasonal)];
        let payloads = vec![seasonal_payload("tasmax_sClim", "degC")];
        let spec = annual_cycle_graph(&meta, &payloads).unwrap();
        let values = &spec.columns[0].values;
        // January and December both carry the winter value
        assert_eq!(values[0], Some(-2.0));
        assert_eq!(values[11], Some(-2.0));
        assert_eq!(values[0], values[11]);
        // Mid-season months carry their season's value
        assert_eq!(values[3], Some(8.0));
        assert_eq!(values[6], Some(18.0));
        assert_eq!(values[9], Some(6.0));
    }

    #[test]
    fn test_annual_cycle_yearly_fills_every_slot() {
        let meta = vec![meta_record("tasmax_aClim", "tasmax", Timescale::Yearly)];
        let payloads = vec![yearly_payload("tasmax_aClim", "degC")];
        let spec = annual_cycle_graph(&meta, &payloads).unwrap();
        assert!(spec.columns[0].values.iter().all(|v| *v == Some(7.5)));
        assert_eq!(spec.columns[0].name, "yearly mean");
    }

    #[test]
    fn test_annual_cycle_rejects_17_points() {
        let meta = vec![meta_record("tasmax_concat", "tasmax", Timescale::Monthly)];
        let data = (0..17u32)
            .map(|i| (format!("1977-01-{:02}T00:00:00Z", i + 1), i as f64))
            .collect();
        let payloads = vec![TimeseriesResult {
            id: "tasmax_concat".to_string(),
            units: "degC".to_string(),
            data,
        }];
        assert!(matches!(
            annual_cycle_graph(&meta, &payloads),
            Err(ChartError::Time(
                cex_core::time::TimeError::InconsistentResolution(17)
            ))
        ));
    }

    #[test]
    fn test_annual_cycle_empty_and_duplicate_inputs() {
        let meta = vec![meta_record("tasmax_mClim", "tasmax", Timescale::Monthly)];
        assert_eq!(annual_cycle_graph(&meta, &[]), Err(ChartError::EmptyInput));

        // Two payloads over indistinguishable metadata records
        let meta = vec![
            meta_record("a", "tasmax", Timescale::Monthly),
            meta_record("b", "tasmax", Timescale::Monthly),
        ];
        let payloads = vec![monthly_payload("a", "degC"), monthly_payload("b", "degC")];
        assert_eq!(
            annual_cycle_graph(&meta, &payloads),
            Err(ChartError::DuplicateSeries)
        );
    }

    #[test]
    fn test_annual_cycle_second_units_takes_y2_third_throws() {
        let meta = vec![
            meta_record("tasmax_mClim", "tasmax", Timescale::Monthly),
            meta_record("pr_mClim", "pr", Timescale::Monthly),
        ];
        let payloads = vec![
            monthly_payload("tasmax_mClim", "degC"),
            monthly_payload("pr_mClim", "mm"),
        ];
        let spec = annual_cycle_graph(&meta, &payloads).unwrap();
        assert_eq!(spec.y.units, "degC");
        assert_eq!(spec.y2.as_ref().unwrap().units, "mm");
        assert_eq!(spec.axes["tasmax mean"], AxisId::Y);
        assert_eq!(spec.axes["pr mean"], AxisId::Y2);

        let meta = vec![
            meta_record("tasmax_mClim", "tasmax", Timescale::Monthly),
            meta_record("pr_mClim", "pr", Timescale::Monthly),
            meta_record("huss_mClim", "huss", Timescale::Monthly),
        ];
        let payloads = vec![
            monthly_payload("tasmax_mClim", "degC"),
            monthly_payload("pr_mClim", "mm"),
            monthly_payload("huss_mClim", "kg kg-1"),
        ];
        assert!(matches!(
            annual_cycle_graph(&meta, &payloads),
            Err(ChartError::TooManyAxes { .. })
        ));
    }

    #[test]
    fn test_annual_cycle_unknown_dataset() {
        let meta = vec![meta_record("tasmax_mClim", "tasmax", Timescale::Monthly)];
        let payloads = vec![monthly_payload("not_in_meta", "degC")];
        assert_eq!(
            annual_cycle_graph(&meta, &payloads),
            Err(ChartError::UnknownDataset("not_in_meta".to_string()))
        );
    }

    fn run_result(runs: &[(&str, &[(&str, f64)], &str)]) -> DataResult {
        runs.iter()
            .map(|(run, points, units)| {
                (
                    run.to_string(),
                    RunData {
                        data: points
                            .iter()
                            .map(|(ts, v)| (ts.to_string(), *v))
                            .collect(),
                        units: units.to_string(),
                    },
                )
            })
            .collect()
    }

    fn context(pairs: &[(&str, &str)]) -> QueryContext {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_lta_single_result_uses_bare_run_names() {
        let result = run_result(&[(
            "r1i1p1",
            &[("1997-01-15T00:00:00Z", 1.0), ("2055-01-15T00:00:00Z", 2.0)],
            "degC",
        )]);
        let spec = long_term_average_graph(&[result], None).unwrap();
        assert_eq!(spec.columns.len(), 1);
        assert_eq!(spec.columns[0].name, "r1i1p1");
        assert!(spec.connect_nulls);
        assert_eq!(spec.x.len(), 2);
    }

    #[test]
    fn test_lta_two_variables_share_y_third_units_on_y2() {
        let tasmax = run_result(&[(
            "r1i1p1",
            &[("1997-01-15T00:00:00Z", 10.0)],
            "degC",
        )]);
        let tasmin = run_result(&[(
            "r1i1p1",
            &[("1997-01-15T00:00:00Z", 2.0)],
            "degC",
        )]);
        let contexts = vec![
            context(&[("variable", "tasmax"), ("model", "CanESM2")]),
            context(&[("variable", "tasmin"), ("model", "CanESM2")]),
        ];
        let spec = long_term_average_graph(&[tasmax.clone(), tasmin.clone()], Some(&contexts))
            .unwrap();
        assert_eq!(spec.columns[0].name, "tasmax r1i1p1");
        assert_eq!(spec.columns[1].name, "tasmin r1i1p1");
        assert_eq!(spec.axes["tasmax r1i1p1"], AxisId::Y);
        assert_eq!(spec.axes["tasmin r1i1p1"], AxisId::Y);
        assert!(spec.y2.is_none());

        let pr = run_result(&[("r1i1p1", &[("1997-01-15T00:00:00Z", 900.0)], "mm")]);
        let contexts = vec![
            context(&[("variable", "tasmax")]),
            context(&[("variable", "tasmin")]),
            context(&[("variable", "pr")]),
        ];
        let spec =
            long_term_average_graph(&[tasmax, tasmin, pr], Some(&contexts)).unwrap();
        assert_eq!(spec.axes["pr r1i1p1"], AxisId::Y2);
        assert_eq!(spec.y2.as_ref().unwrap().units, "mm");
    }

    #[test]
    fn test_lta_null_fills_missing_timestamps() {
        let a = run_result(&[(
            "r1i1p1",
            &[("1997-01-15T00:00:00Z", 1.0), ("2055-01-15T00:00:00Z", 2.0)],
            "degC",
        )]);
        let b = run_result(&[("r2i1p1", &[("2055-01-15T00:00:00Z", 3.0)], "degC")]);
        let contexts = vec![
            context(&[("ensemble_member", "r1i1p1")]),
            context(&[("ensemble_member", "r2i1p1")]),
        ];
        let spec = long_term_average_graph(&[a, b], Some(&contexts)).unwrap();
        let b_series = spec
            .columns
            .iter()
            .find(|s| s.name.contains("r2i1p1 r2i1p1"))
            .unwrap();
        assert_eq!(b_series.values, vec![None, Some(3.0)]);
    }

    #[test]
    fn test_lta_context_errors() {
        let a = run_result(&[("r1i1p1", &[("1997-01-15T00:00:00Z", 1.0)], "degC")]);
        let b = run_result(&[("r1i1p1", &[("1997-01-15T00:00:00Z", 2.0)], "degC")]);

        // Multiple results without contexts
        assert_eq!(
            long_term_average_graph(&[a.clone(), b.clone()], None),
            Err(ChartError::MissingContexts)
        );

        // Identical contexts cannot label distinct series
        let same = vec![context(&[("variable", "tasmax")]); 2];
        assert_eq!(
            long_term_average_graph(&[a.clone(), b.clone()], Some(&same)),
            Err(ChartError::DuplicateContexts)
        );

        // Geometry cannot be a label
        let areas = vec![
            context(&[("area", "POLYGON((0 0,1 0,1 1,0 0))")]),
            context(&[("area", "")]),
        ];
        assert_eq!(
            long_term_average_graph(&[a, b], Some(&areas)),
            Err(ChartError::AreaContextDiffers)
        );
    }

    #[test]
    fn test_timeseries_graph_unions_timestamps() {
        let meta = vec![
            meta_record("tasmax_mClim", "tasmax", Timescale::Monthly),
            meta_record("pr_mClim", "pr", Timescale::Monthly),
        ];
        let a = TimeseriesResult {
            id: "tasmax_mClim".to_string(),
            units: "degC".to_string(),
            data: BTreeMap::from([
                ("1977-01-15T00:00:00Z".to_string(), 1.0),
                ("1977-02-15T00:00:00Z".to_string(), 2.0),
            ]),
        };
        let b = TimeseriesResult {
            id: "pr_mClim".to_string(),
            units: "mm".to_string(),
            data: BTreeMap::from([("1977-02-15T00:00:00Z".to_string(), 30.0)]),
        };
        let spec = timeseries_graph(&meta, &[a, b]).unwrap();
        assert!(spec.subchart);
        assert_eq!(spec.x.len(), 2);
        assert_eq!(spec.columns[0].values, vec![Some(1.0), Some(2.0)]);
        assert_eq!(spec.columns[1].values, vec![None, Some(30.0)]);
        assert_eq!(spec.columns[0].name, "tasmax mean");
        assert_eq!(spec.columns[1].name, "pr mean");
    }

    #[test]
    fn test_timeseries_graph_single_series_name() {
        let meta = vec![meta_record("tasmax_mClim", "tasmax", Timescale::Monthly)];
        let payloads = vec![monthly_payload("tasmax_mClim", "degC")];
        let spec = timeseries_graph(&meta, &payloads).unwrap();
        assert_eq!(spec.columns[0].name, "monthly mean");
    }
}
