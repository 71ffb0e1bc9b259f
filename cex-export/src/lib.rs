//! Export fetched data as CSV or XLSX.
//!
//! Every export carries a small summary header block (model, emissions
//! scenario, variable, time of year) followed by a data block whose
//! column layout depends on the export kind. Both file formats emit the
//! identical logical table.

use cex_api::types::MultistatsResponse;
use cex_chart::{ChartSpec, XAxis};
use cex_core::meta::DatasetMeta;
use rust_xlsxwriter::Workbook;
use std::io::Write;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("csv write failed: {0}")]
    Csv(#[from] csv::Error),
    #[error("xlsx write failed: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("wrong data shape for export: {0}")]
    InvalidShape(String),
}

/// The export kinds, each with its own data-block column layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportKind {
    /// Real-timestamp series, one column per series.
    Timeseries,
    /// Per-dataset summary statistics.
    Stats,
    /// Annual-cycle series over the 12 representative months.
    ClimoSeries,
    /// Exactly one series of (time, value) pairs.
    SingleTimeseries,
}

impl ExportKind {
    /// The kind component of export filenames.
    pub fn file_label(&self) -> &'static str {
        match self {
            ExportKind::Timeseries => "Timeseries",
            ExportKind::Stats => "Stats",
            ExportKind::ClimoSeries => "Climoseries",
            ExportKind::SingleTimeseries => "SingleTimeseries",
        }
    }
}

/// `PCIC_CE_<Kind><Infix>_<TimeOfYear>.<ext>`
pub fn export_filename(kind: ExportKind, infix: &str, time_of_year: &str, ext: &str) -> String {
    format!(
        "PCIC_CE_{}{}_{}.{}",
        kind.file_label(),
        infix,
        time_of_year,
        ext
    )
}

/// One data cell. Numbers stay numeric so the XLSX writer emits real
/// number cells.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Number(f64),
    Empty,
}

/// The summary header block preceding every data block.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExportSummary {
    pub model: String,
    pub emissions_scenario: String,
    pub variable: String,
    pub time_of_year: String,
}

impl ExportSummary {
    fn rows(&self) -> Vec<(&'static str, &str)> {
        vec![
            ("Model", self.model.as_str()),
            ("Emissions Scenario", self.emissions_scenario.as_str()),
            ("Variable", self.variable.as_str()),
            ("Time of Year", self.time_of_year.as_str()),
        ]
    }
}

/// The logical table written to either file format.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportTable {
    pub summary: ExportSummary,
    pub header: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

fn x_labels(spec: &ChartSpec) -> Vec<String> {
    match &spec.x {
        XAxis::Categories(labels) => labels.clone(),
        XAxis::Timestamps(ts) => ts.clone(),
        XAxis::Values(xs) => xs.iter().map(|v| v.to_string()).collect(),
    }
}

/// Build the data block for a chart-backed export kind.
///
/// `Timeseries` and `ClimoSeries` lay out one column per series against
/// the shared time column; `SingleTimeseries` requires exactly one
/// series. `Stats` exports do not come from a chart; see
/// [`stats_table`].
pub fn chart_table(
    kind: ExportKind,
    spec: &ChartSpec,
    summary: ExportSummary,
) -> Result<ExportTable, ExportError> {
    let time_header = match kind {
        ExportKind::ClimoSeries => "Month",
        ExportKind::Timeseries | ExportKind::SingleTimeseries => "Time",
        ExportKind::Stats => {
            return Err(ExportError::InvalidShape(
                "stats exports are built from summary statistics, not a chart".to_string(),
            ))
        }
    };
    if kind == ExportKind::SingleTimeseries && spec.columns.len() != 1 {
        return Err(ExportError::InvalidShape(format!(
            "single-timeseries export needs exactly one series, got {}",
            spec.columns.len()
        )));
    }

    let labels = x_labels(spec);
    let mut header = vec![time_header.to_string()];
    header.extend(spec.columns.iter().map(|s| s.name.clone()));

    let rows = labels
        .iter()
        .enumerate()
        .map(|(i, label)| {
            let mut row = vec![Cell::Text(label.clone())];
            for series in &spec.columns {
                row.push(match series.values.get(i) {
                    Some(Some(v)) => Cell::Number(*v),
                    _ => Cell::Empty,
                });
            }
            row
        })
        .collect();

    Ok(ExportTable { summary, header, rows })
}

/// Build the data block for a stats export: one row per dataset, with
/// the dataset labelled by its run and period when metadata is
/// available.
pub fn stats_table(
    stats: &MultistatsResponse,
    meta: &[DatasetMeta],
    summary: ExportSummary,
) -> ExportTable {
    let header = vec![
        "Dataset".to_string(),
        "Run".to_string(),
        "Period".to_string(),
        "Min".to_string(),
        "Max".to_string(),
        "Mean".to_string(),
        "Median".to_string(),
        "Std.Dev".to_string(),
        "Cells".to_string(),
    ];
    let rows = stats
        .iter()
        .map(|(unique_id, s)| {
            let record = meta.iter().find(|m| &m.unique_id == unique_id);
            let run = record
                .map(|m| m.ensemble_member.clone())
                .unwrap_or_default();
            let period = record
                .map(|m| {
                    format!(
                        "{}-{}",
                        m.start_date.format("%Y"),
                        m.end_date.format("%Y")
                    )
                })
                .unwrap_or_default();
            vec![
                Cell::Text(unique_id.clone()),
                Cell::Text(run),
                Cell::Text(period),
                Cell::Number(s.min),
                Cell::Number(s.max),
                Cell::Number(s.mean),
                Cell::Number(s.median),
                Cell::Number(s.stdev),
                Cell::Number(s.ncells as f64),
            ]
        })
        .collect();
    ExportTable { summary, header, rows }
}

fn cell_text(cell: &Cell) -> String {
    match cell {
        Cell::Text(s) => s.clone(),
        Cell::Number(v) => v.to_string(),
        Cell::Empty => String::new(),
    }
}

/// Write the table as CSV: summary block, blank row, header, data.
pub fn write_csv<W: Write>(table: &ExportTable, writer: W) -> Result<(), ExportError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for (key, value) in table.summary.rows() {
        csv_writer.write_record([key, value])?;
    }
    csv_writer.write_record([""])?;
    csv_writer.write_record(&table.header)?;
    for row in &table.rows {
        csv_writer.write_record(row.iter().map(|c| cell_text(c)))?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Write the table as an XLSX workbook at `path`.
pub fn write_xlsx(table: &ExportTable, path: &Path) -> Result<(), ExportError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();

    let mut row_idx: u32 = 0;
    for (key, value) in table.summary.rows() {
        worksheet.write_string(row_idx, 0, key)?;
        worksheet.write_string(row_idx, 1, value)?;
        row_idx += 1;
    }
    row_idx += 1;
    for (col, name) in table.header.iter().enumerate() {
        worksheet.write_string(row_idx, col as u16, name)?;
    }
    row_idx += 1;
    for row in &table.rows {
        for (col, cell) in row.iter().enumerate() {
            match cell {
                Cell::Text(s) => {
                    worksheet.write_string(row_idx, col as u16, s)?;
                }
                Cell::Number(v) => {
                    worksheet.write_number(row_idx, col as u16, *v)?;
                }
                Cell::Empty => {}
            }
        }
        row_idx += 1;
    }
    workbook.save(path)?;
    log::info!("wrote {} data rows to {}", table.rows.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cex_chart::{Axis, AxisId, Series};

    fn annual_spec() -> ChartSpec {
        let mut spec = ChartSpec::new(
            XAxis::Categories(
                cex_core::time::MONTHS.iter().map(|m| m.to_string()).collect(),
            ),
            Axis::for_units("degC"),
        );
        let values: Vec<Option<f64>> = (0..12).map(|i| Some(i as f64)).collect();
        spec.columns.push(Series::new("monthly mean", values));
        spec.axes.insert("monthly mean".to_string(), AxisId::Y);
        spec
    }

    fn summary() -> ExportSummary {
        ExportSummary {
            model: "CanESM2".to_string(),
            emissions_scenario: "rcp85".to_string(),
            variable: "tasmax".to_string(),
            time_of_year: "Annual".to_string(),
        }
    }

    #[test]
    fn test_export_filename_pattern() {
        assert_eq!(
            export_filename(ExportKind::Timeseries, "tasmax", "July", "csv"),
            "PCIC_CE_Timeseriestasmax_July.csv"
        );
        assert_eq!(
            export_filename(ExportKind::Stats, "", "Winter-DJF", "xlsx"),
            "PCIC_CE_Stats_Winter-DJF.xlsx"
        );
        assert_eq!(
            export_filename(ExportKind::ClimoSeries, "_pr", "Annual", "xlsx"),
            "PCIC_CE_Climoseries_pr_Annual.xlsx"
        );
        assert_eq!(
            export_filename(ExportKind::SingleTimeseries, "", "July", "csv"),
            "PCIC_CE_SingleTimeseries_July.csv"
        );
    }

    #[test]
    fn test_chart_table_climoseries_shape() {
        let table = chart_table(ExportKind::ClimoSeries, &annual_spec(), summary()).unwrap();
        assert_eq!(table.header, vec!["Month", "monthly mean"]);
        assert_eq!(table.rows.len(), 12);
        assert_eq!(table.rows[0][0], Cell::Text("January".to_string()));
        assert_eq!(table.rows[0][1], Cell::Number(0.0));
    }

    #[test]
    fn test_chart_table_single_timeseries_requires_one_series() {
        let mut spec = annual_spec();
        spec.columns
            .push(Series::new("second", vec![None; 12]));
        spec.axes.insert("second".to_string(), AxisId::Y);
        assert!(matches!(
            chart_table(ExportKind::SingleTimeseries, &spec, summary()),
            Err(ExportError::InvalidShape(_))
        ));
    }

    #[test]
    fn test_csv_summary_block_precedes_data_block() {
        let table = chart_table(ExportKind::ClimoSeries, &annual_spec(), summary()).unwrap();
        let mut out = Vec::new();
        write_csv(&table, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Model,CanESM2");
        assert_eq!(lines[1], "Emissions Scenario,rcp85");
        assert_eq!(lines[2], "Variable,tasmax");
        assert_eq!(lines[3], "Time of Year,Annual");
        assert_eq!(lines[5], "Month,monthly mean");
        assert_eq!(lines[6], "January,0");
        // Missing values export as empty cells
        let mut gappy = annual_spec();
        gappy.columns[0].values[1] = None;
        let table = chart_table(ExportKind::ClimoSeries, &gappy, summary()).unwrap();
        let mut out = Vec::new();
        write_csv(&table, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.lines().any(|l| l == "February,"));
    }

    #[test]
    fn test_stats_table_layout() {
        use cex_api::types::SummaryStats;
        let stats: MultistatsResponse = std::collections::BTreeMap::from([(
            "tasmax_mClim".to_string(),
            SummaryStats {
                min: -30.0,
                max: 40.0,
                mean: 5.0,
                median: 4.5,
                stdev: 11.0,
                ncells: 1488,
                time: None,
                units: Some("degC".to_string()),
            },
        )]);
        let table = stats_table(&stats, &[], summary());
        assert_eq!(table.header.len(), 9);
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0][0], Cell::Text("tasmax_mClim".to_string()));
        assert_eq!(table.rows[0][3], Cell::Number(-30.0));
    }
}
