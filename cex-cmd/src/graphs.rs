//! Chart-building subcommands: fetch backend data, run it through the
//! chart-spec pipeline, and print or export the result.

use cex_api::client::Client;
use cex_api::types::{DataQuery, MultimetaQuery, TimeseriesQuery};
use cex_chart::generators::{annual_cycle_graph, long_term_average_graph};
use cex_chart::ChartSpec;
use cex_core::payload::{DataResult, QueryContext};
use cex_core::time::time_of_year;
use cex_export::{
    chart_table, export_filename, stats_table, write_csv, write_xlsx, ExportKind, ExportSummary,
    ExportTable,
};
use log::info;
use std::fs::File;
use std::path::PathBuf;

/// Write a table to `output`, choosing the format from the extension.
/// A directory gets a generated `PCIC_CE_...` CSV filename.
fn write_table(
    table: &ExportTable,
    kind: ExportKind,
    infix: &str,
    time_of_year: &str,
    output: PathBuf,
) -> anyhow::Result<()> {
    let path = if output.is_dir() {
        output.join(export_filename(kind, infix, time_of_year, "csv"))
    } else {
        output
    };
    match path.extension().and_then(|e| e.to_str()) {
        Some("xlsx") => write_xlsx(table, &path)?,
        _ => write_csv(table, File::create(&path)?)?,
    }
    info!("exported {}", path.display());
    Ok(())
}

fn print_chart(spec: &ChartSpec) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(&spec.to_render_json())?);
    Ok(())
}

/// Fetch one dataset's timeseries and build its annual-cycle graph.
pub async fn run_annual_cycle(
    id: &str,
    area: &str,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    let config = cex_config::Config::from_env()?;
    let client = Client::new(&config.backend_url)?;

    let meta = client
        .multimeta(&MultimetaQuery {
            ensemble_name: config.ensemble.clone(),
            model: None,
        })
        .await?;
    let record = meta
        .iter()
        .find(|m| m.unique_id == id)
        .ok_or_else(|| anyhow::anyhow!("no dataset {} in ensemble {}", id, config.ensemble))?
        .clone();

    let result = client
        .timeseries(&TimeseriesQuery { id: id.to_string(), area: area.to_string() })
        .await?;
    let spec = annual_cycle_graph(&meta, &[result])?;

    match output {
        Some(output) => {
            let summary = ExportSummary {
                model: record.model_id.clone(),
                emissions_scenario: record.experiment.clone(),
                variable: record.variable_id.clone(),
                time_of_year: "Annual".to_string(),
            };
            let table = chart_table(ExportKind::ClimoSeries, &spec, summary)?;
            write_table(
                &table,
                ExportKind::ClimoSeries,
                &format!("_{}", record.variable_id),
                "Annual",
                output,
            )
        }
        None => print_chart(&spec),
    }
}

/// Fetch long-term averages for one variable under one or more
/// emissions scenarios and build the comparison graph.
#[allow(clippy::too_many_arguments)]
pub async fn run_lta(
    model: &str,
    variable: &str,
    emissions: &[String],
    timescale: &str,
    time: u32,
    area: &str,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    if emissions.is_empty() {
        anyhow::bail!("at least one emissions scenario is required");
    }
    let config = cex_config::Config::from_env()?;
    let client = Client::new(&config.backend_url)?;

    let mut results: Vec<DataResult> = Vec::with_capacity(emissions.len());
    let mut contexts: Vec<QueryContext> = Vec::with_capacity(emissions.len());
    for emission in emissions {
        let query = DataQuery {
            ensemble_name: config.ensemble.clone(),
            model: model.to_string(),
            variable: variable.to_string(),
            emission: emission.clone(),
            timescale: timescale.to_string(),
            time,
            area: area.to_string(),
        };
        let result = client.data(&query).await?;
        info!("{}: {} runs", emission, result.len());
        contexts.push(query.context());
        results.push(result);
    }
    let spec = long_term_average_graph(&results, Some(&contexts))?;

    match output {
        Some(output) => {
            let toy = time_of_year(timescale.parse()?, time)?;
            let summary = ExportSummary {
                model: model.to_string(),
                emissions_scenario: emissions.join(", "),
                variable: variable.to_string(),
                time_of_year: toy.clone(),
            };
            let table = chart_table(ExportKind::Timeseries, &spec, summary)?;
            write_table(
                &table,
                ExportKind::Timeseries,
                &format!("_{}", variable),
                &toy,
                output,
            )
        }
        None => print_chart(&spec),
    }
}

/// Fetch summary statistics for every dataset matching a selection.
#[allow(clippy::too_many_arguments)]
pub async fn run_stats(
    model: &str,
    variable: &str,
    emission: &str,
    timescale: &str,
    time: u32,
    area: &str,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    let config = cex_config::Config::from_env()?;
    let client = Client::new(&config.backend_url)?;

    let query = DataQuery {
        ensemble_name: config.ensemble.clone(),
        model: model.to_string(),
        variable: variable.to_string(),
        emission: emission.to_string(),
        timescale: timescale.to_string(),
        time,
        area: area.to_string(),
    };
    let stats = client.multistats(&query).await?;
    let meta = client
        .multimeta(&MultimetaQuery {
            ensemble_name: config.ensemble.clone(),
            model: Some(model.to_string()),
        })
        .await?;

    let toy = time_of_year(timescale.parse()?, time)?;
    let summary = ExportSummary {
        model: model.to_string(),
        emissions_scenario: emission.to_string(),
        variable: variable.to_string(),
        time_of_year: toy.clone(),
    };
    let table = stats_table(&stats, &meta, summary);

    match output {
        Some(output) => write_table(
            &table,
            ExportKind::Stats,
            &format!("_{}", variable),
            &toy,
            output,
        ),
        None => {
            println!("{}", table.header.join("\t"));
            for row in &table.rows {
                let cells: Vec<String> = row
                    .iter()
                    .map(|c| match c {
                        cex_export::Cell::Text(s) => s.clone(),
                        cex_export::Cell::Number(v) => v.to_string(),
                        cex_export::Cell::Empty => String::new(),
                    })
                    .collect();
                println!("{}", cells.join("\t"));
            }
            Ok(())
        }
    }
}
