//! Command implementations for the climate explorer CLI.
//!
//! Provides subcommands for listing dataset metadata, fetching chart
//! data from the backend, and exporting the results as CSV or XLSX.

use clap::Subcommand;
use std::path::PathBuf;

pub mod graphs;
pub mod metadata;

#[derive(Subcommand)]
pub enum Command {
    /// List dataset metadata for the configured ensemble
    Metadata {
        /// Only list datasets for this model
        #[arg(long)]
        model: Option<String>,

        /// Only list datasets for this variable
        #[arg(long)]
        variable: Option<String>,

        /// Only list datasets for this emissions scenario
        #[arg(long)]
        experiment: Option<String>,
    },

    /// Fetch a dataset's annual cycle and print or export it
    AnnualCycle {
        /// The dataset's unique id
        #[arg(long)]
        id: String,

        /// WKT polygon to clip to (empty for the whole extent)
        #[arg(long, default_value = "")]
        area: String,

        /// Write CSV/XLSX here instead of printing the chart JSON;
        /// directories get a generated filename
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Long-term averages for one variable across emissions scenarios
    Lta {
        #[arg(long)]
        model: String,

        #[arg(long)]
        variable: String,

        /// One or more emissions scenarios (comma separated)
        #[arg(long, value_delimiter = ',')]
        emission: Vec<String>,

        #[arg(long, default_value = "yearly")]
        timescale: String,

        /// Time index within the timescale
        #[arg(long, default_value_t = 0)]
        time: u32,

        /// WKT polygon to clip to (empty for the whole extent)
        #[arg(long, default_value = "")]
        area: String,

        /// Write CSV/XLSX here instead of printing the chart JSON;
        /// directories get a generated filename
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Summary statistics for every dataset matching a selection
    Stats {
        #[arg(long)]
        model: String,

        #[arg(long)]
        variable: String,

        #[arg(long)]
        emission: String,

        #[arg(long, default_value = "yearly")]
        timescale: String,

        /// Time index within the timescale
        #[arg(long, default_value_t = 0)]
        time: u32,

        /// WKT polygon to clip to (empty for the whole extent)
        #[arg(long, default_value = "")]
        area: String,

        /// Write CSV/XLSX here instead of printing the table;
        /// directories get a generated filename
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

pub async fn run(command: Command) -> anyhow::Result<()> {
    match command {
        Command::Metadata { model, variable, experiment } => {
            metadata::run_metadata(model, variable, experiment).await
        }
        Command::AnnualCycle { id, area, output } => {
            graphs::run_annual_cycle(&id, &area, output).await
        }
        Command::Lta { model, variable, emission, timescale, time, area, output } => {
            graphs::run_lta(&model, &variable, &emission, &timescale, time, &area, output).await
        }
        Command::Stats { model, variable, emission, timescale, time, area, output } => {
            graphs::run_stats(&model, &variable, &emission, &timescale, time, &area, output).await
        }
    }
}
