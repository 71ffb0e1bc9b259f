//! The `metadata` subcommand: fetch and list dataset metadata.

use cex_api::client::Client;
use cex_api::types::MultimetaQuery;
use log::info;

/// Fetch the configured ensemble's metadata and print one line per
/// dataset-variable record, optionally narrowed by model, variable, or
/// emissions scenario.
pub async fn run_metadata(
    model: Option<String>,
    variable: Option<String>,
    experiment: Option<String>,
) -> anyhow::Result<()> {
    let config = cex_config::Config::from_env()?;
    let client = Client::new(&config.backend_url)?;

    let query = MultimetaQuery {
        ensemble_name: config.ensemble.clone(),
        model,
    };
    let records = client.multimeta(&query).await?;
    info!(
        "{} records in ensemble {}",
        records.len(),
        config.ensemble
    );

    let mut shown = 0usize;
    for record in &records {
        if let Some(variable) = &variable {
            if &record.variable_id != variable {
                continue;
            }
        }
        if let Some(experiment) = &experiment {
            if &record.experiment != experiment {
                continue;
            }
        }
        println!(
            "{}\t{}\t{}\t{}\t{}\t{}\t{}",
            record.unique_id,
            record.model_id,
            record.experiment,
            record.variable_id,
            record.ensemble_member,
            record.timescale,
            record.data_spec(),
        );
        shown += 1;
    }
    println!("{} of {} records shown", shown, records.len());
    Ok(())
}
