//! HTTP client for the backend query endpoints.
//!
//! One method per endpoint, no retries: a failed fetch surfaces its
//! error and is only reissued when the caller's derived selection key
//! changes.

use crate::error::ApiError;
use crate::types::{
    DataQuery, FileMetadata, MetadataResponse, MultimetaQuery, MultimetaResponse,
    MultistatsResponse, TimeseriesQuery,
};
use cex_core::meta::DatasetMeta;
use cex_core::payload::{DataResult, TimeseriesResult};
use cex_core::time::TimeKey;
use futures::future::join_all;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::time::Duration;

/// Typed client over the backend's REST endpoints.
pub struct Client {
    http: reqwest::Client,
    base_url: String,
}

fn classify(e: reqwest::Error) -> ApiError {
    if e.is_timeout() || e.is_connect() {
        ApiError::NoResponse
    } else {
        ApiError::Transport(e.to_string())
    }
}

impl Client {
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        Ok(Client {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Client for the backend named by the process environment.
    pub fn from_env() -> Result<Self, ApiError> {
        let config = cex_config::Config::from_env()
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        Client::new(&config.backend_url)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, ApiError> {
        let url = format!("{}/{}", self.base_url, path);
        log::debug!("GET {} with {} params", url, params.len());
        let response = self
            .http
            .get(&url)
            .query(params)
            .send()
            .await
            .map_err(classify)?;
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status(status.as_u16()));
        }
        let body = response.text().await.map_err(classify)?;
        let trimmed = body.trim();
        if trimmed.is_empty() || trimmed == "{}" || trimmed == "null" {
            return Err(ApiError::EmptyPayload);
        }
        serde_json::from_str(trimmed).map_err(|e| ApiError::Malformed(e.to_string()))
    }

    /// Fetch and flatten the dataset metadata for an ensemble.
    pub async fn multimeta(&self, query: &MultimetaQuery) -> Result<Vec<DatasetMeta>, ApiError> {
        let response: MultimetaResponse = self.get_json("multimeta", &query.params()).await?;
        let records = crate::types::flatten_multimeta(&response)?;
        log::info!(
            "multimeta: {} records for ensemble {}",
            records.len(),
            query.ensemble_name
        );
        Ok(records)
    }

    /// Fetch one file's time metadata.
    pub async fn metadata(&self, unique_id: &str) -> Result<FileMetadata, ApiError> {
        let params = vec![("model_id", unique_id.to_string())];
        let response: MetadataResponse = self.get_json("metadata", &params).await?;
        response
            .get(unique_id)
            .cloned()
            .ok_or_else(|| ApiError::Malformed(format!("no metadata entry for {}", unique_id)))
    }

    /// Fetch available times for every candidate file, concurrently.
    /// Per-file failures fail the whole lookup; the caller cannot pick a
    /// default time index from a partial answer.
    pub async fn times_for(
        &self,
        unique_ids: &[&str],
    ) -> Result<Vec<(String, BTreeMap<TimeKey, String>)>, ApiError> {
        let lookups = unique_ids.iter().map(|id| async move {
            let file = self.metadata(id).await?;
            Ok::<_, ApiError>((id.to_string(), file.available_times()?))
        });
        join_all(lookups).await.into_iter().collect()
    }

    /// Fetch long-term-average values keyed by run.
    pub async fn data(&self, query: &DataQuery) -> Result<DataResult, ApiError> {
        self.get_json("data", &query.params()).await
    }

    /// Fetch the time-indexed values of one dataset, optionally clipped
    /// to a spatial polygon.
    pub async fn timeseries(&self, query: &TimeseriesQuery) -> Result<TimeseriesResult, ApiError> {
        let result: TimeseriesResult = self.get_json("timeseries", &query.params()).await?;
        if result.data.is_empty() {
            return Err(ApiError::EmptyPayload);
        }
        Ok(result)
    }

    /// Fetch per-file summary statistics.
    pub async fn multistats(&self, query: &DataQuery) -> Result<MultistatsResponse, ApiError> {
        self.get_json("multistats", &query.params()).await
    }
}
