//! Backend query client and fetch orchestration.
//!
//! [`types`] mirrors the backend's `multimeta` / `metadata` / `data` /
//! `timeseries` / `multistats` responses and flattens them into the
//! workspace's data model. [`error::ApiError`] carries the three-way
//! network error taxonomy (error status / no response / other) plus
//! response-validation failures. [`loader::Loader`] implements the
//! fetch-orchestration contract: the most recently issued fetch for a
//! resource wins, and superseded in-flight completions are discarded.
//!
//! The HTTP client itself lives behind the `api` feature so the data
//! model stays portable.

pub mod error;
pub mod loader;
pub mod types;

#[cfg(feature = "api")]
pub mod client;

pub use error::ApiError;
