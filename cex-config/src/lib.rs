//! Process-wide configuration: backend location from the environment and
//! per-variable display options from a YAML document.
//!
//! The variable-options document is loaded once at startup (from disk or
//! an HTTP-served resource, the caller's choice) and installed into
//! read-only process state with [`install`]. Lookups before installation
//! fall back to built-in defaults so library code never has to thread a
//! config handle through every call.

use cex_core::precision::DEFAULT_PRECISION;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::sync::OnceLock;
use thiserror::Error;

/// Environment variable naming the backend base URL.
pub const BACKEND_URL_VAR: &str = "CE_BACKEND_URL";
/// Environment variable naming the default ensemble.
pub const ENSEMBLE_VAR: &str = "CE_ENSEMBLE_NAME";
/// Ensemble used when `CE_ENSEMBLE_NAME` is unset.
pub const DEFAULT_ENSEMBLE: &str = "ce_files";

/// Palette used for raster layers of variables with no configured
/// override.
pub const DEFAULT_PALETTE: &str = "x-Occam";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("environment variable {0} is not set")]
    MissingEnv(&'static str),
    #[error("variable options already installed")]
    AlreadyInstalled,
    #[error("failed to parse variable options: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("failed to fetch variable options: {0}")]
    Fetch(String),
}

/// Backend connection settings, read from the process environment at
/// startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub backend_url: String,
    pub ensemble: String,
}

impl Config {
    /// Read settings from the environment. The backend URL is required;
    /// the ensemble falls back to [`DEFAULT_ENSEMBLE`].
    pub fn from_env() -> Result<Self, ConfigError> {
        let backend_url = env::var(BACKEND_URL_VAR)
            .map_err(|_| ConfigError::MissingEnv(BACKEND_URL_VAR))?
            .trim_end_matches('/')
            .to_string();
        let ensemble = env::var(ENSEMBLE_VAR).unwrap_or_else(|_| DEFAULT_ENSEMBLE.to_string());
        Ok(Config { backend_url, ensemble })
    }
}

/// Display options for one variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VariableDisplay {
    /// Palette applied to raster layers of this variable.
    pub default_palette: String,
    /// Whether the variable may be rendered on a logarithmic color scale.
    pub logscale: bool,
    /// Decimal places for tooltips and exports; `None` means the global
    /// default.
    pub decimal_precision: Option<usize>,
    /// Variables whose annual cycle cannot be overlaid with this one.
    pub shift_annual_cycle_conflicts: Vec<String>,
}

impl Default for VariableDisplay {
    fn default() -> Self {
        VariableDisplay {
            default_palette: DEFAULT_PALETTE.to_string(),
            logscale: false,
            decimal_precision: None,
            shift_annual_cycle_conflicts: Vec::new(),
        }
    }
}

/// The per-variable display option table, keyed by variable id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VariableOptions {
    #[serde(default)]
    pub variables: BTreeMap<String, VariableDisplay>,
}

impl VariableOptions {
    /// Parse the YAML variable-options document.
    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// Fetch and parse the HTTP-served variable-options document.
    #[cfg(feature = "api")]
    pub async fn fetch(url: &str) -> Result<Self, ConfigError> {
        let response = reqwest::get(url)
            .await
            .map_err(|e| ConfigError::Fetch(e.to_string()))?;
        if !response.status().is_success() {
            return Err(ConfigError::Fetch(format!(
                "server returned status {}",
                response.status()
            )));
        }
        let text = response
            .text()
            .await
            .map_err(|e| ConfigError::Fetch(e.to_string()))?;
        Self::from_yaml(&text)
    }

    /// Options for a variable, or the built-in defaults.
    pub fn display_for(&self, variable_id: &str) -> VariableDisplay {
        self.variables
            .get(variable_id)
            .cloned()
            .unwrap_or_default()
    }
}

static INSTALLED: OnceLock<VariableOptions> = OnceLock::new();

/// Install the variable-options table for the rest of the process.
/// Installing twice is an error; configuration is load-once by design.
pub fn install(options: VariableOptions) -> Result<(), ConfigError> {
    log::info!(
        "installing display options for {} variables",
        options.variables.len()
    );
    INSTALLED
        .set(options)
        .map_err(|_| ConfigError::AlreadyInstalled)
}

/// The installed variable options, or an empty table when nothing has
/// been installed (every lookup then yields built-in defaults).
pub fn variable_options() -> &'static VariableOptions {
    static EMPTY: OnceLock<VariableOptions> = OnceLock::new();
    INSTALLED
        .get()
        .unwrap_or_else(|| EMPTY.get_or_init(VariableOptions::default))
}

/// Decimal places for a variable's displayed values.
pub fn precision_for(variable_id: &str) -> usize {
    variable_options()
        .display_for(variable_id)
        .decimal_precision
        .unwrap_or(DEFAULT_PRECISION)
}

/// Default raster palette for a variable.
pub fn palette_for(variable_id: &str) -> String {
    variable_options().display_for(variable_id).default_palette
}

/// Whether a variable is eligible for logarithmic color scaling.
pub fn logscale_eligible(variable_id: &str) -> bool {
    variable_options().display_for(variable_id).logscale
}

/// Variables whose annual cycles conflict with the given one.
pub fn conflicts_for(variable_id: &str) -> Vec<String> {
    variable_options()
        .display_for(variable_id)
        .shift_annual_cycle_conflicts
}
