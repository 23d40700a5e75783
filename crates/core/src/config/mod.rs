use std::path::Path;

use anyhow::{anyhow, Context, Result};
use rayon::{ThreadPool, ThreadPoolBuilder};
use serde::{Deserialize, Serialize};

use crate::services::index::SortSpec;
use crate::services::scanner::ScanError;

/// Serializable settings for a string reference search.
///
/// Typically stored next to the modules being inspected as `stringref.json` or
/// `stringref.yaml`. Every field is optional in the file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Scan worker count; `None` lets rayon pick one per core.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub worker_threads: Option<usize>,
    /// Initial filter text.
    pub filter: String,
    /// Initial sort.
    pub sort: SortSpec,
    /// Whether following a reference opens a new tab by default.
    pub new_tab: bool,
}

impl SearchConfig {
    /// Build the worker pool scans run on.
    pub fn build_pool(&self) -> Result<ThreadPool, ScanError> {
        let mut builder =
            ThreadPoolBuilder::new().thread_name(|i| format!("stringref-scan-{i}"));
        if let Some(threads) = self.worker_threads {
            builder = builder.num_threads(threads);
        }
        Ok(builder.build()?)
    }
}

/// Config file encodings, picked by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    Yaml,
}

impl ConfigFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Some(ConfigFormat::Json),
            Some("yaml" | "yml") => Some(ConfigFormat::Yaml),
            _ => None,
        }
    }
}

pub fn parse_search_config(body: &str, format: ConfigFormat) -> Result<SearchConfig> {
    match format {
        ConfigFormat::Json => {
            serde_json::from_str(body).context("Failed to parse search config JSON")
        }
        ConfigFormat::Yaml => {
            serde_yaml::from_str(body).context("Failed to parse search config YAML")
        }
    }
}

/// Load a search config from a `.json`, `.yaml` or `.yml` file.
pub fn load_search_config(path: &Path) -> Result<SearchConfig> {
    let format = ConfigFormat::from_path(path).ok_or_else(|| {
        anyhow!("Unsupported config format for {} (expected json, yaml or yml)", path.display())
    })?;
    let body = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read search config at {}", path.display()))?;
    parse_search_config(&body, format)
        .with_context(|| format!("Invalid search config at {}", path.display()))
}
