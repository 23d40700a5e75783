use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::debug;
use serde::Serialize;
use stringref_core::config::{load_search_config, SearchConfig};
use stringref_core::model::StringReference;
use stringref_core::services::{
    SignatureRenderer, SortColumn, SortDirection, SortSpec, StringReferencesService,
};

use crate::{il_label, load_module_dumps};

/// Options shared by every command that scans modules.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct SearchArgs {
    /// Module dump (JSON) to scan. May be repeated.
    #[arg(long = "input", required = true)]
    pub inputs: Vec<PathBuf>,

    /// Search config file (json, yaml or yml).
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Case-insensitive substring to match against the formatted literal.
    #[arg(long)]
    pub filter: Option<String>,

    /// Sort column: literal, method or module.
    #[arg(long)]
    pub sort: Option<SortColumn>,

    /// Sort descending instead of ascending.
    #[arg(long, default_value_t = false)]
    pub desc: bool,

    /// Number of scan worker threads.
    #[arg(long)]
    pub threads: Option<usize>,
}

impl SearchArgs {
    /// Config file values, overridden by any flags given on the command line.
    pub fn resolve_config(&self) -> Result<SearchConfig> {
        let mut config = load_config(self.config.as_deref())?;
        if let Some(filter) = &self.filter {
            config.filter = filter.clone();
        }
        if let Some(column) = self.sort {
            let direction =
                if self.desc { SortDirection::Descending } else { SortDirection::Ascending };
            config.sort = SortSpec::new(column, direction);
        } else if self.desc {
            if let Some(column) = config.sort.column {
                config.sort = SortSpec::descending(column);
            }
        }
        if self.threads.is_some() {
            config.worker_threads = self.threads;
        }
        Ok(config)
    }
}

pub fn load_config(path: Option<&Path>) -> Result<SearchConfig> {
    match path {
        Some(path) => load_search_config(path),
        None => Ok(SearchConfig::default()),
    }
}

/// Load the dumps, scan them, and return the service once the scan has finished.
pub fn run_search(args: &SearchArgs) -> Result<(SearchConfig, StringReferencesService)> {
    let config = args.resolve_config()?;
    let modules = load_module_dumps(&args.inputs)?;
    debug!("loaded {} modules from {} dump files", modules.len(), args.inputs.len());
    let mut service =
        StringReferencesService::new(&config).context("Failed to start scan workers")?;
    service.analyze(modules);
    service.wait_for_scan();
    Ok((config, service))
}

/// One output row of the reference table.
#[derive(Debug, Clone, Serialize)]
pub struct ReferenceRow {
    pub literal: String,
    pub formatted: String,
    pub verbatim: bool,
    pub method: String,
    pub module: String,
    pub offset: u32,
}

impl ReferenceRow {
    pub fn new(reference: &StringReference, renderer: &dyn SignatureRenderer) -> Self {
        Self {
            literal: reference.literal().to_string(),
            formatted: reference.formatted_literal().to_string(),
            verbatim: reference.is_verbatim(),
            method: renderer.method_signature(reference.referrer()),
            module: renderer.module_name(reference.referrer()),
            offset: reference.offset(),
        }
    }

    /// `[method @ IL_xxxx] module`
    pub fn location(&self) -> String {
        format!("[{} @ {}] {}", self.method, il_label(self.offset), self.module)
    }
}
