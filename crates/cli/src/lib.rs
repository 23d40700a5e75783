use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Deserialize;
use stringref_core::model::ModuleDef;

pub mod commands;

/// A module dump file holds either one module or a list of them.
#[derive(Deserialize)]
#[serde(untagged)]
enum ModuleDump {
    Many(Vec<ModuleDef>),
    One(ModuleDef),
}

/// Load module graphs from JSON dump files, in the order given.
pub fn load_module_dumps<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<Arc<ModuleDef>>> {
    let mut modules = Vec::new();
    for path in paths {
        let path = path.as_ref();
        let body = fs::read_to_string(path)
            .with_context(|| format!("Failed to read module dump at {}", path.display()))?;
        let dump: ModuleDump = serde_json::from_str(&body)
            .with_context(|| format!("Failed to parse module dump JSON at {}", path.display()))?;
        match dump {
            ModuleDump::Many(list) => modules.extend(list.into_iter().map(Arc::new)),
            ModuleDump::One(module) => modules.push(Arc::new(module)),
        }
    }
    Ok(modules)
}

/// IL offset label as shown in disassembly listings.
pub fn il_label(offset: u32) -> String {
    format!("IL_{offset:04X}")
}
