//! Core of `stringref`: finds every string literal load in a set of managed modules and
//! keeps them in a live, filterable, sortable index.
//!
//! - [`model`]: the read-only module graph scans walk, and the reference records.
//! - [`services`]: escaping, the parallel scanner, the index, navigation to source and
//!   the [`services::StringReferencesService`] that ties them together.
//! - [`config`]: search settings loaded from JSON or YAML.

pub mod config;
pub mod model;
pub mod services;
