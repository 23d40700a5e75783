//! Parallel literal scan over module types.
//!
//! Work is split per type: every type is scanned on a rayon worker, its references are
//! accumulated locally and handed to the consumer context as one batch. Methods whose
//! bodies fail validation are skipped without affecting their siblings.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use crossbeam::channel::Sender;
use log::{debug, trace};
use rayon::prelude::*;
use rayon::ThreadPool;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{BodyError, MethodRef, ModuleDef, RawReference, StringReference};
use crate::services::index::Epoch;

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Failed to build scan worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
}

/// Message posted by scan workers to the consumer context.
#[derive(Debug)]
pub enum ScanMessage {
    Batch { epoch: Epoch, references: Vec<StringReference> },
    Finished(ScanSummary),
}

/// Totals reported once every type of a scan has been visited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ScanSummary {
    pub epoch: Epoch,
    pub types_scanned: usize,
    pub methods_scanned: usize,
    pub methods_skipped: usize,
    pub references: usize,
}

#[derive(Default)]
struct Counters {
    types: AtomicUsize,
    methods: AtomicUsize,
    skipped: AtomicUsize,
    references: AtomicUsize,
}

impl Counters {
    fn summary(&self, epoch: Epoch) -> ScanSummary {
        ScanSummary {
            epoch,
            types_scanned: self.types.load(Ordering::Relaxed),
            methods_scanned: self.methods.load(Ordering::Relaxed),
            methods_skipped: self.skipped.load(Ordering::Relaxed),
            references: self.references.load(Ordering::Relaxed),
        }
    }
}

/// Literal loads of one method, in instruction order.
pub fn scan_method(method: &MethodRef) -> Result<Vec<RawReference>, BodyError> {
    let instructions = method.method().instructions()?;
    Ok(instructions
        .iter()
        .filter_map(|insn| {
            insn.string_literal().map(|literal| RawReference {
                literal: literal.to_string(),
                referrer: method.clone(),
                offset: insn.offset,
            })
        })
        .collect())
}

fn scan_type(
    module: &Arc<ModuleDef>,
    ordinal: u32,
    type_index: usize,
    counters: &Counters,
) -> Vec<StringReference> {
    let mut batch = Vec::new();
    let method_count = module.types[type_index].methods.len();
    for method_index in 0..method_count {
        let Some(method) = MethodRef::new(Arc::clone(module), ordinal, type_index, method_index)
        else {
            continue;
        };
        if !method.method().has_body() {
            continue;
        }
        match scan_method(&method) {
            Ok(found) => {
                counters.methods.fetch_add(1, Ordering::Relaxed);
                batch.extend(found.into_iter().map(StringReference::from));
            }
            Err(err) => {
                counters.skipped.fetch_add(1, Ordering::Relaxed);
                debug!("Skipping {:?}: {err}", method);
            }
        }
    }
    counters.types.fetch_add(1, Ordering::Relaxed);
    counters.references.fetch_add(batch.len(), Ordering::Relaxed);
    batch
}

/// Every `(module ordinal, type index)` pair of the scan set.
fn work_items(modules: &[Arc<ModuleDef>]) -> Vec<(usize, usize)> {
    modules
        .iter()
        .enumerate()
        .flat_map(|(m, module)| (0..module.types.len()).map(move |t| (m, t)))
        .collect()
}

/// Scan `modules` on the current rayon pool and collect every reference.
///
/// Order of the result is unspecified across types.
pub fn scan(modules: &[Arc<ModuleDef>]) -> Vec<StringReference> {
    let counters = Counters::default();
    work_items(modules)
        .par_iter()
        .flat_map_iter(|&(m, t)| scan_type(&modules[m], m as u32, t, &counters))
        .collect()
}

/// A scan bound to one analysis epoch, streaming batches to the consumer context.
pub(crate) struct ScanJob {
    pub(crate) modules: Vec<Arc<ModuleDef>>,
    pub(crate) epoch: Epoch,
    pub(crate) live_epoch: Arc<AtomicU64>,
    pub(crate) sender: Sender<ScanMessage>,
}

impl ScanJob {
    /// Start the scan on `pool` and return immediately.
    pub(crate) fn spawn(self, pool: &ThreadPool) {
        pool.spawn(move || self.run());
    }

    fn is_stale(&self) -> bool {
        self.live_epoch.load(Ordering::Acquire) != self.epoch.value()
    }

    fn run(self) {
        let counters = Counters::default();
        let items = work_items(&self.modules);
        items.par_iter().for_each_with(self.sender.clone(), |tx, &(m, t)| {
            // A newer analysis has started; nothing from this one will be shown.
            if self.is_stale() {
                return;
            }
            let batch = scan_type(&self.modules[m], m as u32, t, &counters);
            if batch.is_empty() {
                return;
            }
            trace!("epoch {}: flushing {} references", self.epoch.value(), batch.len());
            // The receiver only disappears when the owning service is dropped.
            let _ = tx.send(ScanMessage::Batch { epoch: self.epoch, references: batch });
        });
        let summary = counters.summary(self.epoch);
        debug!(
            "epoch {}: scanned {} types, {} methods ({} skipped), {} references",
            summary.epoch.value(),
            summary.types_scanned,
            summary.methods_scanned,
            summary.methods_skipped,
            summary.references
        );
        let _ = self.sender.send(ScanMessage::Finished(summary));
    }
}
