//! The string references service: owns the index and drives scans.
//!
//! The service is the single consumer context. Scans run on a rayon pool and post
//! batches over a channel; nothing reaches the index until the owner calls [`pump`] or
//! [`wait_for_scan`], so the index is only ever mutated from the owning thread.
//!
//! [`pump`]: StringReferencesService::pump
//! [`wait_for_scan`]: StringReferencesService::wait_for_scan

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crossbeam::channel::{unbounded, Receiver, Sender};
use log::{debug, info};
use rayon::ThreadPool;

use crate::config::SearchConfig;
use crate::model::{ModuleDef, StringReference};
use crate::services::index::{Epoch, SortSpec, StringIndex};
use crate::services::navigator::{navigate, CodeView};
use crate::services::scanner::{ScanError, ScanJob, ScanMessage, ScanSummary};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Idle,
    Running(Epoch),
    Done(ScanSummary),
}

pub struct StringReferencesService {
    index: StringIndex,
    pool: Arc<ThreadPool>,
    live_epoch: Arc<AtomicU64>,
    sender: Sender<ScanMessage>,
    receiver: Receiver<ScanMessage>,
    selected_modules: Vec<Arc<ModuleDef>>,
    current: Option<Arc<StringReference>>,
    state: ScanState,
}

impl StringReferencesService {
    /// Build a service with its own worker pool, applying the configured filter and sort.
    pub fn new(config: &SearchConfig) -> Result<Self, ScanError> {
        let pool = config.build_pool()?;
        let mut service = Self::with_pool(Arc::new(pool));
        service.set_filter(config.filter.clone());
        service.set_sort(config.sort);
        Ok(service)
    }

    pub fn with_pool(pool: Arc<ThreadPool>) -> Self {
        let (sender, receiver) = unbounded();
        Self {
            index: StringIndex::new(),
            pool,
            live_epoch: Arc::new(AtomicU64::new(0)),
            sender,
            receiver,
            selected_modules: Vec::new(),
            current: None,
            state: ScanState::Idle,
        }
    }

    pub fn index(&self) -> &StringIndex {
        &self.index
    }

    /// Mutable access for subscribing observers.
    pub fn index_mut(&mut self) -> &mut StringIndex {
        &mut self.index
    }

    pub fn selected_modules(&self) -> &[Arc<ModuleDef>] {
        &self.selected_modules
    }

    /// Replace the module selection and start scanning it.
    pub fn analyze(&mut self, modules: impl IntoIterator<Item = Arc<ModuleDef>>) -> Epoch {
        self.selected_modules = modules.into_iter().collect();
        self.analyze_selected()
    }

    pub fn analyze_module(&mut self, module: Arc<ModuleDef>) -> Epoch {
        self.analyze([module])
    }

    /// Scan the current selection again from scratch.
    pub fn refresh(&mut self) -> Epoch {
        self.analyze_selected()
    }

    fn analyze_selected(&mut self) -> Epoch {
        let epoch = self.index.clear();
        self.live_epoch.store(epoch.value(), Ordering::Release);
        self.current = None;

        let dropped = self.receiver.try_iter().count();
        if dropped > 0 {
            debug!("Discarded {dropped} queued messages from earlier scans");
        }

        info!(
            "Scanning {} module(s) for string references (epoch {})",
            self.selected_modules.len(),
            epoch.value()
        );
        self.state = ScanState::Running(epoch);
        ScanJob {
            modules: self.selected_modules.clone(),
            epoch,
            live_epoch: Arc::clone(&self.live_epoch),
            sender: self.sender.clone(),
        }
        .spawn(&self.pool);
        epoch
    }

    /// Apply every queued batch without blocking. Returns the number of batches applied.
    pub fn pump(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(message) = self.receiver.try_recv() {
            if self.apply(message) {
                applied += 1;
            }
        }
        applied
    }

    /// Block until the current scan completes, applying batches as they arrive.
    ///
    /// Returns `None` when no analysis has been started.
    pub fn wait_for_scan(&mut self) -> Option<ScanSummary> {
        loop {
            match self.state {
                ScanState::Idle => return None,
                ScanState::Done(summary) => return Some(summary),
                ScanState::Running(_) => {}
            }
            // The service holds a sender, so the channel never disconnects here.
            let message = self.receiver.recv().ok()?;
            self.apply(message);
        }
    }

    pub fn is_scanning(&self) -> bool {
        matches!(self.state, ScanState::Running(_))
    }

    /// Summary of the last completed scan of the current epoch.
    pub fn last_summary(&self) -> Option<ScanSummary> {
        match self.state {
            ScanState::Done(summary) => Some(summary),
            _ => None,
        }
    }

    fn apply(&mut self, message: ScanMessage) -> bool {
        match message {
            ScanMessage::Batch { epoch, references } => self.index.add_batch(epoch, references),
            ScanMessage::Finished(summary) => {
                if self.state == ScanState::Running(summary.epoch) {
                    info!(
                        "Found {} string references in {} types (epoch {})",
                        summary.references,
                        summary.types_scanned,
                        summary.epoch.value()
                    );
                    self.state = ScanState::Done(summary);
                }
                false
            }
        }
    }

    pub fn set_filter(&mut self, text: impl Into<String>) {
        self.index.set_filter(text);
    }

    pub fn set_sort(&mut self, sort: SortSpec) {
        self.index.set_sort(sort);
    }

    /// The visible projection, in display order.
    pub fn visible(&self) -> impl ExactSizeIterator<Item = &Arc<StringReference>> + '_ {
        self.index.visible()
    }

    /// Select the visible row at `position`; out-of-range positions clear the selection.
    pub fn select(&mut self, position: usize) -> Option<&Arc<StringReference>> {
        self.current = self.index.visible_at(position).cloned();
        self.current.as_ref()
    }

    pub fn current_reference(&self) -> Option<&Arc<StringReference>> {
        self.current.as_ref()
    }

    pub fn follow_reference(
        &self,
        reference: &StringReference,
        new_tab: bool,
        view: &dyn CodeView,
    ) -> bool {
        navigate(view, reference, new_tab)
    }

    /// Follow the current selection; `false` when nothing is selected.
    pub fn follow_selected(&self, new_tab: bool, view: &dyn CodeView) -> bool {
        match &self.current {
            Some(reference) => self.follow_reference(reference, new_tab, view),
            None => false,
        }
    }
}
