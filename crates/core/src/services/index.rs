//! The live reference index and its filtered, sorted projection.
//!
//! Records are kept in insertion order; what a UI shows is `visible`, a list of record
//! positions that is always recomputable from the records plus the current filter and
//! sort. Only the consumer context mutates an index.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use log::{debug, trace};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::StringReference;

/// Token identifying one analysis run.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct Epoch(u64);

impl Epoch {
    pub fn value(self) -> u64 {
        self.0
    }

    pub fn next(self) -> Self {
        Epoch(self.0 + 1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortColumn {
    Literal,
    Method,
    Module,
}

impl SortColumn {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortColumn::Literal => "literal",
            SortColumn::Method => "method",
            SortColumn::Module => "module",
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Invalid sort column '{0}'. Allowed: literal, method, module")]
pub struct ParseSortColumnError(String);

impl FromStr for SortColumn {
    type Err = ParseSortColumnError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "literal" => Ok(SortColumn::Literal),
            "method" => Ok(SortColumn::Method),
            "module" => Ok(SortColumn::Module),
            other => Err(ParseSortColumnError(other.to_string())),
        }
    }
}

impl fmt::Display for SortColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    #[default]
    Default,
    Ascending,
    Descending,
}

/// Active sort: a column and a direction. No column, or `Default`, means records are
/// ordered by referrer and offset only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct SortSpec {
    #[serde(default)]
    pub column: Option<SortColumn>,
    #[serde(default)]
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn new(column: SortColumn, direction: SortDirection) -> Self {
        Self { column: Some(column), direction }
    }

    pub fn ascending(column: SortColumn) -> Self {
        Self::new(column, SortDirection::Ascending)
    }

    pub fn descending(column: SortColumn) -> Self {
        Self::new(column, SortDirection::Descending)
    }
}

/// Total order over references under `sort`.
///
/// The column key is compared ordinally and inverted for `Descending`; ties fall back to
/// `(referrer, offset)` ascending, so distinct records never compare equal.
pub fn compare_references(a: &StringReference, b: &StringReference, sort: SortSpec) -> Ordering {
    let primary = match (sort.column, sort.direction) {
        (Some(column), SortDirection::Ascending) => compare_column(column, a, b),
        (Some(column), SortDirection::Descending) => compare_column(column, b, a),
        _ => Ordering::Equal,
    };
    primary.then_with(|| a.key().cmp(&b.key()))
}

fn compare_column(column: SortColumn, a: &StringReference, b: &StringReference) -> Ordering {
    match column {
        SortColumn::Module => a.referrer().module_name().cmp(b.referrer().module_name()),
        SortColumn::Method => {
            let (ra, rb) = (a.referrer(), b.referrer());
            ra.declaring_type()
                .name
                .cmp(&rb.declaring_type().name)
                .then_with(|| ra.name().cmp(rb.name()))
        }
        SortColumn::Literal => a.literal().cmp(b.literal()),
    }
}

/// Case-insensitive substring predicate over the formatted literal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    text: String,
    folded: String,
}

impl Filter {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let folded = fold_case(&text);
        Self { text, folded }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn matches(&self, reference: &StringReference) -> bool {
        self.folded.is_empty()
            || fold_case(reference.formatted_literal()).contains(&self.folded)
    }
}

/// Lowercase one `char` at a time. A char whose lowercase form is longer than one char
/// is kept as is, so folded text lines up with the original char for char.
fn fold_case(text: &str) -> String {
    text.chars()
        .map(|c| {
            let mut lower = c.to_lowercase();
            match (lower.next(), lower.next()) {
                (Some(single), None) => single,
                _ => c,
            }
        })
        .collect()
}

/// Change notification delivered to index observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexEvent {
    Cleared { epoch: Epoch },
    /// A batch was appended; `visible` of its records passed the filter.
    Added { count: usize, visible: usize },
    /// Filter or sort changed; the whole projection should be re-read.
    ViewReset,
}

type Observer = Box<dyn FnMut(&IndexEvent) + Send>;

/// Insertion-ordered references plus the filter and sort that project them.
#[derive(Default)]
pub struct StringIndex {
    epoch: Epoch,
    records: Vec<Arc<StringReference>>,
    filter: Filter,
    sort: SortSpec,
    visible: Vec<usize>,
    observers: Vec<Observer>,
}

impl StringIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Epoch whose batches are currently accepted.
    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    /// Drop every record and start a new epoch; batches from older epochs are ignored
    /// from now on.
    pub fn clear(&mut self) -> Epoch {
        self.epoch = self.epoch.next();
        self.records.clear();
        self.visible.clear();
        self.notify(IndexEvent::Cleared { epoch: self.epoch });
        self.epoch
    }

    /// Append a batch produced for `epoch`. Returns `false` when the batch is stale and
    /// was discarded.
    pub fn add_batch(&mut self, epoch: Epoch, batch: Vec<StringReference>) -> bool {
        if epoch != self.epoch {
            debug!(
                "Dropping {} references from stale epoch {} (current {})",
                batch.len(),
                epoch.value(),
                self.epoch.value()
            );
            return false;
        }
        if batch.is_empty() {
            return true;
        }

        let start = self.records.len();
        self.records.extend(batch.into_iter().map(Arc::new));
        let mut added: Vec<usize> = (start..self.records.len())
            .filter(|&i| self.filter.matches(&self.records[i]))
            .collect();
        let count = self.records.len() - start;
        let visible = added.len();

        let records = &self.records;
        let sort = self.sort;
        added.sort_unstable_by(|&a, &b| compare_references(&records[a], &records[b], sort));
        let current = std::mem::take(&mut self.visible);
        self.visible = merge_sorted(current, added, |a, b| {
            compare_references(&records[a], &records[b], sort)
        });

        trace!("Added {count} references ({visible} visible), {} total", self.records.len());
        self.notify(IndexEvent::Added { count, visible });
        true
    }

    pub fn filter_text(&self) -> &str {
        self.filter.text()
    }

    /// Replace the filter and re-evaluate it over every record.
    pub fn set_filter(&mut self, text: impl Into<String>) {
        let text = text.into();
        if text == self.filter.text() {
            return;
        }
        self.filter = Filter::new(text);
        self.rebuild();
    }

    pub fn sort(&self) -> SortSpec {
        self.sort
    }

    pub fn set_sort(&mut self, sort: SortSpec) {
        if sort == self.sort {
            return;
        }
        self.sort = sort;
        self.sort_visible();
        self.notify(IndexEvent::ViewReset);
    }

    /// Number of records, visible or not.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// All records in insertion order.
    pub fn records(&self) -> impl ExactSizeIterator<Item = &Arc<StringReference>> + '_ {
        self.records.iter()
    }

    pub fn visible_len(&self) -> usize {
        self.visible.len()
    }

    /// The filtered, sorted projection.
    pub fn visible(&self) -> impl ExactSizeIterator<Item = &Arc<StringReference>> + '_ {
        self.visible.iter().map(|&i| &self.records[i])
    }

    pub fn visible_at(&self, position: usize) -> Option<&Arc<StringReference>> {
        self.visible.get(position).map(|&i| &self.records[i])
    }

    /// Register a callback invoked after every mutation of the index.
    pub fn subscribe(&mut self, observer: impl FnMut(&IndexEvent) + Send + 'static) {
        self.observers.push(Box::new(observer));
    }

    fn rebuild(&mut self) {
        let filter = &self.filter;
        self.visible = self
            .records
            .iter()
            .enumerate()
            .filter(|(_, r)| filter.matches(r))
            .map(|(i, _)| i)
            .collect();
        self.sort_visible();
        self.notify(IndexEvent::ViewReset);
    }

    fn sort_visible(&mut self) {
        let records = &self.records;
        let sort = self.sort;
        self.visible.sort_unstable_by(|&a, &b| compare_references(&records[a], &records[b], sort));
    }

    fn notify(&mut self, event: IndexEvent) {
        for observer in &mut self.observers {
            observer(&event);
        }
    }
}

impl fmt::Debug for StringIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StringIndex")
            .field("epoch", &self.epoch)
            .field("records", &self.records.len())
            .field("visible", &self.visible.len())
            .field("filter", &self.filter.text())
            .field("sort", &self.sort)
            .finish()
    }
}

fn merge_sorted(
    left: Vec<usize>,
    right: Vec<usize>,
    mut cmp: impl FnMut(usize, usize) -> Ordering,
) -> Vec<usize> {
    let mut merged = Vec::with_capacity(left.len() + right.len());
    let (mut i, mut j) = (0, 0);
    while i < left.len() && j < right.len() {
        if cmp(left[i], right[j]) == Ordering::Greater {
            merged.push(right[j]);
            j += 1;
        } else {
            merged.push(left[i]);
            i += 1;
        }
    }
    merged.extend_from_slice(&left[i..]);
    merged.extend_from_slice(&right[j..]);
    merged
}
