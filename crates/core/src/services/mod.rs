pub mod escape;
pub mod index;
pub mod navigator;
pub mod references;
pub mod render;
pub mod scanner;

pub use escape::{escape, FormattedLiteral};
pub use index::{
    compare_references, Epoch, Filter, IndexEvent, SortColumn, SortDirection, SortSpec,
    StringIndex,
};
pub use navigator::{navigate, CodeView, DebugInfoCodeView, ShowCompletion};
pub use references::StringReferencesService;
pub use render::{PlainRenderer, SignatureRenderer};
pub use scanner::{scan, scan_method, ScanError, ScanMessage, ScanSummary};
