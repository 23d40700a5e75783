//! Reference records: one per string literal load found during a scan.

use std::fmt;

use once_cell::sync::OnceCell;

use crate::model::{MethodId, MethodRef};
use crate::services::escape::{escape, FormattedLiteral};

/// A literal load as the scanner found it, before it joins the index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawReference {
    pub literal: String,
    pub referrer: MethodRef,
    pub offset: u32,
}

/// Unit of the reference index.
///
/// Immutable after construction except for the display form, which is computed on first
/// access and cached; concurrent first readers observe a single computed value.
pub struct StringReference {
    literal: String,
    referrer: MethodRef,
    offset: u32,
    formatted: OnceCell<FormattedLiteral>,
}

impl StringReference {
    pub fn new(literal: impl Into<String>, referrer: MethodRef, offset: u32) -> Self {
        Self { literal: literal.into(), referrer, offset, formatted: OnceCell::new() }
    }

    pub fn literal(&self) -> &str {
        &self.literal
    }

    pub fn referrer(&self) -> &MethodRef {
        &self.referrer
    }

    /// IL offset of the `ldstr` within the referrer's body.
    pub fn offset(&self) -> u32 {
        self.offset
    }

    /// `(referrer, offset)`: unique within one scan.
    pub fn key(&self) -> (MethodId, u32) {
        (self.referrer.id(), self.offset)
    }

    pub fn formatted(&self) -> &FormattedLiteral {
        self.formatted.get_or_init(|| escape(&self.literal))
    }

    pub fn formatted_literal(&self) -> &str {
        &self.formatted().text
    }

    pub fn is_verbatim(&self) -> bool {
        self.formatted().verbatim
    }

    /// Text a host puts on the clipboard: the raw literal or its escaped display form.
    pub fn copy_text(&self, raw: bool) -> &str {
        if raw {
            &self.literal
        } else {
            self.formatted_literal()
        }
    }
}

impl From<RawReference> for StringReference {
    fn from(raw: RawReference) -> Self {
        Self::new(raw.literal, raw.referrer, raw.offset)
    }
}

impl fmt::Debug for StringReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StringReference")
            .field("literal", &self.literal)
            .field("referrer", &self.referrer)
            .field("offset", &format_args!("IL_{:04X}", self.offset))
            .finish()
    }
}
