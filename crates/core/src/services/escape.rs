//! Source-style rendering of literal text.
//!
//! Literals that contain a backslash but no control characters are shown in verbatim
//! form (`@"C:\temp"`); everything else uses the quoted, escaped form.

use std::cell::RefCell;
use std::fmt::Write;

use serde::{Deserialize, Serialize};

/// Display form of a literal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormattedLiteral {
    pub text: String,
    pub verbatim: bool,
}

thread_local! {
    static SCRATCH: RefCell<String> = const { RefCell::new(String::new()) };
}

/// Render `literal` as it would appear in source.
pub fn escape(literal: &str) -> FormattedLiteral {
    let verbatim = can_use_verbatim(literal);
    let text = SCRATCH.with(|cell| {
        let mut buf = cell.borrow_mut();
        buf.clear();
        if verbatim {
            write_verbatim(&mut buf, literal);
        } else {
            write_quoted(&mut buf, literal);
        }
        buf.clone()
    });
    FormattedLiteral { text, verbatim }
}

fn can_use_verbatim(s: &str) -> bool {
    let mut found_backslash = false;
    for c in s.chars() {
        match c {
            '\\' => found_backslash = true,
            // Newline-class characters with no control category.
            '\u{2028}' | '\u{2029}' => return false,
            c if c.is_control() => return false,
            _ => {}
        }
    }
    found_backslash
}

fn write_quoted(buf: &mut String, s: &str) {
    buf.reserve(s.len() + 2);
    buf.push('"');
    for c in s.chars() {
        match c {
            '\u{07}' => buf.push_str("\\a"),
            '\u{08}' => buf.push_str("\\b"),
            '\u{0C}' => buf.push_str("\\f"),
            '\n' => buf.push_str("\\n"),
            '\r' => buf.push_str("\\r"),
            '\t' => buf.push_str("\\t"),
            '\u{0B}' => buf.push_str("\\v"),
            '\0' => buf.push_str("\\0"),
            '\\' => buf.push_str("\\\\"),
            '"' => buf.push_str("\\\""),
            c if c.is_control() => {
                // Writing into a String cannot fail.
                let _ = write!(buf, "\\u{:04X}", c as u32);
            }
            c => buf.push(c),
        }
    }
    buf.push('"');
}

fn write_verbatim(buf: &mut String, s: &str) {
    buf.reserve(s.len() + 3);
    buf.push_str("@\"");
    for c in s.chars() {
        if c == '"' {
            buf.push_str("\"\"");
        } else {
            buf.push(c);
        }
    }
    buf.push('"');
}
