//! Method extraction for smali class files.
//!
//! The scanner walks the input one line at a time with a three-state machine (header,
//! between methods, inside a method). Only two directives are structural here: `.method`
//! opens a method and `.end method` closes it. Everything else is carried along as opaque text.
//! Framing mistakes (a nested `.method`, a stray `.end method`, or a method still open at end
//! of input) are reported with their line number instead of being matched around.

use crate::result::{Error, Result};
use crate::{is_method_end, is_method_start};
use tracing::debug;

/// Raw text of one method, from its `.method` line through its `.end method` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodSource {
    /// 1-based line of the `.method` directive in the scanned input.
    pub line: usize,
    /// Every line of the method, declaration and terminator included.
    pub lines: Vec<String>,
}

impl MethodSource {
    /// The `.method` declaration line.
    pub fn declaration(&self) -> &str {
        self.lines.first().map(String::as_str).unwrap_or_default()
    }

    /// Method text joined with `\n`, without a trailing newline.
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }
}

/// A top-level piece of the input following the header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceItem {
    /// A complete method.
    Method(MethodSource),
    /// A run of lines outside any method (fields, comments, blank lines).
    Text(Vec<String>),
}

/// A scanned smali file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SmaliSource {
    /// Lines preceding the first method (class, super, source, implements, fields...).
    pub header: Vec<String>,
    /// Methods and interstitial text, in document order.
    pub items: Vec<SourceItem>,
}

impl SmaliSource {
    /// Iterates over the extracted methods in document order.
    pub fn methods(&self) -> impl Iterator<Item = &MethodSource> {
        self.items.iter().filter_map(|item| match item {
            SourceItem::Method(method) => Some(method),
            SourceItem::Text(_) => None,
        })
    }

    /// Number of extracted methods.
    pub fn method_count(&self) -> usize {
        self.methods().count()
    }
}

#[derive(Debug, Clone, Copy)]
enum ScanState {
    Header,
    Between,
    InMethod { start: usize },
}

/// Splits `text` into its header, methods and interstitial text.
///
/// Each method is the shortest span starting at a `.method` line and ending at the next
/// `.end method` line. Input without any method is returned as header only.
pub fn scan_source(text: &str) -> Result<SmaliSource> {
    let mut source = SmaliSource::default();
    let mut state = ScanState::Header;
    let mut pending: Vec<String> = Vec::new();

    for (idx, raw) in text.lines().enumerate() {
        let line_no = idx + 1;

        state = match state {
            ScanState::Header | ScanState::Between if is_method_start(raw) => {
                if matches!(state, ScanState::Header) {
                    source.header = std::mem::take(&mut pending);
                } else if !pending.is_empty() {
                    source
                        .items
                        .push(SourceItem::Text(std::mem::take(&mut pending)));
                }
                pending.push(raw.to_string());
                ScanState::InMethod { start: line_no }
            }
            ScanState::Header | ScanState::Between if is_method_end(raw) => {
                return Err(Error::UnexpectedMethodEnd { line: line_no });
            }
            ScanState::InMethod { start } if is_method_start(raw) => {
                return Err(Error::NestedMethod {
                    line: line_no,
                    open: start,
                });
            }
            ScanState::InMethod { start } if is_method_end(raw) => {
                pending.push(raw.to_string());
                let method = MethodSource {
                    line: start,
                    lines: std::mem::take(&mut pending),
                };
                debug!(
                    line = start,
                    lines = method.lines.len(),
                    "extracted method {}",
                    method.declaration().trim()
                );
                source.items.push(SourceItem::Method(method));
                ScanState::Between
            }
            other => {
                pending.push(raw.to_string());
                other
            }
        };
    }

    match state {
        ScanState::Header => source.header = pending,
        ScanState::Between => {
            if !pending.is_empty() {
                source.items.push(SourceItem::Text(pending));
            }
        }
        ScanState::InMethod { start } => return Err(Error::UnterminatedMethod { line: start }),
    }

    Ok(source)
}
