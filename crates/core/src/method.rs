//! Method model and the line-marker block splitter.
//!
//! A method is held as its declaration, an ordered list of blocks and its terminator. Blocks
//! own their lines and are only joined when the method is rendered, so transforms can move,
//! decorate and reorder them without re-parsing text.

use crate::{code_tokens, is_line_marker};
use crate::result::{Error, Result};
use crate::scanner::MethodSource;
use tracing::debug;

/// Role of a block inside a method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    /// Lines before the first `.line` marker; holds `.locals` and parameter directives.
    Prologue,
    /// Lines from a `.line` marker up to the next marker or the end of the body.
    Body,
    /// Synthetic dispatch preamble.
    Dispatch,
    /// Synthetic `packed-switch` jump table.
    SwitchTable,
}

/// An ordered run of method lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub kind: BlockKind,
    pub lines: Vec<String>,
}

impl Block {
    /// Creates an empty block of the given kind.
    pub fn new(kind: BlockKind) -> Self {
        Self {
            kind,
            lines: Vec::new(),
        }
    }

    /// Creates a block from already collected lines.
    pub fn with_lines(kind: BlockKind, lines: Vec<String>) -> Self {
        Self { kind, lines }
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// The `.line` marker opening this block, if any.
    pub fn marker(&self) -> Option<&str> {
        self.lines
            .first()
            .map(String::as_str)
            .filter(|line| is_line_marker(line))
    }

    /// Index of the last line carrying content (not blank).
    pub fn last_content_index(&self) -> Option<usize> {
        self.lines.iter().rposition(|line| !line.trim().is_empty())
    }

    /// Returns true if any line of the block mentions `needle`.
    pub fn mentions(&self, needle: &str) -> bool {
        self.lines.iter().any(|line| line.contains(needle))
    }
}

/// A method split into blocks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Method {
    /// 1-based source line of the declaration.
    pub line: usize,
    /// The `.method` line.
    pub declaration: String,
    /// Prologue first, then body blocks (or synthetic blocks once transformed).
    pub blocks: Vec<Block>,
    /// The `.end method` line.
    pub terminator: String,
}

impl Method {
    /// Method name with its prototype, e.g. `onCreate(Landroid/os/Bundle;)V`.
    pub fn name(&self) -> &str {
        self.declaration
            .split_whitespace()
            .last()
            .unwrap_or_default()
    }

    /// The block preceding the first line marker.
    pub fn prologue(&self) -> Option<&Block> {
        self.blocks
            .first()
            .filter(|block| block.kind == BlockKind::Prologue)
    }

    /// Number of `.line`-delimited body blocks.
    pub fn body_block_count(&self) -> usize {
        self.blocks
            .iter()
            .filter(|block| block.kind == BlockKind::Body)
            .count()
    }

    /// Returns true once a dispatch preamble has been injected.
    pub fn is_flattened(&self) -> bool {
        self.blocks
            .iter()
            .any(|block| matches!(block.kind, BlockKind::Dispatch | BlockKind::SwitchTable))
    }

    /// Returns true if any line of the method (declaration and terminator included) mentions
    /// `needle`.
    pub fn mentions(&self, needle: &str) -> bool {
        self.declaration.contains(needle)
            || self.terminator.contains(needle)
            || self.blocks.iter().any(|block| block.mentions(needle))
    }

    /// Returns true if a label defined or referenced in the body starts with `prefix`.
    ///
    /// Only code tokens count; string literals and comments are ignored.
    pub fn uses_label_prefix(&self, prefix: &str) -> bool {
        self.body_lines()
            .flat_map(code_tokens)
            .any(|token| token.starts_with(prefix))
    }

    /// Body lines in block order, excluding declaration and terminator.
    pub fn body_lines(&self) -> impl Iterator<Item = &str> {
        self.blocks
            .iter()
            .flat_map(|block| block.lines.iter().map(String::as_str))
    }

    /// Renders the method as text, each line terminated by `\n`.
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str(&self.declaration);
        out.push('\n');
        for line in self.body_lines() {
            out.push_str(line);
            out.push('\n');
        }
        out.push_str(&self.terminator);
        out.push('\n');
        out
    }
}

/// Splits one method into `[prologue, body_0, ..., body_k]` at `.line` markers.
///
/// The declaration and terminator lines are kept aside. A marker always opens a new block and
/// becomes its first line; the block it closes is kept even when empty, which only happens when
/// the first body line is itself a marker. A method without markers yields the prologue alone.
pub fn split_method(source: &MethodSource) -> Result<Method> {
    let (declaration, rest) = source
        .lines
        .split_first()
        .ok_or_else(|| Error::MalformedMethod {
            line: source.line,
            msg: "empty method text".into(),
        })?;
    let (terminator, body) = rest.split_last().ok_or_else(|| Error::MalformedMethod {
        line: source.line,
        msg: "missing .end method".into(),
    })?;

    let mut blocks = Vec::new();
    let mut current = Block::new(BlockKind::Prologue);

    for line in body {
        if is_line_marker(line) {
            blocks.push(std::mem::replace(&mut current, Block::new(BlockKind::Body)));
        }
        current.lines.push(line.clone());
    }
    blocks.push(current);

    let method = Method {
        line: source.line,
        declaration: declaration.clone(),
        blocks,
        terminator: terminator.clone(),
    };

    debug!(
        "split {} into prologue + {} body blocks",
        method.name(),
        method.body_block_count()
    );

    Ok(method)
}
