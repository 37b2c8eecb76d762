//! Dispatch loop synthesis and method reassembly.
//!
//! Layout of a flattened method:
//!
//! ```text
//! .method ...
//!     .locals R+1                      ; prologue, bumped
//!     const/16 vR, 0x0                 ; preamble
//!     :flat_dispatch
//!     packed-switch vR, :flat_switch
//!     :flat_case_0                     ; pinned entry block
//!     ...
//!     const/16 vR, 0x2
//!     goto :flat_dispatch
//!     :flat_case_1                     ; free blocks by ascending case
//!     ...
//!     :flat_switch                     ; jump table
//!     .packed-switch 0x0
//!         :flat_case_0
//!         :flat_case_1
//!     .end packed-switch
//! .end method
//! ```

use super::plan::NextCase;
use tangle_core::{Block, BlockKind, Method, Register};

/// Largest literal `const/16` can load.
const CONST16_MAX: usize = 0x7fff;

/// Label names used by the dispatch loop of one method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchLabels {
    prefix: String,
}

impl DispatchLabels {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Label prefix with its leading colon, used for collision checks.
    pub fn marker(&self) -> String {
        format!(":{}", self.prefix)
    }

    /// Loop head holding the `packed-switch`.
    pub fn dispatch(&self) -> String {
        format!(":{}dispatch", self.prefix)
    }

    /// Label placed on the block holding `case`.
    pub fn case(&self, case: usize) -> String {
        format!(":{}case_{}", self.prefix, case)
    }

    /// Label of the `packed-switch` payload.
    pub fn switch(&self) -> String {
        format!(":{}switch", self.prefix)
    }
}

/// Instruction loading `case` into the dispatch register.
pub fn load_case(register: Register, case: usize) -> String {
    if case <= CONST16_MAX {
        format!("const/16 {register}, 0x{case:x}")
    } else {
        format!("const {register}, 0x{case:x}")
    }
}

/// Register initialisation, loop label and indirect jump.
pub fn preamble(register: Register, labels: &DispatchLabels, indent: &str) -> Block {
    Block::with_lines(
        BlockKind::Dispatch,
        vec![
            String::new(),
            format!("{indent}{}", load_case(register, 0)),
            String::new(),
            format!("{indent}{}", labels.dispatch()),
            format!("{indent}packed-switch {register}, {}", labels.switch()),
            String::new(),
        ],
    )
}

/// Labels `block` with its case and links it to the next case.
///
/// The case label becomes the first line. With a next case, the register load and the jump
/// back to the loop head go right after the block's last non-blank line, so trailing blank
/// lines stay at the end and labels closing the block still fall into the link. The block
/// ending the chain is left without a jump back.
pub fn decorate(
    block: &Block,
    case: usize,
    next: NextCase,
    register: Register,
    labels: &DispatchLabels,
    indent: &str,
) -> Block {
    let mut lines = Vec::with_capacity(block.len() + 3);
    lines.push(format!("{indent}{}", labels.case(case)));
    lines.extend(block.lines.iter().cloned());

    if let NextCase::Case(next) = next {
        let at = block.last_content_index().map_or(1, |idx| idx + 2);
        lines.splice(
            at..at,
            [
                format!("{indent}{}", load_case(register, next)),
                format!("{indent}goto {}", labels.dispatch()),
            ],
        );
    }

    Block::with_lines(BlockKind::Body, lines)
}

/// `packed-switch` payload listing cases `0..case_count` in order.
pub fn switch_table(case_count: usize, labels: &DispatchLabels, indent: &str) -> Block {
    let mut lines = Vec::with_capacity(case_count + 4);
    lines.push(String::new());
    lines.push(format!("{indent}{}", labels.switch()));
    lines.push(format!("{indent}.packed-switch 0x0"));
    lines.extend((0..case_count).map(|case| format!("{indent}{indent}{}", labels.case(case))));
    lines.push(format!("{indent}.end packed-switch"));
    Block::with_lines(BlockKind::SwitchTable, lines)
}

/// Replaces the method's blocks with the flattened layout.
pub fn reassemble(
    method: &mut Method,
    prologue: Block,
    preamble: Block,
    entry: Block,
    shuffled: Vec<Block>,
    table: Block,
) {
    let mut blocks = Vec::with_capacity(shuffled.len() + 4);
    blocks.push(prologue);
    blocks.push(preamble);
    blocks.push(entry);
    blocks.extend(shuffled);
    blocks.push(table);
    method.blocks = blocks;
}
