//! Control-flow flattening.
//!
//! A method's `.line`-delimited blocks are turned into the cases of a `packed-switch` dispatch
//! loop. The first code block stays first as case 0; the remaining blocks are laid out in a
//! random case order and each one loads the case of its original successor into a dedicated
//! register before jumping back to the loop head. Static layout no longer reflects execution
//! order, while the register chain replays the original sequence at run time.

pub mod assemble;
pub mod plan;

use crate::{Error, Result, Transform};
use assemble::{decorate, preamble, reassemble, switch_table, DispatchLabels};
use plan::DispatchPlan;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use tangle_core::registers::{find_locals, reserve_dispatch_register};
use tangle_core::{Block, BlockKind, Method};
use tracing::debug;

/// Configuration for the flattening transform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlattenConfig {
    /// Prefix of every label introduced by the transform.
    pub label_prefix: String,
    /// Indentation of synthesized instructions.
    pub indent: String,
}

impl Default for FlattenConfig {
    fn default() -> Self {
        Self {
            label_prefix: "flat_".to_string(),
            indent: "    ".to_string(),
        }
    }
}

impl FlattenConfig {
    /// Labels derived from the configured prefix.
    pub fn labels(&self) -> DispatchLabels {
        DispatchLabels::new(self.label_prefix.clone())
    }
}

/// Control-flow flattening transform.
#[derive(Debug, Clone, Default)]
pub struct Flatten {
    config: FlattenConfig,
}

impl Flatten {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the transform with a custom configuration.
    ///
    /// The label prefix must be non-empty and made of characters valid in a smali label.
    pub fn with_config(config: FlattenConfig) -> Result<Self> {
        let valid = !config.label_prefix.is_empty()
            && config
                .label_prefix
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '$' | '-'));
        if !valid {
            return Err(Error::InvalidLabelPrefix(config.label_prefix));
        }
        Ok(Self { config })
    }

    pub fn config(&self) -> &FlattenConfig {
        &self.config
    }
}

/// Abstract and native methods carry no body to flatten.
fn has_no_body(method: &Method) -> bool {
    method
        .declaration
        .split_whitespace()
        .any(|word| word == "abstract" || word == "native")
}

/// Detects a dispatch loop in a method read back from flattened text, where the synthetic
/// blocks are no longer told apart from body blocks.
fn has_dispatch_preamble(method: &Method, labels: &DispatchLabels) -> bool {
    let switch = labels.switch();
    method.body_lines().any(|line| {
        line.trim()
            .strip_prefix("packed-switch ")
            .is_some_and(|rest| rest.ends_with(switch.as_str()))
    })
}

impl Transform for Flatten {
    fn name(&self) -> &'static str {
        "Flatten"
    }

    fn apply(&self, method: &mut Method, rng: &mut StdRng) -> Result<bool> {
        let labels = self.config.labels();
        if method.is_flattened() || has_dispatch_preamble(method, &labels) {
            debug!("{} already flattened", method.name());
            return Ok(false);
        }
        if has_no_body(method) {
            debug!("{} has no body", method.name());
            return Ok(false);
        }

        if method.uses_label_prefix(&labels.marker()) {
            return Err(Error::LabelCollision {
                method: method.name().to_string(),
                prefix: labels.marker(),
            });
        }

        let locals = find_locals(method)?;
        let mut blocks = std::mem::take(&mut method.blocks);
        let mut prologue = blocks.remove(0);

        // Without any `.line` marker the code after `.locals` is the only block.
        let entry = if blocks.is_empty() {
            let code = prologue.lines.split_off(locals.index + 1);
            Block::with_lines(BlockKind::Body, code)
        } else {
            blocks.remove(0)
        };
        let free = blocks;

        if entry.last_content_index().is_none() && free.is_empty() {
            debug!("{} has no code after .locals", method.name());
            prologue.lines.extend(entry.lines);
            method.blocks = vec![prologue];
            return Ok(false);
        }

        method.blocks = vec![prologue];
        let register = reserve_dispatch_register(method)?;
        let prologue = method.blocks.remove(0);

        let plan = DispatchPlan::build(register, free.len(), rng)?;
        let indent = self.config.indent.as_str();

        debug!(
            "{}: dispatch register {}, {} cases{}",
            method.name(),
            register,
            plan.case_count(),
            if plan.is_degenerate() { " (entry only)" } else { "" }
        );

        let entry = decorate(&entry, 0, plan.next_case(0)?, register, &labels, indent);

        let mut shuffled = Vec::with_capacity(free.len());
        for case in 1..plan.case_count() {
            let original = plan
                .original_of(case)
                .ok_or_else(|| Error::InvalidPlan(format!("case {case} has no block")))?;
            let next = plan.next_case(original + 1)?;
            debug!("  case {} <- block {} (next {:?})", case, original + 1, next);
            shuffled.push(decorate(
                &free[original],
                case,
                next,
                register,
                &labels,
                indent,
            ));
        }

        let preamble = preamble(register, &labels, indent);
        let table = switch_table(plan.case_count(), &labels, indent);
        reassemble(method, prologue, preamble, entry, shuffled, table);

        Ok(true)
    }
}
