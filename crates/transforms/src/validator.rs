//! Replay a flattened method's dispatch chain.
//!
//! `replay_dispatch` reads the layout produced by [`crate::flatten`] back from a method: it
//! finds the dispatch register from the `packed-switch`, cuts the body into cases at the case
//! labels, reads the constant each case loads into the dispatch register, and follows that
//! chain from case 0. It only understands the layout the flattener emits; it is not a general
//! smali interpreter.

use crate::flatten::assemble::DispatchLabels;
use crate::{Error, Result};
use std::collections::BTreeMap;
use tangle_core::Method;

/// Result of following a dispatch chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchReplay {
    /// Cases in the order the chain visits them.
    pub order: Vec<usize>,
    /// Original lines of each visited case in visiting order, with synthetic and blank lines
    /// removed.
    pub blocks: Vec<Vec<String>>,
}

impl DispatchReplay {
    /// All replayed lines, flattened in execution order.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.blocks
            .iter()
            .flat_map(|block| block.iter().map(String::as_str))
    }
}

#[derive(Debug, Default)]
struct CaseBody {
    next: Option<usize>,
    lines: Vec<String>,
}

/// Follows the dispatch chain of a flattened method from case 0.
///
/// Fails if the method has no dispatch structure, if a case loads a value with no matching
/// case label, if a case is reached twice, or if the chain ends before covering every case.
pub fn replay_dispatch(method: &Method, labels: &DispatchLabels) -> Result<DispatchReplay> {
    let switch_label = labels.switch();
    let dispatch_jump = format!("goto {}", labels.dispatch());

    let register = method
        .body_lines()
        .find_map(|line| {
            line.trim()
                .strip_prefix("packed-switch ")
                .and_then(|rest| rest.strip_suffix(switch_label.as_str()))
                .map(|reg| reg.trim_end().trim_end_matches(',').to_string())
        })
        .ok_or_else(|| Error::MissingDispatch(method.name().to_string()))?;
    let load_prefixes = [format!("const/16 {register}, "), format!("const {register}, ")];

    let mut cases: BTreeMap<usize, CaseBody> = BTreeMap::new();
    let mut current: Option<usize> = None;
    let mut table_seen = false;

    for line in method.body_lines() {
        let trimmed = line.trim();

        if trimmed.is_empty() {
            continue;
        }
        if trimmed == switch_label {
            table_seen = true;
            break;
        }
        if let Some(case) = parse_case_label(trimmed, labels) {
            cases.insert(case, CaseBody::default());
            current = Some(case);
            continue;
        }
        let Some(case) = current.and_then(|case| cases.get_mut(&case)) else {
            continue;
        };
        if trimmed == dispatch_jump {
            continue;
        }
        if let Some(value) = load_prefixes
            .iter()
            .find_map(|prefix| trimmed.strip_prefix(prefix.as_str()))
        {
            case.next = parse_literal(value);
            continue;
        }
        case.lines.push(line.to_string());
    }

    if !table_seen || !cases.contains_key(&0) {
        return Err(Error::MissingDispatch(method.name().to_string()));
    }

    let total = cases.len();
    let mut order = Vec::with_capacity(total);
    let mut blocks = Vec::with_capacity(total);
    let mut visited = vec![false; cases.keys().max().map_or(0, |max| max + 1)];
    let mut current = 0usize;

    loop {
        let body = cases.get(&current).ok_or(Error::MissingCase(current))?;
        if std::mem::replace(&mut visited[current], true) {
            return Err(Error::CaseRevisited(current));
        }
        order.push(current);
        blocks.push(body.lines.clone());

        match body.next {
            Some(next) => current = next,
            None => break,
        }
    }

    if order.len() != total {
        return Err(Error::IncompleteChain {
            visited: order.len(),
            total,
        });
    }

    Ok(DispatchReplay { order, blocks })
}

fn parse_case_label(trimmed: &str, labels: &DispatchLabels) -> Option<usize> {
    let base = labels.case(0);
    let prefix = base.strip_suffix('0')?;
    trimmed.strip_prefix(prefix)?.parse().ok()
}

fn parse_literal(value: &str) -> Option<usize> {
    let value = value.trim();
    match value.strip_prefix("0x") {
        Some(hex) => usize::from_str_radix(hex, 16).ok(),
        None => value.parse().ok(),
    }
}
