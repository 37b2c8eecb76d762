//! Case assignment for the dispatch loop.
//!
//! Chain positions describe original execution order: position 0 is the pinned entry block and
//! position `p >= 1` is free block `p - 1`. Cases describe the jump table: case 0 is the entry
//! block and cases `1..=m` are handed out to the free blocks through a random permutation. The
//! permutation is kept as two arrays that are inverses of each other, so both directions are
//! direct lookups.

use crate::{Error, Result};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use tangle_core::Register;
use tracing::debug;

/// Value written into the dispatch register at the end of a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextCase {
    /// Continue with the given case.
    Case(usize),
    /// Last block of the chain; execution leaves the dispatch loop.
    End,
}

/// Dispatch register, case bijection and next-case chain for one method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchPlan {
    register: Register,
    /// `case_of[i]` is the case assigned to free block `i`.
    case_of: Vec<usize>,
    /// `original_of[j]` is the free block assigned to case `j + 1`.
    original_of: Vec<usize>,
}

impl DispatchPlan {
    /// Shuffles `free_blocks` blocks into cases `1..=free_blocks`.
    pub fn build(register: Register, free_blocks: usize, rng: &mut StdRng) -> Result<Self> {
        let mut original_of: Vec<usize> = (0..free_blocks).collect();
        original_of.shuffle(rng);
        Self::from_permutation(register, original_of)
    }

    /// Builds a plan from an explicit permutation, `original_of[j]` being the free block that
    /// receives case `j + 1`.
    pub fn from_permutation(register: Register, original_of: Vec<usize>) -> Result<Self> {
        let m = original_of.len();
        let mut case_of = vec![usize::MAX; m];

        for (slot, &original) in original_of.iter().enumerate() {
            if original >= m {
                return Err(Error::InvalidPlan(format!(
                    "free block {original} out of range for {m} blocks"
                )));
            }
            if case_of[original] != usize::MAX {
                return Err(Error::InvalidPlan(format!(
                    "free block {original} assigned to cases {} and {}",
                    case_of[original],
                    slot + 1
                )));
            }
            case_of[original] = slot + 1;
        }

        debug!("case assignment {:?} (free block -> case)", case_of);

        Ok(Self {
            register,
            case_of,
            original_of,
        })
    }

    pub fn register(&self) -> Register {
        self.register
    }

    /// Number of free (shuffled) blocks.
    pub fn free_blocks(&self) -> usize {
        self.case_of.len()
    }

    /// Number of jump-table entries, entry block included.
    pub fn case_count(&self) -> usize {
        self.case_of.len() + 1
    }

    /// True when only the entry block exists.
    pub fn is_degenerate(&self) -> bool {
        self.case_of.is_empty()
    }

    /// Case assigned to free block `original`.
    pub fn case_of(&self, original: usize) -> Option<usize> {
        self.case_of.get(original).copied()
    }

    /// Free block holding `case`. Case 0 is the entry block and has no free block.
    pub fn original_of(&self, case: usize) -> Option<usize> {
        case.checked_sub(1)
            .and_then(|slot| self.original_of.get(slot).copied())
    }

    /// Next case for the block at chain `position`.
    ///
    /// The last position yields [`NextCase::End`]; positions past it are an error.
    pub fn next_case(&self, position: usize) -> Result<NextCase> {
        let m = self.case_of.len();
        match position.cmp(&m) {
            std::cmp::Ordering::Less => Ok(NextCase::Case(self.case_of[position])),
            std::cmp::Ordering::Equal => Ok(NextCase::End),
            std::cmp::Ordering::Greater => Err(Error::ChainLookup {
                position,
                cases: self.case_count(),
            }),
        }
    }

    /// Cases in execution order, starting at case 0.
    pub fn chain(&self) -> Vec<usize> {
        std::iter::once(0).chain(self.case_of.iter().copied()).collect()
    }
}
