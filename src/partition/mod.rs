//! Range partitioning
//!
//! Splits the candidate-divisor counter space into contiguous, disjoint,
//! gap-free sub-ranges. The same rule is applied at both levels of the
//! search: across processes, then across the worker threads of one process.
//!
//! # Boundary rule
//!
//! For a parent range whose counters run from `first` to `last` inclusive,
//! `step = (last - first) / count`. Child `i` gets `[first + i*step,
//! first + (i+1)*step)` and the last child runs to the parent's end, absorbing
//! the division remainder.
//!
//! At the top level the parent is `[0, S]` inclusive, which gives the
//! documented widening of the last slot:
//!
//! ```text
//! partition(10, 3) => [0,3) [3,6) [6,11)
//!                                   ^^ end is S + 1, last counter is S
//! ```

use crate::error::{DivisorError, Result};
use num_bigint::BigUint;
use num_traits::Zero;
use std::fmt;

/// Half-open interval `[start, end)` of scan counters
///
/// A counter `c` stands for the candidate divisor `c + 1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateRange {
    pub start: BigUint,
    pub end: BigUint,
}

impl CandidateRange {
    pub fn new(start: BigUint, end: BigUint) -> Self {
        Self { start, end }
    }

    /// Counters `[0, total]` inclusive
    pub fn full(total: &BigUint) -> Self {
        Self {
            start: BigUint::zero(),
            end: total + 1u32,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// Last counter in the range, if any
    pub fn last_counter(&self) -> Option<BigUint> {
        if self.is_empty() {
            None
        } else {
            Some(&self.end - 1u32)
        }
    }

    /// Split into `count` ordered children covering exactly this range
    pub fn partition(&self, count: usize) -> Result<Vec<CandidateRange>> {
        if count == 0 {
            return Err(DivisorError::InvalidWorkerCount(count));
        }

        // Distance from first to last counter; zero for empty or single-counter ranges
        let span = match self.last_counter() {
            Some(last) => last - &self.start,
            None => BigUint::zero(),
        };
        let step = span / count;

        let mut ranges = Vec::with_capacity(count);
        for i in 0..count {
            let start = &self.start + &step * i;
            let end = if i == count - 1 {
                // Never let an empty parent produce a child that starts past its end
                if self.is_empty() {
                    start.clone()
                } else {
                    self.end.clone()
                }
            } else {
                &self.start + &step * (i + 1)
            };
            ranges.push(CandidateRange { start, end });
        }

        Ok(ranges)
    }
}

impl fmt::Display for CandidateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

/// Partition the counters `[0, total_range_size]` across `worker_count` workers
///
/// Returns exactly `worker_count` ranges. The last one ends at
/// `total_range_size + 1`, one past strict multiplication, so the union always
/// reaches `total_range_size` even when the division leaves a remainder.
pub fn partition(total_range_size: &BigUint, worker_count: usize) -> Result<Vec<CandidateRange>> {
    if worker_count == 0 {
        return Err(DivisorError::InvalidWorkerCount(worker_count));
    }
    CandidateRange::full(total_range_size).partition(worker_count)
}

/// Slice of the counter space owned by one process of a `world_size` group
pub fn process_slice(total_range_size: &BigUint, rank: usize, world_size: usize) -> Result<CandidateRange> {
    let mut slices = partition(total_range_size, world_size)?;
    if rank >= world_size {
        return Err(DivisorError::InvalidConfig(format!(
            "rank {} out of range for {} processes",
            rank, world_size
        )));
    }
    Ok(slices.swap_remove(rank))
}
