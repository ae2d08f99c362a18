//! Divisibility workers
//!
//! A worker owns one [`CandidateRange`] and trial-divides the shared dividend
//! by every candidate in it. Workers of one process run as a single fork/join
//! region: all threads are spawned together, each writes only its own result
//! slot, and the caller sees the slots only after every thread has joined.

use crate::error::{DivisorError, Result};
use crate::partition::CandidateRange;
use num_bigint::BigUint;
use num_traits::Zero;
use std::time::{Duration, Instant};

/// Outcome of one worker's scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerOutcome {
    /// Local worker index inside the process
    pub id: usize,
    /// Largest divisor found in range, zero if none
    pub divisor: BigUint,
    /// Candidates actually tested
    pub candidates_tested: u64,
    pub elapsed: Duration,
}

/// Largest candidate in `range` that divides `dividend`, or zero
///
/// Counter `c` runs from `range.start`; the candidate tested is `c + 1`. The
/// scan stops at the end of the range or once the candidate reaches the
/// dividend, so the dividend itself is never reported.
pub fn scan(dividend: &BigUint, range: &CandidateRange) -> BigUint {
    scan_counted(dividend, range).0
}

fn scan_counted(dividend: &BigUint, range: &CandidateRange) -> (BigUint, u64) {
    let mut divisor = BigUint::zero();
    let mut tested = 0u64;

    let mut counter = range.start.clone();
    let mut candidate = &counter + 1u32;
    while counter < range.end && &candidate < dividend {
        let remainder = dividend % &candidate;
        if remainder.is_zero() {
            // Candidates increase monotonically; the last hit is the largest
            divisor = candidate.clone();
        }
        tested += 1;

        counter += 1u32;
        candidate += 1u32;
    }

    (divisor, tested)
}

/// Scan every range on its own thread and return one outcome per range, in order
///
/// Blocks until all threads have joined.
pub fn run_workers(dividend: &BigUint, ranges: &[CandidateRange], debug: bool) -> Result<Vec<WorkerOutcome>> {
    if ranges.is_empty() {
        return Err(DivisorError::InvalidWorkerCount(0));
    }

    // One slot per worker, written only by that worker
    let mut slots: Vec<Option<WorkerOutcome>> = vec![None; ranges.len()];

    std::thread::scope(|scope| -> Result<()> {
        let mut handles = Vec::with_capacity(ranges.len());

        for (id, (range, slot)) in ranges.iter().zip(slots.iter_mut()).enumerate() {
            if debug {
                eprintln!("DEBUG: worker {} scanning counters {}", id, range);
            }

            let handle = std::thread::Builder::new()
                .name(format!("divsearch-worker-{}", id))
                .spawn_scoped(scope, move || {
                    let start = Instant::now();
                    let (divisor, candidates_tested) = scan_counted(dividend, range);
                    *slot = Some(WorkerOutcome {
                        id,
                        divisor,
                        candidates_tested,
                        elapsed: start.elapsed(),
                    });
                })
                .map_err(|e| DivisorError::Transport(format!("failed to spawn worker {}: {}", id, e)))?;

            handles.push((id, handle));
        }

        for (id, handle) in handles {
            handle.join().map_err(|_| DivisorError::WorkerPanicked(id))?;
        }

        Ok(())
    })?;

    slots
        .into_iter()
        .enumerate()
        .map(|(id, slot)| slot.ok_or(DivisorError::WorkerPanicked(id)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::partition::partition;

    fn big(n: u64) -> BigUint {
        BigUint::from(n)
    }

    fn range(start: u64, end: u64) -> CandidateRange {
        CandidateRange::new(big(start), big(end))
    }

    #[test]
    fn test_scan_360_full_range() {
        assert_eq!(scan(&big(360), &range(0, 359)), big(180));
    }

    #[test]
    fn test_scan_never_reports_dividend() {
        // Range reaches past the dividend; 360 itself must not count
        assert_eq!(scan(&big(360), &range(0, 1000)), big(180));
        assert_eq!(scan(&big(360), &range(355, 1000)), big(0));
    }

    #[test]
    fn test_scan_prime() {
        let prime = big(97);
        // Only candidate 1 divides in the full range
        assert_eq!(scan(&prime, &range(0, 97)), big(1));
        // Sub-range starting at counter 0 contains candidate 1
        assert_eq!(scan(&prime, &range(0, 10)), big(1));
        // Sub-range without candidate 1
        assert_eq!(scan(&prime, &range(1, 97)), big(0));
    }

    #[test]
    fn test_scan_sub_range() {
        // Candidates 11..=20 of 360: 12, 15, 18, 20 divide
        assert_eq!(scan(&big(360), &range(10, 20)), big(20));
        // Candidates 21..=23 of 360: none divide
        assert_eq!(scan(&big(360), &range(20, 23)), big(0));
    }

    #[test]
    fn test_scan_degenerate_dividends() {
        assert_eq!(scan(&big(0), &range(0, 10)), big(0));
        assert_eq!(scan(&big(1), &range(0, 10)), big(0));
        assert_eq!(scan(&big(2), &range(0, 10)), big(1));
    }

    #[test]
    fn test_scan_empty_range() {
        assert_eq!(scan(&big(360), &range(5, 5)), big(0));
    }

    #[test]
    fn test_scan_counts_candidates() {
        let (divisor, tested) = scan_counted(&big(100), &range(0, 10));
        assert_eq!(divisor, big(10));
        assert_eq!(tested, 10);

        // Stops once the candidate reaches the dividend
        let (_, tested) = scan_counted(&big(5), &range(0, 10));
        assert_eq!(tested, 4);
    }

    #[test]
    fn test_run_workers_one_slot_per_range() {
        let dividend = big(360);
        let ranges = partition(&dividend, 4).unwrap();
        let outcomes = run_workers(&dividend, &ranges, false).unwrap();

        assert_eq!(outcomes.len(), 4);
        for (i, outcome) in outcomes.iter().enumerate() {
            assert_eq!(outcome.id, i);
            assert_eq!(outcome.divisor, scan(&dividend, &ranges[i]));
        }
        // [0,90) [90,180) [180,270) [270,361)
        assert_eq!(outcomes[0].divisor, big(90));
        assert_eq!(outcomes[1].divisor, big(180));
        assert_eq!(outcomes[2].divisor, big(0));
        assert_eq!(outcomes[3].divisor, big(0));
    }

    #[test]
    fn test_run_workers_rejects_no_ranges() {
        assert!(matches!(
            run_workers(&big(10), &[], false),
            Err(DivisorError::InvalidWorkerCount(0))
        ));
    }
}
