//! Search orchestration
//!
//! One call to [`run_search`] is one process's part of a run:
//!
//! 1. Validate the configuration (thread count first)
//! 2. Root resolves the dividend
//! 3. Broadcast it to the group
//! 4. Take this rank's slice of `[0, dividend]` and split it across threads
//! 5. Scan, join, reduce locally
//! 6. Gather process results; the root reduces them to the global result
//!
//! Every rank runs the same sequence, so the collective calls line up.

use crate::config::validator::{validate_config, validate_threads};
use crate::config::SearchConfig;
use crate::distributed::Collective;
use crate::dividend;
use crate::error::DivisorError;
use crate::partition::{process_slice, CandidateRange};
use crate::reduce::{reduce_global, reduce_local};
use crate::worker::{run_workers, WorkerOutcome};
use anyhow::{Context, Result};
use num_bigint::BigUint;
use std::time::{Duration, Instant};

/// What one process saw of a run
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub rank: usize,
    pub world_size: usize,
    /// Bit length of the broadcast dividend
    pub dividend_bits: u64,
    /// Counter slice this process scanned
    pub slice: CandidateRange,
    pub workers: Vec<WorkerOutcome>,
    /// Largest divisor found by this process, zero if none
    pub process_result: BigUint,
    /// Root only: process results in rank order
    pub process_results: Option<Vec<BigUint>>,
    /// Root only: largest proper divisor overall, zero if none
    pub global_result: Option<BigUint>,
    pub elapsed: Duration,
}

impl SearchOutcome {
    /// Candidates tested by all workers of this process
    pub fn candidates_tested(&self) -> u64 {
        self.workers.iter().map(|w| w.candidates_tested).sum()
    }
}

/// Run this process's part of a search
///
/// The root (rank 0) also produces the global result. Any error here is fatal
/// for the whole group; callers are expected to [`Collective::abort`] on it.
pub fn run_search<C>(collective: &mut C, config: &SearchConfig) -> Result<SearchOutcome>
where
    C: Collective + ?Sized,
{
    // Before any big integer exists
    validate_threads(config.threads)?;
    validate_config(config)?;

    let debug = config.runtime.debug;
    let rank = collective.rank();
    let world_size = collective.world_size();
    let start = Instant::now();

    let root_dividend = if collective.is_root() {
        Some(dividend::resolve(config)?)
    } else {
        None
    };
    let dividend = collective
        .broadcast(root_dividend.as_ref())
        .context("Failed to broadcast dividend")?;
    drop(root_dividend);

    let dividend_bits = dividend.bits();
    if debug {
        eprintln!("DEBUG: rank {} received a {}-bit dividend", rank, dividend_bits);
    }

    let slice = process_slice(&dividend, rank, world_size)?;
    let ranges = slice.partition(config.threads)?;
    if debug {
        eprintln!("DEBUG: rank {} scanning counters {} with {} workers", rank, slice, ranges.len());
    }

    let workers = run_workers(&dividend, &ranges, debug)?;
    let divisors: Vec<BigUint> = workers.iter().map(|w| w.divisor.clone()).collect();
    let process_result = reduce_local(&divisors);

    let process_results = collective
        .gather(&process_result)
        .context("Failed to gather process results")?;
    let global_result = process_results.as_deref().map(reduce_global);

    Ok(SearchOutcome {
        rank,
        world_size,
        dividend_bits,
        slice,
        workers,
        process_result,
        process_results,
        global_result,
        elapsed: start.elapsed(),
    })
}

/// Run a search, telling the rest of the group to abort if it fails
pub fn run_or_abort<C>(collective: &mut C, config: &SearchConfig) -> Result<SearchOutcome>
where
    C: Collective + ?Sized,
{
    match run_search(collective, config) {
        Ok(outcome) => Ok(outcome),
        Err(e) => {
            // The root always releases the other ranks; an abort the root sent is not echoed back
            let from_root = !collective.is_root()
                && matches!(e.downcast_ref::<DivisorError>(), Some(DivisorError::Aborted(_)));
            if !from_root {
                collective.abort(&format!("{:#}", e));
            }
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distributed::{LocalCollective, MemoryCollective};
    use num_traits::Zero;
    use std::thread;

    fn fixed(dividend: &str, threads: usize) -> SearchConfig {
        let mut config = SearchConfig::new(threads);
        config.bits = 64;
        config.dividend = Some(dividend.to_string());
        config
    }

    /// Run one search across an in-memory group and return the root's outcome
    fn run_group(config: &SearchConfig, world_size: usize) -> SearchOutcome {
        let members = MemoryCollective::group(world_size, 1).unwrap();
        let handles: Vec<_> = members
            .into_iter()
            .map(|mut member| {
                let config = config.clone();
                thread::spawn(move || run_search(&mut member, &config).unwrap())
            })
            .collect();

        let mut outcomes: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        outcomes.sort_by_key(|o| o.rank);
        for outcome in &outcomes[1..] {
            assert!(outcome.global_result.is_none());
        }
        outcomes.swap_remove(0)
    }

    #[test]
    fn test_local_search_360() {
        let config = fixed("360", 4);
        let outcome = run_search(&mut LocalCollective::new(1), &config).unwrap();

        assert_eq!(outcome.global_result, Some(BigUint::from(180u32)));
        assert_eq!(outcome.workers.len(), 4);
        assert_eq!(outcome.dividend_bits, 9);
        // Candidates 1..=359, every one tested exactly once
        assert_eq!(outcome.candidates_tested(), 359);
    }

    #[test]
    fn test_deterministic_across_group_shapes() {
        for &(threads, world_size) in &[(1, 1), (3, 1), (1, 2), (2, 3), (4, 4), (5, 7)] {
            let outcome = run_group(&fixed("360", threads), world_size);
            assert_eq!(
                outcome.global_result,
                Some(BigUint::from(180u32)),
                "threads={} processes={}",
                threads,
                world_size
            );
            assert_eq!(outcome.process_results.as_ref().map(Vec::len), Some(world_size));
        }
    }

    #[test]
    fn test_prime_dividend_finds_one() {
        let outcome = run_group(&fixed("97", 3), 2);
        assert_eq!(outcome.global_result, Some(BigUint::from(1u32)));
    }

    #[test]
    fn test_degenerate_dividends() {
        for dividend in ["0", "1"] {
            let outcome = run_group(&fixed(dividend, 2), 2);
            assert!(outcome.global_result.unwrap().is_zero());
        }
    }

    #[test]
    fn test_generated_dividend_same_for_seed() {
        let mut config = SearchConfig::new(2);
        config.bits = 12;
        config.seed = Some(42);

        let a = run_search(&mut LocalCollective::new(1), &config).unwrap();
        let b = run_group(&config, 3);
        assert_eq!(a.global_result, b.global_result);
        assert_eq!(a.dividend_bits, b.dividend_bits);
    }

    #[test]
    fn test_zero_threads_rejected() {
        let config = fixed("360", 0);
        let err = run_search(&mut LocalCollective::new(1), &config).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DivisorError>(),
            Some(DivisorError::InvalidWorkerCount(0))
        ));
    }

    #[test]
    fn test_failure_aborts_group() {
        let members = MemoryCollective::group(2, 1).unwrap();
        let mut iter = members.into_iter();
        let mut root = iter.next().unwrap();
        let mut node = iter.next().unwrap();

        let node_thread = thread::spawn(move || run_search(&mut node, &fixed("360", 2)));

        // Dividend wider than the one-limb buffers
        let mut bad = SearchConfig::new(2);
        bad.bits = 128;
        bad.dividend = Some((BigUint::from(1u32) << 100u32).to_string());
        assert!(run_or_abort(&mut root, &bad).is_err());

        let node_err = node_thread.join().unwrap().unwrap_err();
        assert!(matches!(
            node_err.downcast_ref::<DivisorError>(),
            Some(DivisorError::Aborted(_))
        ));
    }

    #[test]
    fn test_rank_failure_aborts_every_rank() {
        let mut members = MemoryCollective::group(3, 1).unwrap();
        let mut rank2 = members.pop().unwrap();
        let mut rank1 = members.pop().unwrap();
        let mut root = members.pop().unwrap();

        // Rank 1 dies mid-scan; rank 2 completes its own slice normally
        let failing = thread::spawn(move || {
            rank1.broadcast(None).unwrap();
            rank1.abort("worker 0 panicked");
        });
        let healthy = thread::spawn(move || run_or_abort(&mut rank2, &fixed("360", 2)));

        let root_err = run_or_abort(&mut root, &fixed("360", 2)).unwrap_err();
        assert!(matches!(
            root_err.downcast_ref::<DivisorError>(),
            Some(DivisorError::Aborted(_))
        ));

        failing.join().unwrap();
        let rank2_err = healthy.join().unwrap().unwrap_err();
        assert!(matches!(
            rank2_err.downcast_ref::<DivisorError>(),
            Some(DivisorError::Aborted(_))
        ));
    }
}
