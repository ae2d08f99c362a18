//! Maximum reduction
//!
//! Folds worker results into a process result, and process results into the
//! global answer. Both folds start from zero so "no divisor found" stays a
//! distinguishable outcome.

use num_bigint::BigUint;
use num_traits::Zero;

fn max_of<'a, I>(values: I) -> BigUint
where
    I: IntoIterator<Item = &'a BigUint>,
{
    let mut max = BigUint::zero();
    for value in values {
        if value > &max {
            max = value.clone();
        }
    }
    max
}

/// Per-process maximum of all worker results
///
/// Call only after every worker has joined.
pub fn reduce_local(results: &[BigUint]) -> BigUint {
    max_of(results)
}

/// Global maximum of all gathered process results (coordinator only)
pub fn reduce_global(results: &[BigUint]) -> BigUint {
    max_of(results)
}
