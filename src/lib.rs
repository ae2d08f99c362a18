//! divsearch - distributed largest-divisor search
//!
//! divsearch finds the largest proper divisor of a very large integer by
//! brute-force trial division, spread over a group of processes and the
//! worker threads inside each one.
//!
//! # Architecture
//!
//! - **Partitioning**: contiguous, gap-free counter ranges at process and thread level
//! - **Workers**: one scoped thread per range, single-writer result slots
//! - **Reduction**: maximum fold per process, then across processes
//! - **Distributed mode**: broadcast/gather over TCP or in memory, behind one trait
//! - **Reporting**: console summary and JSON report

pub mod config;
pub mod distributed;
pub mod dividend;
pub mod error;
pub mod output;
pub mod partition;
pub mod reduce;
pub mod search;
pub mod worker;

// Re-export commonly used types
pub use config::SearchConfig;
pub use error::DivisorError;
pub use search::{run_search, SearchOutcome};
