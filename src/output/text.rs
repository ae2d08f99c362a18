//! Text output formatting
//!
//! Human-readable report printed by the root process.

use crate::config::SearchConfig;
use crate::search::SearchOutcome;
use num_bigint::BigUint;
use num_traits::Zero;

/// The one-line answer
pub fn format_result_line(result: &BigUint) -> String {
    if result.is_zero() {
        "No divisor found: the dividend has no proper divisor".to_string()
    } else {
        format!("The largest divisor less than the dividend is: {}", result)
    }
}

/// Print the final report (root only)
pub fn print_results(outcome: &SearchOutcome, config: &SearchConfig) {
    let Some(ref result) = outcome.global_result else {
        return;
    };

    println!("═══════════════════════════════════════════════════════════");
    println!("                    SEARCH RESULTS");
    println!("═══════════════════════════════════════════════════════════");
    println!();
    println!("Dividend:     {} bits", format_number(outcome.dividend_bits));
    println!(
        "Layout:       {} processes × {} threads",
        outcome.world_size, config.threads
    );
    println!("Tested here:  {} candidates", format_number(outcome.candidates_tested()));
    println!("Elapsed Time: {:.3}s", outcome.elapsed.as_secs_f64());

    if config.runtime.debug {
        if let Some(ref results) = outcome.process_results {
            println!();
            println!("Per-process results:");
            for (rank, value) in results.iter().enumerate() {
                println!("  Rank {}: {}", rank, value);
            }
        }
    }

    println!();
    println!("{}", format_result_line(result));
}

/// Print the short summary a non-root process shows for its own slice
pub fn print_process_summary(outcome: &SearchOutcome) {
    println!(
        "Rank {} done: {} candidates in {:.3}s, local maximum {}",
        outcome.rank,
        format_number(outcome.candidates_tested()),
        outcome.elapsed.as_secs_f64(),
        outcome.process_result
    );
}

/// Format number with thousands separators
fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::new();

    for (count, c) in s.chars().rev().enumerate() {
        if count > 0 && count % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }

    result.chars().rev().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_line() {
        assert_eq!(
            format_result_line(&BigUint::from(180u32)),
            "The largest divisor less than the dividend is: 180"
        );
    }

    #[test]
    fn test_zero_result_reported_distinctly() {
        let line = format_result_line(&BigUint::zero());
        assert!(line.starts_with("No divisor found"));
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1000), "1,000");
        assert_eq!(format_number(100_000_000), "100,000,000");
    }
}
