//! JSON output formatting
//!
//! Written by the root process when `--json-output` is given. Big integers are
//! decimal strings so no reader has to handle arbitrary-precision numbers.

use crate::config::SearchConfig;
use crate::search::SearchOutcome;
use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;
use std::time::Duration;

/// Duration with both microseconds and human-readable format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonDuration {
    pub micros: u64,
    pub human: String,
}

impl JsonDuration {
    pub fn from_duration(d: Duration) -> Self {
        let micros = d.as_micros() as u64;
        let human = format_duration_human(d);
        Self { micros, human }
    }
}

/// Result of one process
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonProcessResult {
    pub rank: usize,
    pub divisor: String,
}

/// Complete JSON report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonReport {
    pub timestamp: String,
    pub version: String,
    /// Largest proper divisor, "0" when none exists
    pub result: String,
    pub divisor_found: bool,
    pub dividend_bits: u64,
    pub processes: usize,
    pub threads_per_process: usize,
    pub process_results: Vec<JsonProcessResult>,
    pub config: SearchConfig,
    pub elapsed: JsonDuration,
}

impl JsonReport {
    /// Build the report from the root's outcome; `None` on non-root ranks
    pub fn from_outcome(outcome: &SearchOutcome, config: &SearchConfig) -> Option<Self> {
        let result = outcome.global_result.as_ref()?;
        let process_results = outcome
            .process_results
            .as_deref()
            .unwrap_or_default()
            .iter()
            .enumerate()
            .map(|(rank, divisor)| JsonProcessResult {
                rank,
                divisor: divisor.to_string(),
            })
            .collect();

        Some(Self {
            timestamp: Utc::now().to_rfc3339(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            result: result.to_string(),
            divisor_found: result.bits() > 0,
            dividend_bits: outcome.dividend_bits,
            processes: outcome.world_size,
            threads_per_process: config.threads,
            process_results,
            config: config.clone(),
            elapsed: JsonDuration::from_duration(outcome.elapsed),
        })
    }
}

/// Write the report to `output_path` as pretty-printed JSON
pub fn write_json_report(report: &JsonReport, output_path: &Path) -> Result<()> {
    let file = File::create(output_path)
        .with_context(|| format!("Failed to create JSON output file: {}", output_path.display()))?;
    serde_json::to_writer_pretty(file, report).context("Failed to write JSON report")?;
    Ok(())
}

/// Format duration in human-readable format
fn format_duration_human(d: Duration) -> String {
    let micros = d.as_micros() as u64;

    if micros == 0 {
        return "0µs".to_string();
    }

    if micros < 1000 {
        format!("{}µs", micros)
    } else if micros < 1_000_000 {
        format!("{:.3}ms", micros as f64 / 1000.0)
    } else if micros < 60_000_000 {
        format!("{:.3}s", micros as f64 / 1_000_000.0)
    } else if micros < 3_600_000_000 {
        format!("{:.2}m", micros as f64 / 60_000_000.0)
    } else {
        format!("{:.2}h", micros as f64 / 3_600_000_000.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distributed::LocalCollective;
    use crate::search::run_search;

    fn outcome_for(dividend: &str) -> (SearchOutcome, SearchConfig) {
        let mut config = SearchConfig::new(2);
        config.bits = 64;
        config.dividend = Some(dividend.to_string());
        let outcome = run_search(&mut LocalCollective::new(1), &config).unwrap();
        (outcome, config)
    }

    #[test]
    fn test_report_fields() {
        let (outcome, config) = outcome_for("360");
        let report = JsonReport::from_outcome(&outcome, &config).unwrap();

        assert_eq!(report.result, "180");
        assert!(report.divisor_found);
        assert_eq!(report.dividend_bits, 9);
        assert_eq!(report.processes, 1);
        assert_eq!(report.threads_per_process, 2);
        assert_eq!(report.process_results, vec![JsonProcessResult { rank: 0, divisor: "180".to_string() }]);
    }

    #[test]
    fn test_report_no_divisor() {
        let (outcome, config) = outcome_for("1");
        let report = JsonReport::from_outcome(&outcome, &config).unwrap();
        assert_eq!(report.result, "0");
        assert!(!report.divisor_found);
    }

    #[test]
    fn test_write_and_read_back() {
        let (outcome, config) = outcome_for("97");
        let report = JsonReport::from_outcome(&outcome, &config).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        write_json_report(&report, &path).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let parsed: JsonReport = serde_json::from_str(&contents).unwrap();
        assert_eq!(parsed, report);
        assert_eq!(parsed.result, "1");
    }

    #[test]
    fn test_format_duration_human() {
        assert_eq!(format_duration_human(Duration::ZERO), "0µs");
        assert_eq!(format_duration_human(Duration::from_micros(500)), "500µs");
        assert_eq!(format_duration_human(Duration::from_millis(1500)), "1.500s");
    }
}
