//! Configuration module
//!
//! Handles CLI argument parsing, TOML configuration files, and validation.

pub mod cli;
pub mod cli_convert;
pub mod toml;
pub mod validator;

use anyhow::{Context, Result};
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Default dividend size: 10^8 random bits
pub const DEFAULT_BITS: u64 = 100_000_000;

/// Complete search configuration
///
/// The coordinator sends this to every node, so all processes scan with the
/// same thread count and provision the same wire buffers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Worker threads per process
    pub threads: usize,
    /// Random bits in the dividend, also the wire buffer budget
    #[serde(default = "default_bits")]
    pub bits: u64,
    /// Generator seed (wall-clock seconds when absent)
    #[serde(default)]
    pub seed: Option<u64>,
    /// Fixed decimal dividend, bypasses generation
    #[serde(default)]
    pub dividend: Option<String>,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub runtime: RuntimeConfig,
}

fn default_bits() -> u64 {
    DEFAULT_BITS
}

/// Output configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// JSON report path
    #[serde(default)]
    pub json_output: Option<PathBuf>,
}

/// Runtime flags
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    #[serde(default)]
    pub debug: bool,
    #[serde(default)]
    pub dry_run: bool,
}

impl SearchConfig {
    pub fn new(threads: usize) -> Self {
        Self {
            threads,
            bits: DEFAULT_BITS,
            seed: None,
            dividend: None,
            output: OutputConfig::default(),
            runtime: RuntimeConfig::default(),
        }
    }

    /// Parsed fixed dividend, if one was configured
    pub fn fixed_dividend(&self) -> Result<Option<BigUint>> {
        self.dividend
            .as_deref()
            .map(cli_convert::parse_dividend)
            .transpose()
            .context("Invalid dividend in configuration")
    }
}

impl fmt::Display for SearchConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} threads/process, {} bit budget", self.threads, self.bits)?;
        match (&self.dividend, self.seed) {
            (Some(_), _) => write!(f, ", fixed dividend"),
            (None, Some(seed)) => write!(f, ", seed {}", seed),
            (None, None) => write!(f, ", clock seed"),
        }
    }
}

/// Build the configuration from CLI arguments and an optional TOML file
///
/// CLI values take precedence over the file.
pub fn build_config(cli: &cli::Cli) -> Result<SearchConfig> {
    let base = match cli.config {
        Some(ref path) => Some(toml::parse_toml_file(path)?),
        None => None,
    };

    toml::merge_cli_with_config(cli, base)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_defaults() {
        let config = SearchConfig::new(4);
        assert_eq!(config.threads, 4);
        assert_eq!(config.bits, DEFAULT_BITS);
        assert!(config.seed.is_none());
        assert!(!config.runtime.debug);
    }

    #[test]
    fn test_fixed_dividend() {
        let mut config = SearchConfig::new(1);
        assert_eq!(config.fixed_dividend().unwrap(), None);

        config.dividend = Some("360".to_string());
        assert_eq!(config.fixed_dividend().unwrap(), Some(BigUint::from(360u32)));

        config.dividend = Some("nope".to_string());
        assert!(config.fixed_dividend().is_err());
    }

    #[test]
    fn test_display() {
        let mut config = SearchConfig::new(2);
        config.seed = Some(7);
        assert_eq!(config.to_string(), "2 threads/process, 100000000 bit budget, seed 7");
    }
}
