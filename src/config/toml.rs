//! TOML configuration file parsing

use super::*;
use crate::config::cli::Cli;
use crate::config::cli_convert;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Parse TOML configuration file
pub fn parse_toml_file(path: &Path) -> Result<SearchConfig> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    parse_toml_string(&contents)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Parse TOML configuration from string
pub fn parse_toml_string(contents: &str) -> Result<SearchConfig> {
    let config: SearchConfig = ::toml::from_str(contents)
        .context("Failed to parse TOML configuration")?;

    Ok(config)
}

/// Merge CLI arguments with TOML configuration (CLI takes precedence)
///
/// Without a file, the thread count must come from the command line.
pub fn merge_cli_with_config(cli: &Cli, config: Option<SearchConfig>) -> Result<SearchConfig> {
    let cli_threads = cli.threads
        .as_deref()
        .map(cli_convert::parse_worker_count)
        .transpose()?;

    let mut config = match (config, cli_threads) {
        (Some(mut config), Some(threads)) => {
            config.threads = threads;
            config
        }
        (Some(config), None) => config,
        (None, Some(threads)) => SearchConfig::new(threads),
        (None, None) => anyhow::bail!("Missing worker thread count (usage: divsearch <THREADS>)"),
    };

    if let Some(ref bits) = cli.bits {
        config.bits = cli_convert::parse_count(bits).context("Invalid --bits")?;
    }
    if let Some(seed) = cli.seed {
        config.seed = Some(seed);
    }
    if let Some(ref dividend) = cli.dividend {
        config.dividend = Some(dividend.clone());
    }
    if let Some(ref path) = cli.json_output {
        config.output.json_output = Some(path.clone());
    }
    if cli.debug {
        config.runtime.debug = true;
    }
    if cli.dry_run {
        config.runtime.dry_run = true;
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::io::Write;

    fn cli(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_parse_toml_string() {
        let config = parse_toml_string(
            r#"
            threads = 6
            bits = 4096
            seed = 42

            [output]
            json_output = "/tmp/result.json"
            "#,
        )
        .unwrap();

        assert_eq!(config.threads, 6);
        assert_eq!(config.bits, 4096);
        assert_eq!(config.seed, Some(42));
        assert_eq!(config.output.json_output, Some(PathBuf::from("/tmp/result.json")));
        assert!(!config.runtime.debug);
    }

    #[test]
    fn test_parse_toml_defaults() {
        let config = parse_toml_string("threads = 2").unwrap();
        assert_eq!(config.bits, DEFAULT_BITS);
        assert!(config.dividend.is_none());
    }

    #[test]
    fn test_parse_toml_missing_threads() {
        assert!(parse_toml_string("bits = 64").is_err());
    }

    #[test]
    fn test_parse_toml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "threads = 3").unwrap();
        writeln!(file, "dividend = \"360\"").unwrap();

        let config = parse_toml_file(file.path()).unwrap();
        assert_eq!(config.threads, 3);
        assert_eq!(config.dividend.as_deref(), Some("360"));
    }

    #[test]
    fn test_merge_cli_overrides_file() {
        let file_config = parse_toml_string("threads = 2\nbits = 128\nseed = 1").unwrap();
        let args = cli(&["divsearch", "8", "--bits", "64k", "--debug"]);

        let config = merge_cli_with_config(&args, Some(file_config)).unwrap();
        assert_eq!(config.threads, 8);
        assert_eq!(config.bits, 64_000);
        assert_eq!(config.seed, Some(1));
        assert!(config.runtime.debug);
    }

    #[test]
    fn test_merge_keeps_file_threads() {
        let file_config = parse_toml_string("threads = 5").unwrap();
        let config = merge_cli_with_config(&cli(&["divsearch"]), Some(file_config)).unwrap();
        assert_eq!(config.threads, 5);
    }

    #[test]
    fn test_merge_missing_threads() {
        assert!(merge_cli_with_config(&cli(&["divsearch"]), None).is_err());
    }

    #[test]
    fn test_merge_bad_threads() {
        assert!(merge_cli_with_config(&cli(&["divsearch", "many"]), None).is_err());
    }
}
