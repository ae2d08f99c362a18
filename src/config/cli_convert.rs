//! CLI to Config conversion utilities

use anyhow::{Context, Result};
use num_bigint::BigUint;
use std::path::Path;

/// Parse a count string with decimal suffixes (e.g., "64k", "100M", "1g") to a number
///
/// Suffixes are powers of ten: `100M` is 100,000,000.
pub fn parse_count(s: &str) -> Result<u64> {
    let s = s.trim().to_lowercase();

    let (num_str, multiplier) = if s.ends_with('k') {
        (s.trim_end_matches('k'), 1_000u64)
    } else if s.ends_with('m') {
        (s.trim_end_matches('m'), 1_000_000)
    } else if s.ends_with('g') {
        (s.trim_end_matches('g'), 1_000_000_000)
    } else {
        (s.as_str(), 1)
    };

    let num: u64 = num_str.parse()
        .with_context(|| format!("Invalid count format: {}", s))?;

    num.checked_mul(multiplier)
        .with_context(|| format!("Count out of range: {}", s))
}

/// Parse the worker-thread count
///
/// Zero is accepted here; the validator rejects it so every entry point
/// reports it the same way.
pub fn parse_worker_count(s: &str) -> Result<usize> {
    let trimmed = s.trim();
    if trimmed.starts_with('-') {
        anyhow::bail!("worker count must be a positive integer, got {}", trimmed);
    }
    trimmed.parse::<usize>()
        .with_context(|| format!("worker count must be a positive integer, got '{}'", trimmed))
}

/// Parse a decimal dividend
pub fn parse_dividend(s: &str) -> Result<BigUint> {
    let trimmed = s.trim().replace('_', "");
    BigUint::parse_bytes(trimmed.as_bytes(), 10)
        .with_context(|| format!("Invalid decimal dividend: '{}'", s.trim()))
}

/// Normalize one node address, adding `default_port` when none is given
fn normalize_address(addr: &str, default_port: u16) -> String {
    if addr.contains(':') {
        addr.to_string()
    } else {
        format!("{}:{}", addr, default_port)
    }
}

/// Parse a comma-separated host list
pub fn parse_host_list(host_list: &str, default_port: u16) -> Result<Vec<String>> {
    let nodes: Vec<String> = host_list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| normalize_address(s, default_port))
        .collect();

    if nodes.is_empty() {
        anyhow::bail!("Host list is empty");
    }
    Ok(nodes)
}

/// Read node addresses from a clients file (one per line, `#` comments)
pub fn read_clients_file(path: &Path, default_port: u16) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read clients file: {}", path.display()))?;

    let nodes: Vec<String> = content.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| normalize_address(line, default_port))
        .collect();

    if nodes.is_empty() {
        anyhow::bail!("Clients file {} lists no nodes", path.display());
    }
    Ok(nodes)
}
