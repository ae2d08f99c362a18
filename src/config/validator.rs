//! Configuration validation
//!
//! Runs before any dividend is generated or any range is computed.

use super::*;
use crate::error::DivisorError;
use anyhow::Result;

/// Upper bound for the dividend size; a full buffer must fit one wire frame
pub const MAX_BITS: u64 = 1 << 32;

/// Validate complete configuration
pub fn validate_config(config: &SearchConfig) -> Result<()> {
    // Thread count first: nothing else may be touched when it is bad
    validate_threads(config.threads)?;
    validate_bits(config.bits)?;
    validate_dividend(config)?;

    if config.threads > num_cpus::get() * 4 {
        eprintln!(
            "Warning: {} threads per process on a {}-CPU machine; scans will time-share cores",
            config.threads,
            num_cpus::get()
        );
    }

    Ok(())
}

/// Reject a zero worker count
pub fn validate_threads(threads: usize) -> Result<()> {
    if threads == 0 {
        return Err(DivisorError::InvalidWorkerCount(threads).into());
    }
    Ok(())
}

/// Validate the digit budget
pub fn validate_bits(bits: u64) -> Result<()> {
    if bits == 0 {
        anyhow::bail!("bits must be at least 1");
    }
    if bits > MAX_BITS {
        anyhow::bail!("bits must be at most {}, got {}", MAX_BITS, bits);
    }
    Ok(())
}

/// A fixed dividend must parse and fit the wire budget
fn validate_dividend(config: &SearchConfig) -> Result<()> {
    if let Some(dividend) = config.fixed_dividend()? {
        let needed = dividend.bits();
        if needed > config.bits {
            anyhow::bail!(
                "dividend needs {} bits but the configured budget is {} (raise --bits)",
                needed,
                config.bits
            );
        }
    }
    Ok(())
}

/// Validate the process group size
pub fn validate_world_size(world_size: usize) -> Result<()> {
    if world_size == 0 {
        anyhow::bail!("process group must contain at least one process");
    }
    Ok(())
}
