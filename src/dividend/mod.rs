//! Dividend source
//!
//! The coordinator draws one uniformly random value of the configured bit
//! length. The generator is seeded from wall-clock seconds unless a seed is
//! given, so a run can be reproduced with `--seed`.

use crate::config::SearchConfig;
use anyhow::{Context, Result};
use num_bigint::{BigUint, RandBigInt};
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;
use std::time::{SystemTime, UNIX_EPOCH};

/// Seed derived from wall-clock time (seconds since the Unix epoch)
pub fn clock_seed() -> Result<u64> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .context("System clock is before the Unix epoch")?;
    Ok(now.as_secs())
}

/// Random value below `2^bits`
pub fn generate(bits: u64, seed: u64) -> BigUint {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
    rng.gen_biguint(bits)
}

/// The dividend the coordinator will broadcast: the fixed value if configured,
/// otherwise a freshly generated one
pub fn resolve(config: &SearchConfig) -> Result<BigUint> {
    if let Some(dividend) = config.fixed_dividend()? {
        return Ok(dividend);
    }

    let seed = match config.seed {
        Some(seed) => seed,
        None => clock_seed()?,
    };
    if config.runtime.debug {
        eprintln!("DEBUG: generating {}-bit dividend with seed {}", config.bits, seed);
    }
    Ok(generate(config.bits, seed))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_respects_bit_budget() {
        for bits in [1u64, 7, 64, 65, 1000] {
            let value = generate(bits, 99);
            assert!(value.bits() <= bits, "bits={} got {}", bits, value.bits());
        }
    }

    #[test]
    fn test_generate_is_deterministic_per_seed() {
        assert_eq!(generate(512, 1234), generate(512, 1234));
        assert_ne!(generate(512, 1234), generate(512, 4321));
    }

    #[test]
    fn test_resolve_prefers_fixed_dividend() {
        let mut config = SearchConfig::new(1);
        config.dividend = Some("360".to_string());
        config.seed = Some(5);
        assert_eq!(resolve(&config).unwrap(), BigUint::from(360u32));
    }

    #[test]
    fn test_resolve_with_seed() {
        let mut config = SearchConfig::new(1);
        config.bits = 256;
        config.seed = Some(77);
        assert_eq!(resolve(&config).unwrap(), generate(256, 77));
    }

    #[test]
    fn test_clock_seed() {
        assert!(clock_seed().unwrap() > 1_600_000_000);
    }
}
