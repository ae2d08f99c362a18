//! Fixed-capacity limb buffers
//!
//! Every big integer that crosses a process boundary travels as a
//! [`LimbBuffer`]: a capacity in 64-bit limbs, provisioned from the configured
//! bit budget, plus the used limbs in little-endian order. The length of
//! `limbs` is the used-length field; everything above it is implicitly zero.
//!
//! A value that needs more limbs than the capacity is a fatal error. Values
//! are never truncated.

use crate::error::{DivisorError, Result};
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

/// Bits per limb
pub const LIMB_BITS: u64 = 64;

/// Wire form of one big integer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimbBuffer {
    /// Provisioned width in limbs
    pub capacity: usize,
    /// Used limbs, least significant first, no trailing zero limbs
    pub limbs: Vec<u64>,
}

/// Limbs needed to carry any value of up to `bits` bits (at least one)
pub fn capacity_for_bits(bits: u64) -> usize {
    (bits.div_ceil(LIMB_BITS)).max(1) as usize
}

impl LimbBuffer {
    /// Export `value` into a buffer of `capacity` limbs
    pub fn export(value: &BigUint, capacity: usize) -> Result<Self> {
        let limbs = value.to_u64_digits();
        if limbs.len() > capacity {
            return Err(DivisorError::CapacityExceeded {
                needed: limbs.len(),
                capacity,
            });
        }
        Ok(Self { capacity, limbs })
    }

    /// Reconstruct the value, checking the buffer against the locally expected capacity
    pub fn import(&self, expected_capacity: usize) -> Result<BigUint> {
        if self.capacity != expected_capacity {
            return Err(DivisorError::CapacityMismatch {
                expected: expected_capacity,
                actual: self.capacity,
            });
        }
        if self.limbs.len() > self.capacity {
            return Err(DivisorError::CapacityExceeded {
                needed: self.limbs.len(),
                capacity: self.capacity,
            });
        }

        let mut bytes = Vec::with_capacity(self.limbs.len() * 8);
        for limb in &self.limbs {
            bytes.extend_from_slice(&limb.to_le_bytes());
        }
        Ok(BigUint::from_bytes_le(&bytes))
    }

    /// Used limbs
    pub fn used(&self) -> usize {
        self.limbs.len()
    }
}
