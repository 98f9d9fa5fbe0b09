//! Fixed-point codec for floats stored as scaled integers
//!
//! A value is multiplied by `2^fraction_bits`, truncated toward zero and kept
//! in a 32 or 64 bit memory word. Values outside the representable range clamp
//! to the boundary memory pattern instead of wrapping.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SheetCfgError};

/// Margin kept below the next integer when computing the largest value
const MAX_VALUE_MARGIN: f64 = 1.0 / 256.0;

/// Bidirectional mapping between decimals and fixed-width integers
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FixedCodec {
    fraction_bits: u32,
    total_bits: u32,
}

impl FixedCodec {
    /// Create a codec; `total_bits` must be 32 or 64 and leave at least one
    /// integer bit besides the sign
    pub fn new(fraction_bits: u32, total_bits: u32) -> Result<Self> {
        if total_bits != 32 && total_bits != 64 {
            return Err(SheetCfgError::config(format!(
                "fixed-point width must be 32 or 64 bits, got {total_bits}"
            )));
        }
        if fraction_bits == 0 || fraction_bits >= total_bits - 1 {
            return Err(SheetCfgError::config(format!(
                "fraction bits must be within 1..{} for {total_bits}-bit fixed-point, got {fraction_bits}",
                total_bits - 1
            )));
        }
        Ok(Self {
            fraction_bits,
            total_bits,
        })
    }

    #[must_use]
    pub fn fraction_bits(&self) -> u32 {
        self.fraction_bits
    }

    #[must_use]
    pub fn total_bits(&self) -> u32 {
        self.total_bits
    }

    fn integer_bits(&self) -> u32 {
        self.total_bits - self.fraction_bits
    }

    fn scaling(&self) -> f64 {
        2f64.powi(i32::try_from(self.fraction_bits).unwrap_or(i32::MAX))
    }

    /// Largest value encoded without clamping
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn max_value(&self) -> f64 {
        let max_integer = (1_i128 << (self.integer_bits() - 1)) - 1;
        max_integer as f64 + 1.0 - MAX_VALUE_MARGIN
    }

    /// Smallest value encoded without clamping
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn min_value(&self) -> f64 {
        -((1_i128 << (self.integer_bits() - 1)) as f64)
    }

    /// Largest positive memory pattern
    #[must_use]
    pub fn max_memory(&self) -> i128 {
        (1_i128 << (self.total_bits - 1)) - 1
    }

    /// Minimum memory pattern as a signed integer
    #[must_use]
    pub fn signed_min_memory(&self) -> i128 {
        -(1_i128 << (self.total_bits - 1))
    }

    /// Minimum memory pattern reinterpreted as unsigned
    #[must_use]
    pub fn unsigned_min_memory(&self) -> i128 {
        1_i128 << (self.total_bits - 1)
    }

    fn type_mask(&self) -> i128 {
        (1_i128 << self.total_bits) - 1
    }

    /// Encode a value; negative results wrap into the unsigned range when
    /// `signed` is false
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn encode(&self, value: f64, signed: bool) -> i128 {
        if value.is_nan() {
            return 0;
        }
        if value >= self.max_value() {
            return self.max_memory();
        }
        if value <= self.min_value() {
            return if signed {
                self.signed_min_memory()
            } else {
                self.unsigned_min_memory()
            };
        }
        let scaled = (value * self.scaling()).trunc() as i128;
        if scaled >= 0 {
            scaled.min(self.max_memory())
        } else {
            let m = scaled.max(self.signed_min_memory());
            if signed { m } else { m & self.type_mask() }
        }
    }

    /// Whether `encode` would clamp the value
    #[must_use]
    pub fn clamps(&self, value: f64) -> bool {
        value >= self.max_value() || value <= self.min_value()
    }

    /// Decode a memory word produced by [`encode`](Self::encode), signed or not
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn decode(&self, memory: i128) -> f64 {
        let mut v = memory & self.type_mask();
        if v & (1_i128 << (self.total_bits - 1)) != 0 {
            v -= 1_i128 << self.total_bits;
        }
        v as f64 / self.scaling()
    }

    /// One quantization step
    #[must_use]
    pub fn resolution(&self) -> f64 {
        1.0 / self.scaling()
    }
}
