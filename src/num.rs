use alloy::primitives::U256;
use fastnum::{
    UD64, bint,
    decimal::{Context, RoundingMode, UnsignedDecimal},
};

use crate::error::SwapError;

/// Token amount converter between raw minor units (as stored in token
/// accounts and instruction data) and decimals.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Converter {
    decimals: i32,
}

impl Converter {
    pub fn new(decimals: u8) -> Self {
        Self {
            decimals: decimals as i32,
        }
    }

    pub fn decimals(&self) -> u8 {
        self.decimals as u8
    }

    /// `10^decimals` as a decimal, i.e. the number of raw units in one token.
    pub fn unit(&self) -> UD64 {
        Self::default().from_raw(U256::from(10u64).pow(U256::from(self.decimals as u64)))
    }

    pub fn from_raw(&self, value: U256) -> UD64 {
        match bint::UInt::<1>::from_le_slice(&value.as_le_slice()[..8]) {
            Some(unscaled) if value <= U256::from(u64::MAX) => UnsignedDecimal::<1>::from_parts(
                unscaled,
                -self.decimals,
                Context::default().with_rounding_mode(RoundingMode::Floor),
            ),
            _ => UD64::MAX,
        }
    }

    /// Converts a decimal amount into raw units, truncating any precision
    /// the token can not represent.
    pub fn to_raw(&self, value: UD64) -> Result<u64, SwapError> {
        let overflow = || {
            SwapError::InvalidRequest(format!(
                "amount {value} overflows raw units with {} decimals",
                self.decimals
            ))
        };
        let digits = U256::from_le_slice(value.digits().to_radix_le(256).as_slice());
        let shift = self.decimals - value.fractional_digits_count() as i32;
        let pow10 = |exp: i32| U256::from(10u64).checked_pow(U256::from(exp.unsigned_abs()));
        let raw = if shift >= 0 {
            pow10(shift).and_then(|scale| digits.checked_mul(scale))
        } else {
            Some(pow10(shift).map_or(U256::ZERO, |scale| digits / scale))
        };
        raw.and_then(|raw| u64::try_from(raw).ok()).ok_or_else(overflow)
    }
}

/// Parses a decimal literal such as `"10.25"`.
pub fn parse_decimal(value: &str) -> Result<UD64, SwapError> {
    UD64::from_str(value, Context::default())
        .map_err(|_| SwapError::InvalidRequest(format!("invalid decimal: {value}")))
}
