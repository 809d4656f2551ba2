//! Price feeds used to convert fiat amounts into token units.

use async_trait::async_trait;
use parking_lot::Mutex;
use rust_decimal::Decimal;

use crate::{
    error::{Error, Result},
    types::U256,
};

pub use crate::types::FeedId;

impl FeedId {
    /// `0x01` (crypto category) followed by `"FLR/USD"`.
    pub const FLR_USD: FeedId = FeedId([
        0x01, b'F', b'L', b'R', b'/', b'U', b'S', b'D', 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    ]);
}

/// A price of one whole token in fiat: `value / 10^decimals`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceData {
    pub value: u128,
    pub decimals: u8,
    /// Unix time the price was published.
    pub timestamp: u64,
}

fn pow10(exp: u32) -> Option<U256> {
    U256::from(10u8).checked_pow(U256::from(exp))
}

impl PriceData {
    pub fn new(value: u128, decimals: u8, timestamp: u64) -> Self {
        PriceData {
            value,
            decimals,
            timestamp,
        }
    }

    /// Fails with [Error::StalePrice] if the price is older than `max_age`
    /// seconds.
    pub fn check_fresh(&self, now: u64, max_age: u64) -> Result<()> {
        if now.saturating_sub(self.timestamp) > max_age {
            return Err(Error::StalePrice {
                timestamp: self.timestamp,
                now,
                max_age,
            });
        }
        Ok(())
    }

    pub fn as_decimal(&self) -> Result<Decimal> {
        let value = i128::try_from(self.value)
            .map_err(|_| Error::InvalidPrice(format!("{} does not fit a decimal", self.value)))?;
        Decimal::try_from_i128_with_scale(value, u32::from(self.decimals))
            .map_err(|e| Error::InvalidPrice(e.to_string()))
    }

    /// Token units (with `token_decimals`) worth `fiat`, rounded up.
    ///
    /// Computed as `fiat * 10^(token_decimals + decimals) / value` on 256 bit
    /// integers.
    pub fn fiat_to_token_units(&self, fiat: Decimal, token_decimals: u8) -> Result<U256> {
        if fiat.is_sign_negative() && !fiat.is_zero() {
            return Err(Error::InvalidAmount(format!("negative amount {fiat}")));
        }
        if self.value == 0 {
            return Err(Error::InvalidPrice("price is zero".to_string()));
        }

        let overflow = || Error::InvalidAmount(format!("{fiat} overflows 256 bits"));
        let mantissa = fiat.mantissa().unsigned_abs();
        let num = pow10(u32::from(token_decimals) + u32::from(self.decimals))
            .and_then(|p| U256::from(mantissa).checked_mul(p))
            .ok_or_else(overflow)?;
        let den = pow10(fiat.scale())
            .and_then(|p| U256::from(self.value).checked_mul(p))
            .ok_or_else(overflow)?;

        let (units, rem) = num.div_mod(den);
        if rem.is_zero() {
            Ok(units)
        } else {
            Ok(units + 1)
        }
    }
}

#[async_trait]
pub trait PriceOracle: Send + Sync {
    async fn read_feed(&self, feed: FeedId) -> Result<PriceData>;
}

/// Serves one price for every feed, updated by hand.
#[derive(Debug)]
pub struct FixedOracle {
    price: Mutex<PriceData>,
}

impl FixedOracle {
    pub fn new(price: PriceData) -> Self {
        FixedOracle {
            price: Mutex::new(price),
        }
    }

    pub fn set(&self, price: PriceData) {
        *self.price.lock() = price;
    }
}

#[async_trait]
impl PriceOracle for FixedOracle {
    async fn read_feed(&self, _feed: FeedId) -> Result<PriceData> {
        Ok(*self.price.lock())
    }
}
