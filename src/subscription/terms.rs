use serde::Serialize;

use crate::{
    encoding::{self, SLOT_SIZE},
    error::{Error, Result},
    types::{Address, U256},
};

/// Subscription terms, stored in the `app_data` of every channel state.
///
/// Encoded as four slots: recipient, amount per period, start and period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SubscriptionTerms {
    pub recipient: Address,
    /// Token units paid per period.
    pub amount: U256,
    /// Unix time of the first payment.
    pub start: u64,
    /// Seconds between payments.
    pub period: u64,
}

const ENCODED_LEN: usize = 4 * SLOT_SIZE;

fn u64_slot(slot: &[u8], field: &str) -> Result<u64> {
    let (high, low) = slot.split_at(SLOT_SIZE - 8);
    if high.iter().any(|b| *b != 0) {
        return Err(Error::InvalidAppData(format!("{} does not fit 64 bits", field)));
    }
    let mut buf = [0u8; 8];
    buf.copy_from_slice(low);
    Ok(u64::from_be_bytes(buf))
}

impl SubscriptionTerms {
    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(encoding::to_vec(self)?)
    }

    pub fn decode(app_data: &[u8]) -> Result<Self> {
        if app_data.len() != ENCODED_LEN {
            return Err(Error::InvalidAppData(format!(
                "expected {} bytes, got {}",
                ENCODED_LEN,
                app_data.len()
            )));
        }
        let slots: Vec<&[u8]> = app_data.chunks(SLOT_SIZE).collect();

        let (padding, recipient) = slots[0].split_at(SLOT_SIZE - Address::LEN);
        if padding.iter().any(|b| *b != 0) {
            return Err(Error::InvalidAppData("recipient is not an address".to_string()));
        }
        let recipient = Address::try_from(recipient)
            .map_err(|e| Error::InvalidAppData(e.to_string()))?;
        let amount = U256::from_big_endian(slots[1]);
        let start = u64_slot(slots[2], "start")?;
        let period = u64_slot(slots[3], "period")?;

        if amount.is_zero() {
            return Err(Error::InvalidAppData("amount is zero".to_string()));
        }
        if period == 0 {
            return Err(Error::InvalidAppData("period is zero".to_string()));
        }
        Ok(SubscriptionTerms {
            recipient,
            amount,
            start,
            period,
        })
    }

    /// Unix time the payment after `payments_made` payments is due.
    pub fn due_at(&self, payments_made: u64) -> u64 {
        self.start
            .saturating_add(self.period.saturating_mul(payments_made))
    }
}
