//! Two-party payment channels.
//!
//! A [ChannelMachine] owns the immutable [Channel] parameters, the
//! [StateLedger] of fully signed states and, while disputed, the [Dispute].
//! Every new state is checked by the [AllocationEngine] before it reaches the
//! ledger.

mod allocation;
mod dispute;
mod ledger;
mod lifecycle;
mod params;
mod state;
mod update;

use core::fmt;

use crate::types::Hash;

pub use allocation::{AllocationEngine, DestinationPolicy, TokenTotals};
pub use dispute::Dispute;
pub use ledger::StateLedger;
pub use lifecycle::{ChannelMachine, FundingOutcome, FundingRequest, Settlement, SettlementReason};
pub use params::Channel;
pub use state::{Allocation, ChannelState};
pub use update::PendingUpdate;

/// Index of a participant in the channel.
///
/// `0` is the proposer of the channel.
pub type PartIdx = usize;

/// Number of participants of every channel.
pub const PARTICIPANTS: usize = 2;

/// Content derived channel identifier, see [Channel::id].
pub type ChannelId = Hash;

/// Lifecycle status of a channel.
///
/// `VOID -> INITIAL -> ACTIVE -> {DISPUTE -> FINAL, FINAL}`. A channel whose
/// funding timed out goes back to `VOID`.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelStatus {
    Void = 0,
    Initial = 1,
    Active = 2,
    Dispute = 3,
    Final = 4,
}

impl ChannelStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ChannelStatus::Final | ChannelStatus::Void)
    }
}

impl TryFrom<u8> for ChannelStatus {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ChannelStatus::Void),
            1 => Ok(ChannelStatus::Initial),
            2 => Ok(ChannelStatus::Active),
            3 => Ok(ChannelStatus::Dispute),
            4 => Ok(ChannelStatus::Final),
            v => Err(v),
        }
    }
}

impl fmt::Display for ChannelStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ChannelStatus::Void => "VOID",
            ChannelStatus::Initial => "INITIAL",
            ChannelStatus::Active => "ACTIVE",
            ChannelStatus::Dispute => "DISPUTE",
            ChannelStatus::Final => "FINAL",
        })
    }
}

#[cfg(test)]
pub(crate) mod testutil {
    use super::*;
    use crate::{
        sig::Signer,
        types::{Address, U256},
    };
    use rand::{rngs::StdRng, SeedableRng};

    pub const TOKEN: Address = Address([0xee; 20]);

    pub struct Fixture {
        pub alice: Signer,
        pub bob: Signer,
        pub channel: Channel,
    }

    impl Fixture {
        pub fn new(challenge_period: u64) -> Self {
            let mut rng = StdRng::seed_from_u64(42);
            let alice = Signer::new(&mut rng);
            let bob = Signer::new(&mut rng);
            let channel = Channel::new(
                &[alice.address(), bob.address()],
                Address([0xad; 20]),
                challenge_period,
                U256::from(7u64),
                1_000,
            )
            .unwrap();
            Fixture {
                alice,
                bob,
                channel,
            }
        }

        pub fn participants(&self) -> [Address; PARTICIPANTS] {
            *self.channel.participants()
        }

        pub fn allocations(&self, a: u64, b: u64) -> Vec<Allocation> {
            let [pa, pb] = self.participants();
            vec![
                Allocation::new(pa, TOKEN, U256::from(a)),
                Allocation::new(pb, TOKEN, U256::from(b)),
            ]
        }

        pub fn genesis(&self, a: u64, b: u64) -> ChannelState {
            ChannelState::genesis(self.channel.id(), self.allocations(a, b), vec![])
        }

        pub fn sign_both(&self, mut state: ChannelState) -> ChannelState {
            state.sign(&self.alice, 0).unwrap();
            state.sign(&self.bob, 1).unwrap();
            state
        }
    }
}
