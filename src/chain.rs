//! On-chain collaborator.
//!
//! The channel core never talks to a blockchain itself. Deposits, dispute
//! registration, counter-claims and conclusion are handed to an implementation
//! of [Chain], which also reports when all deposits have arrived.

use async_trait::async_trait;

use crate::{
    channel::{Allocation, Channel, ChannelId, ChannelState, FundingRequest, Settlement},
    error::Result,
    types::{Address, Hash},
};

/// A transaction for the adjudicator contract.
#[derive(Debug, Clone, PartialEq)]
pub enum ChainTransaction {
    /// Deposit the local participant's genesis allocations.
    Fund {
        channel_id: ChannelId,
        deposits: Vec<Allocation>,
    },
    /// Register a fully signed state, starting the challenge window.
    Register { params: Channel, state: ChannelState },
    /// Replace the registered state by a newer fully signed one.
    Challenge {
        channel_id: ChannelId,
        state: ChannelState,
    },
    /// Pay out the settled allocations.
    Conclude { settlement: Settlement },
}

impl ChainTransaction {
    pub fn channel_id(&self) -> ChannelId {
        match self {
            ChainTransaction::Fund { channel_id, .. } => *channel_id,
            ChainTransaction::Register { params, .. } => params.id(),
            ChainTransaction::Challenge { channel_id, .. } => *channel_id,
            ChainTransaction::Conclude { settlement } => settlement.channel_id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Receipt {
    pub tx_hash: Hash,
    /// Unix time of the block including the transaction.
    pub block_time: u64,
}

#[async_trait]
pub trait Chain: Send + Sync {
    /// Account paying for the transactions.
    fn address(&self) -> Address;

    /// Network the transactions are sent to.
    fn chain_id(&self) -> u64;

    async fn send_transaction(&self, tx: ChainTransaction) -> Result<Receipt>;

    /// Resolves once every participant has deposited its part of
    /// `request.locked`. Callers bound the wait with a timeout.
    async fn await_deposits(&self, request: &FundingRequest) -> Result<()>;
}
