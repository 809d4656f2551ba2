//! Error type shared by every layer of the channel core.
//!
//! Each variant names the invariant that was violated, so the caller can
//! decide whether to retry with corrected input or give up.

use crate::{
    channel::{ChannelId, ChannelStatus, PartIdx},
    encoding,
    messages::ConversionError,
    types::{Address, U256},
};
use thiserror::Error;

/// Result type for channel operations
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// A channel needs exactly two distinct, non-zero participants.
    #[error("invalid participants: {0}")]
    InvalidParticipants(&'static str),

    /// A challenge period of zero, or shorter than the local minimum, leaves
    /// no time to answer a dispute.
    #[error("challenge period of {period}s is below the minimum of {minimum}s")]
    ChallengePeriodTooShort { period: u64, minimum: u64 },

    #[error("channel uses adjudicator {got}, expected {expected}")]
    UnexpectedAdjudicator { expected: Address, got: Address },

    /// The operation is not allowed in the channel's current lifecycle status.
    #[error("cannot {operation} while channel is {status}")]
    InvalidTransition {
        operation: &'static str,
        status: ChannelStatus,
    },

    #[error("stale turn number {proposed}, latest is {latest}")]
    StaleTurnNumber { latest: u64, proposed: u64 },

    #[error("skipped turn number {proposed}, expected {expected}")]
    SkippedTurnNumber { expected: u64, proposed: u64 },

    #[error("missing signatures of participants {missing:?}")]
    IncompleteSignatures { missing: Vec<PartIdx> },

    #[error("invalid signature: {0}")]
    InvalidSignature(String),

    #[error("signer {0} is not a participant of the channel")]
    UnknownSigner(Address),

    /// Value was created or destroyed for a token.
    #[error("conservation violated for token {token}: locked {locked}, allocated {allocated}")]
    ConservationViolation {
        token: Address,
        locked: U256,
        allocated: U256,
    },

    #[error("balance of {destination} in token {token} is {balance}, cannot pay {amount}")]
    NegativeAllocation {
        destination: Address,
        token: Address,
        balance: U256,
        amount: U256,
    },

    #[error("destination {0} is not whitelisted")]
    UnlistedDestination(Address),

    #[error("amount overflow for token {token}")]
    AmountOverflow { token: Address },

    #[error("channel not found: {0}")]
    ChannelNotFound(ChannelId),

    #[error("state belongs to channel {got}, expected {expected}")]
    WrongChannel { expected: ChannelId, got: ChannelId },

    /// Deposits were not observed in time, the channel is void.
    #[error("funding of channel {0} timed out")]
    FundingTimeout(ChannelId),

    #[error("state cannot close the channel: {0}")]
    NotFinal(&'static str),

    #[error("channel is {0}, not active")]
    NotActive(ChannelStatus),

    /// Two different fully signed states with the same turn number exist.
    /// The channel must be escalated to the adjudicator.
    #[error("conflicting fully signed states for turn {turn_num}")]
    DisputeCollision { turn_num: u64 },

    #[error("challenge period ends at {deadline}, now is {now}")]
    ChallengePeriodNotElapsed { deadline: u64, now: u64 },

    #[error("challenge period ended at {deadline}, now is {now}")]
    ChallengePeriodElapsed { deadline: u64, now: u64 },

    #[error("participant {0} already signed this state")]
    AlreadySigned(PartIdx),

    #[error("no pending proposal for turn {turn_num} of channel {channel_id}")]
    ProposalNotFound { channel_id: ChannelId, turn_num: u64 },

    #[error("price from {timestamp} is older than {max_age}s at {now}")]
    StalePrice {
        timestamp: u64,
        now: u64,
        max_age: u64,
    },

    #[error("invalid price: {0}")]
    InvalidPrice(String),

    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("next payment is due at {due_at}, now is {now}")]
    PaymentNotDue { due_at: u64, now: u64 },

    #[error("invalid app data: {0}")]
    InvalidAppData(String),

    #[error("encoding error: {0}")]
    Encoding(#[from] encoding::Error),

    #[error("wire error: {0}")]
    Wire(#[from] ConversionError),

    #[error("chain error: {0}")]
    Chain(String),

    #[error("signing error: {0}")]
    Signing(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
