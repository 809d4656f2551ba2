//! Messages exchanged between the participants of a channel.
//!
//! An update runs propose -> countersign -> acknowledge: the proposer sends a
//! [StateProposal] carrying its signature, the peer answers with
//! [StateAccepted] (its countersignature) or [StateRejected], and the proposer
//! confirms with [StateAcknowledged] once the fully signed state is in its
//! ledger. Both sides hold both signatures before either appends.

mod proposal;
mod update;

pub use proposal::ChannelProposal;
pub use update::{StateAccepted, StateAcknowledged, StateProposal, StateRejected};

use crate::{channel::ChannelId, types::ParseHexError};

#[derive(Debug, thiserror::Error)]
pub enum ConversionError {
    #[error("invalid byte string: {0}")]
    Bytes(#[from] ParseHexError),
    #[error("integer does not fit into 256 bits")]
    IntegerTooLarge,
    #[error("missing field `{0}`")]
    ExpectedSome(&'static str),
    #[error("invalid channel parameters: {0}")]
    InvalidParams(&'static str),
    #[error("participant index {0} out of range")]
    InvalidParticipantIndex(u32),
    #[error("genesis state does not belong to the proposed channel")]
    ChannelIdMismatch,
    #[error("envelope without message")]
    EmptyEnvelope,
    #[error("message of {0} bytes does not fit into a frame")]
    FrameTooLarge(usize),
    #[error("frame announces {announced} bytes, {available} available")]
    TruncatedFrame { announced: usize, available: usize },
    #[error("decode error: {0}")]
    Decode(#[from] prost::DecodeError),
    #[error("encode error: {0}")]
    Encode(#[from] prost::EncodeError),
}

/// Messages sent between participants of a channel.
#[derive(Debug, Clone, PartialEq)]
pub enum ParticipantMessage {
    ChannelProposal(ChannelProposal),
    StateProposal(StateProposal),
    StateAccepted(StateAccepted),
    StateAcknowledged(StateAcknowledged),
    StateRejected(StateRejected),
}

impl ParticipantMessage {
    pub fn channel_id(&self) -> ChannelId {
        match self {
            ParticipantMessage::ChannelProposal(m) => m.params.id(),
            ParticipantMessage::StateProposal(m) => m.state.channel_id(),
            ParticipantMessage::StateAccepted(m) => m.channel_id,
            ParticipantMessage::StateAcknowledged(m) => m.channel_id,
            ParticipantMessage::StateRejected(m) => m.channel_id,
        }
    }
}
