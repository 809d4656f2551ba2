use super::ConversionError;
use crate::{
    channel::{ChannelId, ChannelState, PartIdx, PARTICIPANTS},
    types::{Hash, Signature},
    wire::proto,
};

/// A proposed next state, signed by the participant `actor_idx`.
#[derive(Debug, Clone, PartialEq)]
pub struct StateProposal {
    pub state: ChannelState,
    pub actor_idx: PartIdx,
    pub sig: Signature,
}

/// Countersignature of the proposal for `turn_num`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateAccepted {
    pub channel_id: ChannelId,
    pub turn_num: u64,
    pub sig: Signature,
}

/// The fully signed state of `turn_num` is in the proposer's ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateAcknowledged {
    pub channel_id: ChannelId,
    pub turn_num: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateRejected {
    pub channel_id: ChannelId,
    pub turn_num: u64,
    pub reason: String,
}

impl TryFrom<proto::StateProposalMsg> for StateProposal {
    type Error = ConversionError;

    fn try_from(value: proto::StateProposalMsg) -> Result<Self, Self::Error> {
        let actor_idx = value.actor_idx as usize;
        if actor_idx >= PARTICIPANTS {
            return Err(ConversionError::InvalidParticipantIndex(value.actor_idx));
        }

        Ok(Self {
            state: value
                .state
                .ok_or(ConversionError::ExpectedSome("state"))?
                .try_into()?,
            actor_idx,
            sig: Signature::try_from(value.sig.as_slice())?,
        })
    }
}

impl From<StateProposal> for proto::StateProposalMsg {
    fn from(value: StateProposal) -> Self {
        Self {
            state: Some((&value.state).into()),
            actor_idx: value.actor_idx as u32,
            sig: value.sig.0.to_vec(),
        }
    }
}

impl TryFrom<proto::StateAcceptedMsg> for StateAccepted {
    type Error = ConversionError;

    fn try_from(value: proto::StateAcceptedMsg) -> Result<Self, Self::Error> {
        Ok(StateAccepted {
            channel_id: Hash::try_from(value.channel_id.as_slice())?,
            turn_num: value.turn_num,
            sig: Signature::try_from(value.sig.as_slice())?,
        })
    }
}

impl From<StateAccepted> for proto::StateAcceptedMsg {
    fn from(value: StateAccepted) -> Self {
        Self {
            channel_id: value.channel_id.0.to_vec(),
            turn_num: value.turn_num,
            sig: value.sig.0.to_vec(),
        }
    }
}

impl TryFrom<proto::StateAcknowledgedMsg> for StateAcknowledged {
    type Error = ConversionError;

    fn try_from(value: proto::StateAcknowledgedMsg) -> Result<Self, Self::Error> {
        Ok(StateAcknowledged {
            channel_id: Hash::try_from(value.channel_id.as_slice())?,
            turn_num: value.turn_num,
        })
    }
}

impl From<StateAcknowledged> for proto::StateAcknowledgedMsg {
    fn from(value: StateAcknowledged) -> Self {
        Self {
            channel_id: value.channel_id.0.to_vec(),
            turn_num: value.turn_num,
        }
    }
}

impl TryFrom<proto::StateRejectedMsg> for StateRejected {
    type Error = ConversionError;

    fn try_from(value: proto::StateRejectedMsg) -> Result<Self, Self::Error> {
        Ok(StateRejected {
            channel_id: Hash::try_from(value.channel_id.as_slice())?,
            turn_num: value.turn_num,
            reason: value.reason,
        })
    }
}

impl From<StateRejected> for proto::StateRejectedMsg {
    fn from(value: StateRejected) -> Self {
        Self {
            channel_id: value.channel_id.0.to_vec(),
            turn_num: value.turn_num,
            reason: value.reason,
        }
    }
}
