use super::ConversionError;
use crate::{
    channel::{Allocation, Channel, ChannelState},
    error::Error,
    types::{Address, Hash, Signature, U256},
    wire::proto,
};

/// Channel parameters and genesis state, signed by the proposer.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelProposal {
    pub params: Channel,
    pub genesis: ChannelState,
    pub sig: Signature,
}

pub(super) fn u256_from_bytes(bytes: &[u8]) -> Result<U256, ConversionError> {
    U256::from_be_slice(bytes).ok_or(ConversionError::IntegerTooLarge)
}

impl From<&Channel> for proto::Params {
    fn from(value: &Channel) -> Self {
        Self {
            participants: value.participants().iter().map(|p| p.0.to_vec()).collect(),
            adjudicator: value.adjudicator().0.to_vec(),
            challenge_period: value.challenge_period(),
            nonce: value.nonce().to_be_bytes().to_vec(),
            created_at: value.created_at(),
        }
    }
}

impl TryFrom<proto::Params> for Channel {
    type Error = ConversionError;

    /// The channel id is not transmitted, it is derived again from the
    /// parameters.
    fn try_from(value: proto::Params) -> Result<Self, Self::Error> {
        let participants = value
            .participants
            .iter()
            .map(|p| Address::try_from(p.as_slice()))
            .collect::<Result<Vec<_>, _>>()?;

        Channel::new(
            &participants,
            Address::try_from(value.adjudicator.as_slice())?,
            value.challenge_period,
            u256_from_bytes(&value.nonce)?,
            value.created_at,
        )
        .map_err(|e| match e {
            Error::InvalidParticipants(reason) => ConversionError::InvalidParams(reason),
            _ => ConversionError::InvalidParams("cannot derive channel id"),
        })
    }
}

impl From<&Allocation> for proto::Allocation {
    fn from(value: &Allocation) -> Self {
        Self {
            destination: value.destination.0.to_vec(),
            token: value.token.0.to_vec(),
            amount: value.amount.to_be_bytes().to_vec(),
        }
    }
}

impl TryFrom<proto::Allocation> for Allocation {
    type Error = ConversionError;

    fn try_from(value: proto::Allocation) -> Result<Self, Self::Error> {
        Ok(Allocation::new(
            Address::try_from(value.destination.as_slice())?,
            Address::try_from(value.token.as_slice())?,
            u256_from_bytes(&value.amount)?,
        ))
    }
}

/// Signatures travel separately, the wire state is always unsigned.
impl From<&ChannelState> for proto::State {
    fn from(value: &ChannelState) -> Self {
        Self {
            channel_id: value.channel_id().0.to_vec(),
            turn_num: value.turn_num(),
            app_data: value.app_data().to_vec(),
            is_final: value.is_final(),
            allocations: value.allocations().iter().map(Into::into).collect(),
        }
    }
}

impl TryFrom<proto::State> for ChannelState {
    type Error = ConversionError;

    fn try_from(value: proto::State) -> Result<Self, Self::Error> {
        let allocations = value
            .allocations
            .into_iter()
            .map(Allocation::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ChannelState::from_parts(
            Hash::try_from(value.channel_id.as_slice())?,
            value.turn_num,
            value.app_data,
            value.is_final,
            allocations,
        ))
    }
}

impl TryFrom<proto::ChannelProposalMsg> for ChannelProposal {
    type Error = ConversionError;

    fn try_from(value: proto::ChannelProposalMsg) -> Result<Self, Self::Error> {
        let params: Channel = value
            .params
            .ok_or(ConversionError::ExpectedSome("params"))?
            .try_into()?;
        let genesis: ChannelState = value
            .genesis
            .ok_or(ConversionError::ExpectedSome("genesis"))?
            .try_into()?;
        if genesis.channel_id() != params.id() {
            return Err(ConversionError::ChannelIdMismatch);
        }

        Ok(ChannelProposal {
            params,
            genesis,
            sig: Signature::try_from(value.sig.as_slice())?,
        })
    }
}

impl From<ChannelProposal> for proto::ChannelProposalMsg {
    fn from(value: ChannelProposal) -> Self {
        Self {
            params: Some((&value.params).into()),
            genesis: Some((&value.genesis).into()),
            sig: value.sig.0.to_vec(),
        }
    }
}
