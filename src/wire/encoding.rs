use prost::{bytes::BufMut, Message};

use super::{
    proto::{envelope, Envelope},
    BytesBus, MessageBus,
};
use crate::{
    error::Result,
    messages::{ConversionError, ParticipantMessage},
    types::Address,
};
use tracing::trace;

/// Frames carry a big-endian u16 length prefix.
const LEN_PREFIX: usize = 2;

/// A decoded frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub sender: Address,
    pub recipient: Address,
    pub msg: ParticipantMessage,
}

#[derive(Debug)]
pub struct ProtoBufEncodingLayer<B: BytesBus> {
    pub bus: B,
}

impl<B: BytesBus> ProtoBufEncodingLayer<B> {
    pub fn new(bus: B) -> Self {
        ProtoBufEncodingLayer { bus }
    }
}

fn to_wire(msg: ParticipantMessage) -> envelope::Msg {
    match msg {
        ParticipantMessage::ChannelProposal(m) => envelope::Msg::ChannelProposal(m.into()),
        ParticipantMessage::StateProposal(m) => envelope::Msg::StateProposal(m.into()),
        ParticipantMessage::StateAccepted(m) => envelope::Msg::StateAccepted(m.into()),
        ParticipantMessage::StateAcknowledged(m) => envelope::Msg::StateAcknowledged(m.into()),
        ParticipantMessage::StateRejected(m) => envelope::Msg::StateRejected(m.into()),
    }
}

fn from_wire(msg: envelope::Msg) -> std::result::Result<ParticipantMessage, ConversionError> {
    Ok(match msg {
        envelope::Msg::ChannelProposal(m) => ParticipantMessage::ChannelProposal(m.try_into()?),
        envelope::Msg::StateProposal(m) => ParticipantMessage::StateProposal(m.try_into()?),
        envelope::Msg::StateAccepted(m) => ParticipantMessage::StateAccepted(m.try_into()?),
        envelope::Msg::StateAcknowledged(m) => {
            ParticipantMessage::StateAcknowledged(m.try_into()?)
        }
        envelope::Msg::StateRejected(m) => ParticipantMessage::StateRejected(m.try_into()?),
    })
}

/// Encode a message into one length prefixed frame.
pub fn encode_frame(
    sender: &Address,
    recipient: &Address,
    msg: ParticipantMessage,
) -> std::result::Result<Vec<u8>, ConversionError> {
    let envelope = Envelope {
        sender: sender.0.to_vec(),
        recipient: recipient.0.to_vec(),
        msg: Some(to_wire(msg)),
    };

    // The length is written as u16 (2 bytes), so we cannot use
    // `encode_length_delimited`, which would write a LEB128 varint.
    let len = envelope.encoded_len();
    let prefix = u16::try_from(len).map_err(|_| ConversionError::FrameTooLarge(len))?;

    let mut buf = Vec::with_capacity(LEN_PREFIX + len);
    buf.put_slice(&prefix.to_be_bytes());
    envelope.encode(&mut buf)?;
    Ok(buf)
}

/// Decode exactly one frame as produced by [encode_frame].
pub fn decode_frame(buf: &[u8]) -> std::result::Result<Frame, ConversionError> {
    if buf.len() < LEN_PREFIX {
        return Err(ConversionError::TruncatedFrame {
            announced: LEN_PREFIX,
            available: buf.len(),
        });
    }
    let announced = u16::from_be_bytes([buf[0], buf[1]]) as usize;
    let body = &buf[LEN_PREFIX..];
    if body.len() != announced {
        return Err(ConversionError::TruncatedFrame {
            announced,
            available: body.len(),
        });
    }

    let envelope = Envelope::decode(body)?;
    let msg = envelope.msg.ok_or(ConversionError::EmptyEnvelope)?;
    Ok(Frame {
        sender: Address::try_from(envelope.sender.as_slice())?,
        recipient: Address::try_from(envelope.recipient.as_slice())?,
        msg: from_wire(msg)?,
    })
}

impl<B: BytesBus> MessageBus for ProtoBufEncodingLayer<B> {
    fn send_to_participant(
        &self,
        sender: &Address,
        recipient: &Address,
        msg: ParticipantMessage,
    ) -> Result<()> {
        let buf = encode_frame(sender, recipient, msg)?;
        trace!(%sender, %recipient, len = buf.len(), "Sending frame");
        self.bus.send_to_participant(sender, recipient, &buf)
    }
}
