//! Transport abstraction for participant messages.

mod encoding;
pub mod proto;

use core::fmt::Debug;

pub use encoding::{decode_frame, encode_frame, Frame, ProtoBufEncodingLayer};

use crate::{error::Result, messages::ParticipantMessage, types::Address};

/// Byte level transport, e.g. a TCP connection per peer.
pub trait BytesBus: Debug + Send + Sync {
    fn send_to_participant(&self, sender: &Address, recipient: &Address, msg: &[u8]) -> Result<()>;
}

/// Low-Level abstraction over the network configuration.
///
/// The client only talks to this trait, [ProtoBufEncodingLayer] turns it into
/// length prefixed protobuf frames for a [BytesBus].
pub trait MessageBus: Debug + Send + Sync {
    fn send_to_participant(
        &self,
        sender: &Address,
        recipient: &Address,
        msg: ParticipantMessage,
    ) -> Result<()>;
}
