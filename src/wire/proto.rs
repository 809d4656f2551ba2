//! Protobuf schema of the participant wire protocol.
//!
//! ```proto
//! message Envelope {
//!   bytes sender = 1;
//!   bytes recipient = 2;
//!   oneof msg {
//!     ChannelProposalMsg channel_proposal = 3;
//!     StateProposalMsg state_proposal = 4;
//!     StateAcceptedMsg state_accepted = 5;
//!     StateAcknowledgedMsg state_acknowledged = 6;
//!     StateRejectedMsg state_rejected = 7;
//!   }
//! }
//! ```
//!
//! Addresses, hashes and signatures are raw bytes, amounts and nonces are
//! 32 byte big-endian integers.

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Envelope {
    #[prost(bytes = "vec", tag = "1")]
    pub sender: Vec<u8>,
    #[prost(bytes = "vec", tag = "2")]
    pub recipient: Vec<u8>,
    #[prost(oneof = "envelope::Msg", tags = "3, 4, 5, 6, 7")]
    pub msg: Option<envelope::Msg>,
}

pub mod envelope {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Msg {
        #[prost(message, tag = "3")]
        ChannelProposal(super::ChannelProposalMsg),
        #[prost(message, tag = "4")]
        StateProposal(super::StateProposalMsg),
        #[prost(message, tag = "5")]
        StateAccepted(super::StateAcceptedMsg),
        #[prost(message, tag = "6")]
        StateAcknowledged(super::StateAcknowledgedMsg),
        #[prost(message, tag = "7")]
        StateRejected(super::StateRejectedMsg),
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Params {
    #[prost(bytes = "vec", repeated, tag = "1")]
    pub participants: Vec<Vec<u8>>,
    #[prost(bytes = "vec", tag = "2")]
    pub adjudicator: Vec<u8>,
    #[prost(uint64, tag = "3")]
    pub challenge_period: u64,
    #[prost(bytes = "vec", tag = "4")]
    pub nonce: Vec<u8>,
    #[prost(uint64, tag = "5")]
    pub created_at: u64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Allocation {
    #[prost(bytes = "vec", tag = "1")]
    pub destination: Vec<u8>,
    #[prost(bytes = "vec", tag = "2")]
    pub token: Vec<u8>,
    #[prost(bytes = "vec", tag = "3")]
    pub amount: Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct State {
    #[prost(bytes = "vec", tag = "1")]
    pub channel_id: Vec<u8>,
    #[prost(uint64, tag = "2")]
    pub turn_num: u64,
    #[prost(bytes = "vec", tag = "3")]
    pub app_data: Vec<u8>,
    #[prost(bool, tag = "4")]
    pub is_final: bool,
    #[prost(message, repeated, tag = "5")]
    pub allocations: Vec<Allocation>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ChannelProposalMsg {
    #[prost(message, optional, tag = "1")]
    pub params: Option<Params>,
    #[prost(message, optional, tag = "2")]
    pub genesis: Option<State>,
    #[prost(bytes = "vec", tag = "3")]
    pub sig: Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct StateProposalMsg {
    #[prost(message, optional, tag = "1")]
    pub state: Option<State>,
    #[prost(uint32, tag = "2")]
    pub actor_idx: u32,
    #[prost(bytes = "vec", tag = "3")]
    pub sig: Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct StateAcceptedMsg {
    #[prost(bytes = "vec", tag = "1")]
    pub channel_id: Vec<u8>,
    #[prost(uint64, tag = "2")]
    pub turn_num: u64,
    #[prost(bytes = "vec", tag = "3")]
    pub sig: Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct StateAcknowledgedMsg {
    #[prost(bytes = "vec", tag = "1")]
    pub channel_id: Vec<u8>,
    #[prost(uint64, tag = "2")]
    pub turn_num: u64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct StateRejectedMsg {
    #[prost(bytes = "vec", tag = "1")]
    pub channel_id: Vec<u8>,
    #[prost(uint64, tag = "2")]
    pub turn_num: u64,
    #[prost(string, tag = "3")]
    pub reason: String,
}
