//! Two-party payment channels.
//!
//! Participants exchange bilaterally signed channel states off-chain and only
//! touch the chain to fund, to dispute and to conclude a channel. The
//! [subscription] layer uses a channel to pay a recipient once per period.

#[cfg(not(any(feature = "k256", feature = "secp256k1")))]
compile_error!("enable one of the signature backends: `k256` or `secp256k1`");

pub mod encoding;
pub mod error;
pub mod types;

pub mod sig;

pub mod channel;
pub mod messages;
pub mod wire;

pub mod chain;
pub mod clock;
pub mod config;
pub mod oracle;

mod client;
pub mod subscription;

pub use client::{ChannelClient, ClientEvent};
pub use config::Config;
pub use error::{Error, Result};
pub use types::{Address, Hash, Signature, U256};
