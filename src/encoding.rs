//! Canonical slot encoding used for everything that gets hashed or signed.
//!
//! Values are written as a flat sequence of 32 byte slots using serde. The
//! encoding is deterministic and injective for the types used in this crate,
//! which is all we need for signing payloads and deriving channel ids. It is
//! close to, but intentionally simpler than, Solidity's ABI encoding: there
//! are no head/tail offsets, dynamic values are length-prefixed in place.

mod error;
mod hashing;
mod ser;

pub mod as_bytes;

pub use error::{Error, Result};
pub use hashing::{keccak256, to_hash, Keccak256Writer};
pub use ser::{to_vec, to_writer, Serializer, Writer, SLOT_SIZE};

#[cfg(test)]
mod tests;
