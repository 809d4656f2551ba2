//! Creation and verification of (Ethereum) signatures over state payloads.
//!
//! Two backends are available: `k256` (default, pure Rust) and `secp256k1`
//! (bindings to libsecp256k1). If both features are enabled `secp256k1` is
//! used for [Signer]. Both produce the same bytes for the same key and
//! payload, signatures are deterministic (RFC 6979).

use crate::{
    channel::PartIdx,
    encoding::keccak256,
    error::{Error, Result},
    types::{Address, Hash, Signature},
};
use sha3::{Digest, Keccak256};

#[cfg(feature = "k256")]
mod k256;
#[cfg(feature = "secp256k1")]
mod secp256k1;

#[cfg(feature = "secp256k1")]
pub use self::secp256k1::{recover_hash, Signer};

#[cfg(all(feature = "k256", not(feature = "secp256k1")))]
pub use self::k256::{recover_hash, Signer};

#[cfg(test)]
mod tests;

/// Add the `\x19Ethereum Signed Message:\n32` prefix to hash.
///
/// This is the format expected by the Solidity contracts.
fn hash_to_eth_signed_msg_hash(hash: Hash) -> Hash {
    // Packed encoding => We can't use the serializer
    let mut hasher = Keccak256::new();
    hasher.update(b"\x19Ethereum Signed Message:\n32");
    hasher.update(hash.0);
    Hash(hasher.finalize().into())
}

/// Ethereum address of an uncompressed SEC1 public key (`0x04 || x || y`).
fn address_from_uncompressed(point: &[u8]) -> Address {
    // Throw away the first byte, which is not part of the public key.
    let hash: [u8; 32] = Keccak256::digest(&point[1..]).into();
    let mut addr = Address::ZERO;
    addr.0.copy_from_slice(&hash[32 - 20..]);
    addr
}

/// Undo the `+ 27` applied to `v` when signing.
fn recovery_id(sig: &Signature) -> Result<u8> {
    sig.0[64]
        .checked_sub(27)
        .filter(|v| *v <= 1)
        .ok_or_else(|| Error::InvalidSignature(format!("recovery id {} out of range", sig.0[64])))
}

/// Recover the address that signed `payload`.
pub fn recover_signer(payload: &[u8], sig: &Signature) -> Result<Address> {
    recover_hash(keccak256(payload), sig)
}

/// Returns `true` iff `sig` is a signature of `expected` over `payload`.
pub fn verify(payload: &[u8], sig: &Signature, expected: Address) -> bool {
    matches!(recover_signer(payload, sig), Ok(addr) if addr == expected)
}

/// Index of the participant that produced `sig` over the payload with the
/// given hash.
pub fn identify_hash(hash: Hash, sig: &Signature, participants: &[Address]) -> Result<PartIdx> {
    let signer = recover_hash(hash, sig)?;
    participants
        .iter()
        .position(|p| *p == signer)
        .ok_or(Error::UnknownSigner(signer))
}

/// Index of the participant that produced `sig` over `payload`.
pub fn identify(payload: &[u8], sig: &Signature, participants: &[Address]) -> Result<PartIdx> {
    identify_hash(keccak256(payload), sig, participants)
}
