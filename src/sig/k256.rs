//! Signer using the k256 Rust crate (implementation of ecdsa in Rust).

use super::{address_from_uncompressed, hash_to_eth_signed_msg_hash, recovery_id};
use crate::{
    encoding::keccak256,
    error::{Error, Result},
    types::{Address, Hash, Signature},
};
use k256::{
    ecdsa::{
        recoverable,
        signature::{hazmat::PrehashSigner, Signature as k256Signature},
        SigningKey, VerifyingKey,
    },
    elliptic_curve::sec1::ToEncodedPoint,
};

impl From<VerifyingKey> for Address {
    fn from(key: VerifyingKey) -> Self {
        address_from_uncompressed(key.to_encoded_point(false).as_bytes())
    }
}

pub struct Signer {
    key: SigningKey,
    addr: Address,
}

impl core::fmt::Debug for Signer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        // Never print the key.
        f.debug_struct("Signer").field("addr", &self.addr).finish()
    }
}

impl Signer {
    pub fn new<R: rand::Rng + rand::CryptoRng>(rng: &mut R) -> Self {
        let key = SigningKey::random(rng);
        let addr = key.verifying_key().into();
        Self { key, addr }
    }

    /// Build a signer from a 32 byte secret key.
    pub fn from_bytes(secret: &[u8; 32]) -> Result<Self> {
        let key = SigningKey::from_bytes(secret).map_err(|e| Error::Signing(e.to_string()))?;
        let addr = key.verifying_key().into();
        Ok(Self { key, addr })
    }

    pub fn address(&self) -> Address {
        self.addr
    }

    /// Sign the keccak-256 hash of `payload`.
    pub fn sign(&self, payload: &[u8]) -> Result<Signature> {
        self.sign_hash(keccak256(payload))
    }

    pub fn sign_hash(&self, msg: Hash) -> Result<Signature> {
        // "\x19Ethereum Signed Message:\n32" format
        let hash = hash_to_eth_signed_msg_hash(msg);

        let sig: recoverable::Signature = self
            .key
            .sign_prehash(&hash.0)
            .map_err(|e| Error::Signing(e.to_string()))?;

        // 65 bytes containing r, s and v in this order. We still have to add
        // 27 to v for the signature to be valid in the EVM.
        let mut sig = Signature::try_from(sig.as_bytes())
            .map_err(|e| Error::Signing(e.to_string()))?;
        debug_assert!(sig.0[32] & 0x80 == 0);
        sig.0[64] += 27;
        Ok(sig)
    }
}

/// Recover the signer of a hash signed with [Signer::sign_hash].
///
/// `msg` must not include the `Ethereum Signed Message` prefix.
pub fn recover_hash(msg: Hash, eth_sig: &Signature) -> Result<Address> {
    let hash = hash_to_eth_signed_msg_hash(msg);

    let mut sig_bytes: [u8; 65] = eth_sig.0;
    sig_bytes[64] = recovery_id(eth_sig)?;

    let sig = recoverable::Signature::from_bytes(&sig_bytes)
        .map_err(|e| Error::InvalidSignature(e.to_string()))?;
    let verifying_key = sig
        .recover_verifying_key_from_digest_bytes(&hash.0.into())
        .map_err(|e| Error::InvalidSignature(e.to_string()))?;
    Ok(verifying_key.into())
}
