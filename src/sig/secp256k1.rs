//! Signer using libsecp256k1 through the `secp256k1` crate.

use super::{address_from_uncompressed, hash_to_eth_signed_msg_hash, recovery_id};
use crate::{
    encoding::keccak256,
    error::{Error, Result},
    types::{Address, Hash, Signature},
};
use secp256k1::{
    ecdsa::{RecoverableSignature, RecoveryId},
    All, Message, PublicKey, Secp256k1, SecretKey,
};

impl From<PublicKey> for Address {
    fn from(pk: PublicKey) -> Self {
        address_from_uncompressed(&pk.serialize_uncompressed())
    }
}

pub struct Signer {
    secp: Secp256k1<All>,
    key: SecretKey,
    addr: Address,
}

impl core::fmt::Debug for Signer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Signer").field("addr", &self.addr).finish()
    }
}

impl Signer {
    pub fn new<R: rand::Rng + rand::CryptoRng>(rng: &mut R) -> Self {
        let secp = Secp256k1::new();
        let key = SecretKey::new(rng);
        let addr = PublicKey::from_secret_key(&secp, &key).into();
        Self { secp, key, addr }
    }

    /// Build a signer from a 32 byte secret key.
    pub fn from_bytes(secret: &[u8; 32]) -> Result<Self> {
        let secp = Secp256k1::new();
        let key = SecretKey::from_slice(secret).map_err(|e| Error::Signing(e.to_string()))?;
        let addr = PublicKey::from_secret_key(&secp, &key).into();
        Ok(Self { secp, key, addr })
    }

    pub fn address(&self) -> Address {
        self.addr
    }

    /// Sign the keccak-256 hash of `payload`.
    pub fn sign(&self, payload: &[u8]) -> Result<Signature> {
        self.sign_hash(keccak256(payload))
    }

    /// Sign a hash using a Ethereum 65-byte recoverable signature.
    ///
    /// Note that this differs from transaction signatures, as it does not
    /// include the chain id in `v` (EIP-155), OpenZeppelin's `ECDSA.recover`
    /// would reject it otherwise.
    pub fn sign_hash(&self, msg: Hash) -> Result<Signature> {
        let hash = hash_to_eth_signed_msg_hash(msg);
        let message = Message::from_slice(&hash.0).map_err(|e| Error::Signing(e.to_string()))?;

        let sig = self.secp.sign_ecdsa_recoverable(&message, &self.key);
        let (v, rs) = sig.serialize_compact();

        // EIP-2: only canonical (low s) signatures are accepted on-chain. The
        // library already produces them.
        debug_assert!(rs[32] & 0x80 == 0);

        // yParity offset by 27, see EIP-2098.
        let v: u8 = 27 + v.to_i32() as u8;
        Ok(Signature::new(&rs, v))
    }
}

/// Recover the signer of a hash signed with [Signer::sign_hash].
///
/// `msg` must not include the `Ethereum Signed Message` prefix.
pub fn recover_hash(msg: Hash, eth_sig: &Signature) -> Result<Address> {
    let hash = hash_to_eth_signed_msg_hash(msg);
    let invalid = |e: secp256k1::Error| Error::InvalidSignature(e.to_string());

    let recid = RecoveryId::from_i32(recovery_id(eth_sig)?.into()).map_err(invalid)?;
    let sig = RecoverableSignature::from_compact(&eth_sig.0[..64], recid).map_err(invalid)?;
    let message = Message::from_slice(&hash.0).map_err(invalid)?;

    let pk = Secp256k1::verification_only()
        .recover_ecdsa(&message, &sig)
        .map_err(invalid)?;
    Ok(pk.into())
}
