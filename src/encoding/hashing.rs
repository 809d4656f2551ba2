use super::{to_writer, Result, Writer};
use crate::types::Hash;

use serde::Serialize;
use sha3::{Digest, Keccak256};

/// Feeds every slot straight into a Keccak-256 hasher, so hashing a value
/// never materializes its encoding.
#[derive(Default)]
pub struct Keccak256Writer {
    hasher: Keccak256,
}

impl Writer for Keccak256Writer {
    fn write(&mut self, slot: &[u8]) {
        self.hasher.update(slot);
    }
}

impl Keccak256Writer {
    pub fn finalize(self) -> Hash {
        Hash(self.hasher.finalize().into())
    }
}

pub fn to_hash<T>(value: &T) -> Result<Hash>
where
    T: Serialize + ?Sized,
{
    let mut writer = Keccak256Writer::default();
    to_writer(value, &mut writer)?;
    Ok(writer.finalize())
}

/// Keccak-256 of raw bytes.
pub fn keccak256(data: &[u8]) -> Hash {
    Hash(Keccak256::digest(data).into())
}
