//! Serialize any `&[u8]` as a dynamic byte string: a length slot followed by
//! the data padded to whole slots.
//!
//! Without this, `Vec<u8>` would be serialized as a sequence with one slot
//! per byte.
//!
//! # Example usage
//! ```
//! use serde::Serialize;
//! use subchan::encoding::{as_bytes, to_vec};
//!
//! #[derive(Serialize)]
//! struct Payload {
//!     #[serde(with = "as_bytes")]
//!     data: Vec<u8>,
//! }
//!
//! let encoded = to_vec(&Payload { data: vec![0xa1, 0xa2] }).unwrap();
//! assert_eq!(encoded.len(), 64);
//! ```

use serde::{ser::SerializeTuple, Serialize, Serializer};

/// Forces `serialize_bytes` for the data part, which cannot be requested
/// through `serialize_element` directly.
struct Bytes<'a>(&'a [u8]);

impl<'a> Serialize for Bytes<'a> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_bytes(self.0)
    }
}

pub fn serialize<S>(v: &[u8], serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let mut s = serializer.serialize_tuple(2)?;
    s.serialize_element(&(v.len() as u64))?;
    s.serialize_element(&Bytes(v))?;
    s.end()
}
