use super::error::{Error, Result};
use serde::{
    ser::{
        self, SerializeMap, SerializeSeq, SerializeStruct, SerializeStructVariant, SerializeTuple,
        SerializeTupleStruct, SerializeTupleVariant,
    },
    Serialize,
};

pub const SLOT_SIZE: usize = 32; // bytes

/// Sink for encoded slots.
///
/// Every call receives a multiple of [SLOT_SIZE] bytes.
pub trait Writer {
    fn write(&mut self, slot: &[u8]);
}

impl Writer for Vec<u8> {
    fn write(&mut self, slot: &[u8]) {
        self.extend_from_slice(slot);
    }
}

pub struct Serializer<'a, W>
where
    W: Writer,
{
    writer: &'a mut W,
}

pub fn to_writer<T, W>(value: &T, writer: &mut W) -> Result<()>
where
    T: Serialize + ?Sized,
    W: Writer,
{
    let mut serializer = Serializer { writer };
    value.serialize(&mut serializer)
}

pub fn to_vec<T>(value: &T) -> Result<Vec<u8>>
where
    T: Serialize + ?Sized,
{
    let mut buf = Vec::new();
    to_writer(value, &mut buf)?;
    Ok(buf)
}

/// Integers take one slot, big endian and right aligned. Negative values are
/// sign extended.
macro_rules! serialize_ints {
    (signed: $($s:ident($st:ty)),+; unsigned: $($u:ident($ut:ty)),+;) => {
        $(
            fn $s(self, v: $st) -> Result<()> {
                self.write_signed(v < 0, v.to_be_bytes());
                Ok(())
            }
        )+
        $(
            fn $u(self, v: $ut) -> Result<()> {
                self.write_right_aligned(v.to_be_bytes());
                Ok(())
            }
        )+
    };
}

/// Sequences, tuples and their variants are the plain concatenation of their
/// elements.
macro_rules! seq_like {
    ($trait:ident::$method:ident) => {
        impl<'a, 'b, W: Writer> $trait for &'a mut Serializer<'b, W> {
            type Ok = ();
            type Error = Error;

            fn $method<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<()> {
                value.serialize(&mut **self)
            }

            fn end(self) -> Result<()> {
                Ok(())
            }
        }
    };
}

/// Field names are not encoded.
macro_rules! struct_like {
    ($trait:ident) => {
        impl<'a, 'b, W: Writer> $trait for &'a mut Serializer<'b, W> {
            type Ok = ();
            type Error = Error;

            fn serialize_field<T: ?Sized + Serialize>(
                &mut self,
                _key: &'static str,
                value: &T,
            ) -> Result<()> {
                value.serialize(&mut **self)
            }

            fn end(self) -> Result<()> {
                Ok(())
            }
        }
    };
}

impl<'a, W> Serializer<'a, W>
where
    W: Writer,
{
    // Panics if N > SLOT_SIZE
    fn write_right_aligned<const N: usize>(&mut self, v: [u8; N]) {
        let mut bytes = [0u8; SLOT_SIZE];
        bytes[SLOT_SIZE - N..].copy_from_slice(v.as_slice());
        self.writer.write(bytes.as_slice());
    }

    // Panics if N > SLOT_SIZE
    fn write_signed<const N: usize>(&mut self, negative: bool, v: [u8; N]) {
        let filler = if negative { 0xff } else { 0x00 };
        let mut bytes = [filler; SLOT_SIZE];
        bytes[SLOT_SIZE - N..].copy_from_slice(v.as_slice());
        self.writer.write(bytes.as_slice());
    }

    fn write_len(&mut self, len: usize) {
        self.write_right_aligned((len as u64).to_be_bytes());
    }

    /// Writes `v` in whole slots, left aligned, zero padding the last one.
    fn write_padded(&mut self, v: &[u8]) {
        let iter = v.chunks_exact(SLOT_SIZE);
        let rem = iter.remainder();
        for chunk in iter {
            self.writer.write(chunk);
        }
        if !rem.is_empty() {
            let mut bytes = [0u8; SLOT_SIZE];
            bytes[..rem.len()].copy_from_slice(rem);
            self.writer.write(bytes.as_slice());
        }
    }
}

impl<'a, 'b, W> ser::Serializer for &'a mut Serializer<'b, W>
where
    W: Writer,
{
    type Ok = ();
    type Error = Error;

    type SerializeSeq = Self;
    type SerializeTuple = Self;
    type SerializeTupleStruct = Self;
    type SerializeTupleVariant = Self;
    type SerializeMap = Self;
    type SerializeStruct = Self;
    type SerializeStructVariant = Self;

    fn serialize_bool(self, v: bool) -> Result<()> {
        self.serialize_u8(u8::from(v))
    }

    serialize_ints! {
        signed: serialize_i8(i8), serialize_i16(i16), serialize_i32(i32), serialize_i64(i64),
            serialize_i128(i128);
        unsigned: serialize_u8(u8), serialize_u16(u16), serialize_u32(u32), serialize_u64(u64),
            serialize_u128(u128);
    }

    fn serialize_f32(self, _: f32) -> Result<()> {
        Err(Error::TypeNotRepresentable("f32"))
    }

    fn serialize_f64(self, _: f64) -> Result<()> {
        Err(Error::TypeNotRepresentable("f64"))
    }

    fn serialize_char(self, v: char) -> Result<()> {
        self.serialize_u32(u32::from(v))
    }

    fn serialize_str(self, v: &str) -> Result<()> {
        self.write_len(v.len());
        self.write_padded(v.as_bytes());
        Ok(())
    }

    /// Fixed-size byte values (hashes, addresses, 256 bit integers) are
    /// written without a length. Use [as_bytes][super::as_bytes] for dynamic
    /// byte strings.
    fn serialize_bytes(self, v: &[u8]) -> Result<()> {
        self.write_padded(v);
        Ok(())
    }

    fn serialize_none(self) -> Result<()> {
        self.serialize_u8(0)
    }

    fn serialize_some<T: ?Sized>(self, value: &T) -> Result<()>
    where
        T: Serialize,
    {
        self.write_right_aligned([1u8]);
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<()> {
        Ok(())
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<()> {
        Ok(())
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        variant_index: u32,
        _variant: &'static str,
    ) -> Result<()> {
        self.serialize_u32(variant_index)
    }

    fn serialize_newtype_struct<T: ?Sized>(self, _name: &'static str, value: &T) -> Result<()>
    where
        T: Serialize,
    {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: ?Sized>(
        self,
        _name: &'static str,
        variant_index: u32,
        _variant: &'static str,
        value: &T,
    ) -> Result<()>
    where
        T: Serialize,
    {
        self.write_right_aligned(variant_index.to_be_bytes());
        value.serialize(self)
    }

    fn serialize_seq(self, len: Option<usize>) -> Result<Self::SerializeSeq> {
        let len = len.ok_or(Error::UnknownLength)?;
        self.write_len(len);
        Ok(self)
    }

    fn serialize_tuple(self, _len: usize) -> Result<Self::SerializeTuple> {
        Ok(self)
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleStruct> {
        Ok(self)
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleVariant> {
        self.write_right_aligned(variant_index.to_be_bytes());
        Ok(self)
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Self::SerializeMap> {
        Err(Error::TypeNotRepresentable("map"))
    }

    fn serialize_struct(self, _name: &'static str, _len: usize) -> Result<Self::SerializeStruct> {
        Ok(self)
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant> {
        self.write_right_aligned(variant_index.to_be_bytes());
        Ok(self)
    }
}

seq_like!(SerializeSeq::serialize_element);
seq_like!(SerializeTuple::serialize_element);
seq_like!(SerializeTupleStruct::serialize_field);
seq_like!(SerializeTupleVariant::serialize_field);

// Unreachable: serialize_map always fails. The trait still has to exist.
impl<'a, 'b, W> SerializeMap for &'a mut Serializer<'b, W>
where
    W: Writer,
{
    type Ok = ();
    type Error = Error;

    fn serialize_key<T: ?Sized>(&mut self, _key: &T) -> Result<()>
    where
        T: Serialize,
    {
        Err(Error::TypeNotRepresentable("map"))
    }

    fn serialize_value<T: ?Sized>(&mut self, _value: &T) -> Result<()>
    where
        T: Serialize,
    {
        Err(Error::TypeNotRepresentable("map"))
    }

    fn end(self) -> Result<()> {
        Err(Error::TypeNotRepresentable("map"))
    }
}

struct_like!(SerializeStruct);
struct_like!(SerializeStructVariant);
