use super::*;
use crate::types::{Address, U256};
use serde::Serialize;
use std::collections::BTreeMap;

fn slots(hex_slots: &[&str]) -> Vec<u8> {
    hex_slots
        .iter()
        .flat_map(|s| {
            assert_eq!(s.len(), 64, "each expected slot is 32 bytes of hex");
            hex::decode(s).unwrap()
        })
        .collect()
}

#[derive(Serialize)]
struct Simple {
    a: u64,
    b: bool,
    c: i8,
}

#[test]
fn integers_are_right_aligned() {
    let encoded = to_vec(&Simple { a: 0x2222, b: true, c: -1 }).unwrap();
    assert_eq!(
        encoded,
        slots(&[
            "0000000000000000000000000000000000000000000000000000000000002222",
            "0000000000000000000000000000000000000000000000000000000000000001",
            "ffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffff",
        ])
    );
}

#[derive(Serialize)]
struct Dynamic {
    #[serde(with = "as_bytes")]
    data: Vec<u8>,
    items: Vec<u16>,
}

#[test]
fn dynamic_values_are_length_prefixed() {
    let encoded = to_vec(&Dynamic {
        data: vec![0xa1, 0xa2, 0xa3, 0xa4],
        items: vec![7, 8],
    })
    .unwrap();
    assert_eq!(
        encoded,
        slots(&[
            "0000000000000000000000000000000000000000000000000000000000000004",
            "a1a2a3a400000000000000000000000000000000000000000000000000000000",
            "0000000000000000000000000000000000000000000000000000000000000002",
            "0000000000000000000000000000000000000000000000000000000000000007",
            "0000000000000000000000000000000000000000000000000000000000000008",
        ])
    );
}

#[test]
fn empty_bytes_only_write_the_length() {
    let encoded = to_vec(&Dynamic {
        data: vec![],
        items: vec![],
    })
    .unwrap();
    assert_eq!(encoded, vec![0u8; 64]);
}

#[test]
fn addresses_and_amounts_fill_one_slot() {
    let addr: Address = "0x5B38Da6a701c568545dCfcB03FcB875f56beddC4".parse().unwrap();
    let encoded = to_vec(&(addr, U256::from(0x5555u64))).unwrap();
    assert_eq!(
        encoded,
        slots(&[
            "0000000000000000000000005b38da6a701c568545dcfcb03fcb875f56beddc4",
            "0000000000000000000000000000000000000000000000000000000000005555",
        ])
    );
}

#[test]
fn options_carry_a_tag() {
    assert_eq!(to_vec(&Option::<u8>::None).unwrap(), vec![0u8; 32]);

    let some = to_vec(&Some(3u8)).unwrap();
    assert_eq!(some.len(), 64);
    assert_eq!(some[31], 1);
    assert_eq!(some[63], 3);
}

#[test]
fn floats_and_maps_are_rejected() {
    assert_eq!(
        to_vec(&1.5f64).unwrap_err(),
        Error::TypeNotRepresentable("f64")
    );

    let mut map = BTreeMap::new();
    map.insert(1u8, 2u8);
    assert_eq!(to_vec(&map).unwrap_err(), Error::TypeNotRepresentable("map"));
}

#[test]
fn hash_matches_hash_of_encoding() {
    let value = Simple { a: 1, b: false, c: 3 };
    let encoded = to_vec(&value).unwrap();
    assert_eq!(to_hash(&value).unwrap(), keccak256(&encoded));
}

#[test]
fn keccak_of_empty_input() {
    // Well known constant, the hash of the empty string.
    assert_eq!(
        keccak256(&[]).to_string(),
        "0xc5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
    );
}
