use super::*;
use crate::encoding::{self, as_bytes};
use rand::{rngs::StdRng, SeedableRng};
use serde::Serialize;

// First well known development account (hardhat, anvil). Do not use that on
// any real device, this is just for testing.
const DEV_KEY: [u8; 32] = [
    0xac, 0x09, 0x74, 0xbe, 0xc3, 0x9a, 0x17, 0xe3, 0x6b, 0xa4, 0xa6, 0xb4, 0xd2, 0x38, 0xff, 0x94,
    0x4b, 0xac, 0xb4, 0x78, 0xcb, 0xed, 0x5e, 0xfc, 0xae, 0x78, 0x4d, 0x7b, 0xf4, 0xf2, 0xff, 0x80,
];
const DEV_ADDRESS: &str = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266";

fn data() -> Hash {
    #[derive(Serialize, Debug)]
    #[serde(transparent)]
    struct Bytes {
        #[serde(with = "as_bytes")]
        value: [u8; 4],
    }
    let d = Bytes {
        value: [0xa1, 0xa2, 0xa3, 0xa4],
    };

    encoding::to_hash(&d).unwrap()
}

macro_rules! make_known_key {
    ($name:ident, $signer:ty) => {
        #[test]
        fn $name() {
            let signer = <$signer>::from_bytes(&DEV_KEY).unwrap();
            assert_eq!(signer.address().to_string(), DEV_ADDRESS);
        }
    };
}

macro_rules! make_deterministic {
    ($name:ident, $signer:ty) => {
        #[test]
        fn $name() {
            let signer = <$signer>::from_bytes(&DEV_KEY).unwrap();
            let a = signer.sign_hash(data()).unwrap();
            let b = signer.sign_hash(data()).unwrap();
            assert_eq!(a, b);
            assert!(a.0[64] == 27 || a.0[64] == 28);
        }
    };
}

macro_rules! make_a_to_b {
    ($name:ident, $signer:ty, $recover:path) => {
        #[test]
        fn $name() {
            let mut rng = StdRng::seed_from_u64(0);
            let signer = <$signer>::new(&mut rng);
            let msg = data();
            let sig = signer.sign_hash(msg).unwrap();

            let address = $recover(msg, &sig).unwrap();
            assert_eq!(address, signer.address());
        }
    };
}

#[cfg(feature = "k256")]
make_known_key!(k256_known_key, super::k256::Signer);
#[cfg(feature = "secp256k1")]
make_known_key!(secp256k1_known_key, super::secp256k1::Signer);

#[cfg(feature = "k256")]
make_deterministic!(k256_deterministic, super::k256::Signer);
#[cfg(feature = "secp256k1")]
make_deterministic!(secp256k1_deterministic, super::secp256k1::Signer);

#[cfg(feature = "k256")]
make_a_to_b!(k256_to_k256, super::k256::Signer, super::k256::recover_hash);
#[cfg(feature = "secp256k1")]
make_a_to_b!(
    secp256k1_to_secp256k1,
    super::secp256k1::Signer,
    super::secp256k1::recover_hash
);
#[cfg(all(feature = "secp256k1", feature = "k256"))]
make_a_to_b!(
    secp256k1_to_k256,
    super::secp256k1::Signer,
    super::k256::recover_hash
);
#[cfg(all(feature = "secp256k1", feature = "k256"))]
make_a_to_b!(
    k256_to_secp256k1,
    super::k256::Signer,
    super::secp256k1::recover_hash
);

#[cfg(all(feature = "secp256k1", feature = "k256"))]
#[test]
fn backends_agree_on_bytes() {
    let a = super::k256::Signer::from_bytes(&DEV_KEY).unwrap();
    let b = super::secp256k1::Signer::from_bytes(&DEV_KEY).unwrap();
    assert_eq!(a.sign_hash(data()).unwrap(), b.sign_hash(data()).unwrap());
}

#[test]
fn verify_checks_the_expected_address() {
    let mut rng = StdRng::seed_from_u64(1);
    let alice = Signer::new(&mut rng);
    let bob = Signer::new(&mut rng);
    let payload = b"turn 1";

    let sig = alice.sign(payload).unwrap();
    assert!(verify(payload, &sig, alice.address()));
    assert!(!verify(payload, &sig, bob.address()));
    assert!(!verify(b"turn 2", &sig, alice.address()));
}

#[test]
fn identify_reports_unknown_signer() {
    let mut rng = StdRng::seed_from_u64(2);
    let alice = Signer::new(&mut rng);
    let bob = Signer::new(&mut rng);
    let mallory = Signer::new(&mut rng);
    let participants = [alice.address(), bob.address()];
    let payload = b"allocation";

    let sig = bob.sign(payload).unwrap();
    assert_eq!(identify(payload, &sig, &participants).unwrap(), 1);

    let sig = mallory.sign(payload).unwrap();
    match identify(payload, &sig, &participants) {
        Err(Error::UnknownSigner(addr)) => assert_eq!(addr, mallory.address()),
        other => panic!("expected UnknownSigner, got {:?}", other),
    }
}

#[test]
fn malformed_recovery_id_is_invalid() {
    let signer = Signer::from_bytes(&DEV_KEY).unwrap();
    let mut sig = signer.sign(b"x").unwrap();
    sig.0[64] = 3;
    assert!(matches!(recover_signer(b"x", &sig), Err(Error::InvalidSignature(_))));
}
