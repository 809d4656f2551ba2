use super::{ChannelId, PartIdx, PARTICIPANTS};
use crate::{
    encoding::{self, as_bytes},
    error::{Error, Result},
    sig::{self, Signer},
    types::{Address, Hash, Signature, U256},
};
use serde::Serialize;

/// One line of a state's value distribution.
#[derive(Serialize, Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Allocation {
    pub destination: Address,
    /// The zero address is the native asset.
    pub token: Address,
    pub amount: U256,
}

impl Allocation {
    pub fn new(destination: Address, token: Address, amount: U256) -> Self {
        Allocation {
            destination,
            token,
            amount,
        }
    }
}

/// One agreed snapshot of a channel.
///
/// The signed payload is the encoding of every field except the signatures.
/// Content fields are private: new states are derived with
/// [ChannelState::make_next_state] so the channel id can't be changed and the
/// turn number can only move forward by one.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ChannelState {
    channel_id: ChannelId,
    turn_num: u64,
    #[serde(with = "as_bytes")]
    app_data: Vec<u8>,
    is_final: bool,
    allocations: Vec<Allocation>,
    #[serde(skip_serializing)]
    signatures: [Option<Signature>; PARTICIPANTS],
}

impl ChannelState {
    /// Turn 0 state, locks the sum of `allocations` per token.
    pub fn genesis(channel_id: ChannelId, allocations: Vec<Allocation>, app_data: Vec<u8>) -> Self {
        Self::from_parts(channel_id, 0, app_data, false, allocations)
    }

    pub(crate) fn from_parts(
        channel_id: ChannelId,
        turn_num: u64,
        app_data: Vec<u8>,
        is_final: bool,
        allocations: Vec<Allocation>,
    ) -> Self {
        ChannelState {
            channel_id,
            turn_num,
            app_data,
            is_final,
            allocations,
            signatures: [None; PARTICIPANTS],
        }
    }

    /// Create an unsigned state that will replace this state.
    pub fn make_next_state(&self) -> Self {
        Self::from_parts(
            self.channel_id,
            self.turn_num + 1,
            self.app_data.clone(),
            self.is_final,
            self.allocations.clone(),
        )
    }

    pub fn with_allocations(mut self, allocations: Vec<Allocation>) -> Self {
        self.allocations = allocations;
        self.signatures = [None; PARTICIPANTS];
        self
    }

    pub fn with_app_data(mut self, app_data: Vec<u8>) -> Self {
        self.app_data = app_data;
        self.signatures = [None; PARTICIPANTS];
        self
    }

    /// Mark this state as closing the channel once fully signed.
    pub fn finalized(mut self) -> Self {
        self.is_final = true;
        self.signatures = [None; PARTICIPANTS];
        self
    }

    pub fn channel_id(&self) -> ChannelId {
        self.channel_id
    }

    pub fn turn_num(&self) -> u64 {
        self.turn_num
    }

    pub fn app_data(&self) -> &[u8] {
        &self.app_data
    }

    pub fn is_final(&self) -> bool {
        self.is_final
    }

    pub fn allocations(&self) -> &[Allocation] {
        &self.allocations
    }

    pub fn signatures(&self) -> &[Option<Signature>; PARTICIPANTS] {
        &self.signatures
    }

    /// Canonical encoding of the content, the payload both participants sign.
    pub fn payload(&self) -> Result<Vec<u8>> {
        Ok(encoding::to_vec(self)?)
    }

    pub fn signing_hash(&self) -> Result<Hash> {
        Ok(encoding::to_hash(self)?)
    }

    /// Same content, signatures ignored.
    pub fn same_content(&self, other: &ChannelState) -> bool {
        self.channel_id == other.channel_id
            && self.turn_num == other.turn_num
            && self.app_data == other.app_data
            && self.is_final == other.is_final
            && self.allocations == other.allocations
    }

    /// Sign as participant `idx` and store the signature in its slot.
    pub fn sign(&mut self, signer: &Signer, idx: PartIdx) -> Result<Signature> {
        let hash = self.signing_hash()?;
        let slot = self
            .signatures
            .get_mut(idx)
            .ok_or_else(|| Error::UnknownSigner(signer.address()))?;
        if slot.is_some() {
            return Err(Error::AlreadySigned(idx));
        }
        let sig = signer.sign_hash(hash)?;
        *slot = Some(sig);
        Ok(sig)
    }

    /// Verify `sig` against `participants` and store it in the slot of the
    /// participant that produced it.
    pub fn add_signature(&mut self, sig: Signature, participants: &[Address]) -> Result<PartIdx> {
        let idx = sig::identify_hash(self.signing_hash()?, &sig, participants)?;
        if self.signatures[idx].is_some() {
            return Err(Error::AlreadySigned(idx));
        }
        self.signatures[idx] = Some(sig);
        Ok(idx)
    }

    pub fn is_fully_signed(&self) -> bool {
        self.signatures.iter().all(Option::is_some)
    }

    pub fn missing_signatures(&self) -> Vec<PartIdx> {
        self.signatures
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_none())
            .map(|(idx, _)| idx)
            .collect()
    }

    /// Checks that every slot holds a signature of the participant with the
    /// same index.
    pub fn verify_signatures(&self, participants: &[Address; PARTICIPANTS]) -> Result<()> {
        let missing = self.missing_signatures();
        if !missing.is_empty() {
            return Err(Error::IncompleteSignatures { missing });
        }
        self.verify_present_signatures(participants)
    }

    /// Like [ChannelState::verify_signatures], but empty slots are fine.
    pub fn verify_present_signatures(&self, participants: &[Address; PARTICIPANTS]) -> Result<()> {
        let hash = self.signing_hash()?;
        for (idx, sig) in self.signatures.iter().enumerate() {
            let sig = match sig {
                Some(sig) => sig,
                None => continue,
            };
            let signer = sig::recover_hash(hash, sig)?;
            if signer == participants[idx] {
                continue;
            }
            return Err(match participants.iter().position(|p| *p == signer) {
                Some(other) => Error::InvalidSignature(format!(
                    "slot {} holds a signature of participant {}",
                    idx, other
                )),
                None => Error::UnknownSigner(signer),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::testutil::Fixture;
    use super::*;

    #[test]
    fn next_state_increments_turn_and_clears_signatures() {
        let f = Fixture::new(10);
        let genesis = f.sign_both(f.genesis(100, 0));
        let next = genesis.make_next_state();
        assert_eq!(next.turn_num(), 1);
        assert_eq!(next.channel_id(), genesis.channel_id());
        assert_eq!(next.allocations(), genesis.allocations());
        assert_eq!(next.missing_signatures(), vec![0, 1]);
    }

    #[test]
    fn signing_outside_the_participant_slots_fails() {
        let f = Fixture::new(10);
        let mut state = f.genesis(100, 0);
        assert!(matches!(
            state.sign(&f.alice, PARTICIPANTS),
            Err(Error::UnknownSigner(addr)) if addr == f.alice.address()
        ));
        assert_eq!(state.missing_signatures(), vec![0, 1]);

        state.sign(&f.alice, 0).unwrap();
        assert!(matches!(state.sign(&f.alice, 0), Err(Error::AlreadySigned(0))));
    }

    #[test]
    fn signatures_are_not_part_of_the_payload() {
        let f = Fixture::new(10);
        let unsigned = f.genesis(100, 0);
        let signed = f.sign_both(unsigned.clone());
        assert_eq!(unsigned.signing_hash().unwrap(), signed.signing_hash().unwrap());
        assert!(unsigned.same_content(&signed));
        assert_ne!(unsigned, signed);
    }

    #[test]
    fn content_changes_the_hash() {
        let f = Fixture::new(10);
        let base = f.genesis(100, 0).make_next_state();
        let hash = base.signing_hash().unwrap();
        assert_ne!(hash, base.clone().finalized().signing_hash().unwrap());
        assert_ne!(hash, base.clone().with_app_data(vec![1]).signing_hash().unwrap());
        assert_ne!(
            hash,
            base.clone()
                .with_allocations(f.allocations(99, 1))
                .signing_hash()
                .unwrap()
        );
    }

    #[test]
    fn add_signature_fills_the_signers_slot() {
        let f = Fixture::new(10);
        let mut state = f.genesis(100, 0);
        let sig = f.bob.sign_hash(state.signing_hash().unwrap()).unwrap();

        assert_eq!(state.add_signature(sig, &f.participants()).unwrap(), 1);
        assert!(matches!(
            state.add_signature(sig, &f.participants()),
            Err(Error::AlreadySigned(1))
        ));
        assert_eq!(state.missing_signatures(), vec![0]);
    }

    #[test]
    fn verify_detects_swapped_slots() {
        let f = Fixture::new(10);
        let mut state = f.genesis(100, 0);
        // Alice's signature in Bob's slot and the other way around.
        state.sign(&f.alice, 1).unwrap();
        state.sign(&f.bob, 0).unwrap();
        assert!(matches!(
            state.verify_signatures(&f.participants()),
            Err(Error::InvalidSignature(_))
        ));
    }

    #[test]
    fn verify_reports_missing_slots() {
        let f = Fixture::new(10);
        let mut state = f.genesis(100, 0);
        state.sign(&f.alice, 0).unwrap();
        match state.verify_signatures(&f.participants()) {
            Err(Error::IncompleteSignatures { missing }) => assert_eq!(missing, vec![1]),
            other => panic!("unexpected {:?}", other),
        }
    }
}
