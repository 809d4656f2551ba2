use super::{ChannelId, PartIdx, PARTICIPANTS};
use crate::{
    encoding,
    error::{Error, Result},
    types::{Address, U256},
};
use serde::Serialize;

/// Preimage of the channel id.
#[derive(Serialize)]
struct IdPreimage<'a> {
    participants: &'a [Address; PARTICIPANTS],
    nonce: U256,
    created_at: u64,
}

/// Immutable parameters of a channel, fixed at creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Channel {
    id: ChannelId,
    participants: [Address; PARTICIPANTS],
    adjudicator: Address,
    challenge_period: u64,
    nonce: U256,
    created_at: u64,
}

impl Channel {
    /// Fails with [Error::InvalidParticipants] unless `participants` holds
    /// exactly two distinct, non-zero addresses, and with
    /// [Error::ChallengePeriodTooShort] for a zero challenge period.
    pub fn new(
        participants: &[Address],
        adjudicator: Address,
        challenge_period: u64,
        nonce: U256,
        created_at: u64,
    ) -> Result<Self> {
        let participants: [Address; PARTICIPANTS] = participants
            .try_into()
            .map_err(|_| Error::InvalidParticipants("a channel has exactly two participants"))?;
        if participants.iter().any(Address::is_zero) {
            return Err(Error::InvalidParticipants("zero address"));
        }
        if participants[0] == participants[1] {
            return Err(Error::InvalidParticipants("participants must be distinct"));
        }

        if challenge_period == 0 {
            return Err(Error::ChallengePeriodTooShort {
                period: 0,
                minimum: 1,
            });
        }

        let id = encoding::to_hash(&IdPreimage {
            participants: &participants,
            nonce,
            created_at,
        })?;

        Ok(Channel {
            id,
            participants,
            adjudicator,
            challenge_period,
            nonce,
            created_at,
        })
    }

    /// Keccak-256 of `(participants, nonce, created_at)`.
    pub fn id(&self) -> ChannelId {
        self.id
    }

    pub fn participants(&self) -> &[Address; PARTICIPANTS] {
        &self.participants
    }

    pub fn adjudicator(&self) -> Address {
        self.adjudicator
    }

    /// Seconds a disputed state must stay unchallenged.
    pub fn challenge_period(&self) -> u64 {
        self.challenge_period
    }

    pub fn nonce(&self) -> U256 {
        self.nonce
    }

    pub fn created_at(&self) -> u64 {
        self.created_at
    }

    pub fn part_idx_of(&self, addr: Address) -> Option<PartIdx> {
        self.participants.iter().position(|p| *p == addr)
    }

    /// Index of the other participant.
    pub fn peer_of(idx: PartIdx) -> PartIdx {
        1 - idx
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: Address = Address([1; 20]);
    const B: Address = Address([2; 20]);

    #[test]
    fn rejects_wrong_participant_sets() {
        let three = [A, B, Address([3; 20])];
        for parts in [&[A][..], &three[..], &[A, A][..], &[A, Address::ZERO][..]] {
            assert!(matches!(
                Channel::new(parts, Address::ZERO, 10, U256::zero(), 0),
                Err(Error::InvalidParticipants(_))
            ));
        }
    }

    #[test]
    fn rejects_zero_challenge_period() {
        assert!(matches!(
            Channel::new(&[A, B], Address::ZERO, 0, U256::zero(), 0),
            Err(Error::ChallengePeriodTooShort { period: 0, .. })
        ));
    }

    #[test]
    fn id_depends_on_participants_nonce_and_time() {
        let c = |parts: &[Address], nonce: u64, at: u64| {
            Channel::new(parts, Address::ZERO, 10, U256::from(nonce), at)
                .unwrap()
                .id()
        };
        let base = c(&[A, B], 1, 100);
        assert_eq!(base, c(&[A, B], 1, 100));
        assert_ne!(base, c(&[B, A], 1, 100));
        assert_ne!(base, c(&[A, B], 2, 100));
        assert_ne!(base, c(&[A, B], 1, 101));
    }

    #[test]
    fn adjudicator_and_period_do_not_change_the_id() {
        let a = Channel::new(&[A, B], Address::ZERO, 10, U256::one(), 5).unwrap();
        let b = Channel::new(&[A, B], Address([9; 20]), 99, U256::one(), 5).unwrap();
        assert_eq!(a.id(), b.id());
        assert_eq!(a.part_idx_of(B), Some(1));
        assert_eq!(a.part_idx_of(Address([9; 20])), None);
    }
}
