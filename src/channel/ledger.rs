use super::{state::ChannelState, ChannelId, PARTICIPANTS};
use crate::{
    error::{Error, Result},
    types::Address,
};
use tracing::debug;

/// Append-only history of the fully signed states of one channel.
///
/// Turn numbers are contiguous from the genesis state (turn 0), so the state
/// with turn `n` is stored at index `n`. Nothing is ever removed or changed.
#[derive(Debug, Clone)]
pub struct StateLedger {
    channel_id: ChannelId,
    participants: [Address; PARTICIPANTS],
    states: Vec<ChannelState>,
}

impl StateLedger {
    pub fn new(channel_id: ChannelId, participants: [Address; PARTICIPANTS]) -> Self {
        StateLedger {
            channel_id,
            participants,
            states: Vec::new(),
        }
    }

    pub fn channel_id(&self) -> ChannelId {
        self.channel_id
    }

    /// Turn number the next appended state must carry.
    pub fn next_turn(&self) -> u64 {
        self.states.len() as u64
    }

    /// Checks channel and turn number of a candidate state without touching
    /// its signatures.
    ///
    /// Appending is a compare-and-swap on "latest + 1": of two concurrent
    /// proposals for the same turn only the first one can be appended.
    pub fn check_sequence(&self, state: &ChannelState) -> Result<()> {
        if state.channel_id() != self.channel_id {
            return Err(Error::WrongChannel {
                expected: self.channel_id,
                got: state.channel_id(),
            });
        }

        let expected = self.next_turn();
        let proposed = state.turn_num();
        if proposed < expected {
            Err(Error::StaleTurnNumber {
                latest: expected - 1,
                proposed,
            })
        } else if proposed > expected {
            Err(Error::SkippedTurnNumber { expected, proposed })
        } else {
            Ok(())
        }
    }

    /// Verify that the state belongs to this channel and carries a valid
    /// signature of every participant.
    pub fn check_signed(&self, state: &ChannelState) -> Result<()> {
        if state.channel_id() != self.channel_id {
            return Err(Error::WrongChannel {
                expected: self.channel_id,
                got: state.channel_id(),
            });
        }
        state.verify_signatures(&self.participants)
    }

    /// Append a fully signed state. Nothing is stored if any check fails.
    pub fn append(&mut self, state: ChannelState) -> Result<&ChannelState> {
        self.check_sequence(&state)?;
        self.check_signed(&state)?;

        debug!(
            channel = %self.channel_id,
            turn = state.turn_num(),
            is_final = state.is_final(),
            "Appended state"
        );
        self.states.push(state);
        Ok(&self.states[self.states.len() - 1])
    }

    /// Highest-turn fully signed state.
    pub fn latest(&self) -> Result<&ChannelState> {
        self.states
            .last()
            .ok_or(Error::ChannelNotFound(self.channel_id))
    }

    pub fn get(&self, turn_num: u64) -> Option<&ChannelState> {
        usize::try_from(turn_num)
            .ok()
            .and_then(|idx| self.states.get(idx))
    }

    pub fn history(&self) -> &[ChannelState] {
        &self.states
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Fails with [Error::DisputeCollision] if a stored state has the same
    /// turn number as `state` but different content.
    pub fn check_conflict(&self, state: &ChannelState) -> Result<()> {
        match self.get(state.turn_num()) {
            Some(stored) if !stored.same_content(state) => Err(Error::DisputeCollision {
                turn_num: state.turn_num(),
            }),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::testutil::Fixture;
    use super::*;

    fn ledger(f: &Fixture) -> StateLedger {
        StateLedger::new(f.channel.id(), f.participants())
    }

    #[test]
    fn latest_of_empty_ledger_is_not_found() {
        let f = Fixture::new(10);
        assert!(matches!(
            ledger(&f).latest(),
            Err(Error::ChannelNotFound(id)) if id == f.channel.id()
        ));
    }

    #[test]
    fn append_and_fetch_round_trip() {
        let f = Fixture::new(10);
        let mut l = ledger(&f);
        let genesis = f.sign_both(f.genesis(100, 0));
        l.append(genesis.clone()).unwrap();

        let next = f.sign_both(genesis.make_next_state().with_allocations(f.allocations(97, 3)));
        l.append(next.clone()).unwrap();

        assert_eq!(l.latest().unwrap(), &next);
        assert_eq!(l.get(0), Some(&genesis));
        assert_eq!(l.len(), 2);
    }

    #[test]
    fn genesis_must_be_turn_zero() {
        let f = Fixture::new(10);
        let mut l = ledger(&f);
        let state = f.sign_both(f.genesis(100, 0).make_next_state());
        assert!(matches!(
            l.append(state),
            Err(Error::SkippedTurnNumber {
                expected: 0,
                proposed: 1
            })
        ));
        assert!(l.is_empty());
    }

    #[test]
    fn resubmission_is_stale() {
        let f = Fixture::new(10);
        let mut l = ledger(&f);
        let genesis = f.sign_both(f.genesis(100, 0));
        l.append(genesis.clone()).unwrap();
        assert!(matches!(
            l.append(genesis),
            Err(Error::StaleTurnNumber {
                latest: 0,
                proposed: 0
            })
        ));
        assert_eq!(l.len(), 1);
    }

    #[test]
    fn partially_signed_state_is_rejected() {
        let f = Fixture::new(10);
        let mut l = ledger(&f);
        let mut genesis = f.genesis(100, 0);
        genesis.sign(&f.alice, 0).unwrap();
        assert!(matches!(
            l.append(genesis),
            Err(Error::IncompleteSignatures { missing }) if missing == vec![1]
        ));
        assert!(l.is_empty());
    }

    #[test]
    fn foreign_state_is_rejected() {
        let f = Fixture::new(10);
        let other = Fixture::new(20);
        let mut l = ledger(&f);
        let foreign = ChannelState::genesis(crate::types::Hash([1; 32]), other.allocations(1, 1), vec![]);
        assert!(matches!(l.append(foreign), Err(Error::WrongChannel { .. })));
    }

    #[test]
    fn conflicting_same_turn_state_collides() {
        let f = Fixture::new(10);
        let mut l = ledger(&f);
        let genesis = f.sign_both(f.genesis(100, 0));
        l.append(genesis.clone()).unwrap();

        l.check_conflict(&genesis).unwrap();
        let other = f.sign_both(f.genesis(50, 50));
        assert!(matches!(
            l.check_conflict(&other),
            Err(Error::DisputeCollision { turn_num: 0 })
        ));
        // Unknown turns don't collide.
        l.check_conflict(&genesis.make_next_state()).unwrap();
    }
}
