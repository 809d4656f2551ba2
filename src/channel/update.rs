use super::{state::ChannelState, PartIdx};
use crate::types::Hash;

/// A proposed next state that is not fully signed yet.
///
/// Pending updates live in the unpersisted working set of a channel until
/// they are complete, superseded or abandoned after the pending timeout.
#[derive(Debug, Clone)]
pub struct PendingUpdate {
    state: ChannelState,
    hash: Hash,
    proposer: PartIdx,
    proposed_at: u64,
}

impl PendingUpdate {
    pub(crate) fn new(state: ChannelState, hash: Hash, proposer: PartIdx, proposed_at: u64) -> Self {
        PendingUpdate {
            state,
            hash,
            proposer,
            proposed_at,
        }
    }

    pub fn state(&self) -> &ChannelState {
        &self.state
    }

    pub(crate) fn state_mut(&mut self) -> &mut ChannelState {
        &mut self.state
    }

    pub fn into_state(self) -> ChannelState {
        self.state
    }

    /// Signing hash of the proposed state.
    pub fn hash(&self) -> Hash {
        self.hash
    }

    pub fn proposer(&self) -> PartIdx {
        self.proposer
    }

    pub fn proposed_at(&self) -> u64 {
        self.proposed_at
    }

    pub fn is_expired(&self, now: u64, timeout: u64) -> bool {
        now.saturating_sub(self.proposed_at) >= timeout
    }
}
