use super::state::ChannelState;
use crate::error::{Error, Result};
use tracing::{info, warn};

/// A running dispute: the best claim seen so far and the end of the
/// challenge window.
///
/// The window is fixed when the dispute is opened, counter-claims do not
/// extend it. States passed in must already be verified (signatures and
/// conservation), the resolver only orders them.
#[derive(Debug, Clone)]
pub struct Dispute {
    claim: ChannelState,
    opened_at: u64,
    deadline: u64,
    escalated: bool,
    counter_claims: usize,
}

impl Dispute {
    pub fn open(claim: ChannelState, now: u64, challenge_period: u64) -> Self {
        Dispute {
            claim,
            opened_at: now,
            deadline: now.saturating_add(challenge_period),
            escalated: false,
            counter_claims: 0,
        }
    }

    /// An escalated dispute is decided by the external adjudicator.
    pub(crate) fn escalated(claim: ChannelState, now: u64, challenge_period: u64) -> Self {
        let mut dispute = Self::open(claim, now, challenge_period);
        dispute.escalated = true;
        dispute
    }

    pub fn claim(&self) -> &ChannelState {
        &self.claim
    }

    pub fn opened_at(&self) -> u64 {
        self.opened_at
    }

    pub fn deadline(&self) -> u64 {
        self.deadline
    }

    pub fn is_escalated(&self) -> bool {
        self.escalated
    }

    pub fn counter_claims(&self) -> usize {
        self.counter_claims
    }

    pub(crate) fn escalate(&mut self) {
        self.escalated = true;
    }

    pub fn has_elapsed(&self, now: u64) -> bool {
        now >= self.deadline
    }

    /// Submit a counter-claim while the window is open.
    ///
    /// A higher turn replaces the claim. The same turn with different content
    /// escalates the dispute. Anything else is stale.
    pub fn submit(&mut self, counter: ChannelState, now: u64) -> Result<()> {
        if self.has_elapsed(now) {
            return Err(Error::ChallengePeriodElapsed {
                deadline: self.deadline,
                now,
            });
        }

        let current = self.claim.turn_num();
        let proposed = counter.turn_num();
        if proposed > current {
            info!(
                channel = %self.claim.channel_id(),
                from = current,
                to = proposed,
                "Dispute claim replaced by counter-claim"
            );
            self.claim = counter;
            self.counter_claims += 1;
            Ok(())
        } else if proposed == current && !self.claim.same_content(&counter) {
            warn!(
                channel = %self.claim.channel_id(),
                turn = proposed,
                "Conflicting claims for the same turn, escalating"
            );
            self.escalated = true;
            Err(Error::DisputeCollision { turn_num: proposed })
        } else {
            Err(Error::StaleTurnNumber {
                latest: current,
                proposed,
            })
        }
    }

    /// The winning state, once the window has passed.
    pub fn resolve(&self, now: u64) -> Result<&ChannelState> {
        if !self.has_elapsed(now) {
            return Err(Error::ChallengePeriodNotElapsed {
                deadline: self.deadline,
                now,
            });
        }
        if self.escalated {
            return Err(Error::DisputeCollision {
                turn_num: self.claim.turn_num(),
            });
        }
        Ok(&self.claim)
    }
}
