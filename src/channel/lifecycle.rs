use std::collections::HashMap;

use super::{
    allocation::{AllocationEngine, TokenTotals},
    dispute::Dispute,
    ledger::StateLedger,
    params::Channel,
    state::{Allocation, ChannelState},
    update::PendingUpdate,
    ChannelId, ChannelStatus, PartIdx, PARTICIPANTS,
};
use crate::{
    error::{Error, Result},
    sig,
    types::{Address, Hash, Signature, U256},
};
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Everything the external funder needs to deposit into the channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FundingRequest {
    pub channel_id: ChannelId,
    pub participants: [Address; PARTICIPANTS],
    pub adjudicator: Address,
    /// Fully signed genesis state.
    pub state: ChannelState,
    pub locked: TokenTotals,
}

impl FundingRequest {
    /// Genesis allocations credited to participant `idx`, i.e. what it has to
    /// deposit.
    pub fn deposits_of(&self, idx: PartIdx) -> Vec<Allocation> {
        self.state
            .allocations()
            .iter()
            .filter(|a| a.destination == self.participants[idx])
            .copied()
            .collect()
    }
}

/// Outcome of the on-chain funding, observed by the chain collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FundingOutcome {
    Funded,
    TimedOut,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettlementReason {
    Cooperative,
    ChallengeExpired,
    Adjudicated,
}

/// The allocations a FINAL channel pays out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settlement {
    pub channel_id: ChannelId,
    pub turn_num: u64,
    pub allocations: Vec<Allocation>,
    pub reason: SettlementReason,
}

/// Lifecycle state machine of one channel.
///
/// Owns the ledger, the locked totals recorded at funding, the dispute while
/// one is running and the working set of partially signed proposals. Status
/// changes are published on a watch channel, see [ChannelMachine::subscribe].
#[derive(Debug)]
pub struct ChannelMachine {
    channel: Channel,
    status: ChannelStatus,
    engine: AllocationEngine,
    ledger: StateLedger,
    locked: TokenTotals,
    funding_in_flight: bool,
    dispute: Option<Dispute>,
    settlement: Option<Settlement>,
    pending: HashMap<Hash, PendingUpdate>,
    status_tx: watch::Sender<ChannelStatus>,
}

impl ChannelMachine {
    /// Create a channel, `VOID -> INITIAL`.
    pub fn create(
        participants: &[Address],
        adjudicator: Address,
        challenge_period: u64,
        nonce: U256,
        now: u64,
        engine: AllocationEngine,
    ) -> Result<Self> {
        let channel = Channel::new(participants, adjudicator, challenge_period, nonce, now)?;
        Ok(Self::from_channel(channel, engine))
    }

    pub fn from_channel(channel: Channel, engine: AllocationEngine) -> Self {
        let (status_tx, _) = watch::channel(ChannelStatus::Void);
        let ledger = StateLedger::new(channel.id(), *channel.participants());
        let mut machine = ChannelMachine {
            channel,
            status: ChannelStatus::Void,
            engine,
            ledger,
            locked: TokenTotals::new(),
            funding_in_flight: false,
            dispute: None,
            settlement: None,
            pending: HashMap::new(),
            status_tx,
        };
        machine.set_status(ChannelStatus::Initial);
        machine
    }

    pub fn id(&self) -> ChannelId {
        self.channel.id()
    }

    pub fn channel(&self) -> &Channel {
        &self.channel
    }

    pub fn status(&self) -> ChannelStatus {
        self.status
    }

    pub fn ledger(&self) -> &StateLedger {
        &self.ledger
    }

    pub fn latest_state(&self) -> Result<&ChannelState> {
        self.ledger.latest()
    }

    /// Per token totals locked at funding.
    pub fn locked(&self) -> &TokenTotals {
        &self.locked
    }

    pub fn engine(&self) -> &AllocationEngine {
        &self.engine
    }

    pub fn dispute(&self) -> Option<&Dispute> {
        self.dispute.as_ref()
    }

    pub fn settlement(&self) -> Option<&Settlement> {
        self.settlement.as_ref()
    }

    pub fn is_funding(&self) -> bool {
        self.funding_in_flight
    }

    /// Feed of status changes. The receiver starts with the current status.
    pub fn subscribe(&self) -> watch::Receiver<ChannelStatus> {
        self.status_tx.subscribe()
    }

    fn set_status(&mut self, next: ChannelStatus) {
        info!(channel = %self.id(), from = %self.status, to = %next, "Channel status changed");
        self.status = next;
        self.status_tx.send_replace(next);
    }

    fn invalid(&self, operation: &'static str) -> Error {
        Error::InvalidTransition {
            operation,
            status: self.status,
        }
    }

    fn require(&self, status: ChannelStatus, operation: &'static str) -> Result<()> {
        if self.status == status {
            Ok(())
        } else {
            Err(self.invalid(operation))
        }
    }

    /// Conservation (and destination policy) of `state` against the latest
    /// state and the locked totals.
    fn check_allocations(&self, state: &ChannelState) -> Result<()> {
        let prior = self.ledger.latest()?.allocations();
        self.engine.validate(
            prior,
            state.allocations(),
            &self.locked,
            self.channel.participants(),
        )
    }

    /// Signatures and conservation of a state used as a dispute claim.
    fn check_claim(&self, state: &ChannelState) -> Result<()> {
        self.ledger.check_signed(state)?;
        self.check_allocations(state)
    }

    fn settle(&mut self, state: ChannelState, reason: SettlementReason) -> Result<&Settlement> {
        info!(
            channel = %self.id(),
            turn = state.turn_num(),
            ?reason,
            "Channel settled"
        );
        self.pending.clear();
        self.set_status(ChannelStatus::Final);
        let settlement = Settlement {
            channel_id: self.id(),
            turn_num: state.turn_num(),
            allocations: state.allocations().to_vec(),
            reason,
        };
        Ok(&*self.settlement.insert(settlement))
    }

    /// Record the fully signed genesis state and request the deposits.
    ///
    /// The per token sums of the genesis allocations become the locked totals
    /// every later state has to conserve.
    pub fn fund(&mut self, genesis: ChannelState) -> Result<FundingRequest> {
        if self.status != ChannelStatus::Initial || self.funding_in_flight {
            return Err(self.invalid("fund"));
        }
        self.ledger.check_sequence(&genesis)?;
        let locked = AllocationEngine::totals(genesis.allocations())?;
        self.engine.validate(
            &[],
            genesis.allocations(),
            &locked,
            self.channel.participants(),
        )?;
        let state = self.ledger.append(genesis)?.clone();

        self.locked = locked.clone();
        self.funding_in_flight = true;
        info!(channel = %self.id(), tokens = locked.len(), "Funding requested");

        Ok(FundingRequest {
            channel_id: self.id(),
            participants: *self.channel.participants(),
            adjudicator: self.channel.adjudicator(),
            state,
            locked,
        })
    }

    /// `INITIAL -> ACTIVE` once funded, `INITIAL -> VOID` on timeout.
    ///
    /// A timeout is reported as [Error::FundingTimeout] after the transition.
    pub fn record_funding(&mut self, outcome: FundingOutcome) -> Result<()> {
        if self.status != ChannelStatus::Initial || !self.funding_in_flight {
            return Err(self.invalid("record funding"));
        }
        self.funding_in_flight = false;
        match outcome {
            FundingOutcome::Funded => {
                self.set_status(ChannelStatus::Active);
                Ok(())
            }
            FundingOutcome::TimedOut => {
                warn!(channel = %self.id(), "Funding timed out");
                self.pending.clear();
                self.set_status(ChannelStatus::Void);
                Err(Error::FundingTimeout(self.id()))
            }
        }
    }

    /// Append the next fully signed state.
    ///
    /// Final states are routed to [ChannelMachine::close_cooperative].
    pub fn update_state(&mut self, new_state: ChannelState) -> Result<()> {
        if new_state.is_final() {
            return self.close_cooperative(new_state).map(|_| ());
        }
        self.require(ChannelStatus::Active, "update state")?;
        self.ledger.check_sequence(&new_state)?;
        self.check_allocations(&new_state)?;
        self.ledger.append(new_state)?;
        self.drop_superseded_pending();
        Ok(())
    }

    /// `ACTIVE -> FINAL` with a final, fully signed successor of the latest
    /// state.
    pub fn close_cooperative(&mut self, final_state: ChannelState) -> Result<&Settlement> {
        self.require(ChannelStatus::Active, "close")?;
        if final_state.channel_id() != self.id() {
            return Err(Error::WrongChannel {
                expected: self.id(),
                got: final_state.channel_id(),
            });
        }
        if !final_state.is_final() {
            return Err(Error::NotFinal("state is not marked final"));
        }
        if !final_state.is_fully_signed() {
            return Err(Error::NotFinal("state is not fully signed"));
        }
        if final_state.turn_num() != self.ledger.next_turn() {
            return Err(Error::NotFinal("state does not succeed the latest state"));
        }
        self.check_allocations(&final_state)?;
        let state = self.ledger.append(final_state)?.clone();
        self.settle(state, SettlementReason::Cooperative)
    }

    /// `ACTIVE -> DISPUTE` with a fully signed claim, starting the challenge
    /// window.
    ///
    /// A claim that conflicts with a stored state of the same turn escalates
    /// the channel to the adjudicator and is reported as
    /// [Error::DisputeCollision]. A claim older than the latest state of the
    /// ledger is replaced by that state, so the dispute never settles on a
    /// superseded state.
    pub fn raise_dispute(&mut self, claim: ChannelState, now: u64) -> Result<&Dispute> {
        if self.status != ChannelStatus::Active {
            return Err(Error::NotActive(self.status));
        }
        self.check_claim(&claim)?;

        let period = self.channel.challenge_period();
        if let Err(e) = self.ledger.check_conflict(&claim) {
            warn!(channel = %self.id(), turn = claim.turn_num(), "Dispute claim collides with ledger");
            self.dispute = Some(Dispute::escalated(claim, now, period));
            self.pending.clear();
            self.set_status(ChannelStatus::Dispute);
            return Err(e);
        }

        let claimed = claim.turn_num();
        let mut dispute = Dispute::open(claim, now, period);
        let latest = self.ledger.latest()?;
        if latest.turn_num() > claimed {
            info!(
                channel = %self.id(),
                claimed,
                latest = latest.turn_num(),
                "Dispute claim is outdated, ledger state takes over"
            );
            dispute.submit(latest.clone(), now)?;
        }

        info!(
            channel = %self.id(),
            turn = dispute.claim().turn_num(),
            deadline = dispute.deadline(),
            "Dispute raised"
        );
        self.pending.clear();
        self.set_status(ChannelStatus::Dispute);
        Ok(&*self.dispute.insert(dispute))
    }

    /// Submit a counter-claim during the challenge window.
    pub fn challenge(&mut self, counter: ChannelState, now: u64) -> Result<()> {
        self.require(ChannelStatus::Dispute, "challenge")?;
        self.check_claim(&counter)?;
        let conflict = self.ledger.check_conflict(&counter);

        let dispute = match self.dispute.as_mut() {
            Some(d) => d,
            None => return Err(self.invalid("challenge")),
        };
        if let Err(e) = conflict {
            warn!(turn = counter.turn_num(), "Counter-claim collides with ledger");
            dispute.escalate();
            return Err(e);
        }
        dispute.submit(counter, now)
    }

    /// `DISPUTE -> FINAL` once the challenge window has passed, settling on
    /// the highest turn claim.
    pub fn expire_challenge_period(&mut self, now: u64) -> Result<&Settlement> {
        self.require(ChannelStatus::Dispute, "expire challenge period")?;
        let winner = match &self.dispute {
            Some(d) => d.resolve(now)?.clone(),
            None => return Err(self.invalid("expire challenge period")),
        };
        self.settle(winner, SettlementReason::ChallengeExpired)
    }

    /// Settle an escalated dispute on the state decided by the adjudicator.
    pub fn record_adjudication(&mut self, state: ChannelState) -> Result<&Settlement> {
        self.require(ChannelStatus::Dispute, "record adjudication")?;
        match &self.dispute {
            Some(d) if d.is_escalated() => {}
            _ => return Err(self.invalid("record adjudication")),
        }
        self.check_claim(&state)?;
        self.settle(state, SettlementReason::Adjudicated)
    }

    /// Put a proposed next state into the working set.
    ///
    /// Any signature the state already carries must belong to the participant
    /// of its slot. Returns the signing hash identifying the proposal.
    pub fn propose(&mut self, state: ChannelState, proposer: PartIdx, now: u64) -> Result<Hash> {
        self.require(ChannelStatus::Active, "propose update")?;
        self.ledger.check_sequence(&state)?;
        self.check_allocations(&state)?;
        state.verify_present_signatures(self.channel.participants())?;

        let hash = state.signing_hash()?;
        debug!(
            channel = %self.id(),
            turn = state.turn_num(),
            proposer,
            %hash,
            "Pending update"
        );
        self.pending
            .insert(hash, PendingUpdate::new(state, hash, proposer, now));
        Ok(hash)
    }

    pub fn pending(&self, hash: &Hash) -> Option<&PendingUpdate> {
        self.pending.get(hash)
    }

    pub fn pending_updates(&self) -> impl Iterator<Item = &PendingUpdate> {
        self.pending.values()
    }

    pub fn remove_pending(&mut self, hash: &Hash) -> Option<PendingUpdate> {
        self.pending.remove(hash)
    }

    /// Add a countersignature to the pending proposal of `turn_num` it was
    /// made for.
    pub fn add_pending_signature(&mut self, turn_num: u64, sig: Signature) -> Result<&PendingUpdate> {
        let participants = *self.channel.participants();

        let mut found = None;
        let mut last_err = None;
        for p in self.pending.values().filter(|p| p.state().turn_num() == turn_num) {
            match sig::identify_hash(p.hash(), &sig, &participants) {
                Ok(_) => {
                    found = Some(p.hash());
                    break;
                }
                Err(e) => last_err = Some(e),
            }
        }
        let hash = match (found, last_err) {
            (Some(hash), _) => hash,
            (None, Some(e)) => return Err(e),
            (None, None) => {
                return Err(Error::ProposalNotFound {
                    channel_id: self.id(),
                    turn_num,
                })
            }
        };

        let channel_id = self.id();
        let pending = self
            .pending
            .get_mut(&hash)
            .ok_or(Error::ProposalNotFound {
                channel_id,
                turn_num,
            })?;
        pending.state_mut().add_signature(sig, &participants)?;
        Ok(pending)
    }

    /// Apply a fully signed pending proposal through
    /// [ChannelMachine::update_state].
    pub fn complete_pending(&mut self, hash: &Hash) -> Result<()> {
        let state = match self.pending.get(hash) {
            Some(p) if !p.state().is_fully_signed() => {
                return Err(Error::IncompleteSignatures {
                    missing: p.state().missing_signatures(),
                })
            }
            Some(p) => p.state().clone(),
            None => {
                return Err(Error::ProposalNotFound {
                    channel_id: self.id(),
                    turn_num: self.ledger.next_turn(),
                })
            }
        };
        self.pending.remove(hash);
        self.update_state(state)
    }

    fn drop_superseded_pending(&mut self) {
        let next = self.ledger.next_turn();
        self.pending.retain(|_, p| p.state().turn_num() >= next);
    }

    /// Abandon proposals older than `timeout` seconds and those superseded by
    /// the ledger.
    pub fn prune_pending(&mut self, now: u64, timeout: u64) -> Vec<PendingUpdate> {
        let next = self.ledger.next_turn();
        let expired: Vec<Hash> = self
            .pending
            .values()
            .filter(|p| p.is_expired(now, timeout) || p.state().turn_num() < next)
            .map(PendingUpdate::hash)
            .collect();

        let mut removed = Vec::with_capacity(expired.len());
        for hash in expired {
            if let Some(p) = self.pending.remove(&hash) {
                warn!(
                    channel = %self.id(),
                    turn = p.state().turn_num(),
                    %hash,
                    "Abandoned pending update"
                );
                removed.push(p);
            }
        }
        removed
    }
}
