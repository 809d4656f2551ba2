use std::{sync::Arc, time::Duration};

use dashmap::{mapref::entry::Entry, DashMap};
use parking_lot::Mutex;
use rand::Rng;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::{
    chain::{Chain, ChainTransaction},
    channel::{
        AllocationEngine, Channel, ChannelId, ChannelMachine, ChannelState, ChannelStatus,
        Dispute, FundingOutcome, FundingRequest, PartIdx, PendingUpdate, Settlement,
    },
    clock::Clock,
    config::Config,
    error::{Error, Result},
    messages::{
        ChannelProposal, ParticipantMessage, StateAccepted, StateAcknowledged, StateProposal,
        StateRejected,
    },
    sig::Signer,
    types::{Address, Hash, Signature, U256},
    wire::{decode_frame, MessageBus},
};

/// What an incoming message did to the local channels.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    /// A peer proposed a channel. We countersigned the genesis state, the
    /// deposits can be made with [ChannelClient::await_funding].
    ChannelProposed(FundingRequest),
    /// The peer countersigned our channel proposal.
    ChannelAccepted(FundingRequest),
    /// The peer proposed the next state, see [ChannelClient::accept_update]
    /// and [ChannelClient::reject_update].
    UpdateProposed {
        channel_id: ChannelId,
        turn_num: u64,
        hash: Hash,
        is_final: bool,
    },
    /// The peer countersigned our proposal and it is in our ledger.
    UpdateAccepted { channel_id: ChannelId, turn_num: u64 },
    /// The peer applied the state we countersigned.
    UpdateAcknowledged { channel_id: ChannelId, turn_num: u64 },
    UpdateRejected {
        channel_id: ChannelId,
        turn_num: u64,
        reason: String,
    },
    /// The peer countersigned our final state, the channel is closed.
    Closed(Settlement),
}

/// Entry point for an application: owns the local key, the connection to
/// the peers and every channel the local participant takes part in.
///
/// Each channel is locked on its own, operations on different channels run
/// in parallel. No lock is held while sending a message or waiting for the
/// chain.
#[derive(Debug)]
pub struct ChannelClient<B: MessageBus> {
    signer: Signer,
    bus: B,
    config: Config,
    clock: Arc<dyn Clock>,
    channels: DashMap<ChannelId, Arc<Mutex<ChannelMachine>>>,
    /// Genesis states of our channel proposals, waiting for the peer.
    proposals: DashMap<ChannelId, ChannelState>,
}

impl<B: MessageBus> ChannelClient<B> {
    pub fn new(bus: B, signer: Signer, config: Config, clock: Arc<dyn Clock>) -> Self {
        ChannelClient {
            signer,
            bus,
            config,
            clock,
            channels: DashMap::new(),
            proposals: DashMap::new(),
        }
    }

    pub fn address(&self) -> Address {
        self.signer.address()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    pub fn now(&self) -> u64 {
        self.clock.now()
    }

    fn engine(&self) -> AllocationEngine {
        AllocationEngine::new(self.config.destination_policy())
    }

    fn machine(&self, channel_id: &ChannelId) -> Result<Arc<Mutex<ChannelMachine>>> {
        self.channels
            .get(channel_id)
            .map(|m| Arc::clone(m.value()))
            .ok_or(Error::ChannelNotFound(*channel_id))
    }

    fn own_idx(&self, channel: &Channel) -> Result<PartIdx> {
        channel
            .part_idx_of(self.address())
            .ok_or_else(|| Error::UnknownSigner(self.address()))
    }

    /// Index of `sender`, which has to be the other participant.
    fn peer_idx(&self, channel: &Channel, sender: Address) -> Result<PartIdx> {
        match channel.part_idx_of(sender) {
            Some(idx) if sender != self.address() => Ok(idx),
            _ => Err(Error::UnknownSigner(sender)),
        }
    }

    /// Refuse to transact on a chain other than the configured one.
    fn check_chain<C: Chain + ?Sized>(&self, chain: &C) -> Result<()> {
        if chain.chain_id() != self.config.chain_id {
            return Err(Error::Chain(format!(
                "connected to chain {}, configured for {}",
                chain.chain_id(),
                self.config.chain_id
            )));
        }
        Ok(())
    }

    fn send(&self, recipient: Address, msg: ParticipantMessage) -> Result<()> {
        self.bus.send_to_participant(&self.address(), &recipient, msg)
    }

    /// Propose a channel with `peer`, locking `deposits[0]` of the configured
    /// token from us and `deposits[1]` from the peer.
    pub fn propose_channel(
        &self,
        peer: Address,
        deposits: [U256; 2],
        app_data: Vec<u8>,
    ) -> Result<ChannelId> {
        let participants = [self.address(), peer];
        let nonce: U256 = rand::thread_rng().gen();
        let machine = ChannelMachine::create(
            &participants,
            self.config.adjudicator,
            self.config.default_challenge_period_secs,
            nonce,
            self.now(),
            self.engine(),
        )?;
        let id = machine.id();

        let allocations =
            AllocationEngine::genesis(&participants, self.config.token.address, deposits);
        let mut genesis = ChannelState::genesis(id, allocations, app_data);
        let sig = genesis.sign(&self.signer, 0)?;
        let params = machine.channel().clone();

        self.channels.insert(id, Arc::new(Mutex::new(machine)));
        self.proposals.insert(id, genesis.clone());
        info!(channel = %id, %peer, "Proposing channel");

        self.send(
            peer,
            ParticipantMessage::ChannelProposal(ChannelProposal {
                params,
                genesis,
                sig,
            }),
        )?;
        Ok(id)
    }

    /// Decode a frame from the byte transport and handle its message.
    pub fn handle_frame(&self, frame: &[u8]) -> Result<ClientEvent> {
        let frame = decode_frame(frame)?;
        if frame.recipient != self.address() {
            warn!(recipient = %frame.recipient, "Frame for another participant");
            return Err(Error::UnknownSigner(frame.recipient));
        }
        self.handle_message(frame.sender, frame.msg)
    }

    pub fn handle_message(&self, sender: Address, msg: ParticipantMessage) -> Result<ClientEvent> {
        debug!(%sender, channel = %msg.channel_id(), "Received message");
        match msg {
            ParticipantMessage::ChannelProposal(m) => self.handle_channel_proposal(sender, m),
            ParticipantMessage::StateProposal(m) => self.handle_state_proposal(sender, m),
            ParticipantMessage::StateAccepted(m) => self.handle_state_accepted(sender, m),
            ParticipantMessage::StateAcknowledged(m) => self.handle_state_acknowledged(sender, m),
            ParticipantMessage::StateRejected(m) => self.handle_state_rejected(sender, m),
        }
    }

    fn handle_channel_proposal(
        &self,
        sender: Address,
        proposal: ChannelProposal,
    ) -> Result<ClientEvent> {
        let ChannelProposal {
            params,
            mut genesis,
            sig,
        } = proposal;
        let id = params.id();
        let own = self.own_idx(&params)?;
        let peer = self.peer_idx(&params, sender)?;

        if let Err(e) = self.check_channel_params(&params) {
            warn!(channel = %id, %sender, error = %e, "Declining channel proposal");
            let reject = ParticipantMessage::StateRejected(StateRejected {
                channel_id: id,
                turn_num: 0,
                reason: e.to_string(),
            });
            if let Err(send_err) = self.send(sender, reject) {
                warn!(channel = %id, error = %send_err, "Could not send rejection");
            }
            return Err(e);
        }

        if genesis.add_signature(sig, params.participants())? != peer {
            return Err(Error::UnknownSigner(sender));
        }
        let own_sig = genesis.sign(&self.signer, own)?;

        let mut machine = ChannelMachine::from_channel(params, self.engine());
        let funding = machine.fund(genesis)?;
        match self.channels.entry(id) {
            Entry::Occupied(e) => {
                let existing = Arc::clone(e.get());
                drop(e);
                let status = existing.lock().status();
                return Err(Error::InvalidTransition {
                    operation: "accept channel proposal",
                    status,
                });
            }
            Entry::Vacant(e) => {
                e.insert(Arc::new(Mutex::new(machine)));
            }
        }
        info!(channel = %id, %sender, "Accepted channel proposal");

        self.send(
            sender,
            ParticipantMessage::StateAccepted(StateAccepted {
                channel_id: id,
                turn_num: 0,
                sig: own_sig,
            }),
        )?;
        Ok(ClientEvent::ChannelProposed(funding))
    }

    /// Parameters a proposed channel must share with our configuration.
    fn check_channel_params(&self, params: &Channel) -> Result<()> {
        let minimum = self.config.min_challenge_period_secs;
        if params.challenge_period() < minimum {
            return Err(Error::ChallengePeriodTooShort {
                period: params.challenge_period(),
                minimum,
            });
        }
        if params.adjudicator() != self.config.adjudicator {
            return Err(Error::UnexpectedAdjudicator {
                expected: self.config.adjudicator,
                got: params.adjudicator(),
            });
        }
        Ok(())
    }

    fn handle_state_proposal(&self, sender: Address, msg: StateProposal) -> Result<ClientEvent> {
        let StateProposal {
            mut state,
            actor_idx,
            sig,
        } = msg;
        let channel_id = state.channel_id();
        let turn_num = state.turn_num();
        let is_final = state.is_final();
        let machine = self.machine(&channel_id)?;

        let proposed = {
            let mut m = machine.lock();
            let now = self.now();
            self.peer_idx(m.channel(), sender).and_then(|peer| {
                if actor_idx != peer {
                    return Err(Error::UnknownSigner(sender));
                }
                if state.add_signature(sig, m.channel().participants())? != peer {
                    return Err(Error::InvalidSignature(
                        "proposal is not signed by its proposer".to_string(),
                    ));
                }
                m.propose(state, peer, now)
            })
        };

        match proposed {
            Ok(hash) => Ok(ClientEvent::UpdateProposed {
                channel_id,
                turn_num,
                hash,
                is_final,
            }),
            Err(e) => {
                warn!(channel = %channel_id, turn = turn_num, error = %e, "Rejecting proposal");
                let reject = ParticipantMessage::StateRejected(StateRejected {
                    channel_id,
                    turn_num,
                    reason: e.to_string(),
                });
                if let Err(send_err) = self.send(sender, reject) {
                    warn!(channel = %channel_id, error = %send_err, "Could not send rejection");
                }
                Err(e)
            }
        }
    }

    fn handle_state_accepted(&self, sender: Address, msg: StateAccepted) -> Result<ClientEvent> {
        let channel_id = msg.channel_id;
        if msg.turn_num == 0 {
            if let Some(genesis) = self.proposals.get(&channel_id).map(|g| g.clone()) {
                return self.complete_channel_proposal(sender, genesis, msg.sig);
            }
        }

        let machine = self.machine(&channel_id)?;
        let event = {
            let mut m = machine.lock();
            self.peer_idx(m.channel(), sender)?;
            let hash = m.add_pending_signature(msg.turn_num, msg.sig)?.hash();
            m.complete_pending(&hash)?;
            match m.settlement() {
                Some(s) => ClientEvent::Closed(s.clone()),
                None => ClientEvent::UpdateAccepted {
                    channel_id,
                    turn_num: msg.turn_num,
                },
            }
        };
        info!(channel = %channel_id, turn = msg.turn_num, "Update countersigned");

        self.send(
            sender,
            ParticipantMessage::StateAcknowledged(StateAcknowledged {
                channel_id,
                turn_num: msg.turn_num,
            }),
        )?;
        Ok(event)
    }

    fn complete_channel_proposal(
        &self,
        sender: Address,
        mut genesis: ChannelState,
        sig: Signature,
    ) -> Result<ClientEvent> {
        let channel_id = genesis.channel_id();
        let machine = self.machine(&channel_id)?;
        let funding = {
            let mut m = machine.lock();
            let peer = self.peer_idx(m.channel(), sender)?;
            if genesis.add_signature(sig, m.channel().participants())? != peer {
                return Err(Error::UnknownSigner(sender));
            }
            m.fund(genesis)?
        };
        self.proposals.remove(&channel_id);
        info!(channel = %channel_id, %sender, "Channel proposal accepted");

        self.send(
            sender,
            ParticipantMessage::StateAcknowledged(StateAcknowledged {
                channel_id,
                turn_num: 0,
            }),
        )?;
        Ok(ClientEvent::ChannelAccepted(funding))
    }

    fn handle_state_acknowledged(
        &self,
        sender: Address,
        msg: StateAcknowledged,
    ) -> Result<ClientEvent> {
        let machine = self.machine(&msg.channel_id)?;
        let m = machine.lock();
        self.peer_idx(m.channel(), sender)?;
        if m.ledger().get(msg.turn_num).is_none() {
            return Err(Error::ProposalNotFound {
                channel_id: msg.channel_id,
                turn_num: msg.turn_num,
            });
        }
        debug!(channel = %msg.channel_id, turn = msg.turn_num, "Update acknowledged");
        Ok(ClientEvent::UpdateAcknowledged {
            channel_id: msg.channel_id,
            turn_num: msg.turn_num,
        })
    }

    fn handle_state_rejected(&self, sender: Address, msg: StateRejected) -> Result<ClientEvent> {
        let channel_id = msg.channel_id;
        let machine = self.machine(&channel_id)?;
        {
            let mut m = machine.lock();
            self.peer_idx(m.channel(), sender)?;
            let own = self.own_idx(m.channel())?;
            let rejected: Vec<Hash> = m
                .pending_updates()
                .filter(|p| p.state().turn_num() == msg.turn_num && p.proposer() == own)
                .map(PendingUpdate::hash)
                .collect();
            for hash in rejected {
                m.remove_pending(&hash);
            }
        }

        if msg.turn_num == 0 && self.proposals.remove(&channel_id).is_some() {
            self.channels.remove(&channel_id);
        }
        warn!(channel = %channel_id, turn = msg.turn_num, reason = %msg.reason, "Proposal rejected");

        Ok(ClientEvent::UpdateRejected {
            channel_id,
            turn_num: msg.turn_num,
            reason: msg.reason,
        })
    }

    /// Countersign the peer's proposal `hash` and apply it.
    ///
    /// Returns the applied state.
    pub fn accept_update(&self, channel_id: ChannelId, hash: Hash) -> Result<ChannelState> {
        let machine = self.machine(&channel_id)?;
        let (peer, state, sig) = {
            let mut m = machine.lock();
            let own = self.own_idx(m.channel())?;
            let turn_num = match m.pending(&hash) {
                Some(p) if p.proposer() == own => return Err(Error::AlreadySigned(own)),
                Some(p) => p.state().turn_num(),
                None => {
                    return Err(Error::ProposalNotFound {
                        channel_id,
                        turn_num: m.ledger().next_turn(),
                    })
                }
            };
            let sig = self.signer.sign_hash(hash)?;
            m.add_pending_signature(turn_num, sig)?;
            m.complete_pending(&hash)?;

            let state = m.latest_state()?.clone();
            (m.channel().participants()[Channel::peer_of(own)], state, sig)
        };
        info!(channel = %channel_id, turn = state.turn_num(), "Accepted update");

        self.send(
            peer,
            ParticipantMessage::StateAccepted(StateAccepted {
                channel_id,
                turn_num: state.turn_num(),
                sig,
            }),
        )?;
        Ok(state)
    }

    pub fn reject_update(&self, channel_id: ChannelId, hash: Hash, reason: &str) -> Result<()> {
        let machine = self.machine(&channel_id)?;
        let (peer, turn_num) = {
            let mut m = machine.lock();
            let own = self.own_idx(m.channel())?;
            let pending = m.remove_pending(&hash).ok_or(Error::ProposalNotFound {
                channel_id,
                turn_num: m.ledger().next_turn(),
            })?;
            (
                m.channel().participants()[Channel::peer_of(own)],
                pending.state().turn_num(),
            )
        };
        info!(channel = %channel_id, turn = turn_num, reason, "Rejected update");

        self.send(
            peer,
            ParticipantMessage::StateRejected(StateRejected {
                channel_id,
                turn_num,
                reason: reason.to_string(),
            }),
        )
    }

    /// Sign `state` and send it to the peer for countersigning.
    ///
    /// Returns the hash identifying the pending proposal.
    pub fn propose_update(&self, channel_id: ChannelId, mut state: ChannelState) -> Result<Hash> {
        let machine = self.machine(&channel_id)?;
        let (peer, msg, hash) = {
            let mut m = machine.lock();
            let own = self.own_idx(m.channel())?;
            let sig = state.sign(&self.signer, own)?;
            let hash = m.propose(state.clone(), own, self.now())?;
            let msg = StateProposal {
                state,
                actor_idx: own,
                sig,
            };
            (m.channel().participants()[Channel::peer_of(own)], msg, hash)
        };
        info!(
            channel = %channel_id,
            turn = msg.state.turn_num(),
            is_final = msg.state.is_final(),
            "Proposing update"
        );

        self.send(peer, ParticipantMessage::StateProposal(msg))?;
        Ok(hash)
    }

    /// Propose paying `amount` of the configured token from us to `to`.
    pub fn propose_transfer(&self, channel_id: ChannelId, to: Address, amount: U256) -> Result<Hash> {
        let next = {
            let machine = self.machine(&channel_id)?;
            let m = machine.lock();
            let latest = m.latest_state()?;
            let allocations = m.engine().transfer(
                latest.allocations(),
                self.address(),
                to,
                self.config.token.address,
                amount,
            )?;
            latest.make_next_state().with_allocations(allocations)
        };
        self.propose_update(channel_id, next)
    }

    /// Propose the final state, closing the channel on the current
    /// allocations once the peer countersigns.
    pub fn close(&self, channel_id: ChannelId) -> Result<Hash> {
        let final_state = {
            let machine = self.machine(&channel_id)?;
            let m = machine.lock();
            m.latest_state()?.make_next_state().finalized()
        };
        self.propose_update(channel_id, final_state)
    }

    /// Deposit our part and wait for the peer's, at most
    /// `funding_timeout_secs`.
    ///
    /// On timeout the channel becomes VOID and [Error::FundingTimeout] is
    /// returned.
    pub async fn await_funding<C>(&self, chain: &C, request: &FundingRequest) -> Result<()>
    where
        C: Chain + ?Sized,
    {
        self.check_chain(chain)?;
        let channel_id = request.channel_id;
        let machine = self.machine(&channel_id)?;
        let own = request
            .participants
            .iter()
            .position(|p| *p == self.address())
            .ok_or_else(|| Error::UnknownSigner(self.address()))?;
        let deposits = request.deposits_of(own);

        let funding = async {
            if deposits.iter().any(|d| !d.amount.is_zero()) {
                let receipt = chain
                    .send_transaction(ChainTransaction::Fund {
                        channel_id,
                        deposits,
                    })
                    .await?;
                debug!(channel = %channel_id, tx = %receipt.tx_hash, "Deposit sent");
            }
            chain.await_deposits(request).await
        };

        let timeout = Duration::from_secs(self.config.funding_timeout_secs);
        let outcome = match tokio::time::timeout(timeout, funding).await {
            Ok(Ok(())) => FundingOutcome::Funded,
            Ok(Err(e)) => {
                warn!(channel = %channel_id, error = %e, "Funding failed");
                return Err(e);
            }
            Err(_) => FundingOutcome::TimedOut,
        };
        let result = machine.lock().record_funding(outcome);
        result
    }

    /// Register our latest fully signed state on-chain, starting the
    /// challenge window.
    pub async fn raise_dispute<C>(&self, chain: &C, channel_id: ChannelId) -> Result<Dispute>
    where
        C: Chain + ?Sized,
    {
        self.check_chain(chain)?;
        let machine = self.machine(&channel_id)?;
        let (params, dispute) = {
            let mut m = machine.lock();
            let claim = m.latest_state()?.clone();
            let dispute = m.raise_dispute(claim, self.now())?.clone();
            (m.channel().clone(), dispute)
        };

        let receipt = chain
            .send_transaction(ChainTransaction::Register {
                params,
                state: dispute.claim().clone(),
            })
            .await?;
        info!(channel = %channel_id, tx = %receipt.tx_hash, "Dispute registered");
        Ok(dispute)
    }

    /// The peer registered `claim` on-chain at `opened_at`.
    ///
    /// If our ledger holds a newer state, answer with
    /// [ChannelClient::submit_counter_claim] before the deadline.
    pub fn observe_dispute(
        &self,
        channel_id: ChannelId,
        claim: ChannelState,
        opened_at: u64,
    ) -> Result<Dispute> {
        let machine = self.machine(&channel_id)?;
        let mut m = machine.lock();
        let latest_turn = m.latest_state()?.turn_num();
        let claimed = claim.turn_num();
        let dispute = m.raise_dispute(claim, opened_at)?.clone();
        if latest_turn > claimed {
            info!(
                channel = %channel_id,
                claimed,
                latest = latest_turn,
                deadline = dispute.deadline(),
                "Peer disputed with an outdated state, counter-claim required"
            );
        }
        Ok(dispute)
    }

    /// Answer a running dispute with our latest fully signed state.
    pub async fn submit_counter_claim<C>(&self, chain: &C, channel_id: ChannelId) -> Result<Dispute>
    where
        C: Chain + ?Sized,
    {
        self.check_chain(chain)?;
        let machine = self.machine(&channel_id)?;
        let (state, dispute) = {
            let mut m = machine.lock();
            let now = self.now();
            let counter = m.latest_state()?.clone();
            let recorded = match m.dispute() {
                Some(d) if d.has_elapsed(now) => {
                    return Err(Error::ChallengePeriodElapsed {
                        deadline: d.deadline(),
                        now,
                    })
                }
                // Already taken over from our ledger when the dispute was
                // observed, only the chain still has to see it.
                Some(d) => d.claim().same_content(&counter),
                None => false,
            };
            if !recorded {
                m.challenge(counter.clone(), now)?;
            }
            let dispute = m.dispute().cloned().ok_or(Error::InvalidTransition {
                operation: "submit counter-claim",
                status: m.status(),
            })?;
            (counter, dispute)
        };

        let receipt = chain
            .send_transaction(ChainTransaction::Challenge { channel_id, state })
            .await?;
        info!(channel = %channel_id, tx = %receipt.tx_hash, "Counter-claim registered");
        Ok(dispute)
    }

    /// Pay out a FINAL channel, settling an expired dispute first.
    pub async fn conclude<C>(&self, chain: &C, channel_id: ChannelId) -> Result<Settlement>
    where
        C: Chain + ?Sized,
    {
        self.check_chain(chain)?;
        let machine = self.machine(&channel_id)?;
        let settlement = {
            let mut m = machine.lock();
            match m.settlement().cloned() {
                Some(s) => s,
                None => m.expire_challenge_period(self.now())?.clone(),
            }
        };

        let receipt = chain
            .send_transaction(ChainTransaction::Conclude {
                settlement: settlement.clone(),
            })
            .await?;
        info!(
            channel = %channel_id,
            turn = settlement.turn_num,
            tx = %receipt.tx_hash,
            "Channel concluded"
        );
        Ok(settlement)
    }

    /// Drop proposals nobody answered within `pending_timeout_secs`.
    ///
    /// Unanswered channel proposals remove the channel. Returns the number of
    /// abandoned proposals.
    pub fn abandon_expired_proposals(&self) -> usize {
        let now = self.now();
        let timeout = self.config.pending_timeout_secs;

        let machines: Vec<_> = self.channels.iter().map(|e| Arc::clone(e.value())).collect();
        let mut abandoned: usize = machines
            .iter()
            .map(|m| m.lock().prune_pending(now, timeout).len())
            .sum();

        let expired: Vec<ChannelId> = self
            .proposals
            .iter()
            .map(|p| *p.key())
            .filter(|id| {
                self.machine(id)
                    .map(|m| now.saturating_sub(m.lock().channel().created_at()) >= timeout)
                    .unwrap_or(true)
            })
            .collect();
        for id in expired {
            self.proposals.remove(&id);
            self.channels.remove(&id);
            warn!(channel = %id, "Abandoned channel proposal");
            abandoned += 1;
        }
        abandoned
    }

    pub fn channel_ids(&self) -> Vec<ChannelId> {
        self.channels.iter().map(|e| *e.key()).collect()
    }

    /// Run `f` on the current state of a channel.
    pub fn inspect<R>(&self, channel_id: ChannelId, f: impl FnOnce(&ChannelMachine) -> R) -> Result<R> {
        let machine = self.machine(&channel_id)?;
        let m = machine.lock();
        Ok(f(&m))
    }

    pub fn status(&self, channel_id: ChannelId) -> Result<ChannelStatus> {
        self.inspect(channel_id, |m| m.status())
    }

    pub fn channel(&self, channel_id: ChannelId) -> Result<Channel> {
        self.inspect(channel_id, |m| m.channel().clone())
    }

    pub fn latest_state(&self, channel_id: ChannelId) -> Result<ChannelState> {
        self.inspect(channel_id, |m| m.latest_state().cloned())?
    }

    pub fn settlement(&self, channel_id: ChannelId) -> Result<Option<Settlement>> {
        self.inspect(channel_id, |m| m.settlement().cloned())
    }

    pub fn dispute(&self, channel_id: ChannelId) -> Result<Option<Dispute>> {
        self.inspect(channel_id, |m| m.dispute().cloned())
    }

    pub fn pending_updates(&self, channel_id: ChannelId) -> Result<Vec<PendingUpdate>> {
        self.inspect(channel_id, |m| m.pending_updates().cloned().collect())
    }

    pub fn subscribe(&self, channel_id: ChannelId) -> Result<watch::Receiver<ChannelStatus>> {
        self.inspect(channel_id, |m| m.subscribe())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{clock::ManualClock, wire::MessageBus};
    use rand::{rngs::StdRng, SeedableRng};

    /// Keeps every message instead of delivering it.
    #[derive(Debug, Default)]
    struct Outbox(Mutex<Vec<(Address, Address, ParticipantMessage)>>);

    impl Outbox {
        fn take(&self) -> Vec<(Address, Address, ParticipantMessage)> {
            std::mem::take(&mut *self.0.lock())
        }
    }

    impl MessageBus for Outbox {
        fn send_to_participant(
            &self,
            sender: &Address,
            recipient: &Address,
            msg: ParticipantMessage,
        ) -> Result<()> {
            self.0.lock().push((*sender, *recipient, msg));
            Ok(())
        }
    }

    fn clients() -> (ChannelClient<Outbox>, ChannelClient<Outbox>, Arc<ManualClock>) {
        let mut rng = StdRng::seed_from_u64(1);
        let clock = Arc::new(ManualClock::new(10_000));
        let a = ChannelClient::new(
            Outbox::default(),
            Signer::new(&mut rng),
            Config::default(),
            clock.clone(),
        );
        let b = ChannelClient::new(
            Outbox::default(),
            Signer::new(&mut rng),
            Config::default(),
            clock.clone(),
        );
        (a, b, clock)
    }

    /// Deliver everything `from` sent to `to`, returning the events.
    fn deliver(from: &ChannelClient<Outbox>, to: &ChannelClient<Outbox>) -> Vec<Result<ClientEvent>> {
        from.bus()
            .take()
            .into_iter()
            .map(|(sender, recipient, msg)| {
                assert_eq!(recipient, to.address());
                to.handle_message(sender, msg)
            })
            .collect()
    }

    #[test]
    fn channel_proposal_is_countersigned() {
        let (a, b, _) = clients();
        let id = a
            .propose_channel(b.address(), [U256::from(100u64), U256::zero()], vec![])
            .unwrap();
        assert_eq!(a.status(id).unwrap(), ChannelStatus::Initial);

        let events = deliver(&a, &b);
        assert!(matches!(events[..], [Ok(ClientEvent::ChannelProposed(_))]));
        assert!(b.latest_state(id).unwrap().is_fully_signed());

        let events = deliver(&b, &a);
        match &events[..] {
            [Ok(ClientEvent::ChannelAccepted(req))] => {
                assert_eq!(req.channel_id, id);
                assert_eq!(req.deposits_of(0)[0].amount, U256::from(100u64));
            }
            other => panic!("unexpected events {:?}", other),
        }
        assert!(a.latest_state(id).unwrap().is_fully_signed());
        assert!(matches!(
            deliver(&a, &b)[..],
            [Ok(ClientEvent::UpdateAcknowledged { turn_num: 0, .. })]
        ));
    }

    #[test]
    fn proposal_from_a_stranger_is_rejected() {
        let (a, b, _) = clients();
        let stranger = Signer::new(&mut StdRng::seed_from_u64(99));
        a.propose_channel(b.address(), [U256::from(1u64), U256::zero()], vec![])
            .unwrap();
        let (_, _, msg) = a.bus().take().remove(0);
        assert!(matches!(
            b.handle_message(stranger.address(), msg),
            Err(Error::UnknownSigner(_))
        ));
        assert!(b.channel_ids().is_empty());
    }

    #[test]
    fn unanswered_channel_proposal_is_abandoned() {
        let (a, b, clock) = clients();
        let id = a
            .propose_channel(b.address(), [U256::from(1u64), U256::zero()], vec![])
            .unwrap();
        clock.advance(a.config().pending_timeout_secs - 1);
        assert_eq!(a.abandon_expired_proposals(), 0);
        clock.advance(1);
        assert_eq!(a.abandon_expired_proposals(), 1);
        assert!(matches!(a.status(id), Err(Error::ChannelNotFound(_))));
    }

    #[test]
    fn declined_channel_proposal_is_dropped() {
        let (a, b, _) = clients();
        let id = a
            .propose_channel(b.address(), [U256::from(1u64), U256::zero()], vec![])
            .unwrap();
        a.bus().take();
        let reject = ParticipantMessage::StateRejected(StateRejected {
            channel_id: id,
            turn_num: 0,
            reason: "no thanks".to_string(),
        });
        assert!(matches!(
            a.handle_message(b.address(), reject),
            Ok(ClientEvent::UpdateRejected { turn_num: 0, .. })
        ));
        assert!(a.channel_ids().is_empty());
    }
}
