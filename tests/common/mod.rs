//! Shared setup for the integration tests.
#![allow(dead_code)]

use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use async_trait::async_trait;
use parking_lot::Mutex;
use rand::{rngs::StdRng, SeedableRng};
use subchan::{
    chain::{Chain, ChainTransaction, Receipt},
    channel::{
        Allocation, AllocationEngine, Channel, ChannelMachine, ChannelState, FundingOutcome,
        FundingRequest,
    },
    clock::ManualClock,
    encoding::keccak256,
    sig::Signer,
    wire::{BytesBus, ProtoBufEncodingLayer},
    Address, ChannelClient, Config, Result, U256,
};

pub const TOKEN: Address = Address([0xee; 20]);
pub const ADJUDICATOR: Address = Address([0xad; 20]);
pub const CHALLENGE_PERIOD: u64 = 3_600;
pub const CREATED_AT: u64 = 1_000;

pub struct Parties {
    pub alice: Signer,
    pub bob: Signer,
    pub channel: Channel,
}

impl Parties {
    pub fn new(seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let alice = Signer::new(&mut rng);
        let bob = Signer::new(&mut rng);
        let channel = Channel::new(
            &[alice.address(), bob.address()],
            ADJUDICATOR,
            CHALLENGE_PERIOD,
            U256::from(seed),
            CREATED_AT,
        )
        .unwrap();
        Parties {
            alice,
            bob,
            channel,
        }
    }

    pub fn allocations(&self, a: u64, b: u64) -> Vec<Allocation> {
        AllocationEngine::genesis(
            self.channel.participants(),
            TOKEN,
            [U256::from(a), U256::from(b)],
        )
    }

    pub fn sign_both(&self, mut state: ChannelState) -> ChannelState {
        state.sign(&self.alice, 0).unwrap();
        state.sign(&self.bob, 1).unwrap();
        state
    }

    pub fn genesis(&self, a: u64, b: u64) -> ChannelState {
        self.sign_both(ChannelState::genesis(
            self.channel.id(),
            self.allocations(a, b),
            vec![],
        ))
    }

    /// Fully signed successor of `prev` with allocations `[a, b]`.
    pub fn next(&self, prev: &ChannelState, a: u64, b: u64) -> ChannelState {
        self.sign_both(prev.make_next_state().with_allocations(self.allocations(a, b)))
    }

    /// A channel in ACTIVE funded with `[a, b]`.
    pub fn funded(&self, a: u64, b: u64) -> ChannelMachine {
        let mut machine =
            ChannelMachine::from_channel(self.channel.clone(), AllocationEngine::default());
        machine.fund(self.genesis(a, b)).unwrap();
        machine.record_funding(FundingOutcome::Funded).unwrap();
        machine
    }

    /// Advance `machine` to `turn`, moving one unit from alice to bob per
    /// turn. Returns the states appended.
    pub fn advance_to(&self, machine: &mut ChannelMachine, turn: u64) -> Vec<ChannelState> {
        let mut appended = Vec::new();
        while machine.ledger().next_turn() <= turn {
            let latest = machine.latest_state().unwrap().clone();
            let [a, b] = [latest.allocations()[0].amount, latest.allocations()[1].amount];
            let next = self.next(&latest, a.low_u64() - 1, b.low_u64() + 1);
            machine.update_state(next.clone()).unwrap();
            appended.push(next);
        }
        appended
    }
}

/// Frames travelling between clients, in order.
#[derive(Debug, Default, Clone)]
pub struct Network {
    frames: Arc<Mutex<VecDeque<(Address, Vec<u8>)>>>,
}

#[derive(Debug)]
pub struct QueueBus(Network);

impl BytesBus for QueueBus {
    fn send_to_participant(&self, _sender: &Address, recipient: &Address, msg: &[u8]) -> Result<()> {
        self.0.frames.lock().push_back((*recipient, msg.to_vec()));
        Ok(())
    }
}

pub type TestClient = ChannelClient<ProtoBufEncodingLayer<QueueBus>>;

impl Network {
    pub fn client(&self, signer: Signer, config: Config, clock: Arc<ManualClock>) -> TestClient {
        ChannelClient::new(
            ProtoBufEncodingLayer::new(QueueBus(self.clone())),
            signer,
            config,
            clock,
        )
    }

    pub fn pop(&self) -> Option<(Address, Vec<u8>)> {
        self.frames.lock().pop_front()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.lock().is_empty()
    }

    /// Deliver frames until the network is quiet, returning every handling
    /// result per recipient.
    pub fn pump(&self, clients: &[&TestClient]) -> Vec<(Address, Result<subchan::ClientEvent>)> {
        let mut results = Vec::new();
        while let Some((recipient, frame)) = self.pop() {
            let client = clients
                .iter()
                .find(|c| c.address() == recipient)
                .expect("frame for unknown client");
            results.push((recipient, client.handle_frame(&frame)));
        }
        results
    }
}

pub fn config() -> Config {
    Config {
        token: subchan::config::TokenConfig {
            address: TOKEN,
            decimals: 18,
        },
        default_challenge_period_secs: CHALLENGE_PERIOD,
        ..Config::default()
    }
}

/// Chain that records transactions. Deposits arrive only if `deposits_arrive`
/// is set, otherwise awaiting them never completes.
#[derive(Debug)]
pub struct MockChain {
    pub deposits_arrive: AtomicBool,
    pub chain_id: u64,
    pub transactions: Mutex<Vec<ChainTransaction>>,
}

impl MockChain {
    fn new(deposits_arrive: bool) -> Self {
        MockChain {
            deposits_arrive: AtomicBool::new(deposits_arrive),
            chain_id: config().chain_id,
            transactions: Mutex::new(Vec::new()),
        }
    }

    pub fn funding() -> Self {
        MockChain::new(true)
    }

    pub fn stalled() -> Self {
        MockChain::new(false)
    }

    pub fn on_chain(chain_id: u64) -> Self {
        MockChain {
            chain_id,
            ..MockChain::funding()
        }
    }

    pub fn sent(&self) -> Vec<ChainTransaction> {
        self.transactions.lock().clone()
    }
}

#[async_trait]
impl Chain for MockChain {
    fn address(&self) -> Address {
        ADJUDICATOR
    }

    fn chain_id(&self) -> u64 {
        self.chain_id
    }

    async fn send_transaction(&self, tx: ChainTransaction) -> Result<Receipt> {
        let count = {
            let mut txs = self.transactions.lock();
            txs.push(tx);
            txs.len()
        };
        Ok(Receipt {
            tx_hash: keccak256(&count.to_be_bytes()),
            block_time: 0,
        })
    }

    async fn await_deposits(&self, _request: &FundingRequest) -> Result<()> {
        if self.deposits_arrive.load(Ordering::SeqCst) {
            Ok(())
        } else {
            std::future::pending().await
        }
    }
}

pub fn manual_clock(now: u64) -> Arc<ManualClock> {
    Arc::new(ManualClock::new(now))
}
