//! Walkthrough: Alice subscribes to Bob's service for three months and pays
//! through a channel.
//!
//! Run with `RUST_LOG=subchan=debug` to see the protocol steps.

use std::{collections::VecDeque, sync::Arc};

use async_trait::async_trait;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use subchan::{
    chain::{Chain, ChainTransaction, Receipt},
    channel::FundingRequest,
    clock::{Clock, ManualClock},
    encoding::keccak256,
    oracle::{FixedOracle, PriceData},
    sig::Signer,
    subscription::{Currency, Plan, SubscriptionRequest, SubscriptionService},
    wire::{BytesBus, ProtoBufEncodingLayer},
    Address, ChannelClient, ClientEvent, Config, Result,
};
use tracing_subscriber::EnvFilter;

/// Helper macro to print significant places in the protocol.
macro_rules! print_bold {
    ($($arg:tt)*) => {
        print!("\x1b[1m");
        print!($($arg)*);
        println!("\x1b[0m");
    };
}

/// Helper macro to print points where the user/application has to interact.
macro_rules! print_user_interaction {
    ($($arg:tt)*) => {
        print!("\x1b[1;34m");
        print!($($arg)*);
        println!("\x1b[0m");
    };
}

/// Byte transport representing a tcp connection. For simplicity all frames go
/// through one queue and are delivered by [deliver_all].
#[derive(Debug, Clone, Default)]
struct Wire {
    frames: Arc<Mutex<VecDeque<(Address, Vec<u8>)>>>,
}

impl BytesBus for Wire {
    fn send_to_participant(&self, _sender: &Address, recipient: &Address, msg: &[u8]) -> Result<()> {
        println!("  -> {}: {} byte frame", recipient, msg.len());
        self.frames.lock().push_back((*recipient, msg.to_vec()));
        Ok(())
    }
}

type Client = ChannelClient<ProtoBufEncodingLayer<Wire>>;

/// Chain where every deposit arrives immediately.
#[derive(Debug, Default)]
struct InstantChain {
    sent: Mutex<usize>,
}

#[async_trait]
impl Chain for InstantChain {
    fn address(&self) -> Address {
        Config::default().adjudicator
    }

    fn chain_id(&self) -> u64 {
        Config::default().chain_id
    }

    async fn send_transaction(&self, tx: ChainTransaction) -> Result<Receipt> {
        let mut sent = self.sent.lock();
        *sent += 1;
        println!("  chain: {} for {}", kind(&tx), tx.channel_id());
        Ok(Receipt {
            tx_hash: keccak256(&sent.to_be_bytes()),
            block_time: 0,
        })
    }

    async fn await_deposits(&self, _request: &FundingRequest) -> Result<()> {
        Ok(())
    }
}

fn kind(tx: &ChainTransaction) -> &'static str {
    match tx {
        ChainTransaction::Fund { .. } => "fund",
        ChainTransaction::Register { .. } => "register",
        ChainTransaction::Challenge { .. } => "challenge",
        ChainTransaction::Conclude { .. } => "conclude",
    }
}

/// Deliver frames until the wire is quiet. Bob countersigns every update.
fn deliver_all(wire: &Wire, alice: &Client, bob: &Client) -> Vec<ClientEvent> {
    let mut events = Vec::new();
    loop {
        let next = wire.frames.lock().pop_front();
        let (recipient, frame) = match next {
            Some(f) => f,
            None => return events,
        };
        let client = if recipient == alice.address() { alice } else { bob };
        match client.handle_frame(&frame) {
            Ok(ClientEvent::UpdateProposed {
                channel_id, hash, ..
            }) if recipient == bob.address() => {
                print_user_interaction!("Bob accepts the update");
                bob.accept_update(channel_id, hash).unwrap();
            }
            Ok(event) => events.push(event),
            Err(e) => println!("  {} refused a frame: {}", recipient, e),
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let wire = Wire::default();
    let clock = Arc::new(ManualClock::new(1_700_000_000));
    let chain = InstantChain::default();
    let config = Config::default();

    let mut rng = rand::thread_rng();
    let alice = Arc::new(ChannelClient::new(
        ProtoBufEncodingLayer::new(wire.clone()),
        Signer::new(&mut rng),
        config.clone(),
        clock.clone(),
    ));
    let bob = ChannelClient::new(
        ProtoBufEncodingLayer::new(wire.clone()),
        Signer::new(&mut rng),
        config,
        clock.clone(),
    );

    // Fallback FLR/USD price while no feed is reachable.
    let oracle = Arc::new(FixedOracle::new(PriceData::new(1_730, 5, clock.now())));
    let service = SubscriptionService::new(Arc::clone(&alice), oracle);

    print_user_interaction!("Alice subscribes to Bob for 5 USD per month, 3 months prepaid");
    let channel_id = service
        .create_subscription(SubscriptionRequest {
            recipient: bob.address(),
            amount: Decimal::new(5, 0),
            currency: Currency::Usd,
            plan: Plan::Monthly,
            prepaid_periods: 3,
        })
        .await
        .unwrap();

    let mut requests = Vec::new();
    for event in deliver_all(&wire, &alice, &bob) {
        if let ClientEvent::ChannelProposed(req) | ClientEvent::ChannelAccepted(req) = event {
            requests.push(req);
        }
    }
    print_bold!("Both signed the initial state, funding channel {}", channel_id);
    // Both sides received the same funding request.
    let request = &requests[0];
    alice.await_funding(&chain, request).await.unwrap();
    bob.await_funding(&chain, request).await.unwrap();

    for month in 1..=2 {
        print_user_interaction!("Month {}: Alice pays", month);
        service.charge(channel_id).unwrap();
        deliver_all(&wire, &alice, &bob);
        if let Err(e) = service.charge(channel_id) {
            println!("  second charge refused: {}", e);
        }
        clock.advance(Plan::Monthly.period_secs());
    }

    for info in service.active_subscriptions() {
        print_bold!(
            "Subscription {}: {} payments made, {} units left, next due at {}",
            info.channel_id,
            info.payments_made,
            info.remaining,
            info.next_payment_at
        );
    }

    print_user_interaction!("Alice cancels, the unused month goes back to her");
    service.cancel(channel_id).unwrap();
    for event in deliver_all(&wire, &alice, &bob) {
        if let ClientEvent::Closed(settlement) = event {
            print_bold!("Channel closed at turn {}", settlement.turn_num);
            for a in &settlement.allocations {
                println!("  {}: {}", a.destination, a.amount);
            }
        }
    }
    alice.conclude(&chain, channel_id).await.unwrap();
}
