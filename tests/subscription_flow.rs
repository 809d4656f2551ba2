mod common;

use std::sync::Arc;

use common::{config, manual_clock, MockChain, Network, Parties, TestClient};
use rust_decimal::Decimal;
use subchan::{
    channel::{ChannelStatus, FundingRequest},
    oracle::{FixedOracle, PriceData},
    subscription::{Currency, Plan, SubscriptionRequest, SubscriptionService},
    ClientEvent, Error, Hash, U256,
};

const START: u64 = 1_700_000_000;

fn tokens(n: u64) -> U256 {
    U256::from(n) * U256::exp10(18)
}

/// 0.02 USD per token.
fn price(timestamp: u64) -> PriceData {
    PriceData::new(2_000, 5, timestamp)
}

fn monthly(recipient: subchan::Address, usd: i64) -> SubscriptionRequest {
    SubscriptionRequest {
        recipient,
        amount: Decimal::new(usd, 0),
        currency: Currency::Usd,
        plan: Plan::Monthly,
        prepaid_periods: 3,
    }
}

/// Bob countersigns whatever alice proposed.
fn settle(net: &Network, alice: &TestClient, bob: &TestClient) -> Vec<ClientEvent> {
    let mut proposals: Vec<(Hash, Hash)> = Vec::new();
    for (_, event) in net.pump(&[alice, bob]) {
        if let ClientEvent::UpdateProposed {
            channel_id, hash, ..
        } = event.unwrap()
        {
            proposals.push((channel_id, hash));
        }
    }
    for (id, hash) in proposals {
        bob.accept_update(id, hash).unwrap();
    }
    net.pump(&[alice, bob])
        .into_iter()
        .map(|(_, event)| event.unwrap())
        .collect()
}

#[tokio::test]
async fn monthly_subscription() {
    let p = Parties::new(51);
    let net = Network::default();
    let clock = manual_clock(START);
    let alice = Arc::new(net.client(p.alice, config(), clock.clone()));
    let bob = net.client(p.bob, config(), clock.clone());
    let oracle = Arc::new(FixedOracle::new(price(START)));
    let service = SubscriptionService::new(Arc::clone(&alice), oracle.clone());

    assert_eq!(
        service.token_amount(Decimal::new(10, 0), Currency::Usd).await.unwrap(),
        tokens(500)
    );
    assert_eq!(
        service.token_amount(Decimal::new(3, 0), Currency::Native).await.unwrap(),
        tokens(3)
    );

    let id = service
        .create_subscription(monthly(bob.address(), 10))
        .await
        .unwrap();

    let requests: Vec<FundingRequest> = net
        .pump(&[&*alice, &bob])
        .into_iter()
        .filter_map(|(_, event)| match event.unwrap() {
            ClientEvent::ChannelProposed(req) | ClientEvent::ChannelAccepted(req) => Some(req),
            _ => None,
        })
        .collect();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].locked.values().next(), Some(&tokens(1_500)));

    let chain = MockChain::funding();
    bob.await_funding(&chain, &requests[0]).await.unwrap();
    alice.await_funding(&chain, &requests[1]).await.unwrap();
    assert_eq!(alice.status(id).unwrap(), ChannelStatus::Active);

    // The first period is due right away.
    service.charge(id).unwrap();
    settle(&net, &alice, &bob);
    assert!(matches!(
        service.charge(id),
        Err(Error::PaymentNotDue { due_at, now: START }) if due_at == START + Plan::Monthly.period_secs()
    ));

    clock.advance(Plan::Monthly.period_secs());
    service.charge(id).unwrap();
    settle(&net, &alice, &bob);

    let subscriptions = service.active_subscriptions();
    assert_eq!(subscriptions.len(), 1);
    let info = &subscriptions[0];
    assert_eq!(info.channel_id, id);
    assert_eq!(info.plan, Some(Plan::Monthly));
    assert_eq!(info.payments_made, 2);
    assert_eq!(info.next_payment_at, START + 2 * Plan::Monthly.period_secs());
    assert_eq!(info.remaining, tokens(500));
    assert_eq!(info.terms.recipient, bob.address());

    // Bob is only the recipient.
    let bob = Arc::new(bob);
    let bob_service = SubscriptionService::new(Arc::clone(&bob), oracle);
    assert!(bob_service.active_subscriptions().is_empty());

    service.cancel(id).unwrap();
    let events = settle(&net, &alice, &bob);
    match &events[0] {
        ClientEvent::Closed(settlement) => {
            assert_eq!(settlement.allocations[0].amount, tokens(500));
            assert_eq!(settlement.allocations[1].amount, tokens(1_000));
        }
        other => panic!("expected close, got {:?}", other),
    }
    assert!(service.active_subscriptions().is_empty());
}

#[tokio::test]
async fn stale_prices_are_refused() {
    let p = Parties::new(52);
    let net = Network::default();
    let clock = manual_clock(START);
    let alice = Arc::new(net.client(p.alice, config(), clock.clone()));
    let max_age = alice.config().price_max_age_secs;
    let oracle = Arc::new(FixedOracle::new(price(START - max_age - 1)));
    let service = SubscriptionService::new(alice, oracle.clone());

    assert!(matches!(
        service.create_subscription(monthly(p.bob.address(), 10)).await,
        Err(Error::StalePrice { .. })
    ));
    assert!(net.is_empty());

    oracle.set(price(START));
    service
        .create_subscription(monthly(p.bob.address(), 10))
        .await
        .unwrap();
    assert!(!net.is_empty());
}

#[tokio::test]
async fn nothing_to_prepay() {
    let p = Parties::new(53);
    let net = Network::default();
    let alice = Arc::new(net.client(p.alice, config(), manual_clock(START)));
    let service = SubscriptionService::new(alice, Arc::new(FixedOracle::new(price(START))));

    let mut request = monthly(p.bob.address(), 10);
    request.prepaid_periods = 0;
    assert!(matches!(
        service.create_subscription(request).await,
        Err(Error::InvalidAmount(_))
    ));
    assert!(matches!(
        service.create_subscription(monthly(p.bob.address(), -1)).await,
        Err(Error::InvalidAmount(_))
    ));
}
