//! Recurring payments over a channel.
//!
//! The subscriber opens a channel to the recipient, locking a number of
//! prepaid periods. The [SubscriptionTerms] travel in the `app_data` of every
//! state, each payment is a transfer of one period amount to the recipient.

mod plan;
mod terms;

use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::info;

pub use plan::{Currency, Plan};
pub use terms::SubscriptionTerms;

use crate::{
    channel::{ChannelId, ChannelState, ChannelStatus},
    client::ChannelClient,
    error::{Error, Result},
    oracle::{PriceData, PriceOracle},
    types::{Address, Hash, U256},
    wire::MessageBus,
};

#[derive(Debug, Clone, PartialEq)]
pub struct SubscriptionRequest {
    pub recipient: Address,
    /// Amount per period in `currency`.
    pub amount: Decimal,
    pub currency: Currency,
    pub plan: Plan,
    /// Periods locked into the channel up front.
    pub prepaid_periods: u32,
}

/// A running subscription as seen by the subscriber.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionInfo {
    pub channel_id: ChannelId,
    pub terms: SubscriptionTerms,
    pub plan: Option<Plan>,
    pub payments_made: u64,
    pub next_payment_at: u64,
    /// Prepaid funds not yet paid out.
    pub remaining: U256,
}

fn balance_of(state: &ChannelState, destination: Address, token: Address) -> U256 {
    state
        .allocations()
        .iter()
        .filter(|a| a.destination == destination && a.token == token)
        .fold(U256::zero(), |acc, a| acc.saturating_add(a.amount))
}

/// Terms and payment count of a subscription state.
fn progress(state: &ChannelState, token: Address) -> Result<(SubscriptionTerms, u64)> {
    let terms = SubscriptionTerms::decode(state.app_data())?;
    let paid = balance_of(state, terms.recipient, token) / terms.amount;
    Ok((terms, paid.low_u64()))
}

/// Subscription layer on top of an injected [ChannelClient].
pub struct SubscriptionService<B: MessageBus> {
    client: Arc<ChannelClient<B>>,
    oracle: Arc<dyn PriceOracle>,
}

impl<B: MessageBus> SubscriptionService<B> {
    pub fn new(client: Arc<ChannelClient<B>>, oracle: Arc<dyn PriceOracle>) -> Self {
        SubscriptionService { client, oracle }
    }

    pub fn client(&self) -> &Arc<ChannelClient<B>> {
        &self.client
    }

    /// Amount per period in units of the configured token.
    pub async fn token_amount(&self, amount: Decimal, currency: Currency) -> Result<U256> {
        let config = self.client.config();
        let price = match currency {
            Currency::Usd => {
                let price = self.oracle.read_feed(config.price_feed).await?;
                price.check_fresh(self.client.now(), config.price_max_age_secs)?;
                price
            }
            // One token per unit, only scaled by the token decimals.
            Currency::Native => PriceData::new(1, 0, self.client.now()),
        };
        price.fiat_to_token_units(amount, config.token.decimals)
    }

    /// Propose a channel to the recipient locking `prepaid_periods` payments.
    pub async fn create_subscription(&self, request: SubscriptionRequest) -> Result<ChannelId> {
        let amount = self.token_amount(request.amount, request.currency).await?;
        if amount.is_zero() {
            return Err(Error::InvalidAmount("amount per period is zero".to_string()));
        }
        let locked = amount
            .checked_mul(U256::from(request.prepaid_periods))
            .filter(|l| !l.is_zero())
            .ok_or_else(|| {
                Error::InvalidAmount(format!(
                    "cannot prepay {} periods of {}",
                    request.prepaid_periods, amount
                ))
            })?;

        let terms = SubscriptionTerms {
            recipient: request.recipient,
            amount,
            start: self.client.now(),
            period: request.plan.period_secs(),
        };
        let channel_id =
            self.client
                .propose_channel(request.recipient, [locked, U256::zero()], terms.encode()?)?;
        info!(
            channel = %channel_id,
            recipient = %request.recipient,
            %amount,
            plan = %request.plan,
            "Subscription proposed"
        );
        Ok(channel_id)
    }

    /// Propose the payment that is due.
    pub fn charge(&self, channel_id: ChannelId) -> Result<Hash> {
        let latest = self.client.latest_state(channel_id)?;
        let (terms, paid) = progress(&latest, self.client.config().token.address)?;

        let now = self.client.now();
        let due_at = terms.due_at(paid);
        if now < due_at {
            return Err(Error::PaymentNotDue { due_at, now });
        }
        info!(channel = %channel_id, payment = paid + 1, "Charging subscription");
        self.client
            .propose_transfer(channel_id, terms.recipient, terms.amount)
    }

    /// Propose closing the channel on the current allocations, returning
    /// the unpaid funds to the subscriber.
    pub fn cancel(&self, channel_id: ChannelId) -> Result<Hash> {
        info!(channel = %channel_id, "Cancelling subscription");
        self.client.close(channel_id)
    }

    /// ACTIVE subscriptions paid by the local participant.
    pub fn active_subscriptions(&self) -> Vec<SubscriptionInfo> {
        let own = self.client.address();
        let token = self.client.config().token.address;

        let mut subscriptions: Vec<SubscriptionInfo> = self
            .client
            .channel_ids()
            .into_iter()
            .filter_map(|id| {
                self.client
                    .inspect(id, |m| {
                        if m.status() != ChannelStatus::Active || m.channel().participants()[0] != own
                        {
                            return None;
                        }
                        let latest = m.latest_state().ok()?;
                        let (terms, paid) = progress(latest, token).ok()?;
                        Some(SubscriptionInfo {
                            channel_id: id,
                            terms,
                            plan: Plan::from_period(terms.period),
                            payments_made: paid,
                            next_payment_at: terms.due_at(paid),
                            remaining: balance_of(latest, own, token),
                        })
                    })
                    .ok()
                    .flatten()
            })
            .collect();
        subscriptions.sort_by_key(|s| s.next_payment_at);
        subscriptions
    }
}
