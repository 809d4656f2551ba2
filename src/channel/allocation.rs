use std::collections::{BTreeMap, BTreeSet};

use super::{state::Allocation, PARTICIPANTS};
use crate::{
    error::{Error, Result},
    types::{Address, U256},
};

/// Total amount per token.
pub type TokenTotals = BTreeMap<Address, U256>;

/// Who may receive funds besides the participants.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DestinationPolicy {
    /// Any destination. Subscription payouts to a recipient that is not a
    /// participant are the common case.
    #[default]
    AllowThirdParties,
    /// Participants plus the listed addresses.
    Whitelist(BTreeSet<Address>),
}

/// Computes and validates allocation vectors.
#[derive(Debug, Clone, Default)]
pub struct AllocationEngine {
    policy: DestinationPolicy,
}

impl AllocationEngine {
    pub fn new(policy: DestinationPolicy) -> Self {
        AllocationEngine { policy }
    }

    pub fn policy(&self) -> &DestinationPolicy {
        &self.policy
    }

    /// Sum of the amounts per token.
    pub fn totals(allocations: &[Allocation]) -> Result<TokenTotals> {
        let mut totals = TokenTotals::new();
        for a in allocations {
            let total = totals.entry(a.token).or_insert_with(U256::zero);
            *total = total
                .checked_add(a.amount)
                .ok_or(Error::AmountOverflow { token: a.token })?;
        }
        Ok(totals)
    }

    /// Genesis allocation: `deposits[i]` of `token` for participant `i`.
    pub fn genesis(
        participants: &[Address; PARTICIPANTS],
        token: Address,
        deposits: [U256; PARTICIPANTS],
    ) -> Vec<Allocation> {
        participants
            .iter()
            .zip(deposits)
            .map(|(p, amount)| Allocation::new(*p, token, amount))
            .collect()
    }

    /// Checks that `new` neither creates nor destroys value relative to the
    /// amounts locked at funding, and that it only pays allowed destinations.
    ///
    /// A token absent from `locked` has a locked total of zero.
    pub fn validate(
        &self,
        prior: &[Allocation],
        new: &[Allocation],
        locked: &TokenTotals,
        participants: &[Address; PARTICIPANTS],
    ) -> Result<()> {
        let allocated = Self::totals(new)?;

        let tokens: BTreeSet<Address> = prior
            .iter()
            .chain(new)
            .map(|a| a.token)
            .chain(locked.keys().copied())
            .collect();
        for token in tokens {
            let locked = locked.get(&token).copied().unwrap_or_default();
            let allocated = allocated.get(&token).copied().unwrap_or_default();
            if locked != allocated {
                return Err(Error::ConservationViolation {
                    token,
                    locked,
                    allocated,
                });
            }
        }

        if let DestinationPolicy::Whitelist(allowed) = &self.policy {
            if let Some(a) = new
                .iter()
                .find(|a| !participants.contains(&a.destination) && !allowed.contains(&a.destination))
            {
                return Err(Error::UnlistedDestination(a.destination));
            }
        }
        Ok(())
    }

    /// Move `amount` of `token` from `from` to `to`.
    ///
    /// Fails with [Error::NegativeAllocation] if `from` holds less than
    /// `amount`. A missing entry for `to` is appended.
    pub fn transfer(
        &self,
        allocations: &[Allocation],
        from: Address,
        to: Address,
        token: Address,
        amount: U256,
    ) -> Result<Vec<Allocation>> {
        let mut next = allocations.to_vec();

        let balance = next
            .iter()
            .find(|a| a.destination == from && a.token == token)
            .map(|a| a.amount)
            .unwrap_or_default();
        if balance < amount {
            return Err(Error::NegativeAllocation {
                destination: from,
                token,
                balance,
                amount,
            });
        }
        if amount.is_zero() || from == to {
            return Ok(next);
        }

        for a in next.iter_mut() {
            if a.destination == from && a.token == token {
                a.amount = a.amount - amount;
            }
        }
        match next
            .iter_mut()
            .find(|a| a.destination == to && a.token == token)
        {
            Some(a) => {
                a.amount = a
                    .amount
                    .checked_add(amount)
                    .ok_or(Error::AmountOverflow { token })?
            }
            None => next.push(Allocation::new(to, token, amount)),
        }
        Ok(next)
    }
}
