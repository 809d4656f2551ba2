use core::{fmt, str::FromStr};

use serde::Deserialize;

const DAY: u64 = 24 * 60 * 60;

/// Billing period of a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    Monthly,
    Quarterly,
    Yearly,
}

impl Plan {
    pub fn period_secs(&self) -> u64 {
        match self {
            Plan::Monthly => 30 * DAY,
            Plan::Quarterly => 90 * DAY,
            Plan::Yearly => 365 * DAY,
        }
    }

    pub fn from_period(secs: u64) -> Option<Plan> {
        [Plan::Monthly, Plan::Quarterly, Plan::Yearly]
            .into_iter()
            .find(|p| p.period_secs() == secs)
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Plan::Monthly => write!(f, "monthly"),
            Plan::Quarterly => write!(f, "quarterly"),
            Plan::Yearly => write!(f, "yearly"),
        }
    }
}

impl FromStr for Plan {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "monthly" => Ok(Plan::Monthly),
            "quarterly" => Ok(Plan::Quarterly),
            "yearly" => Ok(Plan::Yearly),
            other => Err(format!("unknown plan `{}`", other)),
        }
    }
}

/// Unit the subscription amount is given in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Currency {
    /// US dollars, converted with the configured price feed.
    Usd,
    /// Whole units of the channel token.
    Native,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn periods() {
        assert_eq!(Plan::Monthly.period_secs(), 2_592_000);
        assert_eq!(Plan::Quarterly.period_secs(), 7_776_000);
        assert_eq!(Plan::Yearly.period_secs(), 31_536_000);
        assert_eq!(Plan::from_period(7_776_000), Some(Plan::Quarterly));
        assert_eq!(Plan::from_period(1), None);
    }

    #[test]
    fn names() {
        for plan in [Plan::Monthly, Plan::Quarterly, Plan::Yearly] {
            assert_eq!(plan.to_string().parse::<Plan>(), Ok(plan));
        }
        assert!("weekly".parse::<Plan>().is_err());
    }
}
