//! Configuration for the channel client

use std::{collections::BTreeSet, str::FromStr};

use serde::Deserialize;

use crate::{
    channel::DestinationPolicy,
    error::{Error, Result},
    oracle::FeedId,
    types::Address,
};

/// Client configuration
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Chain id of the network the adjudicator lives on
    pub chain_id: u64,

    /// Adjudicator contract deciding disputes
    pub adjudicator: Address,

    /// Challenge period of newly proposed channels (seconds)
    pub default_challenge_period_secs: u64,

    /// Shortest challenge period accepted from a proposing peer (seconds)
    pub min_challenge_period_secs: u64,

    /// How long to wait for all deposits (seconds)
    pub funding_timeout_secs: u64,

    /// Partially signed proposals older than this are abandoned (seconds)
    pub pending_timeout_secs: u64,

    /// Oldest acceptable oracle price (seconds)
    pub price_max_age_secs: u64,

    /// Feed used to convert fiat amounts
    pub price_feed: FeedId,

    /// Allow payouts to destinations other than the participants
    pub allow_third_party_destinations: bool,

    /// Additional destinations when third parties are not allowed
    pub destination_whitelist: Vec<Address>,

    /// Token the channels are funded with
    pub token: TokenConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            chain_id: 114, // Coston2
            adjudicator: Address([
                0xc2, 0xba, 0x5c, 0x5e, 0x2c, 0x48, 0x48, 0xf6, 0x41, 0x87, 0xaa, 0x1f, 0x3f, 0x32,
                0xa3, 0x31, 0xb0, 0xc0, 0x31, 0xb9,
            ]),
            default_challenge_period_secs: 86_400, // 1 day
            min_challenge_period_secs: 3_600, // 1 hour
            funding_timeout_secs: 600,
            pending_timeout_secs: 300,
            price_max_age_secs: 300,
            price_feed: FeedId::FLR_USD,
            allow_third_party_destinations: true,
            destination_whitelist: Vec::new(),
            token: TokenConfig::default(),
        }
    }
}

/// Token configuration
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TokenConfig {
    /// Token contract, the zero address for the native asset
    pub address: Address,

    /// Decimals of the token
    pub decimals: u8,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            address: Address([
                0x1d, 0x80, 0xc4, 0x9b, 0xbb, 0xcd, 0x1c, 0x09, 0x11, 0x34, 0x66, 0x56, 0xb5, 0x29,
                0xdf, 0x9e, 0x5c, 0x2f, 0x78, 0x3d,
            ]),
            decimals: 18,
        }
    }
}

fn parse_var<T>(name: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: core::fmt::Display,
{
    value
        .parse()
        .map_err(|e| Error::Config(format!("Invalid {}: {}", name, e)))
}

impl Config {
    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))?;
        Ok(config)
    }

    /// Load from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Defaults overridden by the `SUBCHAN_*` variables `lookup` knows.
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Config::default();

        if let Some(v) = lookup("SUBCHAN_CHAIN_ID") {
            config.chain_id = parse_var("SUBCHAN_CHAIN_ID", &v)?;
        }

        if let Some(v) = lookup("SUBCHAN_ADJUDICATOR") {
            config.adjudicator = parse_var("SUBCHAN_ADJUDICATOR", &v)?;
        }

        if let Some(v) = lookup("SUBCHAN_CHALLENGE_PERIOD_SECS") {
            config.default_challenge_period_secs = parse_var("SUBCHAN_CHALLENGE_PERIOD_SECS", &v)?;
        }

        if let Some(v) = lookup("SUBCHAN_MIN_CHALLENGE_PERIOD_SECS") {
            config.min_challenge_period_secs = parse_var("SUBCHAN_MIN_CHALLENGE_PERIOD_SECS", &v)?;
        }

        if let Some(v) = lookup("SUBCHAN_FUNDING_TIMEOUT_SECS") {
            config.funding_timeout_secs = parse_var("SUBCHAN_FUNDING_TIMEOUT_SECS", &v)?;
        }

        if let Some(v) = lookup("SUBCHAN_PENDING_TIMEOUT_SECS") {
            config.pending_timeout_secs = parse_var("SUBCHAN_PENDING_TIMEOUT_SECS", &v)?;
        }

        if let Some(v) = lookup("SUBCHAN_PRICE_MAX_AGE_SECS") {
            config.price_max_age_secs = parse_var("SUBCHAN_PRICE_MAX_AGE_SECS", &v)?;
        }

        if let Some(v) = lookup("SUBCHAN_PRICE_FEED") {
            config.price_feed = parse_var("SUBCHAN_PRICE_FEED", &v)?;
        }

        if let Some(v) = lookup("SUBCHAN_TOKEN_ADDRESS") {
            config.token.address = parse_var("SUBCHAN_TOKEN_ADDRESS", &v)?;
        }

        if let Some(v) = lookup("SUBCHAN_TOKEN_DECIMALS") {
            config.token.decimals = parse_var("SUBCHAN_TOKEN_DECIMALS", &v)?;
        }

        Ok(config)
    }

    pub fn destination_policy(&self) -> DestinationPolicy {
        if self.allow_third_party_destinations {
            DestinationPolicy::AllowThirdParties
        } else {
            let allowed: BTreeSet<Address> = self.destination_whitelist.iter().copied().collect();
            DestinationPolicy::Whitelist(allowed)
        }
    }
}
