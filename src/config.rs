//! Swap session configuration.
//!
//! [`SwapConfig`] holds validated settings with defaults matching mainnet
//! behaviour. It can be built from `SWAP_`-prefixed environment variables via
//! [`EnvConfig`] (`SWAP_POLL_INTERVAL_MS`, `SWAP_SLIPPAGE`, `SWAP_TAKER_FEE`,
//! `SWAP_ALLOW_MARKET_CREATION`, `SWAP_STRICT`, `SWAP_CLOSE_NEW_ACCOUNTS`,
//! `SWAP_REFRESH`, `SWAP_EVICTION`, `SWAP_REFERRAL`).

use std::{str::FromStr, time::Duration};

use fastnum::{UD64, decimal::Context, udec64};
use solana_sdk::pubkey::Pubkey;

use crate::state::EvictionPolicy;

pub const ENV_PREFIX: &str = "SWAP_";

/// Default interval between order book refreshes.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Default slippage tolerance, in percent.
pub const DEFAULT_SLIPPAGE_PERCENT: UD64 = udec64!(0.5);

/// Taker fee of the base fee tier.
pub const BASE_TAKER_FEE: UD64 = udec64!(0.0022);

/// How order book snapshots of the active route are kept fresh.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshStrategy {
    /// Subscribe to book-side account changes when a subscriber is
    /// available, poll otherwise.
    #[default]
    Auto,
    /// Always poll.
    Poll,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SwapConfig {
    pub poll_interval: Duration,
    /// Slippage tolerance, in percent.
    pub slippage: UD64,
    pub taker_fee: UD64,
    /// Request creation of missing sollet/wormhole bridge markets.
    pub allow_market_creation: bool,
    /// Fail the swap if the order is not filled completely.
    pub strict: bool,
    /// Close open orders accounts created by the swap.
    pub close_new_accounts: bool,
    pub refresh: RefreshStrategy,
    pub eviction: EvictionPolicy,
    /// Wallet receiving referral fees, through its USDC or USDT account.
    pub referral: Option<Pubkey>,
}

impl Default for SwapConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            slippage: DEFAULT_SLIPPAGE_PERCENT,
            taker_fee: BASE_TAKER_FEE,
            allow_market_creation: false,
            strict: false,
            close_new_accounts: false,
            refresh: RefreshStrategy::default(),
            eviction: EvictionPolicy::default(),
            referral: None,
        }
    }
}

impl SwapConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval.is_zero() {
            return Err(ConfigError::ZeroPollInterval);
        }
        if self.slippage > udec64!(100) {
            return Err(ConfigError::InvalidSlippage(self.slippage.to_string()));
        }
        if self.taker_fee >= UD64::ONE {
            return Err(ConfigError::InvalidTakerFee(self.taker_fee.to_string()));
        }
        Ok(())
    }
}

/// Environment configuration, every variable is optional.
#[derive(Debug, Default, serde::Deserialize)]
pub struct EnvConfig {
    /// Order book polling interval in milliseconds
    pub poll_interval_ms: Option<u64>,

    /// Slippage tolerance in percent (e.g., 0.5)
    pub slippage: Option<String>,

    /// Taker fee rate (e.g., 0.0022)
    pub taker_fee: Option<String>,

    pub allow_market_creation: Option<bool>,

    pub strict: Option<bool>,

    pub close_new_accounts: Option<bool>,

    /// `auto` or `poll`
    pub refresh: Option<RefreshStrategy>,

    /// `never` or `active_route`
    pub eviction: Option<EvictionPolicy>,

    /// Referral wallet address
    pub referral: Option<String>,
}

impl EnvConfig {
    /// Load configuration from `SWAP_`-prefixed environment variables.
    pub fn from_env() -> Result<Self, envy::Error> {
        envy::prefixed(ENV_PREFIX).from_env()
    }

    /// Applies the variables on top of the defaults and validates the result.
    pub fn to_swap_config(&self) -> Result<SwapConfig, ConfigError> {
        let defaults = SwapConfig::default();
        let decimal = |value: &Option<String>, default: UD64, name: &str| match value {
            Some(v) => UD64::from_str(v, Context::default())
                .map_err(|_| ConfigError::InvalidDecimal(name.to_string(), v.clone())),
            None => Ok(default),
        };
        let config = SwapConfig {
            poll_interval: self
                .poll_interval_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.poll_interval),
            slippage: decimal(&self.slippage, defaults.slippage, "slippage")?,
            taker_fee: decimal(&self.taker_fee, defaults.taker_fee, "taker_fee")?,
            allow_market_creation: self
                .allow_market_creation
                .unwrap_or(defaults.allow_market_creation),
            strict: self.strict.unwrap_or(defaults.strict),
            close_new_accounts: self.close_new_accounts.unwrap_or(defaults.close_new_accounts),
            refresh: self.refresh.unwrap_or(defaults.refresh),
            eviction: self.eviction.unwrap_or(defaults.eviction),
            referral: self
                .referral
                .as_deref()
                .map(|r| {
                    Pubkey::from_str(r).map_err(|_| ConfigError::InvalidReferral(r.to_string()))
                })
                .transpose()?,
        };
        config.validate()?;
        Ok(config)
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid decimal value for {0}: {1}")]
    InvalidDecimal(String, String),

    #[error("poll interval cannot be zero")]
    ZeroPollInterval,

    #[error("slippage must be between 0 and 100 percent, got {0}")]
    InvalidSlippage(String),

    #[error("taker fee must be below 1, got {0}")]
    InvalidTakerFee(String),

    #[error("Invalid referral address: {0}")]
    InvalidReferral(String),

    #[error("Environment configuration error: {0}")]
    Env(#[from] envy::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(vars: &[(&str, &str)]) -> Result<EnvConfig, envy::Error> {
        envy::prefixed(ENV_PREFIX).from_iter(
            vars.iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<Vec<_>>(),
        )
    }

    #[test]
    fn test_defaults() {
        let config = env(&[]).unwrap().to_swap_config().unwrap();
        assert_eq!(config, SwapConfig::default());
        assert_eq!(config.poll_interval, Duration::from_secs(10));
        assert_eq!(config.slippage, udec64!(0.5));
        assert_eq!(config.taker_fee, udec64!(0.0022));
    }

    #[test]
    fn test_overrides() {
        let config = env(&[
            ("SWAP_POLL_INTERVAL_MS", "2500"),
            ("SWAP_SLIPPAGE", "1.5"),
            ("SWAP_ALLOW_MARKET_CREATION", "true"),
            ("SWAP_REFRESH", "poll"),
            ("SWAP_EVICTION", "active_route"),
            ("SWAP_REFERRAL", "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v"),
            ("OTHER_SLIPPAGE", "7"),
        ])
        .unwrap()
        .to_swap_config()
        .unwrap();

        assert_eq!(config.poll_interval, Duration::from_millis(2500));
        assert_eq!(config.slippage, udec64!(1.5));
        assert!(config.allow_market_creation);
        assert_eq!(config.refresh, RefreshStrategy::Poll);
        assert_eq!(config.eviction, EvictionPolicy::ActiveRoute);
        assert_eq!(
            config.referral,
            Some(Pubkey::from_str_const("EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v"))
        );
        assert!(!config.strict);
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            env(&[("SWAP_SLIPPAGE", "abc")]).unwrap().to_swap_config(),
            Err(ConfigError::InvalidDecimal(..))
        ));
        assert!(matches!(
            env(&[("SWAP_SLIPPAGE", "100.1")]).unwrap().to_swap_config(),
            Err(ConfigError::InvalidSlippage(_))
        ));
        assert!(matches!(
            env(&[("SWAP_TAKER_FEE", "1")]).unwrap().to_swap_config(),
            Err(ConfigError::InvalidTakerFee(_))
        ));
        assert!(matches!(
            env(&[("SWAP_POLL_INTERVAL_MS", "0")]).unwrap().to_swap_config(),
            Err(ConfigError::ZeroPollInterval)
        ));
        assert!(matches!(
            env(&[("SWAP_REFERRAL", "nobody")]).unwrap().to_swap_config(),
            Err(ConfigError::InvalidReferral(_))
        ));
        assert!(env(&[("SWAP_REFRESH", "sometimes")]).is_err());
    }
}
