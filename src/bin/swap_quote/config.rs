//! Configuration for the swap quote tool.
//!
//! Configuration comes from two sources:
//! - Environment variables (via .env file or shell): session settings, see
//!   [`swap_sdk::config`]
//! - CLI arguments: market data files and the trade to quote

use std::{path::PathBuf, str::FromStr};

use clap::Parser;
use fastnum::UD64;
use swap_sdk::{num::parse_decimal, types::AssetId};

pub use swap_sdk::config::EnvConfig;

/// CLI arguments of the trade to quote.
#[derive(Debug, Parser)]
#[command(name = "swap-quote")]
#[command(about = "Quotes a token swap against order book market data")]
pub struct CliConfig {
    /// JSON file with markets, their order books and the route table
    #[arg(long)]
    pub markets: PathBuf,

    /// SPL token list JSON file
    /// If not specified, decimals are taken from the markets
    #[arg(long)]
    pub tokens: Option<PathBuf>,

    /// Mint of the token to sell
    #[arg(long)]
    pub from: String,

    /// Mint of the token to buy
    #[arg(long)]
    pub to: String,

    /// Amount of the token to sell (e.g., 10.5)
    #[arg(long, default_value = "1")]
    pub amount: String,

    /// Slippage tolerance in percent, overrides SWAP_SLIPPAGE
    #[arg(long)]
    pub slippage: Option<String>,

    /// Price of one `to` token in `from` tokens, replaces the market price
    #[arg(long)]
    pub fair: Option<String>,
}

/// Parsed trade to quote.
#[derive(Clone, Debug, PartialEq)]
pub struct QuoteRequest {
    pub from: AssetId,
    pub to: AssetId,
    pub amount: UD64,
    pub slippage: Option<UD64>,
    pub fair: Option<UD64>,
}

impl CliConfig {
    pub fn to_quote_request(&self) -> Result<QuoteRequest, ConfigError> {
        let mint = |name: &'static str, value: &str| {
            AssetId::from_str(value).map_err(|_| ConfigError::InvalidMint(name, value.to_string()))
        };
        let decimal = |name: &'static str, value: &str| {
            parse_decimal(value).map_err(|_| ConfigError::InvalidDecimal(name, value.to_string()))
        };

        let from = mint("from", &self.from)?;
        let to = mint("to", &self.to)?;
        if from == to {
            return Err(ConfigError::SamePair);
        }

        let amount = decimal("amount", &self.amount)?;
        if amount == UD64::ZERO {
            return Err(ConfigError::ZeroAmount);
        }

        Ok(QuoteRequest {
            from,
            to,
            amount,
            slippage: self
                .slippage
                .as_deref()
                .map(|s| decimal("slippage", s))
                .transpose()?,
            fair: self
                .fair
                .as_deref()
                .map(|f| decimal("fair", f))
                .transpose()?,
        })
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid mint for {0}: {1}")]
    InvalidMint(&'static str, String),

    #[error("Invalid decimal value for {0}: {1}")]
    InvalidDecimal(&'static str, String),

    #[error("amount cannot be zero")]
    ZeroAmount,

    #[error("from and to must be different tokens")]
    SamePair,
}
