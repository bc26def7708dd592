mod market;
mod request;
mod route;

pub use market::MarketHandle;
pub use request::{MinExchangeRate, SwapParams, referral_account};
pub use route::{AssetPair, Route, RouteKind};

use solana_sdk::pubkey::Pubkey;

/// Token mint identifier.
pub type AssetId = Pubkey;

/// Address of an order book market account.
pub type MarketAddress = Pubkey;

/// Monotonic identifier of a route resolution request.
pub type RequestId = u64;

/// Side of the order book.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BookSide {
    Bids,
    Asks,
}

impl std::fmt::Display for BookSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BookSide::Bids => write!(f, "bids"),
            BookSide::Asks => write!(f, "asks"),
        }
    }
}
