use std::collections::HashMap;

use solana_sdk::pubkey::Pubkey;

use crate::{
    Cluster,
    error::SwapError,
    types::{AssetId, MarketAddress},
};

/// Highest version of a deterministic bridge market.
pub const MAX_MARKET_VERSION: u8 = 99;

const SEED_MINT_PREFIX_LEN: usize = 15;

/// Static one-to-one markets between wormhole-wrapped tokens and their native
/// counterparts. Lookups do not depend on the pair order.
#[derive(Clone, Debug, Default)]
pub struct WormholeNativeTable {
    markets: HashMap<String, MarketAddress>,
}

impl WormholeNativeTable {
    pub fn new(entries: impl IntoIterator<Item = (AssetId, AssetId, MarketAddress)>) -> Self {
        Self {
            markets: entries
                .into_iter()
                .map(|(a, b, market)| (Self::key(&a, &b), market))
                .collect(),
        }
    }

    pub fn from_cluster(cluster: &Cluster) -> Self {
        Self::new(cluster.wormhole_native_markets().iter().copied())
    }

    /// Concatenation of both identifiers in string order.
    fn key(a: &AssetId, b: &AssetId) -> String {
        let (a, b) = (a.to_string(), b.to_string());
        if a < b { a + &b } else { b + &a }
    }

    pub fn get(&self, from: &AssetId, to: &AssetId) -> Option<MarketAddress> {
        self.markets.get(&Self::key(from, to)).copied()
    }

    pub fn len(&self) -> usize {
        self.markets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markets.is_empty()
    }
}

/// Seed of a bridge market address: 15 leading characters of both mints and
/// the zero-padded version.
pub fn bridge_market_seed(base: &AssetId, quote: &AssetId, version: u8) -> Option<String> {
    if version > MAX_MARKET_VERSION {
        return None;
    }
    let prefix = |mint: &AssetId| {
        mint.to_string()
            .chars()
            .take(SEED_MINT_PREFIX_LEN)
            .collect::<String>()
    };
    Some(format!("{}{}{version:02}", prefix(base), prefix(quote)))
}

/// Derives the deterministic address of the sollet/wormhole bridge market.
pub fn derive_bridge_market(
    cluster: &Cluster,
    base: &AssetId,
    quote: &AssetId,
    version: u8,
) -> Result<MarketAddress, SwapError> {
    let seed = bridge_market_seed(base, quote, version).ok_or_else(|| {
        SwapError::InvalidRequest(format!(
            "market version {version} exceeds {MAX_MARKET_VERSION}"
        ))
    })?;
    create_with_seed(&cluster.bridge_market_base(), &seed, &cluster.dex_program())
}

/// Account address derived from `base`, `seed` and the owning program.
pub fn create_with_seed(
    base: &AssetId,
    seed: &str,
    owner: &AssetId,
) -> Result<MarketAddress, SwapError> {
    Pubkey::create_with_seed(base, seed, owner).map_err(|e| {
        SwapError::InvalidRequest(format!("cannot derive address from seed {seed}: {e}"))
    })
}
