use std::{collections::HashMap, str::FromStr};

use alloy::primitives::Address;
use serde::Deserialize;
use tracing::warn;

use crate::{
    Cluster,
    error::SwapError,
    types::{AssetId, MarketHandle},
};

/// Tag of sollet-wrapped tokens in the token list.
pub const SOLLET_TAG: &str = "wrapped-sollet";

/// Tag of wormhole-wrapped tokens in the token list.
pub const WORMHOLE_TAG: &str = "wormhole";

/// Chain id of mainnet-beta in the token list.
pub const MAINNET_CHAIN_ID: u64 = 101;

const NATIVE_DECIMALS: u8 = 9;

fn default_chain_id() -> u64 {
    MAINNET_CHAIN_ID
}

/// Token list entry.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenInfo {
    #[serde(default = "default_chain_id")]
    pub chain_id: u64,
    pub address: String,
    pub symbol: String,
    #[serde(default)]
    pub name: String,
    pub decimals: u8,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub extensions: TokenExtensions,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenExtensions {
    /// Contract address on the external chain the token is bridged from.
    pub address: Option<String>,
    pub serum_v3_usdc: Option<String>,
    pub serum_v3_usdt: Option<String>,
}

#[derive(Deserialize)]
struct TokenList {
    tokens: Vec<TokenInfo>,
}

impl TokenInfo {
    fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// Has a market quoted in USDC or USDT.
    pub fn is_usdx_quoted(&self) -> bool {
        self.extensions.serum_v3_usdc.is_some() || self.extensions.serum_v3_usdt.is_some()
    }
}

/// Token metadata lookup and classification.
#[derive(Clone, Debug)]
pub struct TokenRegistry {
    tokens: Vec<(AssetId, TokenInfo)>,
    index: HashMap<AssetId, usize>,
}

impl TokenRegistry {
    /// Parses an SPL token list document (`{"tokens": [...]}`).
    pub fn from_json(cluster: &Cluster, json: &str) -> Result<Self, SwapError> {
        let list: TokenList = serde_json::from_str(json)?;
        Ok(Self::from_tokens(cluster, list.tokens))
    }

    /// Builds the registry from mainnet entries of the list.
    ///
    /// Wrapped native token is renamed to `wSOL` and a separate entry for the
    /// native token is added, so that both can be traded.
    pub fn from_tokens(cluster: &Cluster, tokens: Vec<TokenInfo>) -> Self {
        let mut registry = Self {
            tokens: Vec::with_capacity(tokens.len() + 1),
            index: HashMap::with_capacity(tokens.len() + 1),
        };
        for mut token in tokens
            .into_iter()
            .filter(|t| t.chain_id == MAINNET_CHAIN_ID)
        {
            let mint = match AssetId::from_str(&token.address) {
                Ok(mint) => mint,
                Err(err) => {
                    warn!(address = %token.address, ?err, "skipping token with invalid mint");
                    continue;
                }
            };
            if mint == cluster.wrapped_native_mint() {
                token.symbol = "wSOL".to_string();
            }
            registry.insert(mint, token);
        }
        registry.insert(
            cluster.native_mint(),
            TokenInfo {
                chain_id: MAINNET_CHAIN_ID,
                address: cluster.native_mint().to_string(),
                symbol: "SOL".to_string(),
                name: "Native SOL".to_string(),
                decimals: NATIVE_DECIMALS,
                tags: Vec::new(),
                extensions: TokenExtensions::default(),
            },
        );
        registry
    }

    fn insert(&mut self, mint: AssetId, token: TokenInfo) {
        match self.index.get(&mint) {
            Some(idx) => self.tokens[*idx] = (mint, token),
            None => {
                self.index.insert(mint, self.tokens.len());
                self.tokens.push((mint, token));
            }
        }
    }

    pub fn get(&self, mint: &AssetId) -> Option<&TokenInfo> {
        self.index.get(mint).map(|idx| &self.tokens[*idx].1)
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn decimals(&self, mint: &AssetId) -> Option<u8> {
        self.get(mint).map(|t| t.decimals)
    }

    pub fn symbol(&self, mint: &AssetId) -> Option<&str> {
        self.get(mint).map(|t| t.symbol.as_str())
    }

    pub fn is_sollet(&self, mint: &AssetId) -> bool {
        self.get(mint).is_some_and(|t| t.has_tag(SOLLET_TAG))
    }

    pub fn is_wormhole(&self, mint: &AssetId) -> bool {
        self.get(mint).is_some_and(|t| t.has_tag(WORMHOLE_TAG))
    }

    /// External chain contract of a wormhole-wrapped token.
    pub fn wormhole_contract(&self, mint: &AssetId) -> Option<Address> {
        self.get(mint)
            .filter(|t| t.has_tag(WORMHOLE_TAG))
            .and_then(|t| t.extensions.address.as_deref())
            .and_then(|a| Address::from_str(a).ok())
    }

    fn sorted_by_symbol(&self, filter: impl Fn(&TokenInfo) -> bool) -> Vec<(AssetId, &TokenInfo)> {
        let mut tokens = self
            .tokens
            .iter()
            .filter(|(_, t)| filter(t))
            .map(|(mint, t)| (*mint, t))
            .collect::<Vec<_>>();
        tokens.sort_by(|a, b| a.1.symbol.cmp(&b.1.symbol));
        tokens
    }

    /// Tokens with USD(x) quoted markets, sorted by symbol.
    pub fn swappable_tokens(&self) -> Vec<(AssetId, &TokenInfo)> {
        self.sorted_by_symbol(TokenInfo::is_usdx_quoted)
    }

    pub fn sollet_tokens(&self) -> Vec<(AssetId, &TokenInfo)> {
        self.sorted_by_symbol(|t| t.has_tag(SOLLET_TAG))
    }

    pub fn wormhole_tokens(&self) -> Vec<(AssetId, &TokenInfo)> {
        self.sorted_by_symbol(|t| t.has_tag(WORMHOLE_TAG))
    }

    /// Human readable `BASE / QUOTE` name, `-` for unknown tokens.
    pub fn market_name(&self, market: &MarketHandle) -> String {
        format!(
            "{} / {}",
            self.symbol(&market.base_mint()).unwrap_or("-"),
            self.symbol(&market.quote_mint()).unwrap_or("-"),
        )
    }
}

#[cfg(test)]
mod tests {
    use alloy::primitives::address;
    use fastnum::udec64;
    use solana_sdk::pubkey::Pubkey;

    use super::*;

    const TOKENS: &str = r#"{
        "tokens": [
            {
                "chainId": 101,
                "address": "So11111111111111111111111111111111111111112",
                "symbol": "SOL",
                "name": "Wrapped SOL",
                "decimals": 9,
                "extensions": { "serumV3Usdc": "9wFFyRfZBsuAha4YcuxcXLKwMxJR43S7fPfQLusDBzvT" }
            },
            {
                "chainId": 101,
                "address": "SRMuApVNdxXokk5GT7XD5cUUgXMBCoAz2LHeuAoKWRt",
                "symbol": "SRM",
                "decimals": 6,
                "extensions": { "serumV3Usdt": "AtNnsY1AyRERWJ8xCskfz38YdvruWVJQUVXgScC1iPb" }
            },
            {
                "chainId": 101,
                "address": "BQcdHdAQW1hczDbBi9hiegXAR7A98Q9jx3X3iBBBDiq4",
                "symbol": "USDT",
                "decimals": 6,
                "tags": ["wrapped-sollet", "ethereum"],
                "extensions": { "address": "0xdAC17F958D2ee523a2206206994597C13D831ec7" }
            },
            {
                "chainId": 101,
                "address": "9w97GdWUYYaamGwdKMKZgGzPduZJkiFizq4rz5CPXRv2",
                "symbol": "wUSDT",
                "decimals": 6,
                "tags": ["wormhole"],
                "extensions": { "address": "0xdac17f958d2ee523a2206206994597c13d831ec7" }
            },
            {
                "chainId": 103,
                "address": "SRMuApVNdxXokk5GT7XD5cUUgXMBCoAz2LHeuAoKWRt",
                "symbol": "devSRM",
                "decimals": 6
            },
            {
                "chainId": 101,
                "address": "not-a-mint",
                "symbol": "BAD",
                "decimals": 6
            }
        ]
    }"#;

    fn registry() -> (Cluster, TokenRegistry) {
        let cluster = Cluster::mainnet();
        let registry = TokenRegistry::from_json(&cluster, TOKENS).unwrap();
        (cluster, registry)
    }

    #[test]
    fn test_native_token_injected_and_wrapped_renamed() {
        let (cluster, registry) = registry();
        assert_eq!(registry.len(), 5);
        assert_eq!(registry.symbol(&cluster.native_mint()), Some("SOL"));
        assert_eq!(registry.decimals(&cluster.native_mint()), Some(9));
        assert_eq!(registry.symbol(&cluster.wrapped_native_mint()), Some("wSOL"));
    }

    #[test]
    fn test_other_clusters_ignored() {
        let (_, registry) = registry();
        let srm = Pubkey::from_str_const("SRMuApVNdxXokk5GT7XD5cUUgXMBCoAz2LHeuAoKWRt");
        assert_eq!(registry.symbol(&srm), Some("SRM"));
    }

    #[test]
    fn test_tags() {
        let (cluster, registry) = registry();
        assert!(registry.is_sollet(&cluster.sollet_usdt()));
        assert!(!registry.is_wormhole(&cluster.sollet_usdt()));

        let worm_usdt = cluster.wormhole_native_markets()[1].0;
        assert!(registry.is_wormhole(&worm_usdt));
        assert_eq!(
            registry.wormhole_contract(&worm_usdt),
            Some(address!("0xdAC17F958D2ee523a2206206994597C13D831ec7"))
        );
        // Sollet tokens carry an external address too, but are not wormhole tokens
        assert_eq!(registry.wormhole_contract(&cluster.sollet_usdt()), None);
    }

    #[test]
    fn test_token_lists_sorted_by_symbol() {
        let (_, registry) = registry();
        let symbols = |tokens: Vec<(AssetId, &TokenInfo)>| {
            tokens
                .into_iter()
                .map(|(_, t)| t.symbol.clone())
                .collect::<Vec<_>>()
        };
        assert_eq!(symbols(registry.swappable_tokens()), vec!["SRM", "wSOL"]);
        assert_eq!(symbols(registry.sollet_tokens()), vec!["USDT"]);
        assert_eq!(symbols(registry.wormhole_tokens()), vec!["wUSDT"]);
    }

    #[test]
    fn test_market_name() {
        let (cluster, registry) = registry();
        let market = MarketHandle::new(
            Pubkey::new_from_array([1; 32]),
            cluster.wrapped_native_mint(),
            cluster.sollet_usdt(),
            udec64!(0.1),
            Pubkey::new_from_array([2; 32]),
            Pubkey::new_from_array([3; 32]),
        );
        assert_eq!(registry.market_name(&market), "wSOL / USDT");

        let unknown = MarketHandle::new(
            Pubkey::new_from_array([1; 32]),
            Pubkey::new_from_array([9; 32]),
            cluster.sollet_usdt(),
            udec64!(0.1),
            Pubkey::new_from_array([2; 32]),
            Pubkey::new_from_array([3; 32]),
        );
        assert_eq!(registry.market_name(&unknown), "- / USDT");
    }

    #[test]
    fn test_malformed_json() {
        let cluster = Cluster::mainnet();
        assert!(matches!(
            TokenRegistry::from_json(&cluster, "{\"tokens\": 1}"),
            Err(SwapError::InvalidRequest(_))
        ));
    }
}
