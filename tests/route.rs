use std::sync::Arc;

use alloy::primitives::{Address, address};
use solana_sdk::pubkey::Pubkey;
use swap_sdk::{
    Cluster,
    client::SolletInfo,
    error::SwapError,
    route::{RouteResolver, TokenRegistry, derive_bridge_market},
    testing::MockDex,
    types::{Route, RouteKind},
};

const WORM_USDT: Pubkey = Pubkey::from_str_const("9w97GdWUYYaamGwdKMKZgGzPduZJkiFizq4rz5CPXRv2");
const WORM_USDC: Pubkey = Pubkey::from_str_const("FVsXUnbhifqJ4LiXQEbpUtXVdB8T5ADLKqSs5t1oc54F");

const USDT_CONTRACT: Address = address!("0xdAC17F958D2ee523a2206206994597C13D831ec7");

const TOKENS: &str = r#"{
    "tokens": [
        {
            "address": "BQcdHdAQW1hczDbBi9hiegXAR7A98Q9jx3X3iBBBDiq4",
            "symbol": "USDT",
            "decimals": 6,
            "tags": ["wrapped-sollet", "ethereum"],
            "extensions": { "address": "0xdAC17F958D2ee523a2206206994597C13D831ec7" }
        },
        {
            "address": "BXXkv6z8ykpG1yuvUDPgh732wzVHB69RnB9YgSYh3itW",
            "symbol": "USDC",
            "decimals": 6,
            "tags": ["wrapped-sollet", "ethereum"],
            "extensions": { "address": "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48" }
        },
        {
            "address": "9w97GdWUYYaamGwdKMKZgGzPduZJkiFizq4rz5CPXRv2",
            "symbol": "USDTet",
            "decimals": 6,
            "tags": ["wormhole"],
            "extensions": { "address": "0xdac17f958d2ee523a2206206994597c13d831ec7" }
        },
        {
            "address": "FVsXUnbhifqJ4LiXQEbpUtXVdB8T5ADLKqSs5t1oc54F",
            "symbol": "USDCet",
            "decimals": 6,
            "tags": ["wormhole"],
            "extensions": { "address": "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48" }
        }
    ]
}"#;

fn resolver(dex: &MockDex) -> RouteResolver<MockDex, MockDex> {
    let cluster = Cluster::mainnet();
    let tokens = TokenRegistry::from_json(&cluster, TOKENS).unwrap();
    RouteResolver::new(cluster, Arc::new(tokens), dex.clone(), dex.clone())
}

fn sollet_usdt(contract: Address) -> SolletInfo {
    SolletInfo {
        mint: Cluster::mainnet().sollet_usdt(),
        erc20_contract: contract,
        name: "Tether USD".to_string(),
        ticker: "USDT".to_string(),
    }
}

#[tokio::test]
async fn test_wormhole_native_is_symmetric() {
    let dex = MockDex::new();
    let resolver = resolver(&dex);
    let cluster = resolver.cluster().clone();

    for (wormhole, native, market) in cluster.wormhole_native_markets() {
        let expected = Route::single(*market, RouteKind::WormholeNative);
        assert_eq!(resolver.resolve(*wormhole, *native).await.unwrap(), expected);
        assert_eq!(resolver.resolve(*native, *wormhole).await.unwrap(), expected);
    }
    assert_eq!(dex.sollet_lookups(), 0);
}

#[tokio::test]
async fn test_sollet_bridge_route() {
    let dex = MockDex::new();
    let resolver = resolver(&dex);
    let sollet = resolver.cluster().sollet_usdt();
    let market = derive_bridge_market(resolver.cluster(), &sollet, &WORM_USDT, 0).unwrap();
    dex.add_sollet(sollet_usdt(USDT_CONTRACT));
    dex.add_bridge_market(market);

    let expected = Route::single(market, RouteKind::WormholeSollet);
    assert_eq!(resolver.resolve(sollet, WORM_USDT).await.unwrap(), expected);
    // Sollet side is always the base of the bridge market
    assert_eq!(resolver.resolve(WORM_USDT, sollet).await.unwrap(), expected);
    assert_eq!(dex.market_creations(), 0);
}

#[tokio::test]
async fn test_missing_bridge_market_created_only_when_allowed() {
    let dex = MockDex::new();
    let sollet = Cluster::mainnet().sollet_usdt();
    dex.add_sollet(sollet_usdt(USDT_CONTRACT));

    let resolver = resolver(&dex);
    assert!(matches!(
        resolver.resolve(sollet, WORM_USDT).await,
        Err(SwapError::NotFound { .. })
    ));
    assert_eq!(dex.market_creations(), 0);

    let resolver = resolver.with_market_creation(true);
    let route = resolver.resolve(sollet, WORM_USDT).await.unwrap();
    assert_eq!(route.kind(), RouteKind::WormholeSollet);
    assert_eq!(dex.market_creations(), 1);
    assert!(dex.has_bridge_market(&route.markets()[0]));

    // Existing market is not created again
    resolver.resolve(WORM_USDT, sollet).await.unwrap();
    assert_eq!(dex.market_creations(), 1);
}

#[tokio::test]
async fn test_bridge_contract_mismatch_falls_through() {
    let dex = MockDex::new();
    let resolver = resolver(&dex);
    let sollet = resolver.cluster().sollet_usdt();
    dex.add_sollet(sollet_usdt(address!(
        "0x0000000000000000000000000000000000000001"
    )));
    dex.add_bridge_market(derive_bridge_market(resolver.cluster(), &sollet, &WORM_USDT, 0).unwrap());
    let quote_market = MockDex::address(20);
    dex.add_route(sollet, WORM_USDT, vec![quote_market]);

    assert_eq!(
        resolver.resolve(sollet, WORM_USDT).await.unwrap(),
        Route::single(quote_market, RouteKind::DirectOrTransitiveQuote)
    );
    assert_eq!(dex.sollet_lookups(), 1);
}

#[tokio::test]
async fn test_bridge_lookup_failure_degrades() {
    let dex = MockDex::new();
    let resolver = resolver(&dex);
    let sollet = resolver.cluster().sollet_usdt();
    dex.fail_sollet_lookups(true);

    let err = resolver.resolve(sollet, WORM_USDT).await.unwrap_err();
    assert!(matches!(err, SwapError::NotFound { .. }));
    assert!(err.is_soft());

    let quote_market = MockDex::address(20);
    dex.add_route(sollet, WORM_USDT, vec![quote_market]);
    assert_eq!(
        resolver.resolve(sollet, WORM_USDT).await.unwrap().kind(),
        RouteKind::DirectOrTransitiveQuote
    );
}

#[tokio::test]
async fn test_bridge_needs_opposite_tags() {
    let dex = MockDex::new();
    let resolver = resolver(&dex);
    let cluster = resolver.cluster().clone();

    // Both sollet
    assert!(
        resolver
            .resolve(cluster.sollet_usdt(), cluster.sollet_usdc())
            .await
            .is_err()
    );
    // Both wormhole
    assert!(resolver.resolve(WORM_USDT, WORM_USDC).await.is_err());
    // Wormhole and untagged
    assert!(resolver.resolve(WORM_USDT, MockDex::address(1)).await.is_err());
    assert_eq!(dex.sollet_lookups(), 0);
}

#[tokio::test]
async fn test_quote_currency_routes() {
    let dex = MockDex::new();
    let resolver = resolver(&dex);
    let cluster = resolver.cluster().clone();
    let (srm, fida) = (MockDex::address(1), MockDex::address(2));
    let (sol_market, srm_market, fida_market) = (
        MockDex::address(10),
        MockDex::address(11),
        MockDex::address(12),
    );
    dex.add_route(cluster.wrapped_native_mint(), cluster.usdc(), vec![sol_market]);
    dex.add_route(srm, fida, vec![srm_market, fida_market]);

    let direct = resolver.resolve(cluster.native_mint(), cluster.usdc()).await.unwrap();
    assert_eq!(
        direct,
        Route::single(sol_market, RouteKind::DirectOrTransitiveQuote)
    );
    assert_eq!(
        resolver
            .resolve(cluster.usdc(), cluster.native_mint())
            .await
            .unwrap(),
        direct
    );

    let transitive = resolver.resolve(fida, srm).await.unwrap();
    assert!(transitive.is_transitive());
    assert_eq!(transitive.from_market(), Some(fida_market));
    assert_eq!(transitive.to_market(), Some(srm_market));
}

#[tokio::test]
async fn test_not_found() {
    let dex = MockDex::new();
    let resolver = resolver(&dex);
    let (a, b) = (MockDex::address(1), MockDex::address(2));

    match resolver.resolve(a, b).await {
        Err(SwapError::NotFound { from, to }) => assert_eq!((from, to), (a, b)),
        other => panic!("unexpected resolution: {other:?}"),
    }

    // Routes of more than two markets are not supported
    dex.add_route(a, b, vec![MockDex::address(10), MockDex::address(11), MockDex::address(12)]);
    assert!(resolver.resolve(a, b).await.is_err());
}
