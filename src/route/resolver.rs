use std::sync::Arc;

use tracing::{debug, info, warn};

use super::{TokenRegistry, WormholeNativeTable, derive_bridge_market};
use crate::{
    Cluster,
    client::{BridgeRegistry, RouteTable},
    error::SwapError,
    types::{AssetId, MarketAddress, Route, RouteKind},
};

/// Resolves the route connecting two tokens.
#[derive(derive_more::Debug)]
pub struct RouteResolver<T, B> {
    cluster: Cluster,
    #[debug(skip)]
    tokens: Arc<TokenRegistry>,
    native_markets: WormholeNativeTable,
    #[debug(skip)]
    route_table: T,
    #[debug(skip)]
    bridge: B,
    allow_market_creation: bool,
}

impl<T: RouteTable, B: BridgeRegistry> RouteResolver<T, B> {
    pub fn new(cluster: Cluster, tokens: Arc<TokenRegistry>, route_table: T, bridge: B) -> Self {
        Self {
            native_markets: WormholeNativeTable::from_cluster(&cluster),
            cluster,
            tokens,
            route_table,
            bridge,
            allow_market_creation: false,
        }
    }

    /// Allows requesting creation of missing sollet/wormhole bridge markets.
    pub fn with_market_creation(mut self, allow: bool) -> Self {
        self.allow_market_creation = allow;
        self
    }

    pub fn cluster(&self) -> &Cluster {
        &self.cluster
    }

    pub fn tokens(&self) -> &TokenRegistry {
        &self.tokens
    }

    pub fn route_table(&self) -> &T {
        &self.route_table
    }

    pub fn bridge(&self) -> &B {
        &self.bridge
    }

    /// Returns the route from `from` to `to`.
    ///
    /// # Errors
    ///
    /// [`SwapError::NotFound`] when no market connects the pair.
    pub async fn resolve(&self, from: AssetId, to: AssetId) -> Result<Route, SwapError> {
        if let Some(market) = self.native_markets.get(&from, &to) {
            debug!(%from, %to, %market, "wormhole native route");
            return Ok(Route::single(market, RouteKind::WormholeNative));
        }

        match self.bridge_market(from, to).await {
            Ok(Some(market)) => {
                debug!(%from, %to, %market, "wormhole sollet route");
                return Ok(Route::single(market, RouteKind::WormholeSollet));
            }
            Ok(None) => {}
            Err(err) => warn!(%from, %to, %err, "bridge market lookup failed"),
        }

        let (wrapped_from, wrapped_to) = (self.cluster.wrapped(from), self.cluster.wrapped(to));
        match self.route_table.route(&wrapped_from, &wrapped_to) {
            Some(markets) if matches!(markets.len(), 1 | 2) => {
                debug!(%from, %to, ?markets, "quote currency route");
                Ok(Route::new(markets, RouteKind::DirectOrTransitiveQuote))
            }
            _ => {
                debug!(%from, %to, "no route");
                Err(SwapError::NotFound { from, to })
            }
        }
    }

    /// One-to-one market between a sollet-wrapped token and its wormhole
    /// counterpart, if one exists or was created.
    async fn bridge_market(
        &self,
        from: AssetId,
        to: AssetId,
    ) -> Result<Option<MarketAddress>, SwapError> {
        let tokens = &self.tokens;
        let (from_wormhole, to_wormhole) = (tokens.is_wormhole(&from), tokens.is_wormhole(&to));
        let (from_sollet, to_sollet) = (tokens.is_sollet(&from), tokens.is_sollet(&to));
        if from_wormhole == to_wormhole || from_sollet == to_sollet || from_sollet == from_wormhole
        {
            return Ok(None);
        }

        let (base, quote) = if from_sollet { (from, to) } else { (to, from) };
        let info = self.bridge.sollet_info(base).await?;
        if tokens.wormhole_contract(&quote) != Some(info.erc20_contract) {
            debug!(%base, %quote, contract = %info.erc20_contract, "bridged contracts differ");
            return Ok(None);
        }

        let market = derive_bridge_market(&self.cluster, &base, &quote, 0)?;
        let exists = self
            .bridge
            .ensure_swap_market(base, quote, market, &info, self.allow_market_creation)
            .await?;
        if !exists {
            info!(%base, %quote, %market, "bridge market does not exist");
            return Ok(None);
        }
        Ok(Some(market))
    }
}
