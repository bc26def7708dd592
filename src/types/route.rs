use super::{AssetId, MarketAddress};

/// How two assets are connected.
///
/// * [`RouteKind::DirectOrTransitiveQuote`] trades on quote-currency markets, either directly
///   or transitively through the common quote currency of two markets.
/// * [`RouteKind::WormholeNative`] uses a one-sided market converting a wormhole-wrapped
///   token into its native counterpart. Must be traded from the wormhole side.
/// * [`RouteKind::WormholeSollet`] uses a one-sided market converting a sollet-wrapped token
///   into its wormhole counterpart. Must be traded from the sollet side.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RouteKind {
    DirectOrTransitiveQuote,
    WormholeNative,
    WormholeSollet,
}

/// Ordered sequence of markets converting one asset into another.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Route {
    markets: Vec<MarketAddress>,
    kind: RouteKind,
}

impl Route {
    pub fn new(markets: Vec<MarketAddress>, kind: RouteKind) -> Self {
        Self { markets, kind }
    }

    pub fn single(market: MarketAddress, kind: RouteKind) -> Self {
        Self::new(vec![market], kind)
    }

    pub fn markets(&self) -> &[MarketAddress] {
        &self.markets
    }

    pub fn kind(&self) -> RouteKind {
        self.kind
    }

    /// Market the `from` asset is sold on.
    pub fn from_market(&self) -> Option<MarketAddress> {
        self.markets.first().copied()
    }

    /// Market the `to` asset is bought on, only present for transitive routes.
    pub fn to_market(&self) -> Option<MarketAddress> {
        self.markets.get(1).copied()
    }

    pub fn is_transitive(&self) -> bool {
        self.markets.len() == 2
    }

    pub fn is_one_sided(&self) -> bool {
        !matches!(self.kind, RouteKind::DirectOrTransitiveQuote)
    }

    pub fn contains(&self, market: &MarketAddress) -> bool {
        self.markets.contains(market)
    }
}

/// Ordered pair of assets being swapped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct AssetPair {
    pub from: AssetId,
    pub to: AssetId,
}

impl AssetPair {
    pub fn new(from: AssetId, to: AssetId) -> Self {
        Self { from, to }
    }

    pub fn reversed(&self) -> Self {
        Self {
            from: self.to,
            to: self.from,
        }
    }
}
