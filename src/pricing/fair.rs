use fastnum::UD64;

use crate::{
    Cluster,
    error::SwapError,
    state::Bbo,
    types::{AssetId, MarketHandle},
};

/// Native token wrapping direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WrapKind {
    Wrap,
    Unwrap,
}

/// One market of a route with its current best bid and offer.
#[derive(Clone, Copy, Debug)]
pub struct RouteLeg<'a> {
    pub market: &'a MarketHandle,
    pub bbo: Bbo,
}

impl<'a> RouteLeg<'a> {
    pub fn new(market: &'a MarketHandle, bbo: Bbo) -> Self {
        Self { market, bbo }
    }

    fn best_bid(&self) -> Option<UD64> {
        self.bbo.best_bid.filter(|p| *p > UD64::ZERO)
    }
}

pub fn wrap_kind(cluster: &Cluster, from: &AssetId, to: &AssetId) -> Option<WrapKind> {
    if *from == cluster.native_mint() && *to == cluster.wrapped_native_mint() {
        Some(WrapKind::Wrap)
    } else if *from == cluster.wrapped_native_mint() && *to == cluster.native_mint() {
        Some(WrapKind::Unwrap)
    } else {
        None
    }
}

pub fn is_wrap_unwrap(cluster: &Cluster, from: &AssetId, to: &AssetId) -> bool {
    wrap_kind(cluster, from, to).is_some()
}

/// Sollet-wrapped USDT/USDC into its native counterpart.
pub fn is_unwrap_sollet(cluster: &Cluster, from: &AssetId, to: &AssetId) -> bool {
    (*from == cluster.sollet_usdt() && *to == cluster.usdt())
        || (*from == cluster.sollet_usdc() && *to == cluster.usdc())
}

/// Number of `from` tokens needed to buy a single `to` token, aggregated
/// across the route.
///
/// Wrapping and unwrapping the native token always trades at `1`.
pub fn fair_rate(
    cluster: &Cluster,
    from: &AssetId,
    to: &AssetId,
    legs: &[RouteLeg<'_>],
) -> Result<UD64, SwapError> {
    if is_wrap_unwrap(cluster, from, to) {
        return Ok(UD64::ONE);
    }
    match legs {
        [leg] => {
            let base = leg.market.base_mint();
            let sells_base = base == *from
                || (base == cluster.wrapped_native_mint() && *from == cluster.native_mint());
            if sells_base {
                leg.best_bid().map(|bid| UD64::ONE / bid)
            } else {
                leg.bbo.best_offer
            }
        }
        [from_leg, to_leg] => from_leg
            .best_bid()
            .zip(to_leg.bbo.best_offer)
            .map(|(bid, offer)| offer / bid),
        _ => None,
    }
    .ok_or(SwapError::Unavailable("fair price"))
}

#[cfg(test)]
mod tests {
    use fastnum::udec64;
    use solana_sdk::pubkey::Pubkey;

    use super::*;

    fn market(cluster: &Cluster, base: AssetId) -> MarketHandle {
        MarketHandle::new(
            Pubkey::new_from_array([1; 32]),
            base,
            cluster.usdc(),
            udec64!(0.1),
            Pubkey::new_from_array([2; 32]),
            Pubkey::new_from_array([3; 32]),
        )
    }

    fn bbo(bid: Option<UD64>, offer: Option<UD64>) -> Bbo {
        Bbo {
            best_bid: bid,
            best_offer: offer,
            mid: None,
        }
    }

    #[test]
    fn test_wrap_unwrap_is_one() {
        let cluster = Cluster::mainnet();
        let (sol, wsol) = (cluster.native_mint(), cluster.wrapped_native_mint());

        assert_eq!(wrap_kind(&cluster, &sol, &wsol), Some(WrapKind::Wrap));
        assert_eq!(wrap_kind(&cluster, &wsol, &sol), Some(WrapKind::Unwrap));
        assert_eq!(wrap_kind(&cluster, &sol, &cluster.usdc()), None);

        assert_eq!(fair_rate(&cluster, &sol, &wsol, &[]).unwrap(), UD64::ONE);
        assert_eq!(fair_rate(&cluster, &wsol, &sol, &[]).unwrap(), UD64::ONE);
    }

    #[test]
    fn test_single_market() {
        let cluster = Cluster::mainnet();
        let srm = Pubkey::new_from_array([7; 32]);
        let market = market(&cluster, srm);
        let leg = RouteLeg::new(&market, bbo(Some(udec64!(10)), Some(udec64!(10.2))));

        assert_eq!(
            fair_rate(&cluster, &srm, &cluster.usdc(), &[leg]).unwrap(),
            udec64!(0.1)
        );
        assert_eq!(
            fair_rate(&cluster, &cluster.usdc(), &srm, &[leg]).unwrap(),
            udec64!(10.2)
        );
    }

    #[test]
    fn test_native_sells_wrapped_base() {
        let cluster = Cluster::mainnet();
        let market = market(&cluster, cluster.wrapped_native_mint());
        let leg = RouteLeg::new(&market, bbo(Some(udec64!(20)), Some(udec64!(21))));

        assert_eq!(
            fair_rate(&cluster, &cluster.native_mint(), &cluster.usdc(), &[leg]).unwrap(),
            udec64!(0.05)
        );
    }

    #[test]
    fn test_transitive() {
        let cluster = Cluster::mainnet();
        let (srm, fida) = (Pubkey::new_from_array([7; 32]), Pubkey::new_from_array([8; 32]));
        let (from_market, to_market) = (market(&cluster, srm), market(&cluster, fida));
        let from_leg = RouteLeg::new(&from_market, bbo(Some(udec64!(4)), None));
        let to_leg = RouteLeg::new(&to_market, bbo(None, Some(udec64!(10))));

        assert_eq!(
            fair_rate(&cluster, &srm, &fida, &[from_leg, to_leg]).unwrap(),
            udec64!(2.5)
        );
        assert!(matches!(
            fair_rate(&cluster, &srm, &fida, &[to_leg, from_leg]),
            Err(SwapError::Unavailable(_))
        ));
    }

    #[test]
    fn test_missing_side_unavailable() {
        let cluster = Cluster::mainnet();
        let srm = Pubkey::new_from_array([7; 32]);
        let market = market(&cluster, srm);
        let leg = RouteLeg::new(&market, bbo(None, Some(udec64!(10.2))));

        assert!(fair_rate(&cluster, &srm, &cluster.usdc(), &[leg]).is_err());
        assert!(fair_rate(&cluster, &srm, &cluster.usdc(), &[]).is_err());
    }

    #[test]
    fn test_unwrap_sollet() {
        let cluster = Cluster::mainnet();
        assert!(is_unwrap_sollet(&cluster, &cluster.sollet_usdt(), &cluster.usdt()));
        assert!(is_unwrap_sollet(&cluster, &cluster.sollet_usdc(), &cluster.usdc()));
        assert!(!is_unwrap_sollet(&cluster, &cluster.usdt(), &cluster.sollet_usdt()));
        assert!(!is_unwrap_sollet(&cluster, &cluster.sollet_usdt(), &cluster.usdc()));
    }
}
