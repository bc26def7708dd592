use fastnum::{UD64, udec64};

use super::RouteLeg;
use crate::{error::SwapError, num::Converter, types::AssetId};

const HUNDRED: UD64 = udec64!(100);

/// Share of the traded amount left after taker fees, `1` when no market is
/// involved.
pub fn fee_multiplier(taker_fee: UD64, wrap_unwrap: bool) -> UD64 {
    if wrap_unwrap {
        UD64::ONE
    } else if taker_fee >= UD64::ONE {
        UD64::ZERO
    } else {
        UD64::ONE - taker_fee
    }
}

fn positive(fair: UD64) -> Result<UD64, SwapError> {
    if fair > UD64::ZERO {
        Ok(fair)
    } else {
        Err(SwapError::Unavailable("fair price"))
    }
}

/// Amount of `to` tokens received for `input` `from` tokens.
pub fn expected_output(input: UD64, fair: UD64, fee_multiplier: UD64) -> Result<UD64, SwapError> {
    Ok(input * fee_multiplier / positive(fair)?)
}

/// Amount of `from` tokens needed to receive `output` `to` tokens.
pub fn required_input(output: UD64, fair: UD64, fee_multiplier: UD64) -> Result<UD64, SwapError> {
    if fee_multiplier == UD64::ZERO {
        return Err(SwapError::Unavailable("fee multiplier"));
    }
    Ok(output * positive(fair)? / fee_multiplier)
}

/// Minimum acceptable exchange rate, in raw `to` units per whole `from`
/// token, after fees and `slippage` percent.
pub fn min_exchange_rate(
    fair: UD64,
    to_decimals: u8,
    slippage: UD64,
    fee_multiplier: UD64,
) -> Result<u64, SwapError> {
    if slippage > HUNDRED {
        return Err(SwapError::InvalidRequest(format!(
            "slippage {slippage}% exceeds 100%"
        )));
    }
    let expected = (Converter::new(to_decimals).unit() * fee_multiplier / positive(fair)?).floor();
    let rate = (expected * (HUNDRED - slippage) / HUNDRED).floor();
    Converter::new(0).to_raw(rate)
}

/// Minimum order size the trade falls short of.
#[derive(Clone, Copy, derive_more::Debug, PartialEq, Eq)]
#[debug("{min_size} of {base_mint}")]
pub struct MinSwapAmount {
    pub min_size: UD64,
    /// Token the minimum is denominated in.
    pub base_mint: AssetId,
}

/// Returns the minimum order size to report when the trade is below the
/// minimum of any route leg, `None` otherwise.
///
/// With two legs the one whose minimum is worth more at its best bid wins.
pub fn min_swap_amount(
    from: &AssetId,
    from_amount: UD64,
    to_amount: UD64,
    from_leg: &RouteLeg<'_>,
    to_leg: Option<&RouteLeg<'_>>,
) -> Option<MinSwapAmount> {
    let from_market = from_leg.market;
    let from_min = from_market.min_order_size();
    // Buying the base of the from market with its quote
    let base_amount = if from_market.quote_mint() == *from {
        to_amount
    } else {
        from_amount
    };
    let below_from_min = base_amount < from_min;

    let min_of = |leg: &RouteLeg<'_>| MinSwapAmount {
        min_size: leg.market.min_order_size(),
        base_mint: leg.market.base_mint(),
    };
    match to_leg {
        None if below_from_min => Some(min_of(from_leg)),
        None => None,
        Some(to_leg) => {
            let to_min = to_leg.market.min_order_size();
            if to_amount >= to_min && !below_from_min {
                return None;
            }
            let worth = |leg: &RouteLeg<'_>| {
                leg.market.min_order_size() * leg.bbo.best_bid.unwrap_or(UD64::ZERO)
            };
            if worth(from_leg) > worth(to_leg) {
                Some(min_of(from_leg))
            } else {
                Some(min_of(to_leg))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use solana_sdk::pubkey::Pubkey;

    use super::*;
    use crate::{state::Bbo, types::MarketHandle};

    const FEE: UD64 = udec64!(0.9978);

    fn market(base: u8, quote: u8, min_size: UD64) -> MarketHandle {
        MarketHandle::new(
            Pubkey::new_from_array([base + 100; 32]),
            Pubkey::new_from_array([base; 32]),
            Pubkey::new_from_array([quote; 32]),
            min_size,
            Pubkey::new_from_array([base + 101; 32]),
            Pubkey::new_from_array([base + 102; 32]),
        )
    }

    fn bbo(bid: UD64) -> Bbo {
        Bbo {
            best_bid: Some(bid),
            best_offer: None,
            mid: None,
        }
    }

    #[test]
    fn test_fee_multiplier() {
        assert_eq!(fee_multiplier(udec64!(0.0022), false), FEE);
        assert_eq!(fee_multiplier(udec64!(0.0022), true), UD64::ONE);
    }

    #[test]
    fn test_amount_coupling() {
        assert_eq!(
            expected_output(udec64!(10), udec64!(0.1), FEE).unwrap(),
            udec64!(99.78)
        );
        assert_eq!(
            required_input(udec64!(99.78), udec64!(0.1), FEE).unwrap(),
            udec64!(10)
        );
        assert!(expected_output(udec64!(10), UD64::ZERO, FEE).is_err());
    }

    #[test]
    fn test_min_exchange_rate() {
        assert_eq!(
            min_exchange_rate(udec64!(0.1), 6, udec64!(0.5), FEE).unwrap(),
            9_928_110
        );
        // floor(97823.529..) = 97823, * 0.995 = 97333.885
        assert_eq!(
            min_exchange_rate(udec64!(10.2), 6, udec64!(0.5), FEE).unwrap(),
            97_333
        );
        assert_eq!(
            min_exchange_rate(UD64::ONE, 9, UD64::ZERO, UD64::ONE).unwrap(),
            1_000_000_000
        );
        assert!(min_exchange_rate(udec64!(0.1), 6, udec64!(101), FEE).is_err());
        assert!(min_exchange_rate(UD64::ZERO, 6, udec64!(0.5), FEE).is_err());
        // 10^25 raw units per token do not fit the instruction
        assert!(matches!(
            min_exchange_rate(udec64!(0.0000001), 18, UD64::ZERO, UD64::ONE),
            Err(SwapError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_min_swap_amount_single_leg() {
        let market = market(1, 2, udec64!(0.5));
        let leg = RouteLeg::new(&market, bbo(udec64!(10)));
        let (base, quote) = (market.base_mint(), market.quote_mint());

        // Selling the base
        assert_eq!(
            min_swap_amount(&base, udec64!(0.1), udec64!(1), &leg, None),
            Some(MinSwapAmount {
                min_size: udec64!(0.5),
                base_mint: base
            })
        );
        assert_eq!(min_swap_amount(&base, udec64!(1), udec64!(10), &leg, None), None);

        // Buying the base, to amount is what counts
        assert!(min_swap_amount(&quote, udec64!(100), udec64!(0.2), &leg, None).is_some());
        assert!(min_swap_amount(&quote, udec64!(1), udec64!(0.6), &leg, None).is_none());
    }

    #[test]
    fn test_min_swap_amount_two_legs() {
        let from_market = market(1, 3, udec64!(1));
        let to_market = market(2, 3, udec64!(0.1));
        let from_leg = RouteLeg::new(&from_market, bbo(udec64!(2)));
        let to_leg = RouteLeg::new(&to_market, bbo(udec64!(50)));
        let from = from_market.base_mint();

        assert_eq!(
            min_swap_amount(&from, udec64!(5), udec64!(1), &from_leg, Some(&to_leg)),
            None
        );
        // Below the to market minimum, to minimum is worth 5 vs 2
        assert_eq!(
            min_swap_amount(&from, udec64!(5), udec64!(0.01), &from_leg, Some(&to_leg)),
            Some(MinSwapAmount {
                min_size: udec64!(0.1),
                base_mint: to_market.base_mint()
            })
        );
    }
}
