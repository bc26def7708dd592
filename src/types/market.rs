use fastnum::UD64;

use super::{AssetId, BookSide, MarketAddress};

/// Order book market as loaded from the exchange.
///
/// Everything except the decimals is immutable after loading, decimals may be
/// resolved later with [`MarketHandle::with_decimals`].
#[derive(Clone, derive_more::Debug, PartialEq)]
pub struct MarketHandle {
    address: MarketAddress,
    base_mint: AssetId,
    quote_mint: AssetId,
    #[debug("{min_order_size}")]
    min_order_size: UD64,
    bids_address: MarketAddress,
    asks_address: MarketAddress,
    base_decimals: Option<u8>,
    quote_decimals: Option<u8>,
}

impl MarketHandle {
    pub fn new(
        address: MarketAddress,
        base_mint: AssetId,
        quote_mint: AssetId,
        min_order_size: UD64,
        bids_address: MarketAddress,
        asks_address: MarketAddress,
    ) -> Self {
        Self {
            address,
            base_mint,
            quote_mint,
            min_order_size,
            bids_address,
            asks_address,
            base_decimals: None,
            quote_decimals: None,
        }
    }

    pub fn with_decimals(mut self, base_decimals: u8, quote_decimals: u8) -> Self {
        self.base_decimals = Some(base_decimals);
        self.quote_decimals = Some(quote_decimals);
        self
    }

    pub fn address(&self) -> MarketAddress {
        self.address
    }

    pub fn base_mint(&self) -> AssetId {
        self.base_mint
    }

    pub fn quote_mint(&self) -> AssetId {
        self.quote_mint
    }

    pub fn min_order_size(&self) -> UD64 {
        self.min_order_size
    }

    pub fn base_decimals(&self) -> Option<u8> {
        self.base_decimals
    }

    pub fn quote_decimals(&self) -> Option<u8> {
        self.quote_decimals
    }

    /// Account holding the given side of the book.
    pub fn book_side_address(&self, side: BookSide) -> MarketAddress {
        match side {
            BookSide::Bids => self.bids_address,
            BookSide::Asks => self.asks_address,
        }
    }

    /// Side of the book a taker consumes to receive `to`.
    ///
    /// Buying the base asset lifts asks, anything else hits bids.
    pub fn taker_side(&self, to: &AssetId) -> BookSide {
        if *to == self.base_mint {
            BookSide::Asks
        } else {
            BookSide::Bids
        }
    }
}
