use crate::{state::BookError, types};

pub type SwapResult<T> = Result<T, SwapError>;

/// Error produced while resolving routes, refreshing market data,
/// pricing a trade or submitting it.
///
/// Only [`SwapError::Fatal`] and [`SwapError::Submission`] are meant to abort
/// a user action, the rest degrade to "swap unavailable" placeholders.
#[derive(Clone, Debug, thiserror::Error)]
pub enum SwapError {
    #[error("no trade route: {from} -> {to}")]
    NotFound {
        from: types::AssetId,
        to: types::AssetId,
    },

    #[error("external lookup failed: {0}")]
    ExternalLookupFailed(String),

    #[error("{0} is unavailable")]
    Unavailable(&'static str),

    #[error("fatal error: {0}")]
    Fatal(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("request {request} superseded by {latest}")]
    Superseded {
        request: types::RequestId,
        latest: types::RequestId,
    },

    #[error("swap submission failed: {0}")]
    Submission(String),

    #[error("order book error: {0}")]
    Book(#[from] BookError),
}

impl SwapError {
    /// `true` for conditions the consumer should render as "swap unavailable"
    /// rather than as a failure.
    pub fn is_soft(&self) -> bool {
        matches!(
            self,
            SwapError::NotFound { .. }
                | SwapError::Unavailable(_)
                | SwapError::ExternalLookupFailed(_)
                | SwapError::Superseded { .. }
        )
    }
}

impl From<serde_json::Error> for SwapError {
    fn from(value: serde_json::Error) -> Self {
        Self::InvalidRequest(value.to_string())
    }
}
