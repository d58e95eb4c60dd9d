use async_trait::async_trait;

use crate::enums::Chain;
use crate::error::QuoteError;

mod moralis;
pub use moralis::MoralisQuoteSource;

/// A current USD price snapshot for a tracked token.
#[derive(Debug, Clone)]
pub struct TokenQuote {
    pub symbol: String,
    pub decimals: i32,
    pub usd_price: f64,
}

/// External price-quote provider. Fallible, rate-limited, latency-bearing;
/// every call is bounded by the client timeout.
#[async_trait]
pub trait QuoteSource: Send + Sync {
    async fn get_price(
        &self,
        token_address: &str,
        chain: Chain,
    ) -> std::result::Result<TokenQuote, QuoteError>;
}
