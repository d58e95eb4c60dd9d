use async_trait::async_trait;
use serde::Deserialize;

use crate::config::Config;
use crate::enums::Chain;
use crate::error::QuoteError;
use crate::quote::{QuoteSource, TokenQuote};

const MORALIS_API_BASE: &str = "https://deep-index.moralis.io/api/v2.2";

pub struct MoralisQuoteSource {
    client: reqwest::Client,
    api_key: String,
}

#[derive(Deserialize)]
struct MoralisPriceResponse {
    #[serde(rename = "tokenSymbol")]
    token_symbol: String,
    #[serde(rename = "tokenDecimals")]
    token_decimals: String,
    #[serde(rename = "usdPrice")]
    usd_price: f64,
}

impl MoralisQuoteSource {
    pub fn new(config: &Config) -> std::result::Result<Self, QuoteError> {
        let client = reqwest::Client::builder()
            .timeout(config.quote_timeout)
            .build()
            .map_err(|e| QuoteError::Network(e.to_string()))?;

        Ok(Self {
            client,
            api_key: config.moralis_api_key.clone(),
        })
    }
}

#[async_trait]
impl QuoteSource for MoralisQuoteSource {
    async fn get_price(
        &self,
        token_address: &str,
        chain: Chain,
    ) -> std::result::Result<TokenQuote, QuoteError> {
        let url = format!(
            "{}/erc20/{}/price?chain={}",
            MORALIS_API_BASE,
            token_address,
            chain.quote_chain_id()
        );

        let response = self
            .client
            .get(&url)
            .header("X-API-Key", &self.api_key)
            .send()
            .await
            .map_err(|e| QuoteError::Network(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(QuoteError::NotFound);
        }
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(QuoteError::RateLimited);
        }
        if !status.is_success() {
            return Err(QuoteError::Network(format!(
                "Moralis returned status: {}",
                status
            )));
        }

        let body: MoralisPriceResponse = response
            .json()
            .await
            .map_err(|e| QuoteError::Malformed(e.to_string()))?;

        let decimals = body
            .token_decimals
            .parse::<i32>()
            .map_err(|_| QuoteError::Malformed(format!(
                "non-numeric tokenDecimals: {}",
                body.token_decimals
            )))?;

        if !body.usd_price.is_finite() || body.usd_price < 0.0 {
            return Err(QuoteError::Malformed(format!(
                "invalid usdPrice: {}",
                body.usd_price
            )));
        }

        Ok(TokenQuote {
            symbol: body.token_symbol,
            decimals,
            usd_price: body.usd_price,
        })
    }
}
