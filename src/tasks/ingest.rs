use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::prelude::Decimal;

use crate::enums::Chain;
use crate::error::Result;
use crate::quote::QuoteSource;
use crate::stores::{NewPriceSample, PriceStore};
use crate::tasks::PeriodicTask;

/// Polls the quote provider for every tracked asset and appends one sample
/// per success. A failed asset is logged and skipped; it never aborts the
/// cycle for the other assets, and there is no retry within a cycle.
pub struct PriceIngestionTask {
    quote_source: Arc<dyn QuoteSource>,
    prices: Arc<dyn PriceStore>,
}

impl PriceIngestionTask {
    pub fn new(quote_source: Arc<dyn QuoteSource>, prices: Arc<dyn PriceStore>) -> Self {
        Self {
            quote_source,
            prices,
        }
    }

    async fn ingest_chain(&self, chain: Chain) {
        let quote = match self
            .quote_source
            .get_price(chain.token_address(), chain)
            .await
        {
            Ok(quote) => quote,
            Err(e) => {
                tracing::warn!(chain = %chain, error = %e, "quote fetch failed, skipping asset");
                return;
            }
        };

        let Some(usd_price) = Decimal::from_f64_retain(quote.usd_price) else {
            tracing::warn!(chain = %chain, price = quote.usd_price, "unrepresentable price, skipping asset");
            return;
        };

        let sample = NewPriceSample {
            chain,
            token_symbol: quote.symbol.clone(),
            token_decimals: quote.decimals,
            usd_price,
            observed_at: Utc::now(),
        };

        match self.prices.append(sample).await {
            Ok(()) => {
                tracing::debug!(chain = %chain, symbol = %quote.symbol, price = quote.usd_price, "sample persisted");
            }
            Err(e) => {
                // Sample is dropped; the next tick produces a fresh one.
                tracing::error!(chain = %chain, error = %e, "failed to persist sample");
            }
        }
    }
}

#[async_trait]
impl PeriodicTask for PriceIngestionTask {
    fn name(&self) -> &'static str {
        "price-ingestion"
    }

    async fn run(&self) -> Result<()> {
        for &chain in Chain::all() {
            self.ingest_chain(chain).await;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use chrono::{DateTime, Utc};

    use super::*;
    use crate::db::entity::price;
    use crate::error::QuoteError;
    use crate::quote::TokenQuote;

    /// Quote source that fails for POL and succeeds for ETH.
    struct HalfBrokenQuotes;

    #[async_trait]
    impl QuoteSource for HalfBrokenQuotes {
        async fn get_price(
            &self,
            _token_address: &str,
            chain: Chain,
        ) -> std::result::Result<TokenQuote, QuoteError> {
            match chain {
                Chain::Eth => Ok(TokenQuote {
                    symbol: "WETH".to_string(),
                    decimals: 18,
                    usd_price: 2501.25,
                }),
                Chain::Pol => Err(QuoteError::RateLimited),
            }
        }
    }

    #[derive(Default)]
    struct MemoryPrices {
        samples: Mutex<Vec<NewPriceSample>>,
    }

    #[async_trait]
    impl PriceStore for MemoryPrices {
        async fn append(&self, sample: NewPriceSample) -> Result<()> {
            self.samples.lock().unwrap().push(sample);
            Ok(())
        }

        async fn latest(&self, _chain: Chain) -> Result<Option<price::Model>> {
            Ok(None)
        }

        async fn latest_before(
            &self,
            _chain: Chain,
            _cutoff: DateTime<Utc>,
        ) -> Result<Option<price::Model>> {
            Ok(None)
        }

        async fn since(&self, _chain: Chain, _from: DateTime<Utc>) -> Result<Vec<price::Model>> {
            Ok(Vec::new())
        }

        async fn delete_older_than(&self, _cutoff: DateTime<Utc>) -> Result<u64> {
            Ok(0)
        }
    }

    #[tokio::test]
    async fn test_partial_failure_still_persists_other_assets() {
        let prices = Arc::new(MemoryPrices::default());
        let task = PriceIngestionTask::new(Arc::new(HalfBrokenQuotes), prices.clone());

        task.run().await.unwrap();

        let samples = prices.samples.lock().unwrap();
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].chain, Chain::Eth);
        assert_eq!(samples[0].token_symbol, "WETH");
    }
}
