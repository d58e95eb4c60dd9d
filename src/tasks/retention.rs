use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};

use crate::error::Result;
use crate::stores::PriceStore;
use crate::tasks::PeriodicTask;

/// Deletes price samples older than the retention horizon. Pure
/// maintenance; never touches alert state and is safe to run concurrently
/// with ingestion appends and evaluator reads.
pub struct RetentionSweeper {
    prices: Arc<dyn PriceStore>,
    horizon: Duration,
}

impl RetentionSweeper {
    pub fn new(prices: Arc<dyn PriceStore>, retention_days: i64) -> Self {
        Self {
            prices,
            horizon: Duration::days(retention_days),
        }
    }
}

#[async_trait]
impl PeriodicTask for RetentionSweeper {
    fn name(&self) -> &'static str {
        "retention-sweeper"
    }

    async fn run(&self) -> Result<()> {
        let cutoff = Utc::now() - self.horizon;
        let deleted = self.prices.delete_older_than(cutoff).await?;

        tracing::info!(%cutoff, deleted, "old price samples removed");
        Ok(())
    }
}
