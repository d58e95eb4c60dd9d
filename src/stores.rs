use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::prelude::Decimal;
use uuid::Uuid;

use crate::db::entity::{alert, price};
use crate::enums::Chain;
use crate::error::Result;

/// A sample ready to be appended; the store assigns the row id.
#[derive(Debug, Clone)]
pub struct NewPriceSample {
    pub chain: Chain,
    pub token_symbol: String,
    pub token_decimals: i32,
    pub usd_price: Decimal,
    pub observed_at: DateTime<Utc>,
}

/// Append-only store of price samples, queryable by chain and time.
#[async_trait]
pub trait PriceStore: Send + Sync {
    async fn append(&self, sample: NewPriceSample) -> Result<()>;

    /// Most recent sample for a chain, by `observed_at` descending.
    async fn latest(&self, chain: Chain) -> Result<Option<price::Model>>;

    /// Most recent sample with `observed_at <= cutoff`.
    async fn latest_before(
        &self,
        chain: Chain,
        cutoff: DateTime<Utc>,
    ) -> Result<Option<price::Model>>;

    /// All samples for a chain with `observed_at >= from`, oldest first.
    async fn since(&self, chain: Chain, from: DateTime<Utc>) -> Result<Vec<price::Model>>;

    /// Bulk-delete samples with `observed_at < cutoff`. Returns rows removed.
    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64>;
}

/// Mutable store of alert records. The evaluator only ever deactivates
/// through the compare-and-swap below, never with a read-then-write pair.
#[async_trait]
pub trait AlertStore: Send + Sync {
    async fn list_active(&self) -> Result<Vec<alert::Model>>;

    /// Atomically transition `is_active` from true to false. Returns true
    /// iff this call performed the transition; a second caller racing on
    /// the same alert observes false and must not notify.
    async fn compare_and_deactivate(&self, id: Uuid) -> Result<bool>;
}
