use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    ColumnTrait,
    DatabaseConnection,
    EntityTrait,
    QueryFilter,
    QueryOrder,
    Set,
};
use uuid::Uuid;

use crate::db::entity::price;
use crate::enums::Chain;
use crate::error::Result;
use crate::stores::{NewPriceSample, PriceStore};

pub struct PriceRepository {
    db: DatabaseConnection,
}

impl PriceRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl PriceStore for PriceRepository {
    async fn append(&self, sample: NewPriceSample) -> Result<()> {
        let row = price::ActiveModel {
            id: Set(Uuid::new_v4()),
            chain: Set(sample.chain.as_str().to_string()),
            token_symbol: Set(sample.token_symbol),
            token_decimals: Set(sample.token_decimals),
            usd_price: Set(sample.usd_price),
            observed_at: Set(sample.observed_at),
        };

        price::Entity::insert(row).exec(&self.db).await?;
        Ok(())
    }

    async fn latest(&self, chain: Chain) -> Result<Option<price::Model>> {
        let sample = price::Entity::find()
            .filter(price::Column::Chain.eq(chain.as_str()))
            .order_by_desc(price::Column::ObservedAt)
            .one(&self.db)
            .await?;

        Ok(sample)
    }

    async fn latest_before(
        &self,
        chain: Chain,
        cutoff: DateTime<Utc>,
    ) -> Result<Option<price::Model>> {
        let sample = price::Entity::find()
            .filter(price::Column::Chain.eq(chain.as_str()))
            .filter(price::Column::ObservedAt.lte(cutoff))
            .order_by_desc(price::Column::ObservedAt)
            .one(&self.db)
            .await?;

        Ok(sample)
    }

    async fn since(&self, chain: Chain, from: DateTime<Utc>) -> Result<Vec<price::Model>> {
        let samples = price::Entity::find()
            .filter(price::Column::Chain.eq(chain.as_str()))
            .filter(price::Column::ObservedAt.gte(from))
            .order_by_asc(price::Column::ObservedAt)
            .all(&self.db)
            .await?;

        Ok(samples)
    }

    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let result = price::Entity::delete_many()
            .filter(price::Column::ObservedAt.lt(cutoff))
            .exec(&self.db)
            .await?;

        Ok(result.rows_affected)
    }
}
