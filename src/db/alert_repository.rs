use async_trait::async_trait;
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait,
    ActiveValue,
    ColumnTrait,
    DatabaseConnection,
    EntityTrait,
    QueryFilter,
    QueryOrder,
    prelude::Decimal,
};
use uuid::Uuid;

use crate::db::entity::alert;
use crate::enums::Chain;
use crate::error::{AppError, Result};
use crate::stores::AlertStore;

pub struct AlertRepository {
    db: DatabaseConnection,
}

#[derive(Debug, Clone)]
pub struct NewAlert {
    pub chain: Chain,
    pub threshold_usd: Decimal,
    pub email: String,
}

#[derive(Debug, Clone, Default)]
pub struct AlertUpdate {
    pub chain: Option<Chain>,
    pub threshold_usd: Option<Decimal>,
    pub email: Option<String>,
    /// Setting this back to true is the administrative reactivation path;
    /// the background tasks never do it.
    pub is_active: Option<bool>,
}

impl AlertRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn create(&self, new: NewAlert) -> Result<alert::Model> {
        let now = Utc::now();

        let row = alert::ActiveModel {
            id: ActiveValue::Set(Uuid::new_v4()),
            chain: ActiveValue::Set(new.chain.as_str().to_string()),
            threshold_usd: ActiveValue::Set(new.threshold_usd),
            email: ActiveValue::Set(new.email),
            is_active: ActiveValue::Set(true),
            created_at: ActiveValue::Set(now),
            updated_at: ActiveValue::Set(now),
        };

        let alert = row.insert(&self.db).await?;
        Ok(alert)
    }

    pub async fn list(&self) -> Result<Vec<alert::Model>> {
        let alerts = alert::Entity::find()
            .order_by_desc(alert::Column::CreatedAt)
            .all(&self.db)
            .await?;

        Ok(alerts)
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<alert::Model>> {
        let alert = alert::Entity::find_by_id(id).one(&self.db).await?;
        Ok(alert)
    }

    pub async fn update(&self, id: Uuid, update: AlertUpdate) -> Result<alert::Model> {
        let alert = alert::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(AppError::AlertNotFound)?;

        let mut active: alert::ActiveModel = alert.into();

        if let Some(chain) = update.chain {
            active.chain = ActiveValue::Set(chain.as_str().to_string());
        }
        if let Some(threshold) = update.threshold_usd {
            active.threshold_usd = ActiveValue::Set(threshold);
        }
        if let Some(email) = update.email {
            active.email = ActiveValue::Set(email);
        }
        if let Some(is_active) = update.is_active {
            active.is_active = ActiveValue::Set(is_active);
        }
        active.updated_at = ActiveValue::Set(Utc::now());

        let alert = active.update(&self.db).await?;
        Ok(alert)
    }

    pub async fn delete(&self, id: Uuid) -> Result<()> {
        let result = alert::Entity::delete_by_id(id).exec(&self.db).await?;

        if result.rows_affected == 0 {
            return Err(AppError::AlertNotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl AlertStore for AlertRepository {
    async fn list_active(&self) -> Result<Vec<alert::Model>> {
        let alerts = alert::Entity::find()
            .filter(alert::Column::IsActive.eq(true))
            .all(&self.db)
            .await?;

        Ok(alerts)
    }

    async fn compare_and_deactivate(&self, id: Uuid) -> Result<bool> {
        // Single conditional UPDATE; the `is_active = true` filter is the
        // compare half of the swap.
        let result = alert::Entity::update_many()
            .col_expr(alert::Column::IsActive, Expr::value(false))
            .col_expr(alert::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(alert::Column::Id.eq(id))
            .filter(alert::Column::IsActive.eq(true))
            .exec(&self.db)
            .await?;

        Ok(result.rows_affected == 1)
    }
}
