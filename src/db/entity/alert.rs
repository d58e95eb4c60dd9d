use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A standing request to notify an email address once a chain's price
/// reaches a dollar threshold. `is_active` goes false exactly once, via the
/// evaluator's compare-and-swap; the core never flips it back.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "alerts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub chain: String,
    pub threshold_usd: Decimal,
    pub email: String,
    pub is_active: bool,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
