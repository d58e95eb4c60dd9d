use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.create_table(
            Table::create()
                .table(Prices::Table)
                .if_not_exists()
                .col(ColumnDef::new(Prices::Id).uuid().not_null().primary_key())
                .col(ColumnDef::new(Prices::Chain).string().not_null())
                .col(ColumnDef::new(Prices::TokenSymbol).string().not_null())
                .col(ColumnDef::new(Prices::TokenDecimals).integer().not_null())
                .col(ColumnDef::new(Prices::UsdPrice).decimal().not_null())
                .col(ColumnDef::new(Prices::ObservedAt).timestamp_with_time_zone().not_null())
                .to_owned()
        ).await?;

        // Latest-sample lookups filter by chain and order by observed_at
        manager.create_index(
            Index::create()
                .if_not_exists()
                .name("idx_prices_chain_observed_at")
                .table(Prices::Table)
                .col(Prices::Chain)
                .col(Prices::ObservedAt)
                .to_owned()
        ).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Prices::Table).to_owned()).await
    }
}

#[derive(Iden)]
enum Prices {
    Table,
    Id,
    Chain,
    TokenSymbol,
    TokenDecimals,
    UsdPrice,
    ObservedAt,
}
