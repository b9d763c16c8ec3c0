use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
  async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .create_table(
        Table::create()
          .table(RateLimits::Table)
          .if_not_exists()
          .col(ColumnDef::new(RateLimits::Key).string().not_null().primary_key())
          .col(ColumnDef::new(RateLimits::WindowStart).date_time().not_null())
          .col(ColumnDef::new(RateLimits::Hits).integer().not_null().default(0))
          .to_owned(),
      )
      .await
  }

  async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager.drop_table(Table::drop().table(RateLimits::Table).to_owned()).await
  }
}

#[derive(DeriveIden)]
pub enum RateLimits {
  Table,
  Key,
  WindowStart,
  Hits,
}
