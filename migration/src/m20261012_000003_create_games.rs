use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
  async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .create_table(
        Table::create()
          .table(Games::Table)
          .if_not_exists()
          .col(
            ColumnDef::new(Games::Id)
              .integer()
              .not_null()
              .auto_increment()
              .primary_key(),
          )
          .col(ColumnDef::new(Games::PlaceId).big_integer().not_null().unique_key())
          .col(ColumnDef::new(Games::Name).string().not_null())
          .col(ColumnDef::new(Games::ScriptUrl).string().not_null())
          .col(
            ColumnDef::new(Games::ScriptVersion)
              .string()
              .not_null()
              .default("1.0.0"),
          )
          .col(ColumnDef::new(Games::MinKeyTier).string().null())
          .col(ColumnDef::new(Games::IsActive).boolean().not_null().default(true))
          .col(
            ColumnDef::new(Games::TotalExecutions)
              .big_integer()
              .not_null()
              .default(0),
          )
          .col(ColumnDef::new(Games::CreatedAt).date_time().not_null())
          .to_owned(),
      )
      .await
  }

  async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager.drop_table(Table::drop().table(Games::Table).to_owned()).await
  }
}

#[derive(DeriveIden)]
pub enum Games {
  Table,
  Id,
  PlaceId,
  Name,
  ScriptUrl,
  ScriptVersion,
  MinKeyTier,
  IsActive,
  TotalExecutions,
  CreatedAt,
}
