use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
  async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .create_table(
        Table::create()
          .table(UsageLogs::Table)
          .if_not_exists()
          .col(
            ColumnDef::new(UsageLogs::Id)
              .integer()
              .not_null()
              .auto_increment()
              .primary_key(),
          )
          .col(ColumnDef::new(UsageLogs::KeyId).integer().null())
          .col(ColumnDef::new(UsageLogs::Hwid).string().null())
          .col(ColumnDef::new(UsageLogs::Executor).string().null())
          .col(ColumnDef::new(UsageLogs::GameId).integer().null())
          .col(ColumnDef::new(UsageLogs::GameName).string().null())
          .col(ColumnDef::new(UsageLogs::PlayerId).string().null())
          .col(ColumnDef::new(UsageLogs::PlayerName).string().null())
          .col(ColumnDef::new(UsageLogs::IpAddress).string().not_null())
          .col(ColumnDef::new(UsageLogs::Success).boolean().not_null())
          .col(ColumnDef::new(UsageLogs::ErrorType).string().null())
          .col(ColumnDef::new(UsageLogs::CreatedAt).date_time().not_null())
          .to_owned(),
      )
      .await?;

    manager
      .create_index(
        Index::create()
          .name("idx_usage_logs_key")
          .table(UsageLogs::Table)
          .col(UsageLogs::KeyId)
          .to_owned(),
      )
      .await
  }

  async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager.drop_table(Table::drop().table(UsageLogs::Table).to_owned()).await
  }
}

#[derive(DeriveIden)]
pub enum UsageLogs {
  Table,
  Id,
  KeyId,
  Hwid,
  Executor,
  GameId,
  GameName,
  PlayerId,
  PlayerName,
  IpAddress,
  Success,
  ErrorType,
  CreatedAt,
}
