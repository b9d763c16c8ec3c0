use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
  async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .create_table(
        Table::create()
          .table(Scripts::Table)
          .if_not_exists()
          .col(
            ColumnDef::new(Scripts::Id)
              .integer()
              .not_null()
              .auto_increment()
              .primary_key(),
          )
          .col(ColumnDef::new(Scripts::AccessKey).string().not_null().unique_key())
          .col(ColumnDef::new(Scripts::Name).string().not_null())
          .col(ColumnDef::new(Scripts::ScriptContent).text().not_null())
          .col(ColumnDef::new(Scripts::EncryptionKey).string().null())
          .col(
            ColumnDef::new(Scripts::RequireKey)
              .boolean()
              .not_null()
              .default(false),
          )
          .col(ColumnDef::new(Scripts::AllowedGames).json().null())
          .col(ColumnDef::new(Scripts::AllowedExecutors).json().null())
          .col(ColumnDef::new(Scripts::IsActive).boolean().not_null().default(true))
          .col(
            ColumnDef::new(Scripts::TotalLoads)
              .big_integer()
              .not_null()
              .default(0),
          )
          .col(ColumnDef::new(Scripts::LastLoadedAt).date_time().null())
          .col(ColumnDef::new(Scripts::CreatedAt).date_time().not_null())
          .to_owned(),
      )
      .await?;

    manager
      .create_table(
        Table::create()
          .table(ScriptLoadLogs::Table)
          .if_not_exists()
          .col(
            ColumnDef::new(ScriptLoadLogs::Id)
              .integer()
              .not_null()
              .auto_increment()
              .primary_key(),
          )
          .col(ColumnDef::new(ScriptLoadLogs::ScriptId).integer().null())
          .col(ColumnDef::new(ScriptLoadLogs::IpAddress).string().not_null())
          .col(ColumnDef::new(ScriptLoadLogs::UserAgent).string().null())
          .col(ColumnDef::new(ScriptLoadLogs::Executor).string().null())
          .col(ColumnDef::new(ScriptLoadLogs::Hwid).string().null())
          .col(ColumnDef::new(ScriptLoadLogs::PlayerId).string().null())
          .col(ColumnDef::new(ScriptLoadLogs::PlayerName).string().null())
          .col(ColumnDef::new(ScriptLoadLogs::GameId).string().null())
          .col(ColumnDef::new(ScriptLoadLogs::KeyValue).string().null())
          .col(ColumnDef::new(ScriptLoadLogs::Success).boolean().not_null())
          .col(ColumnDef::new(ScriptLoadLogs::Error).string().null())
          .col(ColumnDef::new(ScriptLoadLogs::CreatedAt).date_time().not_null())
          .to_owned(),
      )
      .await
  }

  async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .drop_table(Table::drop().table(ScriptLoadLogs::Table).to_owned())
      .await?;
    manager.drop_table(Table::drop().table(Scripts::Table).to_owned()).await
  }
}

#[derive(DeriveIden)]
pub enum Scripts {
  Table,
  Id,
  AccessKey,
  Name,
  ScriptContent,
  EncryptionKey,
  RequireKey,
  AllowedGames,
  AllowedExecutors,
  IsActive,
  TotalLoads,
  LastLoadedAt,
  CreatedAt,
}

#[derive(DeriveIden)]
pub enum ScriptLoadLogs {
  Table,
  Id,
  ScriptId,
  IpAddress,
  UserAgent,
  Executor,
  Hwid,
  PlayerId,
  PlayerName,
  GameId,
  KeyValue,
  Success,
  Error,
  CreatedAt,
}
