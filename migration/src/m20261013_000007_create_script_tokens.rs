use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
  async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .create_table(
        Table::create()
          .table(ScriptTokens::Table)
          .if_not_exists()
          .col(
            ColumnDef::new(ScriptTokens::Token)
              .string()
              .not_null()
              .primary_key(),
          )
          .col(ColumnDef::new(ScriptTokens::KeyId).integer().not_null())
          .col(ColumnDef::new(ScriptTokens::GameId).integer().not_null())
          .col(ColumnDef::new(ScriptTokens::ScriptLocation).string().not_null())
          .col(ColumnDef::new(ScriptTokens::ExpiresAt).date_time().not_null())
          .to_owned(),
      )
      .await?;

    manager
      .create_index(
        Index::create()
          .name("idx_script_tokens_expires")
          .table(ScriptTokens::Table)
          .col(ScriptTokens::ExpiresAt)
          .to_owned(),
      )
      .await
  }

  async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .drop_table(Table::drop().table(ScriptTokens::Table).to_owned())
      .await
  }
}

#[derive(DeriveIden)]
pub enum ScriptTokens {
  Table,
  Token,
  KeyId,
  GameId,
  ScriptLocation,
  ExpiresAt,
}
