use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
  async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .create_table(
        Table::create()
          .table(Blacklist::Table)
          .if_not_exists()
          .col(
            ColumnDef::new(Blacklist::Id)
              .integer()
              .not_null()
              .auto_increment()
              .primary_key(),
          )
          .col(ColumnDef::new(Blacklist::Kind).string().not_null())
          .col(ColumnDef::new(Blacklist::Value).string().not_null())
          .col(ColumnDef::new(Blacklist::Reason).string().null())
          .col(ColumnDef::new(Blacklist::CreatedAt).date_time().not_null())
          .to_owned(),
      )
      .await?;

    manager
      .create_index(
        Index::create()
          .name("idx_blacklist_kind_value")
          .table(Blacklist::Table)
          .col(Blacklist::Kind)
          .col(Blacklist::Value)
          .unique()
          .to_owned(),
      )
      .await
  }

  async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager.drop_table(Table::drop().table(Blacklist::Table).to_owned()).await
  }
}

#[derive(DeriveIden)]
pub enum Blacklist {
  Table,
  Id,
  Kind,
  Value,
  Reason,
  CreatedAt,
}
