use sea_orm_migration::prelude::*;

use super::m20261012_000002_create_license_keys::LicenseKeys;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
  async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .create_table(
        Table::create()
          .table(Providers::Table)
          .if_not_exists()
          .col(ColumnDef::new(Providers::Id).string().not_null().primary_key())
          .col(ColumnDef::new(Providers::Name).string().not_null())
          .col(ColumnDef::new(Providers::IsActive).boolean().not_null().default(true))
          .col(
            ColumnDef::new(Providers::KeyDurationDays)
              .integer()
              .not_null()
              .default(1),
          )
          .col(
            ColumnDef::new(Providers::IpCheck)
              .string()
              .not_null()
              .default("none"),
          )
          .col(
            ColumnDef::new(Providers::TotalCompletions)
              .big_integer()
              .not_null()
              .default(0),
          )
          .col(ColumnDef::new(Providers::CreatedAt).date_time().not_null())
          .to_owned(),
      )
      .await?;

    manager
      .create_table(
        Table::create()
          .table(ProviderSessions::Table)
          .if_not_exists()
          .col(
            ColumnDef::new(ProviderSessions::SessionId)
              .string()
              .not_null()
              .primary_key(),
          )
          .col(ColumnDef::new(ProviderSessions::Provider).string().not_null())
          .col(ColumnDef::new(ProviderSessions::DiscordId).string().null())
          .col(
            ColumnDef::new(ProviderSessions::Status)
              .string()
              .not_null()
              .default("pending"),
          )
          .col(ColumnDef::new(ProviderSessions::ProviderToken).string().null())
          .col(ColumnDef::new(ProviderSessions::IpAddress).string().null())
          .col(ColumnDef::new(ProviderSessions::KeyId).integer().null())
          .col(ColumnDef::new(ProviderSessions::KeyValue).string().null())
          .col(ColumnDef::new(ProviderSessions::CreatedAt).date_time().not_null())
          .col(ColumnDef::new(ProviderSessions::StartedAt).date_time().null())
          .col(ColumnDef::new(ProviderSessions::CompletedAt).date_time().null())
          .col(ColumnDef::new(ProviderSessions::ExpiresAt).date_time().not_null())
          .foreign_key(
            ForeignKey::create()
              .name("fk_provider_sessions_provider")
              .from(ProviderSessions::Table, ProviderSessions::Provider)
              .to(Providers::Table, Providers::Id)
              .on_delete(ForeignKeyAction::Cascade),
          )
          .foreign_key(
            ForeignKey::create()
              .name("fk_provider_sessions_key")
              .from(ProviderSessions::Table, ProviderSessions::KeyId)
              .to(LicenseKeys::Table, LicenseKeys::Id)
              .on_delete(ForeignKeyAction::SetNull),
          )
          .to_owned(),
      )
      .await?;

    let seed = Query::insert()
      .into_table(Providers::Table)
      .columns([
        Providers::Id,
        Providers::Name,
        Providers::IsActive,
        Providers::KeyDurationDays,
        Providers::IpCheck,
        Providers::TotalCompletions,
        Providers::CreatedAt,
      ])
      .values_panic([
        "workink".into(),
        "Work.ink".into(),
        false.into(),
        1.into(),
        "none".into(),
        0.into(),
        Expr::current_timestamp().into(),
      ])
      .values_panic([
        "platoboost".into(),
        "Platoboost".into(),
        false.into(),
        1.into(),
        "none".into(),
        0.into(),
        Expr::current_timestamp().into(),
      ])
      .values_panic([
        "linkvertise".into(),
        "Linkvertise".into(),
        false.into(),
        1.into(),
        "none".into(),
        0.into(),
        Expr::current_timestamp().into(),
      ])
      .values_panic([
        "lootlabs".into(),
        "LootLabs".into(),
        false.into(),
        1.into(),
        "none".into(),
        0.into(),
        Expr::current_timestamp().into(),
      ])
      .to_owned();

    manager.exec_stmt(seed).await
  }

  async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .drop_table(Table::drop().table(ProviderSessions::Table).to_owned())
      .await?;
    manager.drop_table(Table::drop().table(Providers::Table).to_owned()).await
  }
}

#[derive(DeriveIden)]
pub enum Providers {
  Table,
  Id,
  Name,
  IsActive,
  KeyDurationDays,
  IpCheck,
  TotalCompletions,
  CreatedAt,
}

#[derive(DeriveIden)]
pub enum ProviderSessions {
  Table,
  SessionId,
  Provider,
  DiscordId,
  Status,
  ProviderToken,
  IpAddress,
  KeyId,
  KeyValue,
  CreatedAt,
  StartedAt,
  CompletedAt,
  ExpiresAt,
}
