use sea_orm_migration::prelude::*;

use super::m20261012_000001_create_users::Users;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
  async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .create_table(
        Table::create()
          .table(LicenseKeys::Table)
          .if_not_exists()
          .col(
            ColumnDef::new(LicenseKeys::Id)
              .integer()
              .not_null()
              .auto_increment()
              .primary_key(),
          )
          .col(ColumnDef::new(LicenseKeys::Value).string().not_null().unique_key())
          .col(
            ColumnDef::new(LicenseKeys::KeyType)
              .string()
              .not_null()
              .default("daily"),
          )
          .col(ColumnDef::new(LicenseKeys::OwnerId).integer().null())
          .col(ColumnDef::new(LicenseKeys::Hwid).string().null())
          .col(
            ColumnDef::new(LicenseKeys::HwidLocked)
              .boolean()
              .not_null()
              .default(false),
          )
          .col(ColumnDef::new(LicenseKeys::HwidLockedAt).date_time().null())
          .col(
            ColumnDef::new(LicenseKeys::IsActive)
              .boolean()
              .not_null()
              .default(true),
          )
          .col(ColumnDef::new(LicenseKeys::ExpiresAt).date_time().null())
          .col(ColumnDef::new(LicenseKeys::CreatedAt).date_time().not_null())
          .col(ColumnDef::new(LicenseKeys::LastUsedAt).date_time().null())
          .col(ColumnDef::new(LicenseKeys::LastUsedIp).string().null())
          .col(ColumnDef::new(LicenseKeys::LastExecutor).string().null())
          .col(
            ColumnDef::new(LicenseKeys::TotalUses)
              .big_integer()
              .not_null()
              .default(0),
          )
          .foreign_key(
            ForeignKey::create()
              .name("fk_license_keys_owner")
              .from(LicenseKeys::Table, LicenseKeys::OwnerId)
              .to(Users::Table, Users::Id)
              .on_delete(ForeignKeyAction::SetNull),
          )
          .to_owned(),
      )
      .await?;

    manager
      .create_index(
        Index::create()
          .name("idx_license_keys_owner")
          .table(LicenseKeys::Table)
          .col(LicenseKeys::OwnerId)
          .to_owned(),
      )
      .await
  }

  async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager.drop_table(Table::drop().table(LicenseKeys::Table).to_owned()).await
  }
}

#[derive(DeriveIden)]
pub enum LicenseKeys {
  Table,
  Id,
  Value,
  KeyType,
  OwnerId,
  Hwid,
  HwidLocked,
  HwidLockedAt,
  IsActive,
  ExpiresAt,
  CreatedAt,
  LastUsedAt,
  LastUsedIp,
  LastExecutor,
  TotalUses,
}
