//! Create battle table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Battle::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Battle::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Battle::Title).string_len(256).not_null())
                    .col(ColumnDef::new(Battle::Description).text())
                    .col(
                        ColumnDef::new(Battle::BattleType)
                            .string_len(16)
                            .not_null()
                            .default("custom"),
                    )
                    .col(ColumnDef::new(Battle::OptionA).json().not_null())
                    .col(ColumnDef::new(Battle::OptionB).json().not_null())
                    .col(
                        ColumnDef::new(Battle::OptionAIdentifier)
                            .string_len(256)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Battle::OptionBIdentifier)
                            .string_len(256)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Battle::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(Battle::EndsAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(Battle::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .to_owned(),
            )
            .await?;

        // Index: created_at (newest-first listings)
        manager
            .create_index(
                Index::create()
                    .name("idx_battle_created_at")
                    .table(Battle::Table)
                    .col(Battle::CreatedAt)
                    .to_owned(),
            )
            .await?;

        // Index: (is_active, battle_type) for filtered active listings
        manager
            .create_index(
                Index::create()
                    .name("idx_battle_active_type")
                    .table(Battle::Table)
                    .col(Battle::IsActive)
                    .col(Battle::BattleType)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Battle::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Battle {
    Table,
    Id,
    Title,
    Description,
    BattleType,
    OptionA,
    OptionB,
    OptionAIdentifier,
    OptionBIdentifier,
    CreatedAt,
    EndsAt,
    IsActive,
}
