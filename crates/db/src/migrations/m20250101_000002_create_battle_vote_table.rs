//! Create battle vote table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(BattleVote::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(BattleVote::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(BattleVote::BattleId).string_len(32).not_null())
                    .col(ColumnDef::new(BattleVote::VoterId).string_len(192).not_null())
                    .col(ColumnDef::new(BattleVote::Choice).string_len(1).not_null())
                    .col(
                        ColumnDef::new(BattleVote::CastAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_battle_vote_battle")
                            .from(BattleVote::Table, BattleVote::BattleId)
                            .to(Battle::Table, Battle::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Unique index: (battle_id, voter_id) - one vote per voter per battle.
        // Vote insertion relies on this constraint; there is no application check.
        manager
            .create_index(
                Index::create()
                    .name("idx_battle_vote_battle_voter")
                    .table(BattleVote::Table)
                    .col(BattleVote::BattleId)
                    .col(BattleVote::VoterId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(BattleVote::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum BattleVote {
    Table,
    Id,
    BattleId,
    VoterId,
    Choice,
    CastAt,
}

#[derive(Iden)]
enum Battle {
    Table,
    Id,
}
