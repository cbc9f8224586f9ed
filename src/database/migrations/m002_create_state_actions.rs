use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(StateActions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(StateActions::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(StateActions::StateId).integer().not_null())
                    .col(ColumnDef::new(StateActions::ActionId).integer().not_null())
                    .col(ColumnDef::new(StateActions::Role).string().not_null())
                    .col(
                        ColumnDef::new(StateActions::Position)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_state_actions_state_id")
                            .from(StateActions::Table, StateActions::StateId)
                            .to(States::Table, States::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_state_actions_action_id")
                            .from(StateActions::Table, StateActions::ActionId)
                            .to(Actions::Table, Actions::Id),
                    )
                    .to_owned(),
            )
            .await?;

        // One row per (state, action, slot)
        manager
            .create_index(
                Index::create()
                    .name("uq_state_actions_state_action_role")
                    .table(StateActions::Table)
                    .col(StateActions::StateId)
                    .col(StateActions::ActionId)
                    .col(StateActions::Role)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .alter_table(
                Table::alter()
                    .table(States::Table)
                    .add_column(ColumnDef::new(States::DeferredEvents).text())
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .alter_table(
                Table::alter()
                    .table(States::Table)
                    .drop_column(States::DeferredEvents)
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(StateActions::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum StateActions {
    Table,
    Id,
    StateId,
    ActionId,
    Role,
    Position,
}

#[derive(DeriveIden)]
enum States {
    Table,
    Id,
    DeferredEvents,
}

#[derive(DeriveIden)]
enum Actions {
    Table,
    Id,
}
