use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Actions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Actions::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Actions::Name).string())
                    .col(ColumnDef::new(Actions::Spel).text())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Guards::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Guards::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Guards::Name).string())
                    .col(ColumnDef::new(Guards::Spel).text())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(States::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(States::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(States::MachineId).string())
                    .col(ColumnDef::new(States::State).string().not_null())
                    .col(ColumnDef::new(States::Region).string())
                    .col(ColumnDef::new(States::SubmachineId).string())
                    .col(
                        ColumnDef::new(States::Initial)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(States::Kind).string())
                    .col(ColumnDef::new(States::ParentStateId).integer())
                    .col(ColumnDef::new(States::InitialActionId).integer())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_states_parent_state_id")
                            .from(States::Table, States::ParentStateId)
                            .to(States::Table, States::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_states_initial_action_id")
                            .from(States::Table, States::InitialActionId)
                            .to(Actions::Table, Actions::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_states_machine_id")
                    .table(States::Table)
                    .col(States::MachineId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("uq_states_machine_state")
                    .table(States::Table)
                    .col(States::MachineId)
                    .col(States::State)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Transitions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Transitions::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Transitions::MachineId).string())
                    .col(ColumnDef::new(Transitions::SourceId).integer())
                    .col(ColumnDef::new(Transitions::TargetId).integer())
                    .col(ColumnDef::new(Transitions::Event).string())
                    .col(ColumnDef::new(Transitions::Kind).string())
                    .col(ColumnDef::new(Transitions::GuardId).integer())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_transitions_source_id")
                            .from(Transitions::Table, Transitions::SourceId)
                            .to(States::Table, States::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_transitions_target_id")
                            .from(Transitions::Table, Transitions::TargetId)
                            .to(States::Table, States::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_transitions_guard_id")
                            .from(Transitions::Table, Transitions::GuardId)
                            .to(Guards::Table, Guards::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_transitions_machine_id")
                    .table(Transitions::Table)
                    .col(Transitions::MachineId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(TransitionActions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(TransitionActions::TransitionId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(TransitionActions::ActionId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(TransitionActions::Position)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .primary_key(
                        Index::create()
                            .col(TransitionActions::TransitionId)
                            .col(TransitionActions::ActionId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_transition_actions_transition_id")
                            .from(TransitionActions::Table, TransitionActions::TransitionId)
                            .to(Transitions::Table, Transitions::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_transition_actions_action_id")
                            .from(TransitionActions::Table, TransitionActions::ActionId)
                            .to(Actions::Table, Actions::Id),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(TransitionActions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Transitions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(States::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Guards::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Actions::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Actions {
    Table,
    Id,
    Name,
    Spel,
}

#[derive(DeriveIden)]
enum Guards {
    Table,
    Id,
    Name,
    Spel,
}

#[derive(DeriveIden)]
enum States {
    Table,
    Id,
    MachineId,
    State,
    Region,
    SubmachineId,
    Initial,
    Kind,
    ParentStateId,
    InitialActionId,
}

#[derive(DeriveIden)]
enum Transitions {
    Table,
    Id,
    MachineId,
    SourceId,
    TargetId,
    Event,
    Kind,
    GuardId,
}

#[derive(DeriveIden)]
enum TransitionActions {
    Table,
    TransitionId,
    ActionId,
    Position,
}
