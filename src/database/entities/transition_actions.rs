use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Join table between transitions and the actions they execute
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "transition_actions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub transition_id: i32,
    #[sea_orm(primary_key, auto_increment = false)]
    pub action_id: i32,
    /// Insertion order within the transition's action set
    pub position: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::transitions::Entity",
        from = "Column::TransitionId",
        to = "super::transitions::Column::Id",
        on_delete = "Cascade"
    )]
    Transitions,
    #[sea_orm(
        belongs_to = "super::actions::Entity",
        from = "Column::ActionId",
        to = "super::actions::Column::Id"
    )]
    Actions,
}

impl Related<super::transitions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transitions.def()
    }
}

impl Related<super::actions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Actions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
