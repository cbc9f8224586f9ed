use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Named action executed by the engine when a transition fires or a state is
/// entered or exited. `spel` holds the expression evaluated by the engine.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "actions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: Option<String>,
    pub spel: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::transition_actions::Entity")]
    TransitionActions,
    #[sea_orm(has_many = "super::state_actions::Entity")]
    StateActions,
}

impl Related<super::transition_actions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TransitionActions.def()
    }
}

impl Related<super::state_actions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::StateActions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
