use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::common_types::TransitionKind;

/// Row form of a transition. Source, target and guard are foreign keys; the
/// action set lives in `transition_actions`.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "transitions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub machine_id: Option<String>,
    pub source_id: Option<i32>,
    pub target_id: Option<i32>,
    pub event: Option<String>,
    pub kind: Option<TransitionKind>,
    pub guard_id: Option<i32>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::states::Entity",
        from = "Column::SourceId",
        to = "super::states::Column::Id"
    )]
    Source,
    #[sea_orm(
        belongs_to = "super::states::Entity",
        from = "Column::TargetId",
        to = "super::states::Column::Id"
    )]
    Target,
    #[sea_orm(
        belongs_to = "super::guards::Entity",
        from = "Column::GuardId",
        to = "super::guards::Column::Id"
    )]
    Guards,
    #[sea_orm(has_many = "super::transition_actions::Entity")]
    TransitionActions,
}

impl Related<super::guards::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Guards.def()
    }
}

impl Related<super::transition_actions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TransitionActions.def()
    }
}

impl Related<super::actions::Entity> for Entity {
    fn to() -> RelationDef {
        super::transition_actions::Relation::Actions.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::transition_actions::Relation::Transitions.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
