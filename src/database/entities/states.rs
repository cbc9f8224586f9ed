use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::common_types::StateKind;

/// A state of one machine definition.
///
/// `(machine_id, state)` is unique. Deferred events are kept as a JSON array
/// in `deferred_events`.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "states")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub machine_id: Option<String>,
    pub state: String,
    pub region: Option<String>,
    pub submachine_id: Option<String>,
    pub initial: bool,
    pub kind: Option<StateKind>,
    pub parent_state_id: Option<i32>,
    pub initial_action_id: Option<i32>,
    pub deferred_events: Option<String>, // JSON array
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "Entity",
        from = "Column::ParentStateId",
        to = "Column::Id"
    )]
    ParentState,
    #[sea_orm(
        belongs_to = "super::actions::Entity",
        from = "Column::InitialActionId",
        to = "super::actions::Column::Id"
    )]
    InitialAction,
    #[sea_orm(has_many = "super::state_actions::Entity")]
    StateActions,
}

impl Related<super::state_actions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::StateActions.def()
    }
}

impl Related<super::actions::Entity> for Entity {
    fn to() -> RelationDef {
        super::state_actions::Relation::Actions.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::state_actions::Relation::States.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Decode the deferred event list; malformed or missing JSON yields no events
    pub fn deferred_event_list(&self) -> Vec<String> {
        self.deferred_events
            .as_deref()
            .and_then(|raw| serde_json::from_str(raw).ok())
            .unwrap_or_default()
    }
}

/// Encode deferred events for storage, `None` when there are none
pub fn encode_deferred_events<'a, I>(events: I) -> Option<String>
where
    I: IntoIterator<Item = &'a String>,
{
    let events: Vec<&String> = events.into_iter().collect();
    if events.is_empty() {
        None
    } else {
        serde_json::to_string(&events).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(deferred_events: Option<&str>) -> Model {
        Model {
            id: 1,
            machine_id: Some("m1".to_string()),
            state: "S1".to_string(),
            region: None,
            submachine_id: None,
            initial: false,
            kind: None,
            parent_state_id: None,
            initial_action_id: None,
            deferred_events: deferred_events.map(str::to_string),
        }
    }

    #[test]
    fn test_deferred_events_decoding() {
        assert_eq!(
            row(Some(r#"["E1","E2"]"#)).deferred_event_list(),
            vec!["E1".to_string(), "E2".to_string()]
        );
        assert!(row(None).deferred_event_list().is_empty());
        assert!(row(Some("not json")).deferred_event_list().is_empty());
    }

    #[test]
    fn test_deferred_events_encoding() {
        let events = vec!["E1".to_string()];
        assert_eq!(encode_deferred_events(&events), Some(r#"["E1"]"#.to_string()));
        assert_eq!(encode_deferred_events(&Vec::<String>::new()), None);
    }
}
