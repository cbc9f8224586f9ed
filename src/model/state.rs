use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::Action;
use crate::database::entities::StateKind;

/// A state of a machine definition together with its attached actions
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct State {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i32>,
    pub machine_id: Option<String>,
    pub state: String,
    pub region: Option<String>,
    pub submachine_id: Option<String>,
    #[serde(default)]
    pub initial: bool,
    pub kind: Option<StateKind>,
    pub parent_state_id: Option<i32>,
    pub initial_action: Option<Action>,
    #[serde(default)]
    pub entry_actions: IndexSet<Action>,
    #[serde(default)]
    pub exit_actions: IndexSet<Action>,
    #[serde(default)]
    pub state_actions: IndexSet<Action>,
    #[serde(default)]
    pub deferred_events: IndexSet<String>,
}

impl State {
    pub fn new(machine_id: impl Into<String>, state: impl Into<String>) -> Self {
        Self {
            machine_id: Some(machine_id.into()),
            state: state.into(),
            ..Default::default()
        }
    }

    pub fn as_initial(mut self) -> Self {
        self.initial = true;
        self
    }

    pub fn with_kind(mut self, kind: StateKind) -> Self {
        self.kind = Some(kind);
        self
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.state)
    }
}
