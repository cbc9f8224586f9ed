use serde::{Deserialize, Serialize};
use std::fmt;

use crate::database::entities::actions;

/// An action executed by the engine, identified by name
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Action {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i32>,
    pub name: Option<String>,
    pub spel: Option<String>,
}

impl Action {
    pub fn new(name: impl Into<String>, spel: Option<String>) -> Self {
        Self {
            id: None,
            name: Some(name.into()),
            spel,
        }
    }
}

impl From<actions::Model> for Action {
    fn from(model: actions::Model) -> Self {
        Self {
            id: Some(model.id),
            name: model.name,
            spel: model.spel,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.name, self.id) {
            (Some(name), _) => f.write_str(name),
            (None, Some(id)) => write!(f, "action#{}", id),
            (None, None) => f.write_str("action"),
        }
    }
}
