use serde::{Deserialize, Serialize};
use std::fmt;

use crate::database::entities::guards;

/// A guard predicate evaluated by the engine before a transition fires
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Guard {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i32>,
    pub name: Option<String>,
    pub spel: Option<String>,
}

impl Guard {
    pub fn new(name: impl Into<String>, spel: Option<String>) -> Self {
        Self {
            id: None,
            name: Some(name.into()),
            spel,
        }
    }
}

impl From<guards::Model> for Guard {
    fn from(model: guards::Model) -> Self {
        Self {
            id: Some(model.id),
            name: model.name,
            spel: model.spel,
        }
    }
}

impl fmt::Display for Guard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.name, self.id) {
            (Some(name), _) => f.write_str(name),
            (None, Some(id)) => write!(f, "guard#{}", id),
            (None, None) => f.write_str("guard"),
        }
    }
}
