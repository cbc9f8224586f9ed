use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Classification of a transition.
///
/// Stored as upper-case text so rows stay readable from plain SQL.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransitionKind {
    /// Exits the source state and enters the target state
    #[sea_orm(string_value = "EXTERNAL")]
    External,
    /// Source and target are the same state, which is neither exited nor entered
    #[sea_orm(string_value = "INTERNAL")]
    Internal,
    /// Does not exit the containing composite state
    #[sea_orm(string_value = "LOCAL")]
    Local,
    /// Transition into the initial state of a region
    #[sea_orm(string_value = "INITIAL")]
    Initial,
}

impl TransitionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransitionKind::External => "EXTERNAL",
            TransitionKind::Internal => "INTERNAL",
            TransitionKind::Local => "LOCAL",
            TransitionKind::Initial => "INITIAL",
        }
    }
}

impl FromStr for TransitionKind {
    type Err = String;

    /// Parse a kind, ignoring case
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "EXTERNAL" => Ok(TransitionKind::External),
            "INTERNAL" => Ok(TransitionKind::Internal),
            "LOCAL" => Ok(TransitionKind::Local),
            "INITIAL" => Ok(TransitionKind::Initial),
            _ => Err(format!("unknown transition kind '{}'", s)),
        }
    }
}

impl fmt::Display for TransitionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pseudo state and regular state kinds
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StateKind {
    #[sea_orm(string_value = "SIMPLE")]
    Simple,
    #[sea_orm(string_value = "INITIAL")]
    Initial,
    #[sea_orm(string_value = "END")]
    End,
    #[sea_orm(string_value = "CHOICE")]
    Choice,
    #[sea_orm(string_value = "JUNCTION")]
    Junction,
    #[sea_orm(string_value = "FORK")]
    Fork,
    #[sea_orm(string_value = "JOIN")]
    Join,
    #[sea_orm(string_value = "HISTORY_SHALLOW")]
    HistoryShallow,
    #[sea_orm(string_value = "HISTORY_DEEP")]
    HistoryDeep,
    #[sea_orm(string_value = "ENTRY")]
    Entry,
    #[sea_orm(string_value = "EXIT")]
    Exit,
}

impl StateKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StateKind::Simple => "SIMPLE",
            StateKind::Initial => "INITIAL",
            StateKind::End => "END",
            StateKind::Choice => "CHOICE",
            StateKind::Junction => "JUNCTION",
            StateKind::Fork => "FORK",
            StateKind::Join => "JOIN",
            StateKind::HistoryShallow => "HISTORY_SHALLOW",
            StateKind::HistoryDeep => "HISTORY_DEEP",
            StateKind::Entry => "ENTRY",
            StateKind::Exit => "EXIT",
        }
    }
}

impl fmt::Display for StateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which slot of a state an action is attached to
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "lowercase")]
pub enum ActionRole {
    #[sea_orm(string_value = "entry")]
    Entry,
    #[sea_orm(string_value = "exit")]
    Exit,
    #[sea_orm(string_value = "do")]
    Do,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transition_kind_conversion() {
        assert_eq!(TransitionKind::External.as_str(), "EXTERNAL");
        assert_eq!("internal".parse(), Ok(TransitionKind::Internal));
        assert_eq!("Local".parse(), Ok(TransitionKind::Local));

        let err = "sideways".parse::<TransitionKind>().unwrap_err();
        assert_eq!(err, "unknown transition kind 'sideways'");
    }

    #[test]
    fn test_kinds_serialize_upper_case() {
        let json = serde_json::to_string(&TransitionKind::Local).unwrap();
        assert_eq!(json, "\"LOCAL\"");

        let kind: StateKind = serde_json::from_str("\"HISTORY_DEEP\"").unwrap();
        assert_eq!(kind, StateKind::HistoryDeep);

        let role: ActionRole = serde_json::from_str("\"do\"").unwrap();
        assert_eq!(role, ActionRole::Do);
    }
}
