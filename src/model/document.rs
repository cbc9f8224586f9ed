//! Portable description of one machine definition.
//!
//! States, actions and guards are referenced by name, so a document carries
//! no database ids and can be moved between stores.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

use crate::database::entities::{StateKind, TransitionKind};
use crate::errors::DocumentError;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MachineDocument {
    pub machine_id: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<NamedExpression>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub guards: Vec<NamedExpression>,
    #[serde(default)]
    pub states: Vec<StateDefinition>,
    #[serde(default)]
    pub transitions: Vec<TransitionDefinition>,
}

/// Action or guard definition
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NamedExpression {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spel: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StateDefinition {
    pub state: String,
    #[serde(default)]
    pub initial: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<StateKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submachine_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_action: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entry_actions: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exit_actions: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub state_actions: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub deferred_events: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TransitionDefinition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<TransitionKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guard: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<String>,
}

/// Serialization format of a document file
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DocumentFormat {
    Json,
    Yaml,
}

impl DocumentFormat {
    pub fn from_path(path: &Path) -> Result<Self, DocumentError> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase());

        match extension.as_deref() {
            Some("json") => Ok(DocumentFormat::Json),
            Some("yaml") | Some("yml") => Ok(DocumentFormat::Yaml),
            _ => Err(DocumentError::UnsupportedFormat(path.display().to_string())),
        }
    }

    pub fn from_name(name: &str) -> Result<Self, DocumentError> {
        match name.to_ascii_lowercase().as_str() {
            "json" => Ok(DocumentFormat::Json),
            "yaml" | "yml" => Ok(DocumentFormat::Yaml),
            other => Err(DocumentError::UnsupportedFormat(other.to_string())),
        }
    }
}

impl MachineDocument {
    pub fn new(machine_id: impl Into<String>) -> Self {
        Self {
            machine_id: machine_id.into(),
            ..Default::default()
        }
    }

    pub fn from_json(content: &str) -> Result<Self, DocumentError> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn from_yaml(content: &str) -> Result<Self, DocumentError> {
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn to_json(&self) -> Result<String, DocumentError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn to_yaml(&self) -> Result<String, DocumentError> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn render(&self, format: DocumentFormat) -> Result<String, DocumentError> {
        match format {
            DocumentFormat::Json => self.to_json(),
            DocumentFormat::Yaml => self.to_yaml(),
        }
    }

    /// Read a document, choosing the format from the file extension
    pub fn parse(path: &Path) -> Result<Self, DocumentError> {
        let format = DocumentFormat::from_path(path)?;
        let content = fs::read_to_string(path)?;
        match format {
            DocumentFormat::Json => Self::from_json(&content),
            DocumentFormat::Yaml => Self::from_yaml(&content),
        }
    }

    pub fn state(&self, name: &str) -> Option<&StateDefinition> {
        self.states.iter().find(|state| state.state == name)
    }

    /// Check names are unique and every reference resolves
    pub fn validate(&self) -> Result<(), DocumentError> {
        let actions = unique_names(
            self.actions.iter().map(|a| a.name.as_str()),
            DocumentError::DuplicateAction,
        )?;
        let guards = unique_names(
            self.guards.iter().map(|g| g.name.as_str()),
            DocumentError::DuplicateGuard,
        )?;
        let states = unique_names(
            self.states.iter().map(|s| s.state.as_str()),
            DocumentError::DuplicateState,
        )?;

        let check_action = |name: &String| {
            if actions.contains(name.as_str()) {
                Ok(())
            } else {
                Err(DocumentError::UnknownAction(name.clone()))
            }
        };
        let check_state = |name: &String| {
            if states.contains(name.as_str()) {
                Ok(())
            } else {
                Err(DocumentError::UnknownState(name.clone()))
            }
        };

        for state in &self.states {
            if let Some(parent) = &state.parent {
                if parent == &state.state {
                    return Err(DocumentError::SelfParent(parent.clone()));
                }
                check_state(parent)?;
            }
            state
                .initial_action
                .iter()
                .chain(&state.entry_actions)
                .chain(&state.exit_actions)
                .chain(&state.state_actions)
                .try_for_each(check_action)?;
        }
        self.check_parent_chains()?;

        for transition in &self.transitions {
            transition
                .source
                .iter()
                .chain(&transition.target)
                .try_for_each(check_state)?;
            transition.actions.iter().try_for_each(check_action)?;
            if let Some(guard) = &transition.guard {
                if !guards.contains(guard.as_str()) {
                    return Err(DocumentError::UnknownGuard(guard.clone()));
                }
            }
        }

        Ok(())
    }

    fn check_parent_chains(&self) -> Result<(), DocumentError> {
        let parents: HashMap<&str, &str> = self
            .states
            .iter()
            .filter_map(|s| s.parent.as_deref().map(|parent| (s.state.as_str(), parent)))
            .collect();

        for state in &self.states {
            let mut seen = HashSet::from([state.state.as_str()]);
            let mut current = state.state.as_str();
            while let Some(&parent) = parents.get(current) {
                if !seen.insert(parent) {
                    return Err(DocumentError::ParentCycle(parent.to_string()));
                }
                current = parent;
            }
        }
        Ok(())
    }
}

fn unique_names<'a, I, F>(names: I, duplicate: F) -> Result<HashSet<&'a str>, DocumentError>
where
    I: IntoIterator<Item = &'a str>,
    F: Fn(String) -> DocumentError,
{
    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(name) {
            return Err(duplicate(name.to_string()));
        }
    }
    Ok(seen)
}

#[cfg(test)]
mod tests {
    use super::*;

    const WASHER: &str = r#"
machine_id: washer
actions:
  - name: fill
    spel: "water.open()"
  - name: drain
guards:
  - name: doorClosed
    spel: "door == 'closed'"
states:
  - state: IDLE
    initial: true
  - state: RUNNING
    entry_actions: [fill]
    deferred_events: [OPEN]
  - state: WASHING
    parent: RUNNING
transitions:
  - source: IDLE
    target: RUNNING
    event: START
    kind: EXTERNAL
    guard: doorClosed
    actions: [fill]
  - source: RUNNING
    target: IDLE
    event: STOP
    actions: [drain]
"#;

    #[test]
    fn test_parse_yaml_document() {
        let doc = MachineDocument::from_yaml(WASHER).unwrap();
        assert_eq!(doc.machine_id, "washer");
        assert_eq!(doc.states.len(), 3);
        assert!(doc.state("IDLE").unwrap().initial);
        assert_eq!(doc.state("WASHING").unwrap().parent.as_deref(), Some("RUNNING"));
        assert_eq!(doc.transitions[0].kind, Some(TransitionKind::External));
        assert_eq!(doc.transitions[1].kind, None);
        doc.validate().unwrap();
    }

    #[test]
    fn test_json_and_yaml_agree() {
        let doc = MachineDocument::from_yaml(WASHER).unwrap();
        let json = doc.to_json().unwrap();
        assert_eq!(MachineDocument::from_json(&json).unwrap(), doc);
    }

    #[test]
    fn test_validate_rejects_unknown_references() {
        let mut doc = MachineDocument::from_yaml(WASHER).unwrap();
        doc.transitions[0].target = Some("SPINNING".to_string());
        assert!(matches!(
            doc.validate(),
            Err(DocumentError::UnknownState(name)) if name == "SPINNING"
        ));

        let mut doc = MachineDocument::from_yaml(WASHER).unwrap();
        doc.transitions[1].guard = Some("lidOpen".to_string());
        assert!(matches!(doc.validate(), Err(DocumentError::UnknownGuard(_))));

        let mut doc = MachineDocument::from_yaml(WASHER).unwrap();
        doc.states[1].exit_actions.push("rinse".to_string());
        assert!(matches!(doc.validate(), Err(DocumentError::UnknownAction(_))));
    }

    #[test]
    fn test_validate_rejects_duplicates_and_self_parent() {
        let mut doc = MachineDocument::from_yaml(WASHER).unwrap();
        doc.states.push(StateDefinition {
            state: "IDLE".to_string(),
            ..Default::default()
        });
        assert!(matches!(doc.validate(), Err(DocumentError::DuplicateState(_))));

        let mut doc = MachineDocument::from_yaml(WASHER).unwrap();
        doc.states[0].parent = Some("IDLE".to_string());
        assert!(matches!(doc.validate(), Err(DocumentError::SelfParent(_))));
    }

    #[test]
    fn test_validate_rejects_parent_cycles() {
        let mut doc = MachineDocument::from_yaml(WASHER).unwrap();
        doc.states[1].parent = Some("WASHING".to_string());
        assert!(matches!(doc.validate(), Err(DocumentError::ParentCycle(_))));

        // A chain that ends at a root is fine
        let mut doc = MachineDocument::from_yaml(WASHER).unwrap();
        doc.states[1].parent = Some("IDLE".to_string());
        doc.validate().unwrap();
    }

    #[test]
    fn test_format_detection() {
        assert_eq!(
            DocumentFormat::from_path(Path::new("washer.YML")).unwrap(),
            DocumentFormat::Yaml
        );
        assert_eq!(
            DocumentFormat::from_path(Path::new("washer.json")).unwrap(),
            DocumentFormat::Json
        );
        assert!(DocumentFormat::from_path(Path::new("washer.xml")).is_err());
        assert!(DocumentFormat::from_name("toml").is_err());
    }
}
