use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::{Action, Guard, State};
use crate::database::entities::TransitionKind;

/// One directed transition of a state machine definition.
///
/// Holds the source and target states, the triggering event, the transition
/// kind, the guard and the actions executed when the transition fires. The
/// record performs no validation; every field may be absent. The id is
/// assigned by [`TransitionService`](crate::services::TransitionService) when
/// the transition is first saved.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    #[serde(default)]
    id: Option<i32>,
    #[serde(default)]
    machine_id: Option<String>,
    #[serde(default)]
    source: Option<State>,
    #[serde(default)]
    target: Option<State>,
    #[serde(default)]
    event: Option<String>,
    #[serde(default)]
    kind: Option<TransitionKind>,
    #[serde(default)]
    actions: IndexSet<Action>,
    #[serde(default)]
    guard: Option<Guard>,
}

impl Transition {
    /// Empty transition, every field absent
    pub fn new() -> Self {
        Self::default()
    }

    /// Transition between two states, not bound to a machine id
    pub fn between(source: State, target: State, event: impl Into<String>) -> Self {
        Self {
            source: Some(source),
            target: Some(target),
            event: Some(event.into()),
            ..Self::default()
        }
    }

    pub fn for_machine(
        machine_id: impl Into<String>,
        source: State,
        target: State,
        event: impl Into<String>,
    ) -> Self {
        Self {
            machine_id: Some(machine_id.into()),
            ..Self::between(source, target, event)
        }
    }

    pub fn with_actions<I>(mut self, actions: I) -> Self
    where
        I: IntoIterator<Item = Action>,
    {
        self.actions = actions.into_iter().collect();
        self
    }

    pub fn with_guard(mut self, guard: Guard) -> Self {
        self.guard = Some(guard);
        self
    }

    pub fn with_kind(mut self, kind: TransitionKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn id(&self) -> Option<i32> {
        self.id
    }

    pub(crate) fn set_id(&mut self, id: i32) {
        self.id = Some(id);
    }

    pub fn machine_id(&self) -> Option<&str> {
        self.machine_id.as_deref()
    }

    pub fn set_machine_id(&mut self, machine_id: Option<String>) {
        self.machine_id = machine_id;
    }

    pub fn source(&self) -> Option<&State> {
        self.source.as_ref()
    }

    pub fn set_source(&mut self, source: Option<State>) {
        self.source = source;
    }

    pub fn target(&self) -> Option<&State> {
        self.target.as_ref()
    }

    pub fn set_target(&mut self, target: Option<State>) {
        self.target = target;
    }

    pub fn event(&self) -> Option<&str> {
        self.event.as_deref()
    }

    pub fn set_event(&mut self, event: Option<String>) {
        self.event = event;
    }

    pub fn kind(&self) -> Option<TransitionKind> {
        self.kind
    }

    pub fn set_kind(&mut self, kind: Option<TransitionKind>) {
        self.kind = kind;
    }

    pub fn actions(&self) -> &IndexSet<Action> {
        &self.actions
    }

    pub fn set_actions(&mut self, actions: IndexSet<Action>) {
        self.actions = actions;
    }

    pub fn guard(&self) -> Option<&Guard> {
        self.guard.as_ref()
    }

    pub fn set_guard(&mut self, guard: Option<Guard>) {
        self.guard = guard;
    }
}

struct Field<'a, T>(Option<&'a T>);

impl<T: fmt::Display> fmt::Display for Field<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(value) => value.fmt(f),
            None => f.write_str("none"),
        }
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let actions: Vec<String> = self.actions.iter().map(ToString::to_string).collect();
        write!(
            f,
            "Transition [id={}, machine_id={}, source={}, target={}, event={}, kind={}, actions=[{}], guard={}]",
            Field(self.id.as_ref()),
            Field(self.machine_id.as_ref()),
            Field(self.source.as_ref()),
            Field(self.target.as_ref()),
            Field(self.event.as_ref()),
            Field(self.kind.as_ref()),
            actions.join(", "),
            Field(self.guard.as_ref()),
        )
    }
}
