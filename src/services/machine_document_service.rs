use indexmap::IndexMap;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, DbErr,
    EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, info, warn};

use super::action_service::get_or_create_action;
use super::guard_service::get_or_create_guard;
use super::state_service::{load_states, save_state};
use super::transition_service::{delete_machine_transitions, load_transitions, save_transition};
use crate::database::entities::{state_actions, states, transitions};
use crate::errors::{DocumentError, RepositoryError, RepositoryResult};
use crate::model::{
    Action, Guard, MachineDocument, NamedExpression, State, StateDefinition, Transition,
    TransitionDefinition,
};

/// What to do when the imported machine already has stored data
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImportMode {
    /// Fail with `MachineExists`
    Create,
    /// Delete the stored states and transitions first
    Replace,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImportSummary {
    pub machine_id: String,
    pub states: usize,
    pub transitions: usize,
    pub actions: usize,
    pub guards: usize,
}

/// Imports and exports whole machine definitions
#[derive(Clone)]
pub struct MachineDocumentService {
    db: DatabaseConnection,
}

impl MachineDocumentService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Store a document in one database transaction. Actions and guards are
    /// shared between machines and reused by name.
    pub async fn import(
        &self,
        document: &MachineDocument,
        mode: ImportMode,
    ) -> RepositoryResult<ImportSummary> {
        document.validate()?;
        let machine_id = document.machine_id.as_str();

        let txn = self.db.begin().await?;

        if machine_exists(&txn, machine_id).await? {
            match mode {
                ImportMode::Create => {
                    return Err(RepositoryError::MachineExists(machine_id.to_string()));
                }
                ImportMode::Replace => {
                    let removed = delete_machine(&txn, machine_id).await?;
                    debug!("Removed {} stored rows of machine {}", removed, machine_id);
                }
            }
        }

        let mut actions: HashMap<&str, Action> = HashMap::new();
        for definition in &document.actions {
            let action =
                get_or_create_action(&txn, &definition.name, definition.spel.clone()).await?;
            actions.insert(definition.name.as_str(), action);
        }

        let mut guards: HashMap<&str, Guard> = HashMap::new();
        for definition in &document.guards {
            let guard = get_or_create_guard(&txn, &definition.name, definition.spel.clone()).await?;
            guards.insert(definition.name.as_str(), guard);
        }

        // Insert every state first so parents can be resolved by name
        let mut stored_states: HashMap<&str, State> = HashMap::new();
        for definition in &document.states {
            let state = state_from_definition(machine_id, definition, &actions);
            let saved = save_state(&txn, &state).await?;
            stored_states.insert(definition.state.as_str(), saved);
        }

        for definition in &document.states {
            let Some(parent) = &definition.parent else {
                continue;
            };
            let parent_id = stored_states.get(parent.as_str()).and_then(|s| s.id);
            if let Some(child) = stored_states.get_mut(definition.state.as_str()) {
                if let Some(id) = child.id {
                    states::ActiveModel {
                        id: Set(id),
                        parent_state_id: Set(parent_id),
                        ..Default::default()
                    }
                    .update(&txn)
                    .await?;
                }
                child.parent_state_id = parent_id;
            }
        }

        for definition in &document.transitions {
            let lookup = |name: &Option<String>| {
                name.as_deref()
                    .and_then(|name| stored_states.get(name))
                    .cloned()
            };

            let mut transition = Transition::new()
                .with_actions(
                    definition
                        .actions
                        .iter()
                        .filter_map(|name| actions.get(name.as_str()).cloned()),
                );
            transition.set_machine_id(Some(machine_id.to_string()));
            transition.set_source(lookup(&definition.source));
            transition.set_target(lookup(&definition.target));
            transition.set_event(definition.event.clone());
            transition.set_kind(definition.kind);
            transition.set_guard(
                definition
                    .guard
                    .as_deref()
                    .and_then(|name| guards.get(name))
                    .cloned(),
            );

            save_transition(&txn, &transition).await?;
        }

        txn.commit().await?;

        let summary = ImportSummary {
            machine_id: machine_id.to_string(),
            states: document.states.len(),
            transitions: document.transitions.len(),
            actions: document.actions.len(),
            guards: document.guards.len(),
        };
        info!(
            "Imported machine {}: {} states, {} transitions",
            summary.machine_id, summary.states, summary.transitions
        );
        Ok(summary)
    }

    /// Rebuild the document of a stored machine. Only the actions and guards
    /// the machine references are included.
    pub async fn export(&self, machine_id: &str) -> RepositoryResult<MachineDocument> {
        let state_rows = states::Entity::find()
            .filter(states::Column::MachineId.eq(machine_id))
            .order_by_asc(states::Column::Id)
            .all(&self.db)
            .await?;
        let transition_rows = transitions::Entity::find()
            .filter(transitions::Column::MachineId.eq(machine_id))
            .order_by_asc(transitions::Column::Id)
            .all(&self.db)
            .await?;

        if state_rows.is_empty() && transition_rows.is_empty() {
            return Err(RepositoryError::MachineNotFound(machine_id.to_string()));
        }

        let stored_states = load_states(&self.db, state_rows).await?;
        let stored_transitions = load_transitions(&self.db, transition_rows).await?;

        let names: HashMap<i32, &str> = stored_states
            .iter()
            .filter_map(|state| state.id.map(|id| (id, state.state.as_str())))
            .collect();

        let mut actions: IndexMap<String, Option<String>> = IndexMap::new();
        let mut guards: IndexMap<String, Option<String>> = IndexMap::new();

        let mut document = MachineDocument::new(machine_id);

        for state in &stored_states {
            let parent = match state.parent_state_id {
                Some(id) => Some(
                    names
                        .get(&id)
                        .map(|name| name.to_string())
                        .ok_or_else(|| DocumentError::UnknownState(format!("#{}", id)))?,
                ),
                None => None,
            };

            document.states.push(StateDefinition {
                state: state.state.clone(),
                initial: state.initial,
                kind: state.kind,
                region: state.region.clone(),
                submachine_id: state.submachine_id.clone(),
                parent,
                initial_action: state
                    .initial_action
                    .as_ref()
                    .map(|action| record_action(&mut actions, action))
                    .transpose()?,
                entry_actions: record_actions(&mut actions, &state.entry_actions)?,
                exit_actions: record_actions(&mut actions, &state.exit_actions)?,
                state_actions: record_actions(&mut actions, &state.state_actions)?,
                deferred_events: state.deferred_events.iter().cloned().collect(),
            });
        }

        for transition in &stored_transitions {
            let guard = match transition.guard() {
                Some(guard) => {
                    let name = guard.name.clone().ok_or(DocumentError::Unnamed("guard"))?;
                    guards.entry(name.clone()).or_insert_with(|| guard.spel.clone());
                    Some(name)
                }
                None => None,
            };

            document.transitions.push(TransitionDefinition {
                source: transition.source().map(|state| state.state.clone()),
                target: transition.target().map(|state| state.state.clone()),
                event: transition.event().map(str::to_string),
                kind: transition.kind(),
                guard,
                actions: record_actions(&mut actions, transition.actions())?,
            });
        }

        document.actions = into_expressions(actions);
        document.guards = into_expressions(guards);

        debug!(
            "Exported machine {} with {} states and {} transitions",
            machine_id,
            document.states.len(),
            document.transitions.len()
        );
        Ok(document)
    }

    /// Distinct machine ids with stored states or transitions
    pub async fn list_machines(&self) -> RepositoryResult<Vec<String>> {
        let mut machines = BTreeSet::new();

        for row in states::Entity::find().all(&self.db).await? {
            machines.extend(row.machine_id);
        }
        for row in transitions::Entity::find().all(&self.db).await? {
            machines.extend(row.machine_id);
        }

        Ok(machines.into_iter().collect())
    }

    /// Remove every state and transition of a machine
    pub async fn delete(&self, machine_id: &str) -> RepositoryResult<u64> {
        let txn = self.db.begin().await?;
        let removed = delete_machine(&txn, machine_id).await?;
        if removed == 0 {
            return Err(RepositoryError::MachineNotFound(machine_id.to_string()));
        }
        txn.commit().await?;

        info!("Deleted machine {} ({} rows)", machine_id, removed);
        Ok(removed)
    }
}

fn state_from_definition(
    machine_id: &str,
    definition: &StateDefinition,
    actions: &HashMap<&str, Action>,
) -> State {
    let resolve = |names: &[String]| {
        names
            .iter()
            .filter_map(|name| actions.get(name.as_str()).cloned())
            .collect()
    };

    State {
        id: None,
        machine_id: Some(machine_id.to_string()),
        state: definition.state.clone(),
        region: definition.region.clone(),
        submachine_id: definition.submachine_id.clone(),
        initial: definition.initial,
        kind: definition.kind,
        parent_state_id: None,
        initial_action: definition
            .initial_action
            .as_deref()
            .and_then(|name| actions.get(name))
            .cloned(),
        entry_actions: resolve(&definition.entry_actions),
        exit_actions: resolve(&definition.exit_actions),
        state_actions: resolve(&definition.state_actions),
        deferred_events: definition.deferred_events.iter().cloned().collect(),
    }
}

fn record_action(
    catalogue: &mut IndexMap<String, Option<String>>,
    action: &Action,
) -> Result<String, DocumentError> {
    let name = action.name.clone().ok_or(DocumentError::Unnamed("action"))?;
    catalogue
        .entry(name.clone())
        .or_insert_with(|| action.spel.clone());
    Ok(name)
}

fn record_actions<'a, I>(
    catalogue: &mut IndexMap<String, Option<String>>,
    actions: I,
) -> Result<Vec<String>, DocumentError>
where
    I: IntoIterator<Item = &'a Action>,
{
    actions
        .into_iter()
        .map(|action| record_action(catalogue, action))
        .collect()
}

fn into_expressions(catalogue: IndexMap<String, Option<String>>) -> Vec<NamedExpression> {
    catalogue
        .into_iter()
        .map(|(name, spel)| NamedExpression { name, spel })
        .collect()
}

async fn machine_exists<C: ConnectionTrait>(db: &C, machine_id: &str) -> Result<bool, DbErr> {
    let states = states::Entity::find()
        .filter(states::Column::MachineId.eq(machine_id))
        .count(db)
        .await?;
    let transitions = transitions::Entity::find()
        .filter(transitions::Column::MachineId.eq(machine_id))
        .count(db)
        .await?;
    Ok(states + transitions > 0)
}

fn outside_machine<C: ColumnTrait>(column: C, machine_id: &str) -> Condition {
    Condition::any()
        .add(column.ne(machine_id))
        .add(column.is_null())
}

async fn delete_machine<C: ConnectionTrait>(db: &C, machine_id: &str) -> RepositoryResult<u64> {
    let state_ids: Vec<i32> = states::Entity::find()
        .filter(states::Column::MachineId.eq(machine_id))
        .all(db)
        .await?
        .into_iter()
        .map(|row| row.id)
        .collect();

    if !state_ids.is_empty() {
        // Other machines may still point at these states
        let foreign_transition = transitions::Entity::find()
            .filter(outside_machine(transitions::Column::MachineId, machine_id))
            .filter(
                Condition::any()
                    .add(transitions::Column::SourceId.is_in(state_ids.clone()))
                    .add(transitions::Column::TargetId.is_in(state_ids.clone())),
            )
            .one(db)
            .await?;
        let foreign_child = states::Entity::find()
            .filter(outside_machine(states::Column::MachineId, machine_id))
            .filter(states::Column::ParentStateId.is_in(state_ids.clone()))
            .one(db)
            .await?;

        let referenced = foreign_transition
            .and_then(|row| {
                [row.source_id, row.target_id]
                    .into_iter()
                    .flatten()
                    .find(|id| state_ids.contains(id))
            })
            .or_else(|| foreign_child.and_then(|row| row.parent_state_id));
        if let Some(id) = referenced {
            warn!(
                "Refusing to delete machine {}: state {} is referenced by another machine",
                machine_id, id
            );
            return Err(RepositoryError::InUse { entity: "state", id });
        }
    }

    let removed_transitions = delete_machine_transitions(db, machine_id).await?;

    if state_ids.is_empty() {
        return Ok(removed_transitions);
    }

    state_actions::Entity::delete_many()
        .filter(state_actions::Column::StateId.is_in(state_ids.clone()))
        .exec(db)
        .await?;

    // Children point at parents of the same machine; detach before deleting
    states::Entity::update_many()
        .col_expr(
            states::Column::ParentStateId,
            sea_orm::sea_query::Expr::value(Option::<i32>::None),
        )
        .filter(states::Column::Id.is_in(state_ids.clone()))
        .exec(db)
        .await?;

    let result = states::Entity::delete_many()
        .filter(states::Column::Id.is_in(state_ids))
        .exec(db)
        .await?;

    Ok(removed_transitions + result.rows_affected)
}
