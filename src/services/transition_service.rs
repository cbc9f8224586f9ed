use indexmap::IndexSet;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use std::collections::HashMap;
use tracing::{debug, info};

use super::action_service::load_action_map;
use super::guard_service::load_guard_map;
use super::state_service::load_states;
use crate::database::entities::{states, transition_actions, transitions};
use crate::errors::{RepositoryError, RepositoryResult};
use crate::model::{State, Transition};

/// Repository for transitions. Source, target, guard and actions are always
/// loaded together with the transition.
#[derive(Clone)]
pub struct TransitionService {
    db: DatabaseConnection,
}

impl TransitionService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Insert a transition without an id, update it otherwise. Referenced
    /// states, guard and actions must already be saved; on update the stored
    /// action set is replaced.
    pub async fn save(&self, transition: &Transition) -> RepositoryResult<Transition> {
        let txn = self.db.begin().await?;
        let saved = save_transition(&txn, transition).await?;
        txn.commit().await?;

        info!("Saved {}", saved);
        Ok(saved)
    }

    pub async fn get_by_id(&self, id: i32) -> RepositoryResult<Option<Transition>> {
        let row = transitions::Entity::find_by_id(id).one(&self.db).await?;
        match row {
            Some(row) => Ok(load_transitions(&self.db, vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    pub async fn find_by_machine_id(&self, machine_id: &str) -> RepositoryResult<Vec<Transition>> {
        let rows = transitions::Entity::find()
            .filter(transitions::Column::MachineId.eq(machine_id))
            .order_by_asc(transitions::Column::Id)
            .all(&self.db)
            .await?;

        debug!("Found {} transitions for machine {}", rows.len(), machine_id);
        Ok(load_transitions(&self.db, rows).await?)
    }

    pub async fn find_by_event(
        &self,
        machine_id: &str,
        event: &str,
    ) -> RepositoryResult<Vec<Transition>> {
        let rows = transitions::Entity::find()
            .filter(transitions::Column::MachineId.eq(machine_id))
            .filter(transitions::Column::Event.eq(event))
            .order_by_asc(transitions::Column::Id)
            .all(&self.db)
            .await?;

        Ok(load_transitions(&self.db, rows).await?)
    }

    pub async fn list(&self) -> RepositoryResult<Vec<Transition>> {
        let rows = transitions::Entity::find()
            .order_by_asc(transitions::Column::Id)
            .all(&self.db)
            .await?;

        Ok(load_transitions(&self.db, rows).await?)
    }

    pub async fn count_by_machine_id(&self, machine_id: &str) -> RepositoryResult<u64> {
        let count = transitions::Entity::find()
            .filter(transitions::Column::MachineId.eq(machine_id))
            .count(&self.db)
            .await?;
        Ok(count)
    }

    pub async fn delete(&self, id: i32) -> RepositoryResult<()> {
        let txn = self.db.begin().await?;
        transition_actions::Entity::delete_many()
            .filter(transition_actions::Column::TransitionId.eq(id))
            .exec(&txn)
            .await?;
        let result = transitions::Entity::delete_by_id(id).exec(&txn).await?;
        if result.rows_affected == 0 {
            return Err(RepositoryError::NotFound {
                entity: "transition",
                id,
            });
        }
        txn.commit().await?;

        info!("Deleted transition {}", id);
        Ok(())
    }

    /// Delete every transition of a machine, returning how many were removed
    pub async fn delete_by_machine_id(&self, machine_id: &str) -> RepositoryResult<u64> {
        let txn = self.db.begin().await?;
        let deleted = delete_machine_transitions(&txn, machine_id).await?;
        txn.commit().await?;

        info!("Deleted {} transitions of machine {}", deleted, machine_id);
        Ok(deleted)
    }
}

fn reference_id(reference: Option<&State>, what: &'static str) -> RepositoryResult<Option<i32>> {
    match reference {
        None => Ok(None),
        Some(state) => state.id.map(Some).ok_or(RepositoryError::Unsaved(what)),
    }
}

pub(crate) async fn save_transition<C: ConnectionTrait>(
    db: &C,
    transition: &Transition,
) -> RepositoryResult<Transition> {
    let source_id = reference_id(transition.source(), "source state")?;
    let target_id = reference_id(transition.target(), "target state")?;
    let guard_id = match transition.guard() {
        None => None,
        Some(guard) => Some(guard.id.ok_or(RepositoryError::Unsaved("guard"))?),
    };
    // Copies of one stored action collapse to its first position
    let action_ids = transition
        .actions()
        .iter()
        .map(|action| action.id.ok_or(RepositoryError::Unsaved("action")))
        .collect::<RepositoryResult<IndexSet<i32>>>()?;

    let row = match transition.id() {
        Some(id) => {
            let existing = transitions::Entity::find_by_id(id)
                .one(db)
                .await?
                .ok_or(RepositoryError::NotFound {
                    entity: "transition",
                    id,
                })?;

            let mut active: transitions::ActiveModel = existing.into();
            active.machine_id = Set(transition.machine_id().map(str::to_string));
            active.source_id = Set(source_id);
            active.target_id = Set(target_id);
            active.event = Set(transition.event().map(str::to_string));
            active.kind = Set(transition.kind());
            active.guard_id = Set(guard_id);
            active.update(db).await?
        }
        None => {
            transitions::ActiveModel {
                machine_id: Set(transition.machine_id().map(str::to_string)),
                source_id: Set(source_id),
                target_id: Set(target_id),
                event: Set(transition.event().map(str::to_string)),
                kind: Set(transition.kind()),
                guard_id: Set(guard_id),
                ..Default::default()
            }
            .insert(db)
            .await?
        }
    };

    transition_actions::Entity::delete_many()
        .filter(transition_actions::Column::TransitionId.eq(row.id))
        .exec(db)
        .await?;

    for (position, action_id) in action_ids.into_iter().enumerate() {
        transition_actions::Entity::insert(transition_actions::ActiveModel {
            transition_id: Set(row.id),
            action_id: Set(action_id),
            position: Set(position as i32),
        })
        .exec_without_returning(db)
        .await?;
    }

    let id = row.id;
    load_transitions(db, vec![row])
        .await?
        .pop()
        .ok_or(RepositoryError::NotFound {
            entity: "transition",
            id,
        })
}

pub(crate) async fn delete_machine_transitions<C: ConnectionTrait>(
    db: &C,
    machine_id: &str,
) -> Result<u64, DbErr> {
    let ids: Vec<i32> = transitions::Entity::find()
        .filter(transitions::Column::MachineId.eq(machine_id))
        .all(db)
        .await?
        .into_iter()
        .map(|row| row.id)
        .collect();

    if ids.is_empty() {
        return Ok(0);
    }

    transition_actions::Entity::delete_many()
        .filter(transition_actions::Column::TransitionId.is_in(ids.clone()))
        .exec(db)
        .await?;
    let result = transitions::Entity::delete_many()
        .filter(transitions::Column::Id.is_in(ids))
        .exec(db)
        .await?;

    Ok(result.rows_affected)
}

/// Resolve the references of transition rows, keeping row order
pub(crate) async fn load_transitions<C: ConnectionTrait>(
    db: &C,
    rows: Vec<transitions::Model>,
) -> Result<Vec<Transition>, DbErr> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }

    let mut state_ids: Vec<i32> = rows
        .iter()
        .flat_map(|row| [row.source_id, row.target_id])
        .flatten()
        .collect();
    state_ids.sort_unstable();
    state_ids.dedup();

    let states: HashMap<i32, State> = if state_ids.is_empty() {
        HashMap::new()
    } else {
        let state_rows = states::Entity::find()
            .filter(states::Column::Id.is_in(state_ids))
            .all(db)
            .await?;
        load_states(db, state_rows)
            .await?
            .into_iter()
            .filter_map(|state| state.id.map(|id| (id, state)))
            .collect()
    };

    let guard_ids: Vec<i32> = rows.iter().filter_map(|row| row.guard_id).collect();
    let guards = load_guard_map(db, guard_ids).await?;

    let transition_ids: Vec<i32> = rows.iter().map(|row| row.id).collect();
    let links = transition_actions::Entity::find()
        .filter(transition_actions::Column::TransitionId.is_in(transition_ids))
        .order_by_asc(transition_actions::Column::Position)
        .all(db)
        .await?;
    let actions = load_action_map(db, links.iter().map(|link| link.action_id).collect()).await?;

    let transitions = rows
        .into_iter()
        .map(|row| {
            let mut transition = Transition::new();
            transition.set_id(row.id);
            transition.set_machine_id(row.machine_id);
            transition.set_source(row.source_id.and_then(|id| states.get(&id).cloned()));
            transition.set_target(row.target_id.and_then(|id| states.get(&id).cloned()));
            transition.set_event(row.event);
            transition.set_kind(row.kind);
            transition.set_guard(row.guard_id.and_then(|id| guards.get(&id).cloned()));
            transition.set_actions(
                links
                    .iter()
                    .filter(|link| link.transition_id == row.id)
                    .filter_map(|link| actions.get(&link.action_id).cloned())
                    .collect(),
            );
            transition
        })
        .collect();

    Ok(transitions)
}
