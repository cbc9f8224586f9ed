use indexmap::IndexSet;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, DbErr,
    EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use tracing::{debug, info, warn};

use super::action_service::load_action_map;
use crate::database::entities::states::encode_deferred_events;
use crate::database::entities::{state_actions, states, transitions, ActionRole};
use crate::errors::{RepositoryError, RepositoryResult};
use crate::model::{Action, State};

/// Service layer for states and the actions attached to them
#[derive(Clone)]
pub struct StateService {
    db: DatabaseConnection,
}

impl StateService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Insert a state without an id, update it otherwise. Attached actions
    /// must already be saved.
    pub async fn save(&self, state: &State) -> RepositoryResult<State> {
        let txn = self.db.begin().await?;
        let saved = save_state(&txn, state).await?;
        txn.commit().await?;

        info!(
            "Saved state {} of machine {:?} ({:?})",
            saved.state, saved.machine_id, saved.id
        );
        Ok(saved)
    }

    pub async fn get_by_id(&self, id: i32) -> RepositoryResult<Option<State>> {
        let row = states::Entity::find_by_id(id).one(&self.db).await?;
        match row {
            Some(row) => Ok(load_states(&self.db, vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    pub async fn find_by_machine_id(&self, machine_id: &str) -> RepositoryResult<Vec<State>> {
        let rows = states::Entity::find()
            .filter(states::Column::MachineId.eq(machine_id))
            .order_by_asc(states::Column::Id)
            .all(&self.db)
            .await?;

        debug!("Found {} states for machine {}", rows.len(), machine_id);
        Ok(load_states(&self.db, rows).await?)
    }

    pub async fn find_by_name(
        &self,
        machine_id: &str,
        state: &str,
    ) -> RepositoryResult<Option<State>> {
        let row = states::Entity::find()
            .filter(states::Column::MachineId.eq(machine_id))
            .filter(states::Column::State.eq(state))
            .one(&self.db)
            .await?;

        match row {
            Some(row) => Ok(load_states(&self.db, vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    /// Delete a state that no transition or child state references
    pub async fn delete(&self, id: i32) -> RepositoryResult<()> {
        let transition_refs = transitions::Entity::find()
            .filter(
                Condition::any()
                    .add(transitions::Column::SourceId.eq(id))
                    .add(transitions::Column::TargetId.eq(id)),
            )
            .count(&self.db)
            .await?;
        let child_refs = states::Entity::find()
            .filter(states::Column::ParentStateId.eq(id))
            .count(&self.db)
            .await?;

        if transition_refs + child_refs > 0 {
            warn!("Refusing to delete state {} which is still referenced", id);
            return Err(RepositoryError::InUse { entity: "state", id });
        }

        let txn = self.db.begin().await?;
        state_actions::Entity::delete_many()
            .filter(state_actions::Column::StateId.eq(id))
            .exec(&txn)
            .await?;
        let result = states::Entity::delete_by_id(id).exec(&txn).await?;
        if result.rows_affected == 0 {
            return Err(RepositoryError::NotFound { entity: "state", id });
        }
        txn.commit().await?;

        info!("Deleted state {}", id);
        Ok(())
    }
}

fn saved_action_id(action: &Action) -> RepositoryResult<i32> {
    action.id.ok_or(RepositoryError::Unsaved("state action"))
}

pub(crate) async fn save_state<C: ConnectionTrait>(db: &C, state: &State) -> RepositoryResult<State> {
    let initial_action_id = state
        .initial_action
        .as_ref()
        .map(saved_action_id)
        .transpose()?;

    let mut links = Vec::new();
    for (role, actions) in [
        (ActionRole::Entry, &state.entry_actions),
        (ActionRole::Exit, &state.exit_actions),
        (ActionRole::Do, &state.state_actions),
    ] {
        let action_ids = actions
            .iter()
            .map(saved_action_id)
            .collect::<RepositoryResult<IndexSet<i32>>>()?;
        for (position, action_id) in action_ids.into_iter().enumerate() {
            links.push((role, action_id, position as i32));
        }
    }

    let deferred_events = encode_deferred_events(&state.deferred_events);

    let row = match state.id {
        Some(id) => {
            let existing = states::Entity::find_by_id(id)
                .one(db)
                .await?
                .ok_or(RepositoryError::NotFound { entity: "state", id })?;

            let mut active: states::ActiveModel = existing.into();
            active.machine_id = Set(state.machine_id.clone());
            active.state = Set(state.state.clone());
            active.region = Set(state.region.clone());
            active.submachine_id = Set(state.submachine_id.clone());
            active.initial = Set(state.initial);
            active.kind = Set(state.kind);
            active.parent_state_id = Set(state.parent_state_id);
            active.initial_action_id = Set(initial_action_id);
            active.deferred_events = Set(deferred_events);
            active.update(db).await?
        }
        None => {
            states::ActiveModel {
                machine_id: Set(state.machine_id.clone()),
                state: Set(state.state.clone()),
                region: Set(state.region.clone()),
                submachine_id: Set(state.submachine_id.clone()),
                initial: Set(state.initial),
                kind: Set(state.kind),
                parent_state_id: Set(state.parent_state_id),
                initial_action_id: Set(initial_action_id),
                deferred_events: Set(deferred_events),
                ..Default::default()
            }
            .insert(db)
            .await?
        }
    };

    state_actions::Entity::delete_many()
        .filter(state_actions::Column::StateId.eq(row.id))
        .exec(db)
        .await?;

    for (role, action_id, position) in links {
        state_actions::ActiveModel {
            state_id: Set(row.id),
            action_id: Set(action_id),
            role: Set(role),
            position: Set(position),
            ..Default::default()
        }
        .insert(db)
        .await?;
    }

    let id = row.id;
    load_states(db, vec![row])
        .await?
        .pop()
        .ok_or(RepositoryError::NotFound { entity: "state", id })
}

/// Attach actions and deferred events to state rows, keeping row order
pub(crate) async fn load_states<C: ConnectionTrait>(
    db: &C,
    rows: Vec<states::Model>,
) -> Result<Vec<State>, DbErr> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }

    let ids: Vec<i32> = rows.iter().map(|row| row.id).collect();
    let links = state_actions::Entity::find()
        .filter(state_actions::Column::StateId.is_in(ids))
        .order_by_asc(state_actions::Column::Position)
        .all(db)
        .await?;

    let mut action_ids: Vec<i32> = links.iter().map(|link| link.action_id).collect();
    action_ids.extend(rows.iter().filter_map(|row| row.initial_action_id));
    action_ids.sort_unstable();
    action_ids.dedup();
    let actions = load_action_map(db, action_ids).await?;

    let states = rows
        .into_iter()
        .map(|row| {
            let mut state = State {
                id: Some(row.id),
                deferred_events: row.deferred_event_list().into_iter().collect(),
                initial_action: row
                    .initial_action_id
                    .and_then(|id| actions.get(&id).cloned()),
                machine_id: row.machine_id,
                state: row.state,
                region: row.region,
                submachine_id: row.submachine_id,
                initial: row.initial,
                kind: row.kind,
                parent_state_id: row.parent_state_id,
                ..Default::default()
            };

            for link in links.iter().filter(|link| link.state_id == row.id) {
                let Some(action) = actions.get(&link.action_id) else {
                    continue;
                };
                let slot = match link.role {
                    ActionRole::Entry => &mut state.entry_actions,
                    ActionRole::Exit => &mut state.exit_actions,
                    ActionRole::Do => &mut state.state_actions,
                };
                slot.insert(action.clone());
            }

            state
        })
        .collect();

    Ok(states)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::entities::StateKind;
    use crate::database::test_utils::setup_test_db;
    use crate::services::ActionService;

    #[tokio::test]
    async fn test_save_and_reload_state_with_actions() {
        let db = setup_test_db().await;
        let actions = ActionService::new(db.clone());
        let service = StateService::new(db);

        let fill = actions.create("fill", None).await.unwrap();
        let lock = actions.create("lock", None).await.unwrap();

        let mut state = State::new("washer", "RUNNING").with_kind(StateKind::Simple);
        state.entry_actions.insert(fill.clone());
        state.exit_actions.insert(lock.clone());
        state.initial_action = Some(lock.clone());
        state.deferred_events.insert("OPEN".to_string());

        let saved = service.save(&state).await.unwrap();
        assert!(saved.id.is_some());

        let loaded = service
            .find_by_name("washer", "RUNNING")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(loaded, saved);
        assert!(loaded.entry_actions.contains(&fill));
        assert!(loaded.exit_actions.contains(&lock));
        assert_eq!(loaded.initial_action, Some(lock));
        assert!(loaded.deferred_events.contains("OPEN"));
    }

    #[tokio::test]
    async fn test_stale_action_copies_share_one_entry_slot() {
        let db = setup_test_db().await;
        let actions = ActionService::new(db.clone());
        let service = StateService::new(db);

        let fill = actions.create("fill", None).await.unwrap();
        let stale = Action {
            spel: Some("water.open()".to_string()),
            ..fill.clone()
        };

        let mut state = State::new("washer", "RUNNING");
        state.entry_actions.insert(fill.clone());
        state.entry_actions.insert(stale);
        assert_eq!(state.entry_actions.len(), 2);

        let saved = service.save(&state).await.unwrap();
        assert_eq!(saved.entry_actions.len(), 1);
        assert!(saved.entry_actions.contains(&fill));
    }

    #[tokio::test]
    async fn test_update_replaces_attached_actions() {
        let db = setup_test_db().await;
        let actions = ActionService::new(db.clone());
        let service = StateService::new(db);

        let fill = actions.create("fill", None).await.unwrap();
        let drain = actions.create("drain", None).await.unwrap();

        let mut state = State::new("washer", "RUNNING");
        state.state_actions.insert(fill);
        let mut saved = service.save(&state).await.unwrap();

        saved.state_actions.clear();
        saved.state_actions.insert(drain.clone());
        saved.region = Some("main".to_string());
        let updated = service.save(&saved).await.unwrap();

        assert_eq!(updated.id, saved.id);
        assert_eq!(updated.region.as_deref(), Some("main"));
        assert_eq!(updated.state_actions.len(), 1);
        assert!(updated.state_actions.contains(&drain));
    }

    #[tokio::test]
    async fn test_unsaved_action_is_rejected() {
        let db = setup_test_db().await;
        let service = StateService::new(db);

        let mut state = State::new("washer", "IDLE");
        state.entry_actions.insert(Action::new("fill", None));

        let err = service.save(&state).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Unsaved("state action")));
        assert!(service.find_by_machine_id("washer").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_parent_state_is_refused() {
        let db = setup_test_db().await;
        let service = StateService::new(db);

        let parent = service.save(&State::new("washer", "RUNNING")).await.unwrap();
        let mut child = State::new("washer", "WASHING");
        child.parent_state_id = parent.id;
        let child = service.save(&child).await.unwrap();

        let err = service.delete(parent.id.unwrap()).await.unwrap_err();
        assert!(err.is_conflict());

        service.delete(child.id.unwrap()).await.unwrap();
        service.delete(parent.id.unwrap()).await.unwrap();
        assert!(service.find_by_machine_id("washer").await.unwrap().is_empty());
    }
}
