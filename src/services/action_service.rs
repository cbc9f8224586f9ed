use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use std::collections::HashMap;
use tracing::{debug, info, warn};

use crate::database::entities::{actions, state_actions, states, transition_actions};
use crate::errors::{RepositoryError, RepositoryResult};
use crate::model::Action;

/// Service layer for the shared action catalogue
#[derive(Clone)]
pub struct ActionService {
    db: DatabaseConnection,
}

impl ActionService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn create(&self, name: &str, spel: Option<String>) -> RepositoryResult<Action> {
        let model = actions::ActiveModel {
            name: Set(Some(name.to_string())),
            spel: Set(spel),
            ..Default::default()
        }
        .insert(&self.db)
        .await?;

        info!("Created action {} ({})", name, model.id);
        Ok(model.into())
    }

    pub async fn get_by_id(&self, id: i32) -> RepositoryResult<Option<Action>> {
        let model = actions::Entity::find_by_id(id).one(&self.db).await?;
        Ok(model.map(Action::from))
    }

    pub async fn find_by_name(&self, name: &str) -> RepositoryResult<Option<Action>> {
        Ok(find_action_by_name(&self.db, name).await?)
    }

    /// Return the action with this name, creating it when missing. A given
    /// `spel` replaces the stored expression.
    pub async fn get_or_create(&self, name: &str, spel: Option<String>) -> RepositoryResult<Action> {
        Ok(get_or_create_action(&self.db, name, spel).await?)
    }

    pub async fn list(&self) -> RepositoryResult<Vec<Action>> {
        let models = actions::Entity::find()
            .order_by_asc(actions::Column::Id)
            .all(&self.db)
            .await?;
        Ok(models.into_iter().map(Action::from).collect())
    }

    /// Delete an action no transition or state refers to
    pub async fn delete(&self, id: i32) -> RepositoryResult<()> {
        let transition_refs = transition_actions::Entity::find()
            .filter(transition_actions::Column::ActionId.eq(id))
            .count(&self.db)
            .await?;
        let state_refs = state_actions::Entity::find()
            .filter(state_actions::Column::ActionId.eq(id))
            .count(&self.db)
            .await?;
        let initial_refs = states::Entity::find()
            .filter(states::Column::InitialActionId.eq(id))
            .count(&self.db)
            .await?;

        if transition_refs + state_refs + initial_refs > 0 {
            warn!("Refusing to delete action {} which is still referenced", id);
            return Err(RepositoryError::InUse {
                entity: "action",
                id,
            });
        }

        let result = actions::Entity::delete_by_id(id).exec(&self.db).await?;
        if result.rows_affected == 0 {
            return Err(RepositoryError::NotFound {
                entity: "action",
                id,
            });
        }

        info!("Deleted action {}", id);
        Ok(())
    }
}

pub(crate) async fn find_action_by_name<C: ConnectionTrait>(
    db: &C,
    name: &str,
) -> Result<Option<Action>, DbErr> {
    let model = actions::Entity::find()
        .filter(actions::Column::Name.eq(name))
        .order_by_asc(actions::Column::Id)
        .one(db)
        .await?;
    Ok(model.map(Action::from))
}

pub(crate) async fn get_or_create_action<C: ConnectionTrait>(
    db: &C,
    name: &str,
    spel: Option<String>,
) -> Result<Action, DbErr> {
    let existing = actions::Entity::find()
        .filter(actions::Column::Name.eq(name))
        .order_by_asc(actions::Column::Id)
        .one(db)
        .await?;

    let model = match existing {
        Some(model) if spel.is_none() || model.spel == spel => {
            debug!("Reusing action {} ({})", name, model.id);
            model
        }
        Some(model) => {
            let mut active: actions::ActiveModel = model.into();
            active.spel = Set(spel);
            active.update(db).await?
        }
        None => {
            actions::ActiveModel {
                name: Set(Some(name.to_string())),
                spel: Set(spel),
                ..Default::default()
            }
            .insert(db)
            .await?
        }
    };

    Ok(model.into())
}

/// Load actions by id, keyed by id
pub(crate) async fn load_action_map<C: ConnectionTrait>(
    db: &C,
    ids: Vec<i32>,
) -> Result<HashMap<i32, Action>, DbErr> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let models = actions::Entity::find()
        .filter(actions::Column::Id.is_in(ids))
        .all(db)
        .await?;

    Ok(models
        .into_iter()
        .map(|model| (model.id, Action::from(model)))
        .collect())
}
