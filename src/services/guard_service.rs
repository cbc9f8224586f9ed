use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use std::collections::HashMap;
use tracing::{debug, info, warn};

use crate::database::entities::{guards, transitions};
use crate::errors::{RepositoryError, RepositoryResult};
use crate::model::Guard;

/// Service layer for guard definitions
#[derive(Clone)]
pub struct GuardService {
    db: DatabaseConnection,
}

impl GuardService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn create(&self, name: &str, spel: Option<String>) -> RepositoryResult<Guard> {
        let model = guards::ActiveModel {
            name: Set(Some(name.to_string())),
            spel: Set(spel),
            ..Default::default()
        }
        .insert(&self.db)
        .await?;

        info!("Created guard {} ({})", name, model.id);
        Ok(model.into())
    }

    pub async fn get_by_id(&self, id: i32) -> RepositoryResult<Option<Guard>> {
        let model = guards::Entity::find_by_id(id).one(&self.db).await?;
        Ok(model.map(Guard::from))
    }

    pub async fn find_by_name(&self, name: &str) -> RepositoryResult<Option<Guard>> {
        let model = guards::Entity::find()
            .filter(guards::Column::Name.eq(name))
            .order_by_asc(guards::Column::Id)
            .one(&self.db)
            .await?;
        Ok(model.map(Guard::from))
    }

    pub async fn get_or_create(&self, name: &str, spel: Option<String>) -> RepositoryResult<Guard> {
        Ok(get_or_create_guard(&self.db, name, spel).await?)
    }

    pub async fn list(&self) -> RepositoryResult<Vec<Guard>> {
        let models = guards::Entity::find()
            .order_by_asc(guards::Column::Id)
            .all(&self.db)
            .await?;
        Ok(models.into_iter().map(Guard::from).collect())
    }

    /// Delete a guard no transition refers to
    pub async fn delete(&self, id: i32) -> RepositoryResult<()> {
        let references = transitions::Entity::find()
            .filter(transitions::Column::GuardId.eq(id))
            .count(&self.db)
            .await?;

        if references > 0 {
            warn!(
                "Refusing to delete guard {} used by {} transitions",
                id, references
            );
            return Err(RepositoryError::InUse { entity: "guard", id });
        }

        let result = guards::Entity::delete_by_id(id).exec(&self.db).await?;
        if result.rows_affected == 0 {
            return Err(RepositoryError::NotFound { entity: "guard", id });
        }

        info!("Deleted guard {}", id);
        Ok(())
    }
}

pub(crate) async fn get_or_create_guard<C: ConnectionTrait>(
    db: &C,
    name: &str,
    spel: Option<String>,
) -> Result<Guard, DbErr> {
    let existing = guards::Entity::find()
        .filter(guards::Column::Name.eq(name))
        .order_by_asc(guards::Column::Id)
        .one(db)
        .await?;

    let model = match existing {
        Some(model) if spel.is_none() || model.spel == spel => {
            debug!("Reusing guard {} ({})", name, model.id);
            model
        }
        Some(model) => {
            let mut active: guards::ActiveModel = model.into();
            active.spel = Set(spel);
            active.update(db).await?
        }
        None => {
            guards::ActiveModel {
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

pub(crate) async fn load_guard_map<C: ConnectionTrait>(
    db: &C,
    ids: Vec<i32>,
) -> Result<HashMap<i32, Guard>, DbErr> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let models = guards::Entity::find()
        .filter(guards::Column::Id.is_in(ids))
        .all(db)
        .await?;

    Ok(models
        .into_iter()
        .map(|model| (model.id, Guard::from(model)))
        .collect())
}
