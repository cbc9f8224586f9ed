//! Database functionality tests
//!
//! Tests for migrations and the transition repository

use anyhow::Result;
use sea_orm::{Database, DatabaseConnection, EntityTrait, PaginatorTrait};
use statemachine_data::database::entities::*;
use statemachine_data::database::setup_database;
use statemachine_data::model::{Action, Guard, State, Transition};
use statemachine_data::services::{ActionService, GuardService, StateService, TransitionService};
use statemachine_data::RepositoryError;
use tempfile::NamedTempFile;

/// Create a file-backed test database with migrations applied
async fn setup_test_db() -> Result<(DatabaseConnection, NamedTempFile)> {
    let temp_file = NamedTempFile::new()?;
    let db_url = format!("sqlite://{}?mode=rwc", temp_file.path().display());

    let db = Database::connect(&db_url).await?;
    setup_database(&db).await?;

    Ok((db, temp_file))
}

struct Washer {
    idle: State,
    running: State,
    fill: Action,
    heat: Action,
    door_closed: Guard,
}

async fn seed_washer(db: &DatabaseConnection) -> Result<Washer> {
    let states = StateService::new(db.clone());
    let actions = ActionService::new(db.clone());
    let guards = GuardService::new(db.clone());

    Ok(Washer {
        idle: states.save(&State::new("washer", "IDLE").as_initial()).await?,
        running: states.save(&State::new("washer", "RUNNING")).await?,
        fill: actions.create("fill", Some("water.open()".to_string())).await?,
        heat: actions.create("heat", None).await?,
        door_closed: guards
            .create("doorClosed", Some("door == 'closed'".to_string()))
            .await?,
    })
}

#[tokio::test]
async fn test_database_migrations() -> Result<()> {
    let (db, _temp_file) = setup_test_db().await?;

    assert_eq!(states::Entity::find().count(&db).await?, 0);
    assert_eq!(transitions::Entity::find().count(&db).await?, 0);
    assert_eq!(transition_actions::Entity::find().count(&db).await?, 0);
    assert_eq!(actions::Entity::find().count(&db).await?, 0);
    assert_eq!(guards::Entity::find().count(&db).await?, 0);
    assert_eq!(state_actions::Entity::find().count(&db).await?, 0);

    Ok(())
}

#[tokio::test]
async fn test_transition_save_and_reload() -> Result<()> {
    let (db, _temp_file) = setup_test_db().await?;
    let washer = seed_washer(&db).await?;
    let service = TransitionService::new(db.clone());

    let transition = Transition::for_machine(
        "washer",
        washer.idle.clone(),
        washer.running.clone(),
        "START",
    )
    .with_kind(TransitionKind::External)
    .with_guard(washer.door_closed.clone())
    .with_actions(vec![washer.fill.clone(), washer.heat.clone()]);

    let saved = service.save(&transition).await?;
    let id = saved.id().expect("saved transition has an id");

    let loaded = service.get_by_id(id).await?.expect("transition exists");
    assert_eq!(loaded, saved);
    assert_eq!(loaded.machine_id(), Some("washer"));
    assert_eq!(loaded.source(), Some(&washer.idle));
    assert_eq!(loaded.target(), Some(&washer.running));
    assert_eq!(loaded.event(), Some("START"));
    assert_eq!(loaded.kind(), Some(TransitionKind::External));
    assert_eq!(loaded.guard(), Some(&washer.door_closed));

    let actions: Vec<&Action> = loaded.actions().iter().collect();
    assert_eq!(actions, vec![&washer.fill, &washer.heat]);

    Ok(())
}

#[tokio::test]
async fn test_empty_transition_round_trip() -> Result<()> {
    let (db, _temp_file) = setup_test_db().await?;
    let service = TransitionService::new(db);

    let saved = service.save(&Transition::new()).await?;
    assert!(saved.id().is_some());
    assert_eq!(saved.machine_id(), None);
    assert!(saved.source().is_none());
    assert!(saved.actions().is_empty());
    assert!(saved.guard().is_none());

    Ok(())
}

#[tokio::test]
async fn test_update_replaces_action_set() -> Result<()> {
    let (db, _temp_file) = setup_test_db().await?;
    let washer = seed_washer(&db).await?;
    let service = TransitionService::new(db.clone());

    let mut saved = service
        .save(
            &Transition::for_machine("washer", washer.idle.clone(), washer.running.clone(), "START")
                .with_actions(vec![washer.fill.clone(), washer.heat.clone()]),
        )
        .await?;

    saved.set_actions([washer.heat.clone()].into_iter().collect());
    saved.set_event(Some("RESUME".to_string()));
    saved.set_guard(Some(washer.door_closed.clone()));
    let updated = service.save(&saved).await?;

    assert_eq!(updated.id(), saved.id());
    assert_eq!(updated.event(), Some("RESUME"));
    assert_eq!(updated.actions().len(), 1);
    assert!(updated.actions().contains(&washer.heat));
    assert_eq!(transition_actions::Entity::find().count(&db).await?, 1);
    assert_eq!(transitions::Entity::find().count(&db).await?, 1);

    Ok(())
}

#[tokio::test]
async fn test_copies_of_one_action_are_stored_once() -> Result<()> {
    let (db, _temp_file) = setup_test_db().await?;
    let washer = seed_washer(&db).await?;
    let service = TransitionService::new(db.clone());

    // A copy taken before the expression changed still has the same id
    let stale_fill = Action {
        spel: Some("water.close()".to_string()),
        ..washer.fill.clone()
    };
    let transition =
        Transition::for_machine("washer", washer.idle.clone(), washer.running.clone(), "START")
            .with_actions(vec![washer.fill.clone(), washer.heat.clone(), stale_fill]);
    assert_eq!(transition.actions().len(), 3);

    let saved = service.save(&transition).await?;
    let actions: Vec<&Action> = saved.actions().iter().collect();
    assert_eq!(actions, vec![&washer.fill, &washer.heat]);
    assert_eq!(transition_actions::Entity::find().count(&db).await?, 2);

    Ok(())
}

#[tokio::test]
async fn test_unsaved_references_are_rejected() -> Result<()> {
    let (db, _temp_file) = setup_test_db().await?;
    let washer = seed_washer(&db).await?;
    let service = TransitionService::new(db.clone());

    let unsaved_target = Transition::for_machine(
        "washer",
        washer.idle.clone(),
        State::new("washer", "DRYING"),
        "DRY",
    );
    assert!(matches!(
        service.save(&unsaved_target).await,
        Err(RepositoryError::Unsaved("target state"))
    ));

    let unsaved_action =
        Transition::for_machine("washer", washer.idle.clone(), washer.running.clone(), "START")
            .with_actions(vec![Action::new("spin", None)]);
    assert!(matches!(
        service.save(&unsaved_action).await,
        Err(RepositoryError::Unsaved("action"))
    ));

    assert_eq!(transitions::Entity::find().count(&db).await?, 0);
    Ok(())
}

#[tokio::test]
async fn test_find_by_machine_and_event() -> Result<()> {
    let (db, _temp_file) = setup_test_db().await?;
    let washer = seed_washer(&db).await?;
    let states = StateService::new(db.clone());
    let service = TransitionService::new(db.clone());

    let off = states.save(&State::new("dryer", "OFF")).await?;
    let on = states.save(&State::new("dryer", "ON")).await?;

    service
        .save(&Transition::for_machine("washer", washer.idle.clone(), washer.running.clone(), "START"))
        .await?;
    service
        .save(&Transition::for_machine("washer", washer.running.clone(), washer.idle.clone(), "STOP"))
        .await?;
    service
        .save(&Transition::for_machine("dryer", off, on, "START"))
        .await?;

    let washer_transitions = service.find_by_machine_id("washer").await?;
    let events: Vec<&str> = washer_transitions
        .iter()
        .filter_map(|transition| transition.event())
        .collect();
    assert_eq!(events, vec!["START", "STOP"]);

    let starts = service.find_by_event("dryer", "START").await?;
    assert_eq!(starts.len(), 1);
    assert_eq!(starts[0].source().map(|s| s.state.as_str()), Some("OFF"));

    assert_eq!(service.count_by_machine_id("washer").await?, 2);
    assert_eq!(service.list().await?.len(), 3);
    assert!(service.find_by_machine_id("unknown").await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_delete_transitions() -> Result<()> {
    let (db, _temp_file) = setup_test_db().await?;
    let washer = seed_washer(&db).await?;
    let service = TransitionService::new(db.clone());

    let first = service
        .save(
            &Transition::for_machine("washer", washer.idle.clone(), washer.running.clone(), "START")
                .with_actions(vec![washer.fill.clone()]),
        )
        .await?;
    service
        .save(&Transition::for_machine("washer", washer.running.clone(), washer.idle.clone(), "STOP"))
        .await?;

    let id = first.id().expect("saved transition has an id");
    service.delete(id).await?;
    assert!(service.get_by_id(id).await?.is_none());
    assert_eq!(transition_actions::Entity::find().count(&db).await?, 0);

    let err = service.delete(id).await.unwrap_err();
    assert!(err.is_not_found());

    assert_eq!(service.delete_by_machine_id("washer").await?, 1);
    assert_eq!(service.count_by_machine_id("washer").await?, 0);

    Ok(())
}

#[tokio::test]
async fn test_referenced_rows_cannot_be_deleted() -> Result<()> {
    let (db, _temp_file) = setup_test_db().await?;
    let washer = seed_washer(&db).await?;
    let service = TransitionService::new(db.clone());

    service
        .save(
            &Transition::for_machine("washer", washer.idle.clone(), washer.running.clone(), "START")
                .with_guard(washer.door_closed.clone())
                .with_actions(vec![washer.fill.clone()]),
        )
        .await?;

    let state_err = StateService::new(db.clone())
        .delete(washer.idle.id.expect("saved state"))
        .await
        .unwrap_err();
    assert!(state_err.is_conflict());

    let action_err = ActionService::new(db.clone())
        .delete(washer.fill.id.expect("saved action"))
        .await
        .unwrap_err();
    assert!(action_err.is_conflict());

    let guard_err = GuardService::new(db.clone())
        .delete(washer.door_closed.id.expect("saved guard"))
        .await
        .unwrap_err();
    assert!(guard_err.is_conflict());

    ActionService::new(db.clone())
        .delete(washer.heat.id.expect("saved action"))
        .await?;

    Ok(())
}
