#[cfg(test)]
use sea_orm::DatabaseConnection;

#[cfg(test)]
use crate::config::DatabaseSettings;

/// Single-connection in-memory store with the full schema applied
#[cfg(test)]
pub async fn setup_test_db() -> DatabaseConnection {
    let settings = DatabaseSettings {
        path: ":memory:".to_string(),
        ..Default::default()
    };
    let db = super::establish_connection(&settings)
        .await
        .expect("in-memory store opens");

    super::setup_database(&db)
        .await
        .expect("schema migrates");

    db
}
