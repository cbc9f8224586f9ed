use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use std::time::Duration;

use crate::config::DatabaseSettings;

pub async fn establish_connection(settings: &DatabaseSettings) -> Result<DatabaseConnection, DbErr> {
    let database_url = get_database_url(Some(settings.path.as_str()));
    let mut opt = ConnectOptions::new(database_url);

    // Every pooled connection to an in-memory database opens its own database
    let max_connections = if settings.path == ":memory:" {
        1
    } else {
        settings.max_connections
    };

    opt.max_connections(max_connections)
        .min_connections(settings.min_connections.min(max_connections))
        .connect_timeout(Duration::from_secs(settings.connect_timeout_secs))
        .acquire_timeout(Duration::from_secs(settings.connect_timeout_secs))
        .idle_timeout(Duration::from_secs(300))
        .sqlx_logging(true)
        .sqlx_logging_level(tracing::log::LevelFilter::Debug);

    Database::connect(opt).await
}

pub fn get_database_url(database_path: Option<&str>) -> String {
    match database_path {
        Some(":memory:") => "sqlite::memory:".to_string(),
        Some(path) => format!("sqlite://{}?mode=rwc", path),
        None => "sqlite://statemachine.db?mode=rwc".to_string(),
    }
}
