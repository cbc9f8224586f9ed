pub mod connection;
pub mod entities;
pub mod migrations;
pub mod test_utils;

pub use connection::*;
pub use entities::*;

use sea_orm::{DatabaseConnection, DbErr};
use sea_orm_migration::MigratorTrait;

/// Apply every pending migration
pub async fn setup_database(db: &DatabaseConnection) -> Result<(), DbErr> {
    migrations::Migrator::up(db, None).await
}
