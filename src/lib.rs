pub mod config;
pub mod database;
pub mod errors;
pub mod model;
pub mod services;

pub use errors::{DocumentError, RepositoryError, RepositoryResult};
pub use model::{Action, Guard, MachineDocument, State, Transition};
