pub mod actions;
pub mod common_types;
pub mod guards;
pub mod state_actions;
pub mod states;
pub mod transition_actions;
pub mod transitions;

pub use common_types::{ActionRole, StateKind, TransitionKind};
