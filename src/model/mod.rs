pub mod action;
pub mod document;
pub mod guard;
pub mod state;
pub mod transition;

pub use action::Action;
pub use document::{
    DocumentFormat, MachineDocument, NamedExpression, StateDefinition, TransitionDefinition,
};
pub use guard::Guard;
pub use state::State;
pub use transition::Transition;
