pub mod action_service;
pub mod guard_service;
pub mod machine_document_service;
pub mod state_service;
pub mod transition_service;

pub use action_service::ActionService;
pub use guard_service::GuardService;
pub use machine_document_service::{ImportMode, ImportSummary, MachineDocumentService};
pub use state_service::StateService;
pub use transition_service::TransitionService;
