//! Error types for the repository layer
//!
//! - **RepositoryError**: persistence operations on states, transitions,
//!   actions, guards and whole machines
//! - **DocumentError**: parsing and validating machine documents
//!
//! # Examples
//!
//! ```rust
//! use statemachine_data::errors::RepositoryError;
//!
//! let err = RepositoryError::NotFound { entity: "transition", id: 42 };
//! assert!(err.is_not_found());
//!
//! let err = RepositoryError::InUse { entity: "state", id: 7 };
//! assert!(err.is_conflict());
//! ```

pub mod document;
pub mod repository;

pub use document::DocumentError;
pub use repository::RepositoryError;

/// Result type alias for repository operations
pub type RepositoryResult<T> = Result<T, RepositoryError>;
