use thiserror::Error;

use super::DocumentError;

/// Repository errors
#[derive(Error, Debug)]
pub enum RepositoryError {
    /// Database operation failed
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// Row with the given id does not exist
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i32 },

    /// A referenced record has not been persisted yet
    #[error("Referenced {0} has not been saved")]
    Unsaved(&'static str),

    /// Row is still referenced and cannot be deleted
    #[error("{entity} {id} is still referenced")]
    InUse { entity: &'static str, id: i32 },

    /// Machine already has stored states or transitions
    #[error("Machine '{0}' already exists")]
    MachineExists(String),

    /// Nothing is stored for the machine
    #[error("Machine '{0}' not found")]
    MachineNotFound(String),

    /// Stored data could not be turned into a document
    #[error(transparent)]
    Document(#[from] DocumentError),
}

impl RepositoryError {
    /// Check if this is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            RepositoryError::NotFound { .. } | RepositoryError::MachineNotFound(_)
        )
    }

    /// Check if this is a conflict with existing data
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            RepositoryError::InUse { .. } | RepositoryError::MachineExists(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = RepositoryError::NotFound {
            entity: "transition",
            id: 3,
        };
        assert_eq!(err.to_string(), "transition 3 not found");

        let err = RepositoryError::Unsaved("source state");
        assert_eq!(err.to_string(), "Referenced source state has not been saved");
    }

    #[test]
    fn test_error_categories() {
        assert!(RepositoryError::MachineNotFound("m1".into()).is_not_found());
        assert!(RepositoryError::MachineExists("m1".into()).is_conflict());
        assert!(!RepositoryError::Unsaved("guard").is_conflict());
        assert!(!RepositoryError::Unsaved("guard").is_not_found());
    }

    #[test]
    fn test_document_error_passthrough() {
        let err: RepositoryError = DocumentError::UnknownState("S9".into()).into();
        assert_eq!(err.to_string(), "Unknown state 'S9'");
    }
}
