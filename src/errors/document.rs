use thiserror::Error;

/// Machine document errors
#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("Duplicate state '{0}'")]
    DuplicateState(String),

    #[error("Duplicate action '{0}'")]
    DuplicateAction(String),

    #[error("Duplicate guard '{0}'")]
    DuplicateGuard(String),

    #[error("Unknown state '{0}'")]
    UnknownState(String),

    #[error("Unknown action '{0}'")]
    UnknownAction(String),

    #[error("Unknown guard '{0}'")]
    UnknownGuard(String),

    /// State names itself as parent
    #[error("State '{0}' cannot be its own parent")]
    SelfParent(String),

    #[error("State '{0}' is its own ancestor")]
    ParentCycle(String),

    /// A stored row lacks a name the document format requires
    #[error("Stored {0} has no name")]
    Unnamed(&'static str),

    #[error("Unsupported document format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid JSON document: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid YAML document: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Failed to read document: {0}")]
    Io(#[from] std::io::Error),
}
