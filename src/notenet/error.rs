use thiserror::Error;

#[derive(Error, Debug)]
pub enum NotesError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid seed: {0}")]
    InvalidSeed(String),

    #[error("Invalid document id: {0}")]
    InvalidDocId(String),

    #[error("Validation failed for {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("Document not found: {0}")]
    DocumentNotFound(String),

    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Config error: {0}")]
    Config(String),
}

impl NotesError {
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        NotesError::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, NotesError>;
