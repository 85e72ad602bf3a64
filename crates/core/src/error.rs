#[derive(Debug, thiserror::Error)]
pub enum NoteError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("note not found: {0}")]
    NotFound(String),
    #[error("failed to create storage directory: {0}")]
    StorageDirCreation(std::io::Error),
    #[error("failed to create note directory: {0}")]
    NoteDirCreation(std::io::Error),
    #[error("failed to write note file: {0}")]
    FileWrite(std::io::Error),
    #[error("failed to read note file: {0}")]
    FileRead(std::io::Error),
    #[error("failed to delete note: {0}")]
    FileDelete(std::io::Error),
    #[error("failed to serialize note: {0}")]
    Serialization(serde_json::Error),
    #[error("translation error: {0}")]
    Translation(String),

    #[error("sections error: {0}")]
    Sections(#[from] medical_sections::SectionsError),

    #[error("structuring service failed: {0}")]
    Upstream(String),
}

pub type NoteResult<T> = std::result::Result<T, NoteError>;
