use thiserror::Error;

#[derive(Debug, Error)]
pub enum MirrorError {
    #[error("config invalid or unreadable: {0}")]
    InvalidConfig(String),
    #[error("file excluded from backup: {0}")]
    ExcludedFile(String),
    #[error("source file does not exist: {0}")]
    MissingSource(String),
    #[error("invalid task folder name: {0}")]
    InvalidTask(String),
    #[error("folder does not exist: {0}")]
    MissingFolder(String),
}
