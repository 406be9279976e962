use pedigree_core::PedigreeError;
use pedigree_store::StoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Document error: {0}")]
    Document(#[from] PedigreeError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(#[from] serde_yaml::Error),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Logging error: {0}")]
    Logging(String),
}

pub type Result<T> = std::result::Result<T, SessionError>;
