use thiserror::Error;

#[derive(Error, Debug)]
pub enum PedigreeError {
    #[error("Invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PedigreeError>;
