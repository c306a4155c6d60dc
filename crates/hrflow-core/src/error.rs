use thiserror::Error;

#[derive(Debug, Error)]
pub enum HrflowError {
    // Simulation errors
    #[error("No start node found")]
    NoStartNode,

    #[error("Simulation cancelled")]
    Cancelled,

    // Document errors
    #[error("Invalid workflow file: {0}")]
    InvalidDocument(String),

    #[error("Invalid attributes for node {node}: {message}")]
    InvalidAttributes { node: String, message: String },

    // Config errors
    #[error("Config error: {0}")]
    Config(String),

    #[error("Config file not found: {0}")]
    ConfigNotFound(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // JSON errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, HrflowError>;
