use thiserror::Error;

/// Main error type for Traceflow operations
#[derive(Error, Debug)]
pub enum TraceflowError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("Template error: {0}")]
    Template(#[from] tera::Error),

    #[error("Failed to render statement {index} with template '{template}': {detail}")]
    StatementRender {
        index: usize,
        template: String,
        detail: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Renderer error: {0}")]
    Renderer(String),

    #[error("Unsupported platform for diagram rendering: {0}")]
    UnsupportedPlatform(String),

    #[error("Configuration validation failed: {0}")]
    Validation(String),
}

pub type Result<T> = std::result::Result<T, TraceflowError>;
