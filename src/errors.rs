// ABOUTME: Error types for the stagdeck library
// ABOUTME: Provides structured error handling for theme loading, expressions and deck assembly

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DeckError {
    #[error("Path security violation: {0}")]
    PathSecurityError(String),

    #[error("Theme load error: {0}")]
    ThemeLoadError(String),

    #[error("Expression error: {0}")]
    ExpressionError(String),

    #[error("Invalid theme JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Failed to read file: {0}")]
    FileReadError(#[from] std::io::Error),

    #[error("Path not found: {0}")]
    PathNotFoundError(PathBuf),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Slide not found: {0}")]
    SlideNotFoundError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Unknown error: {0}")]
    UnknownError(String),
}

impl From<anyhow::Error> for DeckError {
    fn from(err: anyhow::Error) -> Self {
        DeckError::UnknownError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, DeckError>;
