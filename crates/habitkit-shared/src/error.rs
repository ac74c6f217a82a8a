//! Error types for habitkit.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum HabitError {
    #[error("Store error: {0}")]
    Store(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("No authenticated user")]
    Unauthenticated,

    #[error("Invalid date: {0}")]
    InvalidDate(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl HabitError {
    /// Whether a retry (or the next refresh) may succeed without user action
    pub fn is_transient(&self) -> bool {
        matches!(self, HabitError::Store(_) | HabitError::Io(_))
    }
}

impl From<chrono::ParseError> for HabitError {
    fn from(e: chrono::ParseError) -> Self {
        HabitError::InvalidDate(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, HabitError>;
