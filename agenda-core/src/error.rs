//! Error types for the agenda core.

use thiserror::Error;

use crate::category::CategoryId;
use crate::event::EventId;

/// Errors that can occur while fetching or mutating calendar state.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AgendaError {
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("A change to event {0} is still being saved")]
    MutationInProgress(EventId),

    #[error("Event not found: {0}")]
    EventNotFound(EventId),

    #[error("Category not found: {0}")]
    CategoryNotFound(CategoryId),

    #[error("Category {0} is still used by events")]
    CategoryInUse(CategoryId),

    #[error("Session rejected by server: {0}")]
    Unauthorized(String),

    #[error("Remote error: {0}")]
    Remote(String),

    #[error("Request timed out after {0}s")]
    Timeout(u64),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type alias for agenda operations.
pub type AgendaResult<T> = Result<T, AgendaError>;
