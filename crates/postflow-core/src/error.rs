//! Domain-level error types.

use thiserror::Error;

use crate::validation::ValidationErrors;

/// Domain errors - business logic failures.
#[derive(Debug, Error)]
pub enum DomainError {
    /// Scoped lookup miss. Carries no id so a miss caused by another owner
    /// reads exactly like a missing row.
    #[error("{entity_type} not found")]
    NotFound { entity_type: &'static str },

    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),
}

/// Repository-level errors.
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("Database connection failed: {0}")]
    Connection(String),

    #[error("Query execution failed: {0}")]
    Query(String),

    #[error("Entity not found")]
    NotFound,

    #[error("Constraint violation: {0}")]
    Constraint(String),
}
