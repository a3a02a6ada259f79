//! Error types for table resource operations

use indexmap::IndexMap;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Aggregated per-field validation failures
///
/// Collects every failing field with all of its rule messages, so a caller
/// can surface the full set of problems in one response instead of the
/// first failure encountered.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct ValidationErrors {
    /// Field name mapped to the messages of every rule it failed
    pub errors: IndexMap<String, Vec<String>>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a failure message for a field
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.entry(field.into()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Messages recorded for a single field, if any
    pub fn get(&self, field: &str) -> Option<&Vec<String>> {
        self.errors.get(field)
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, messages) in &self.errors {
            for message in messages {
                if !first {
                    write!(f, "; ")?;
                }
                write!(f, "{}: {}", field, message)?;
                first = false;
            }
        }
        Ok(())
    }
}

/// Errors that can occur while composing or executing a table query
#[derive(Debug, Error)]
pub enum TableError {
    /// Declared filter rules rejected the request input.
    ///
    /// Raised before any predicate touches the query; the whole request
    /// fails, never a partial application.
    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),

    /// Programmer error in a resource or filter declaration, caught at
    /// composition time rather than silently tolerated.
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("SQL error: {0}")]
    Sql(#[from] sqlx::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl TableError {
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Build a validation error for a single field
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = ValidationErrors::new();
        errors.add(field, message);
        Self::Validation(errors)
    }
}

pub type Result<T> = std::result::Result<T, TableError>;
