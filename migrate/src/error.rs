//! Error types for the migration pipeline.
//!
//! The hierarchy mirrors the pipeline stages:
//!
//! - [`ValidationError`] - a single field could not be read or coerced
//! - [`DataIntegrityError`] - rows contradict a uniqueness assumption
//! - [`AssemblyError`] - either of the above, tagged with entity and key
//! - [`SourceError`] - row dumps could not be read
//! - [`SchemaError`] - assembled documents failed JSON Schema validation
//! - [`ExportError`] - documents could not be written
//! - [`ConfigError`] - environment configuration is malformed
//! - [`MigrateError`] - top-level orchestration errors
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.

use thiserror::Error;

use crate::models::Entity;

// =============================================================================
// Field Validation Errors
// =============================================================================

/// A field value that cannot be turned into its document form.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Date/time value that no accepted format recognizes.
    #[error("Invalid date in field '{field}': {value}")]
    InvalidDate { field: String, value: String },

    /// Non-null, non-numeric element in a numeric list.
    #[error("Non-numeric value in field '{field}': {value}")]
    NonNumeric { field: String, value: String },

    /// Required column absent or null.
    #[error("Missing required field: {0}")]
    MissingField(String),

    /// Value present but of an unusable type.
    #[error("Invalid value for field '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

impl ValidationError {
    pub fn invalid_date(field: &str, value: impl ToString) -> Self {
        Self::InvalidDate {
            field: field.to_string(),
            value: value.to_string(),
        }
    }

    pub fn non_numeric(field: &str, value: impl ToString) -> Self {
        Self::NonNumeric {
            field: field.to_string(),
            value: value.to_string(),
        }
    }

    pub fn invalid_value(field: &str, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

// =============================================================================
// Data Integrity Errors
// =============================================================================

/// Rows that violate the one-document-per-key assumption.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DataIntegrityError {
    /// Two rows share a primary key but disagree on parent fields.
    #[error("Duplicate {entity} id {key}: {detail}")]
    DuplicateKey {
        entity: Entity,
        key: String,
        detail: String,
    },
}

// =============================================================================
// Assembly Errors
// =============================================================================

/// Failure while folding rows of one entity into documents.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssemblyError {
    /// A row field failed validation.
    #[error("{entity} row (id {key}): {source}")]
    Validation {
        entity: Entity,
        key: String,
        #[source]
        source: ValidationError,
    },

    /// The rows of an entity contradict each other.
    #[error(transparent)]
    Integrity(#[from] DataIntegrityError),
}

impl AssemblyError {
    /// The entity whose pipeline failed.
    pub fn entity(&self) -> Entity {
        match self {
            Self::Validation { entity, .. } => *entity,
            Self::Integrity(DataIntegrityError::DuplicateKey { entity, .. }) => *entity,
        }
    }

    /// The offending group key, as rendered in the message.
    pub fn key(&self) -> &str {
        match self {
            Self::Validation { key, .. } => key,
            Self::Integrity(DataIntegrityError::DuplicateKey { key, .. }) => key,
        }
    }
}

// =============================================================================
// Source Errors
// =============================================================================

/// Errors while loading row dumps.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Failed to read file.
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// No dump for the entity in the input directory.
    #[error("No row dump for {entity} in {dir} (expected {expected})")]
    MissingInput {
        entity: Entity,
        dir: String,
        expected: String,
    },

    /// Invalid CSV content.
    #[error("Line {line}: {message}")]
    Csv { line: usize, message: String },

    /// Invalid JSON content.
    #[error("Invalid JSON rows: {0}")]
    Json(#[from] serde_json::Error),

    /// JSON dump is not an array of objects.
    #[error("Row dump must be an array of objects: {0}")]
    NotRows(String),
}

// =============================================================================
// Schema Errors
// =============================================================================

/// Documents rejected by the embedded JSON Schemas.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// One or more documents failed validation.
    #[error("{count} {entity} document(s) failed schema validation; first: {first}")]
    Invalid {
        entity: Entity,
        count: usize,
        first: String,
    },

    /// Documents could not be turned into JSON for validation.
    #[error("Cannot serialize documents: {0}")]
    Serialize(#[from] serde_json::Error),
}

// =============================================================================
// Export Errors
// =============================================================================

/// Errors while persisting documents.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Filesystem failure.
    #[error("Failed to write {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Serialization failure.
    #[error("Cannot serialize documents: {0}")]
    Json(#[from] serde_json::Error),
}

// =============================================================================
// Config Errors
// =============================================================================

/// Malformed environment configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {var}: '{value}' (expected true or false)")]
    InvalidBool { var: String, value: String },

    #[error("Unknown entity '{0}' (expected discos, usuarios or estoques)")]
    UnknownEntity(String),
}

// =============================================================================
// Migrate Errors (top-level)
// =============================================================================

/// Top-level pipeline orchestration errors.
///
/// This is the error type returned by [`crate::transform::pipeline::run_export`].
#[derive(Debug, Error)]
pub enum MigrateError {
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    #[error("Assembly error: {0}")]
    Assembly(#[from] AssemblyError),

    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for single-field conversions.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Result type for entity assembly.
pub type AssemblyResult<T> = Result<T, AssemblyError>;

/// Result type for row sources.
pub type SourceResult<T> = Result<T, SourceError>;

/// Result type for exporters.
pub type ExportResult<T> = Result<T, ExportError>;

/// Result type for the whole run.
pub type MigrateResult<T> = Result<T, MigrateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion_chain() {
        // DataIntegrityError -> AssemblyError -> MigrateError
        let integrity = DataIntegrityError::DuplicateKey {
            entity: Entity::Release,
            key: "42".into(),
            detail: "field 'titulo' differs".into(),
        };
        let assembly: AssemblyError = integrity.into();
        assert_eq!(assembly.key(), "42");
        assert_eq!(assembly.entity(), Entity::Release);

        let top: MigrateError = assembly.into();
        let msg = top.to_string();
        assert!(msg.contains("discos"));
        assert!(msg.contains("42"));
    }

    #[test]
    fn test_validation_error_carries_key() {
        let err = AssemblyError::Validation {
            entity: Entity::User,
            key: "7".into(),
            source: ValidationError::invalid_date("data_criacao", "yesterday"),
        };
        let msg = err.to_string();
        assert!(msg.contains("usuarios"));
        assert!(msg.contains("id 7"));
        assert!(msg.contains("yesterday"));
        assert_eq!(err.key(), "7");
    }
}
