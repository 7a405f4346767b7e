use thiserror::Error;

use crate::filter::Category;

/// Main error type for SixDegrees
#[derive(Error, Debug)]
pub enum SixDegreesError {
    /// Filter operand does not match the field's declared type
    #[error("Invalid filter operand for {field}: {reason}")]
    InvalidFilterOperand { field: String, reason: String },

    /// Filter names a field the category does not declare
    #[error("Unknown field '{field}' for {category} filter")]
    UnknownField { category: Category, field: String },

    /// Path has no segments (both endpoints are the same person)
    #[error("Path is empty")]
    EmptyPath,

    /// Path segment does not join exactly one person and one project
    #[error("Malformed path segment {index}: {reason}")]
    MalformedSegment { index: usize, reason: String },

    /// Record shape matches no known variant
    #[error("Unresolved type: {0}")]
    UnresolvedType(String),

    /// Shortest-path traversal failed in the graph store
    #[error("Traversal failed: {0}")]
    TraversalFailed(String),

    /// Secondary lookup failed in the graph store
    #[error("Lookup failed: {0}")]
    LookupFailed(String),

    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// File system I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl SixDegreesError {
    /// Stable machine-readable name of the variant, used in API error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            SixDegreesError::InvalidFilterOperand { .. } => "InvalidFilterOperand",
            SixDegreesError::UnknownField { .. } => "UnknownField",
            SixDegreesError::EmptyPath => "EmptyPath",
            SixDegreesError::MalformedSegment { .. } => "MalformedSegment",
            SixDegreesError::UnresolvedType(_) => "UnresolvedType",
            SixDegreesError::TraversalFailed(_) => "TraversalFailed",
            SixDegreesError::LookupFailed(_) => "LookupFailed",
            SixDegreesError::Database(_) => "Database",
            SixDegreesError::Io(_) => "Io",
            SixDegreesError::Config(_) => "Config",
            SixDegreesError::InvalidInput(_) => "InvalidInput",
        }
    }

    pub(crate) fn invalid_operand(field: &str, reason: impl Into<String>) -> Self {
        SixDegreesError::InvalidFilterOperand {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

/// Convenient Result type using SixDegreesError
pub type Result<T> = std::result::Result<T, SixDegreesError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SixDegreesError::Config("Test error".to_string());
        assert!(err.to_string().contains("Configuration error"));
        assert!(err.to_string().contains("Test error"));
    }

    #[test]
    fn test_unknown_field_names_category() {
        let err = SixDegreesError::UnknownField {
            category: Category::Movie,
            field: "colour".to_string(),
        };
        assert_eq!(err.to_string(), "Unknown field 'colour' for movie filter");
        assert_eq!(err.kind(), "UnknownField");
    }

    #[test]
    fn test_error_from_rusqlite() {
        let rusqlite_err = rusqlite::Error::InvalidQuery;
        let err: SixDegreesError = rusqlite_err.into();
        assert!(matches!(err, SixDegreesError::Database(_)));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: SixDegreesError = io_err.into();
        assert!(matches!(err, SixDegreesError::Io(_)));
    }
}
