//! Error types for dockside

use thiserror::Error;

/// Result type alias for dockside operations
pub type Result<T> = std::result::Result<T, DocksideError>;

/// Unified error type for all dockside operations
///
/// Store failures are passed through with their original message text and are
/// never retried or reclassified at this layer; the store is the sole arbiter
/// of what went wrong.
#[derive(Error, Debug, Clone)]
pub enum DocksideError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Query error: {0}")]
    Query(String),

    #[error("Validation error: {0}")]
    Validation(String),

    /// A string could not be converted to the store's native identifier type.
    /// Carries the native constructor's message unmodified.
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),
}

impl From<serde_json::Error> for DocksideError {
    fn from(err: serde_json::Error) -> Self {
        DocksideError::Serialization(err.to_string())
    }
}

// MongoDB-specific error conversions (when mongodb-errors feature is enabled)
#[cfg(feature = "mongodb-errors")]
impl From<mongodb::error::Error> for DocksideError {
    fn from(err: mongodb::error::Error) -> Self {
        DocksideError::Database(err.to_string())
    }
}

#[cfg(feature = "mongodb-errors")]
impl From<bson::ser::Error> for DocksideError {
    fn from(err: bson::ser::Error) -> Self {
        DocksideError::Serialization(format!("BSON serialization error: {}", err))
    }
}

#[cfg(feature = "mongodb-errors")]
impl From<bson::de::Error> for DocksideError {
    fn from(err: bson::de::Error) -> Self {
        DocksideError::Deserialization(format!("BSON deserialization error: {}", err))
    }
}

#[cfg(feature = "mongodb-errors")]
impl From<bson::oid::Error> for DocksideError {
    fn from(err: bson::oid::Error) -> Self {
        DocksideError::InvalidIdentifier(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_connection() {
        let err = DocksideError::Connection("timeout".to_string());
        assert_eq!(err.to_string(), "Connection error: timeout");
    }

    #[test]
    fn test_error_display_database() {
        let err = DocksideError::Database("write failed".to_string());
        assert_eq!(err.to_string(), "Database error: write failed");
    }

    #[test]
    fn test_error_display_query() {
        let err = DocksideError::Query("collection not defined".to_string());
        assert_eq!(err.to_string(), "Query error: collection not defined");
    }

    #[test]
    fn test_error_display_validation() {
        let err = DocksideError::Validation("invalid ordering set".to_string());
        assert_eq!(err.to_string(), "Validation error: invalid ordering set");
    }

    #[test]
    fn test_error_display_invalid_identifier() {
        let err = DocksideError::InvalidIdentifier("provided hex string is not valid".to_string());
        assert_eq!(
            err.to_string(),
            "Invalid identifier: provided hex string is not valid"
        );
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<String>("invalid").unwrap_err();
        let err: DocksideError = json_err.into();
        assert!(matches!(err, DocksideError::Serialization(_)));
    }

    #[test]
    #[cfg(feature = "mongodb-errors")]
    fn test_from_object_id_error() {
        let oid_err = bson::oid::ObjectId::parse_str("not-hex").unwrap_err();
        let err: DocksideError = oid_err.into();
        assert!(matches!(err, DocksideError::InvalidIdentifier(_)));
    }

    #[test]
    fn test_result_type_err() {
        let result: Result<i32> = Err(DocksideError::Query("failed".to_string()));
        assert!(result.is_err());
    }
}
