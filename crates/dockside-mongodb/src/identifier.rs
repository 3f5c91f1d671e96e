//! Identifier normalization between caller-facing values and native ObjectIds

use bson::{oid::ObjectId, Bson};
use dockside_common::Result;

/// Convert a candidate identifier into the store's native identifier type.
///
/// String input is parsed as an ObjectId; any parse failure from the native
/// constructor is surfaced to the caller unmodified. Non-string input passes
/// through unchanged, so already-native identifiers normalize idempotently.
pub fn normalize(id: Bson) -> Result<Bson> {
    match id {
        Bson::String(s) => Ok(Bson::ObjectId(ObjectId::parse_str(&s)?)),
        other => Ok(other),
    }
}

/// Generate a fresh native identifier.
pub fn generate() -> Bson {
    Bson::ObjectId(ObjectId::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use dockside_common::DocksideError;

    #[test]
    fn test_normalize_valid_hex_string() {
        let hex = "507f1f77bcf86cd799439011";
        let normalized = normalize(Bson::String(hex.to_string())).unwrap();
        assert_eq!(
            normalized,
            Bson::ObjectId(ObjectId::parse_str(hex).unwrap())
        );
    }

    #[test]
    fn test_normalize_is_idempotent_for_native_values() {
        let native = Bson::ObjectId(ObjectId::new());
        let once = normalize(native.clone()).unwrap();
        let twice = normalize(once.clone()).unwrap();
        assert_eq!(once, native);
        assert_eq!(twice, native);
    }

    #[test]
    fn test_normalize_passes_non_string_through() {
        assert_eq!(normalize(Bson::Int64(42)).unwrap(), Bson::Int64(42));
        assert_eq!(normalize(Bson::Null).unwrap(), Bson::Null);
    }

    #[test]
    fn test_normalize_invalid_string_errors() {
        let err = normalize(Bson::String("not-an-object-id".to_string())).unwrap_err();
        assert!(matches!(err, DocksideError::InvalidIdentifier(_)));
    }

    #[test]
    fn test_generate_is_native() {
        assert!(matches!(generate(), Bson::ObjectId(_)));
    }
}
