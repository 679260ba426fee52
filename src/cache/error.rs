//! Cache error types.

use thiserror::Error;

/// Errors that can occur during cache operations.
#[derive(Error, Debug)]
pub enum CacheError {
    /// The key is absent or its deadline has passed.
    #[error("Cache key not found: {0}")]
    NotFound(String),

    #[error("Cache operation failed: {0}")]
    Operation(String),

    #[error("Cache connection failed: {0}")]
    Connection(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl CacheError {
    pub fn not_found(key: impl Into<String>) -> Self {
        CacheError::NotFound(key.into())
    }

    /// True for the "absent or expired" class only.
    pub fn is_not_found(&self) -> bool {
        matches!(self, CacheError::NotFound(_))
    }

    /// True for dial, pool and command failures (anything the caller may retry).
    pub fn is_transport(&self) -> bool {
        matches!(self, CacheError::Operation(_) | CacheError::Connection(_))
    }

    pub fn is_codec(&self) -> bool {
        matches!(self, CacheError::Serialization(_))
    }
}

impl From<redb::Error> for CacheError {
    fn from(error: redb::Error) -> Self {
        match error {
            redb::Error::DatabaseAlreadyOpen | redb::Error::Io(_) => {
                CacheError::Connection(error.to_string())
            }
            other => CacheError::Operation(other.to_string()),
        }
    }
}

impl From<redis::RedisError> for CacheError {
    fn from(error: redis::RedisError) -> Self {
        CacheError::Operation(error.to_string())
    }
}

impl From<bb8::RunError<redis::RedisError>> for CacheError {
    fn from(error: bb8::RunError<redis::RedisError>) -> Self {
        CacheError::Connection(error.to_string())
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(error: serde_json::Error) -> Self {
        CacheError::Serialization(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classes_are_disjoint() {
        let not_found = CacheError::not_found("user:1");
        assert!(not_found.is_not_found());
        assert!(!not_found.is_transport());
        assert!(!not_found.is_codec());

        let transport = CacheError::Connection("refused".to_string());
        assert!(transport.is_transport());
        assert!(!transport.is_not_found());

        let codec = CacheError::Serialization("bad json".to_string());
        assert!(codec.is_codec());
        assert!(!codec.is_transport());
    }

    #[test]
    fn test_not_found_message_names_key() {
        let err = CacheError::not_found("session:abc");
        assert_eq!(err.to_string(), "Cache key not found: session:abc");
    }

    #[test]
    fn test_json_error_maps_to_serialization() {
        let json_err = serde_json::from_str::<u32>("not-a-number").unwrap_err();
        let err: CacheError = json_err.into();
        assert!(err.is_codec());
    }
}
