//! Error types for GraphQL operations.
//!
//! Errors surface in two places: as `Err` results of service calls (schema
//! build, request execution) and as entries of the response `errors[]` list,
//! where [`GraphQLError::error_code`] becomes `extensions.code`.

use std::fmt;

use async_graphql::ErrorExtensions;

/// Errors that can occur during schema synthesis or query resolution.
#[derive(Debug, Clone)]
pub enum GraphQLError {
    /// Schema is still being built - client should retry.
    SchemaInitializing,

    /// Schema build failed.
    SchemaBuildFailed(String),

    /// Invalid query syntax.
    InvalidQuery(String),

    /// A pagination argument exceeds the configured maximum.
    PageSizeExceeded {
        /// Argument name (`first` or `last`).
        argument: &'static str,
        /// Value the client asked for.
        requested: i64,
        /// Maximum allowed at the time of the request.
        max: usize,
    },

    /// Two arguments were given that cannot be combined.
    MutuallyExclusive {
        first: &'static str,
        second: &'static str,
    },

    /// A cursor could not be decoded or does not fit the query.
    InvalidCursor(String),

    /// An explicit revision id belongs to another entity.
    RevisionOwnership {
        /// Requested revision id.
        revision_id: u64,
        /// Kind and id the revision was requested for.
        entity: String,
    },

    /// Storage error.
    Storage(String),

    /// Validation error.
    Validation(String),

    /// Internal error.
    Internal(String),
}

impl fmt::Display for GraphQLError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SchemaInitializing => {
                write!(f, "GraphQL schema is initializing, please retry")
            }
            Self::SchemaBuildFailed(msg) => {
                write!(f, "Failed to build GraphQL schema: {msg}")
            }
            Self::InvalidQuery(msg) => {
                write!(f, "Invalid GraphQL query: {msg}")
            }
            Self::PageSizeExceeded {
                argument,
                requested,
                max,
            } => {
                write!(
                    f,
                    "Argument \"{argument}\" must not exceed {max} (requested {requested})"
                )
            }
            Self::MutuallyExclusive { first, second } => {
                write!(
                    f,
                    "Arguments \"{first}\" and \"{second}\" cannot be used together"
                )
            }
            Self::InvalidCursor(msg) => {
                write!(f, "Invalid cursor: {msg}")
            }
            Self::RevisionOwnership {
                revision_id,
                entity,
            } => {
                write!(f, "Revision {revision_id} does not belong to {entity}")
            }
            Self::Storage(msg) => {
                write!(f, "Storage error: {msg}")
            }
            Self::Validation(msg) => {
                write!(f, "Validation error: {msg}")
            }
            Self::Internal(msg) => {
                write!(f, "Internal error: {msg}")
            }
        }
    }
}

impl std::error::Error for GraphQLError {}

impl GraphQLError {
    /// Returns the error code for GraphQL error extensions.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::SchemaInitializing => "SCHEMA_INITIALIZING",
            Self::SchemaBuildFailed(_) => "SCHEMA_BUILD_FAILED",
            Self::InvalidQuery(_) => "INVALID_QUERY",
            Self::PageSizeExceeded { .. } => "PAGE_SIZE_EXCEEDED",
            Self::MutuallyExclusive { .. } => "VALIDATION_ERROR",
            Self::InvalidCursor(_) => "INVALID_CURSOR",
            Self::RevisionOwnership { .. } => "REVISION_MISMATCH",
            Self::Storage(_) => "STORAGE_ERROR",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Returns `true` for errors caused by the client's input.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidQuery(_)
                | Self::PageSizeExceeded { .. }
                | Self::MutuallyExclusive { .. }
                | Self::InvalidCursor(_)
                | Self::RevisionOwnership { .. }
                | Self::Validation(_)
        )
    }

    /// Returns the Retry-After value in seconds, if applicable.
    #[must_use]
    pub fn retry_after(&self) -> Option<u32> {
        match self {
            Self::SchemaInitializing => Some(5),
            _ => None,
        }
    }
}

impl ErrorExtensions for GraphQLError {
    fn extend(&self) -> async_graphql::Error {
        async_graphql::Error::new(self.to_string()).extend_with(|_, e| {
            e.set("code", self.error_code());
            if let Self::PageSizeExceeded { max, .. } = self {
                e.set("max", *max as u64);
            }
        })
    }
}

impl From<contentgraph_storage::StorageError> for GraphQLError {
    fn from(err: contentgraph_storage::StorageError) -> Self {
        Self::Storage(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            GraphQLError::SchemaInitializing.error_code(),
            "SCHEMA_INITIALIZING"
        );
        assert_eq!(
            GraphQLError::PageSizeExceeded {
                argument: "first",
                requested: 500,
                max: 100
            }
            .error_code(),
            "PAGE_SIZE_EXCEEDED"
        );
        assert_eq!(
            GraphQLError::RevisionOwnership {
                revision_id: 3,
                entity: "node/1".into()
            }
            .error_code(),
            "REVISION_MISMATCH"
        );
    }

    #[test]
    fn test_page_size_message_cites_bound() {
        let err = GraphQLError::PageSizeExceeded {
            argument: "first",
            requested: 11,
            max: 10,
        };
        let message = err.to_string();
        assert!(message.contains("\"first\""));
        assert!(message.contains("exceed 10"));
        assert!(err.is_client_error());
    }

    #[test]
    fn test_extensions_carry_code() {
        let err = GraphQLError::InvalidCursor("bad".into()).extend();
        assert_eq!(err.message, "Invalid cursor: bad");
        let extensions = err.extensions.expect("extensions");
        assert_eq!(
            extensions.get("code"),
            Some(&async_graphql::Value::from("INVALID_CURSOR"))
        );
    }

    #[test]
    fn test_from_storage_error() {
        let err: GraphQLError = contentgraph_storage::StorageError::unknown_kind("block").into();
        assert!(matches!(err, GraphQLError::Storage(_)));
        assert!(!err.is_client_error());
        assert_eq!(GraphQLError::SchemaInitializing.retry_after(), Some(5));
    }
}
