//! Error types for the content store abstraction.

/// Errors that can occur while reading the content model or entity data.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The requested entity kind is not known to the store.
    #[error("Unknown entity kind: {kind}")]
    UnknownKind {
        /// The kind identifier that was requested.
        kind: String,
    },

    /// The requested sub-kind does not belong to the entity kind.
    #[error("Unknown sub-kind: {kind}/{sub_kind}")]
    UnknownSubKind {
        /// The owning kind.
        kind: String,
        /// The sub-kind identifier that was requested.
        sub_kind: String,
    },

    /// An entity the caller expected to exist was not found.
    #[error("Entity not found: {kind}/{id}")]
    NotFound {
        /// The kind of the missing entity.
        kind: String,
        /// The id of the missing entity.
        id: u64,
    },

    /// Content model or entity data is malformed.
    #[error("Invalid content: {message}")]
    InvalidContent {
        /// Description of why the content is invalid.
        message: String,
    },

    /// An internal storage error occurred.
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

impl StorageError {
    /// Creates a new `UnknownKind` error.
    #[must_use]
    pub fn unknown_kind(kind: impl Into<String>) -> Self {
        Self::UnknownKind { kind: kind.into() }
    }

    /// Creates a new `UnknownSubKind` error.
    #[must_use]
    pub fn unknown_sub_kind(kind: impl Into<String>, sub_kind: impl Into<String>) -> Self {
        Self::UnknownSubKind {
            kind: kind.into(),
            sub_kind: sub_kind.into(),
        }
    }

    /// Creates a new `NotFound` error.
    #[must_use]
    pub fn not_found(kind: impl Into<String>, id: u64) -> Self {
        Self::NotFound {
            kind: kind.into(),
            id,
        }
    }

    /// Creates a new `InvalidContent` error.
    #[must_use]
    pub fn invalid_content(message: impl Into<String>) -> Self {
        Self::InvalidContent {
            message: message.into(),
        }
    }

    /// Creates a new `Internal` error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}
