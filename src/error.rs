//! Error type returned by [`Local`](crate::Local) lookups.

/// The error type for local-storage operations.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum LocalError {
    /// The key was never set, or was deleted, in the resolving context.
    NotFound {
        /// The key that failed to resolve.
        key: String,
    },
}

impl LocalError {
    pub(crate) fn not_found(key: &str) -> Self {
        Self::NotFound { key: key.to_owned() }
    }

    /// Returns the key this error refers to.
    pub fn key(&self) -> &str {
        match self {
            Self::NotFound { key } => key,
        }
    }

    /// Returns `true` for [`LocalError::NotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl core::fmt::Display for LocalError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound { key } => write!(f, "no value for key `{key}` in the current context"),
        }
    }
}

impl std::error::Error for LocalError {}
