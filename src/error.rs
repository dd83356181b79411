//! Error types for flagsync.

/// Result type alias for flagsync operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while selecting providers, syncing, loading or serving flags.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A provider key did not match any registered provider.
    #[error("no {kind} provider registered under '{name}'")]
    ProviderNotFound {
        /// Provider kind (`sync`, `evaluator` or `service`)
        kind: &'static str,
        /// The key that was looked up
        name: String,
    },

    /// The sync source could not be read.
    #[error("sync source {source_name} unreachable: {reason}")]
    SourceUnreachable {
        /// Human-readable name of the source (`file:...`, `http:...`)
        source_name: String,
        /// Underlying failure
        reason: String,
    },

    /// A flag payload could not be parsed by the evaluator.
    #[error("failed to parse flag configuration: {0}")]
    Parse(String),

    /// The transport-serving loop terminated abnormally.
    #[error("service failure: {0}")]
    ServiceFailure(String),

    /// Invalid runtime configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// File watching could not be set up.
    #[error("file watching error: {0}")]
    Watch(String),
}

impl Error {
    pub(crate) fn unreachable(source_name: impl Into<String>, reason: impl ToString) -> Self {
        Self::SourceUnreachable {
            source_name: source_name.into(),
            reason: reason.to_string(),
        }
    }
}

/// Errors returned when resolving a single flag.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    /// No flag with that key is loaded.
    #[error("flag '{0}' not found")]
    FlagNotFound(String),

    /// The flag exists but its state is `DISABLED`.
    #[error("flag '{0}' is disabled")]
    FlagDisabled(String),

    /// The resolved value is not of the requested kind.
    #[error("flag '{flag}' is of type {actual}, expected {expected}")]
    TypeMismatch {
        /// Flag key
        flag: String,
        /// Requested kind
        expected: &'static str,
        /// Kind of the default variant's value
        actual: &'static str,
    },
}

impl ResolveError {
    /// Stable machine-readable code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::FlagNotFound(_) => "FLAG_NOT_FOUND",
            Self::FlagDisabled(_) => "FLAG_DISABLED",
            Self::TypeMismatch { .. } => "TYPE_MISMATCH",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_not_found_message() {
        let err = Error::ProviderNotFound {
            kind: "sync",
            name: "ftp".to_string(),
        };
        assert_eq!(err.to_string(), "no sync provider registered under 'ftp'");
    }

    #[test]
    fn test_unreachable_names_source() {
        let err = Error::unreachable("http:http://localhost:1", "connection refused");
        assert!(err.to_string().contains("http:http://localhost:1"));
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn test_resolve_error_codes() {
        assert_eq!(ResolveError::FlagNotFound("a".into()).code(), "FLAG_NOT_FOUND");
        assert_eq!(ResolveError::FlagDisabled("a".into()).code(), "FLAG_DISABLED");
        let mismatch = ResolveError::TypeMismatch {
            flag: "a".into(),
            expected: "boolean",
            actual: "string",
        };
        assert_eq!(mismatch.code(), "TYPE_MISMATCH");
        assert_eq!(mismatch.to_string(), "flag 'a' is of type string, expected boolean");
    }
}
