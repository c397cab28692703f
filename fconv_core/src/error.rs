//! Error types for format handlers.

use thiserror::Error;

/// Result type for handler operations
pub type ConvertResult<T> = Result<T, ConvertError>;

/// Boxed source error from an external engine (image codec, archive container, io).
pub type EngineError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Coarse error category, for callers that branch on the kind of failure
/// rather than on its fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Init,
    NotReady,
    UnsupportedConversion,
    MalformedInput,
    HeterogeneousArchive,
    EmptyResult,
    EngineFailure,
}

/// Errors raised by [`FormatHandler`](crate::FormatHandler) implementations.
///
/// Every variant is raised synchronously from `init` or `do_convert` and is
/// never retried internally. Messages are meant to be shown to a user as-is.
#[derive(Debug, Error)]
pub enum ConvertError {
    /// One-time setup failed; the handler stays not-ready.
    #[error("handler '{handler}' failed to initialize: {reason}")]
    Init { handler: String, reason: String },

    /// Conversion requested before `init` completed
    #[error("handler '{handler}' is not initialized")]
    NotReady { handler: String },

    /// The (input, output) pair is not one the handler declared
    #[error("unsupported conversion {from} -> {to}: {reason}")]
    UnsupportedConversion {
        from: String,
        to: String,
        reason: String,
    },

    /// Buffer length or shape fails a required constraint
    #[error("{file}: {reason}")]
    MalformedInput { file: String, reason: String },

    /// Archive entry is neither a matching page nor an allowed metadata file
    #[error("{file}: archive contains multiple file types, abort (found '{entry}')")]
    HeterogeneousArchive { file: String, entry: String },

    /// Well-formed request that cannot structurally produce any output
    #[error("{reason}")]
    EmptyResult { reason: String },

    /// The external decode/encode surface reported an error
    #[error("{file}: {source}")]
    EngineFailure {
        file: String,
        #[source]
        source: EngineError,
    },
}

impl ConvertError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Init { .. } => ErrorKind::Init,
            Self::NotReady { .. } => ErrorKind::NotReady,
            Self::UnsupportedConversion { .. } => ErrorKind::UnsupportedConversion,
            Self::MalformedInput { .. } => ErrorKind::MalformedInput,
            Self::HeterogeneousArchive { .. } => ErrorKind::HeterogeneousArchive,
            Self::EmptyResult { .. } => ErrorKind::EmptyResult,
            Self::EngineFailure { .. } => ErrorKind::EngineFailure,
        }
    }

    pub fn unsupported(from: &str, to: &str, reason: impl Into<String>) -> Self {
        Self::UnsupportedConversion {
            from: from.to_string(),
            to: to.to_string(),
            reason: reason.into(),
        }
    }

    pub fn malformed(file: &str, reason: impl Into<String>) -> Self {
        Self::MalformedInput {
            file: file.to_string(),
            reason: reason.into(),
        }
    }

    pub fn engine(file: &str, source: impl Into<EngineError>) -> Self {
        Self::EngineFailure {
            file: file.to_string(),
            source: source.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_are_human_readable() {
        let err = ConvertError::malformed("a.rgb", "Invalid RGB file size; not a whole number of samples.");
        assert_eq!(
            err.to_string(),
            "a.rgb: Invalid RGB file size; not a whole number of samples."
        );
        assert_eq!(err.kind(), ErrorKind::MalformedInput);

        let err = ConvertError::HeterogeneousArchive {
            file: "vol1.cbz".into(),
            entry: "notes.txt".into(),
        };
        assert!(err.to_string().contains("archive contains multiple file types, abort"));
    }

    #[test]
    fn engine_failure_keeps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "truncated");
        let err = ConvertError::engine("page.png", io);
        assert_eq!(err.kind(), ErrorKind::EngineFailure);
        assert!(std::error::Error::source(&err).is_some());
        assert_eq!(err.to_string(), "page.png: truncated");
    }
}
