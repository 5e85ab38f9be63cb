//! Error types for the network model and its collaborators.
//!
//! Errors propagate to the nearest caller boundary. The engine never
//! retries silently and never encodes failure as a sentinel metric value;
//! every numeric result a caller sees is a valid metric value.

use olivia_graph::GraphError;

/// Convenience alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Failures surfaced by the network model.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A package name is not part of the model. Recoverable at the caller.
    #[error("package not found: {name}")]
    NotFound {
        /// The name that failed to resolve.
        name: String,
    },

    /// An ingest file could not be parsed.
    #[error("malformed input at line {line}: {reason}")]
    MalformedInput {
        /// 1-based line number in the source file.
        line: usize,
        /// What was wrong with the line.
        reason: String,
    },

    /// Arithmetic between metric results over different package universes.
    #[error("metric domains do not match: {detail}")]
    DomainMismatch {
        /// How the universes differ.
        detail: String,
    },

    /// A metric was requested from an operation that cannot serve it, e.g.
    /// the analytic immunization delta for a non-Reach metric, or
    /// `get_metric` for an unregistered custom kind.
    #[error("unsupported metric {kind} for {operation}")]
    UnsupportedMetric {
        /// Tag of the offending metric kind.
        kind: String,
        /// The operation that rejected it.
        operation: String,
    },

    /// A serialized model failed validation: wrong magic, unknown version,
    /// truncation, or checksum mismatch.
    #[error("corrupted model file: {reason}")]
    CorruptedModel {
        /// What failed to validate.
        reason: String,
    },

    /// Internal invariant violation bubbled up from the graph layer.
    /// Fatal; never swallowed.
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// Underlying filesystem failure.
    #[error("i/o failure: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound { name: name.into() }
    }

    pub(crate) fn malformed(line: usize, reason: impl Into<String>) -> Self {
        Self::MalformedInput {
            line,
            reason: reason.into(),
        }
    }

    pub(crate) fn corrupted(reason: impl Into<String>) -> Self {
        Self::CorruptedModel {
            reason: reason.into(),
        }
    }

    pub(crate) fn unsupported(kind: impl Into<String>, operation: impl Into<String>) -> Self {
        Self::UnsupportedMetric {
            kind: kind.into(),
            operation: operation.into(),
        }
    }
}
