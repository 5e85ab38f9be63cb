//! Error type for graph construction.

/// Errors produced while building graph structures.
///
/// Malformed *inputs* are rejected before this layer (the ingest parsers in
/// `olivia-core` own those failures); anything surfacing here means the
/// builder's own bookkeeping went wrong and is a bug, not a user error.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    /// An internal invariant did not hold. Fatal; never swallowed.
    #[error("graph invariant violated: {detail}")]
    InvariantViolation {
        /// Which invariant failed, for the bug report.
        detail: String,
    },
}

impl GraphError {
    pub(crate) fn invariant(detail: impl Into<String>) -> Self {
        Self::InvariantViolation {
            detail: detail.into(),
        }
    }
}
