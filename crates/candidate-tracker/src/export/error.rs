use super::format::ExportFormat;

/// Failures raised while reading rows out of a [`RowSource`](super::RowSource).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SourceError {
    #[error("fetch limit must be greater than zero")]
    ZeroLimit,
    #[error("offset {offset} is not aligned to the page size {limit}")]
    UnalignedOffset { offset: usize, limit: usize },
    #[error("row source unavailable: {0}")]
    Unavailable(String),
}

/// Every way an export can fail, from request validation to the background worker.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExportError {
    #[error("{format} export allows at most {ceiling} rows but {requested} were requested")]
    LimitExceeded {
        format: ExportFormat,
        ceiling: usize,
        requested: usize,
    },
    #[error("unsupported export format: {0}")]
    UnsupportedFormat(String),
    #[error("invalid export scope: {0}")]
    InvalidScope(String),
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error("{format} encoding failed: {message}")]
    Encode {
        format: ExportFormat,
        message: String,
    },
    #[error("export worker failed: {0}")]
    Worker(String),
}

impl ExportError {
    pub(crate) fn encode(format: ExportFormat, err: impl std::fmt::Display) -> Self {
        Self::Encode {
            format,
            message: err.to_string(),
        }
    }

    /// Whether the failure stems from the request rather than from processing it.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ExportError::LimitExceeded { .. }
                | ExportError::UnsupportedFormat(_)
                | ExportError::InvalidScope(_)
        )
    }
}
