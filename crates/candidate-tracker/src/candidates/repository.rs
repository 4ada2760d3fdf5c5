use crate::export::{Page, PageRequest, SourceError};

use super::domain::{Candidate, CandidateDraft, CandidateId};

/// Storage abstraction so the service can be exercised without a database.
///
/// Rows are ordered by id. Email and document number are unique across
/// candidates; violating either yields [`RepositoryError::Conflict`].
pub trait CandidateRepository: Send + Sync {
    fn insert(&self, draft: CandidateDraft) -> Result<Candidate, RepositoryError>;
    fn update(&self, candidate: Candidate) -> Result<Candidate, RepositoryError>;
    fn fetch(&self, id: CandidateId) -> Result<Option<Candidate>, RepositoryError>;
    fn delete(&self, id: CandidateId) -> Result<(), RepositoryError>;

    /// Up to `limit` candidates starting at `offset`, plus the total count.
    fn slice(&self, offset: usize, limit: usize) -> Result<Page<Candidate>, RepositoryError>;

    fn page(&self, request: PageRequest) -> Result<Page<Candidate>, RepositoryError> {
        self.slice(request.offset(), request.size)
    }

    fn all(&self) -> Result<Vec<Candidate>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    #[error("a candidate with the same {0} already exists")]
    Conflict(&'static str),
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

impl From<RepositoryError> for SourceError {
    fn from(value: RepositoryError) -> Self {
        SourceError::Unavailable(value.to_string())
    }
}
