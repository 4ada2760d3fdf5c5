//! Recruitment candidates: registration, validation, localized views and exports.

pub mod domain;
pub mod labels;
pub mod repository;
pub mod router;
pub mod service;
pub mod validation;
pub mod view;

#[cfg(test)]
mod tests;

pub use domain::{
    AuditTrail, Candidate, CandidateDraft, CandidateId, CandidatePatch, CandidateProfile,
    CandidateStatus, CandidateUpdate, DocumentType, EducationLevel, Gender, Labeled, NewCandidate,
};
pub use labels::Locale;
pub use repository::{CandidateRepository, RepositoryError};
pub use router::candidate_router;
pub use service::{CandidateService, CandidateServiceError, AUDITOR};
pub use validation::{FieldError, ValidationErrors};
pub use view::{export_columns, CandidateView, PagedResponse};
