use std::sync::Arc;

use tracing::{debug, info};

use crate::export::{
    window_fetch, Clock, ExportArtifact, ExportError, ExportFormat, ExportOrchestrator,
    ExportScope, ExportTicket, ListRowSource, Page, PageRequest, PagedRowSource, RowSource,
    SourceError, SystemClock,
};

use super::domain::{
    AuditTrail, Candidate, CandidateDraft, CandidateId, CandidatePatch, CandidateUpdate,
    NewCandidate,
};
use super::labels::Locale;
use super::repository::{CandidateRepository, RepositoryError};
use super::validation::{validate_patch, validate_profile, ValidationErrors};
use super::view::{export_columns, CandidateView, PagedResponse};

/// Name stamped into audit fields for every write.
pub const AUDITOR: &str = "system";

type CandidateSource = Box<dyn RowSource<CandidateView>>;

/// Candidate CRUD plus candidate exports, over a repository and the export orchestrator.
pub struct CandidateService<R> {
    repository: Arc<R>,
    exports: ExportOrchestrator,
    clock: Arc<dyn Clock>,
}

impl<R> CandidateService<R>
where
    R: CandidateRepository + 'static,
{
    pub fn new(repository: Arc<R>, exports: ExportOrchestrator) -> Self {
        Self::with_clock(repository, exports, Arc::new(SystemClock))
    }

    pub fn with_clock(repository: Arc<R>, exports: ExportOrchestrator, clock: Arc<dyn Clock>) -> Self {
        Self {
            repository,
            exports,
            clock,
        }
    }

    pub fn exports(&self) -> &ExportOrchestrator {
        &self.exports
    }

    pub fn list(
        &self,
        request: PageRequest,
        locale: Locale,
    ) -> Result<PagedResponse<CandidateView>, CandidateServiceError> {
        if request.size == 0 {
            return Err(ValidationErrors::single("size", "must be at least 1").into());
        }
        let page = self.repository.page(request)?;
        let page = Page {
            rows: page
                .rows
                .iter()
                .map(|candidate| CandidateView::new(candidate, locale))
                .collect(),
            total_elements: page.total_elements,
        };
        Ok(PagedResponse::from_page(page, request))
    }

    pub fn get(&self, id: CandidateId, locale: Locale) -> Result<CandidateView, CandidateServiceError> {
        let candidate = self.load(id)?;
        Ok(CandidateView::new(&candidate, locale))
    }

    pub fn create(
        &self,
        body: NewCandidate,
        locale: Locale,
    ) -> Result<CandidateView, CandidateServiceError> {
        let now = self.clock.now().naive_utc();
        validate_profile(&body.profile, now.date())?;

        let draft = CandidateDraft {
            profile: body.profile,
            status: body.status.unwrap_or_default(),
            registered_on: body.registered_on.unwrap_or(now.date()),
            audit: AuditTrail::created(AUDITOR, now),
        };
        let stored = self.repository.insert(draft)?;
        info!(candidate_id = %stored.id, "candidate created");
        Ok(CandidateView::new(&stored, locale))
    }

    pub fn replace(
        &self,
        id: CandidateId,
        body: CandidateUpdate,
        locale: Locale,
    ) -> Result<CandidateView, CandidateServiceError> {
        let now = self.clock.now().naive_utc();
        validate_profile(&body.profile, now.date())?;

        let mut candidate = self.load(id)?;
        candidate.profile = body.profile;
        candidate.status = body.status;
        candidate.audit.touch(AUDITOR, now);

        let stored = self.save(candidate)?;
        info!(candidate_id = %id, "candidate replaced");
        Ok(CandidateView::new(&stored, locale))
    }

    pub fn patch(
        &self,
        id: CandidateId,
        patch: CandidatePatch,
        locale: Locale,
    ) -> Result<CandidateView, CandidateServiceError> {
        let now = self.clock.now().naive_utc();
        validate_patch(&patch, now.date())?;

        let mut candidate = self.load(id)?;
        if patch.is_empty() {
            return Ok(CandidateView::new(&candidate, locale));
        }
        patch.apply(&mut candidate);
        candidate.audit.touch(AUDITOR, now);

        let stored = self.save(candidate)?;
        info!(candidate_id = %id, "candidate patched");
        Ok(CandidateView::new(&stored, locale))
    }

    pub fn delete(&self, id: CandidateId) -> Result<(), CandidateServiceError> {
        match self.repository.delete(id) {
            Ok(()) => {
                info!(candidate_id = %id, "candidate deleted");
                Ok(())
            }
            Err(RepositoryError::NotFound) => Err(CandidateServiceError::NotFound(id)),
            Err(err) => Err(err.into()),
        }
    }

    /// Queue an export of the candidates covered by `scope`.
    pub fn submit_export(
        &self,
        format: ExportFormat,
        scope: ExportScope,
        locale: Locale,
    ) -> Result<ExportTicket, CandidateServiceError> {
        scope.validate()?;
        let build = candidate_source(Arc::clone(&self.repository), scope, locale);
        let ticket = self.exports.submit::<CandidateView, _, _>(format, build);
        debug!(export_id = %ticket.id, %format, ?scope, "candidate export submitted");
        Ok(ticket)
    }

    /// Export on the calling thread and hand the artifact back without storing it.
    pub fn export_now(
        &self,
        format: ExportFormat,
        scope: ExportScope,
        locale: Locale,
    ) -> Result<ExportArtifact, CandidateServiceError> {
        scope.validate()?;
        let build = candidate_source(Arc::clone(&self.repository), scope, locale);
        let artifact = self.exports.run::<CandidateView, _, _>(format, build)?;
        info!(%format, rows = artifact.rows, bytes = artifact.size(), "candidate export served");
        Ok(artifact)
    }

    fn load(&self, id: CandidateId) -> Result<Candidate, CandidateServiceError> {
        self.repository
            .fetch(id)?
            .ok_or(CandidateServiceError::NotFound(id))
    }

    fn save(&self, candidate: Candidate) -> Result<Candidate, CandidateServiceError> {
        let id = candidate.id;
        match self.repository.update(candidate) {
            Ok(stored) => Ok(stored),
            Err(RepositoryError::NotFound) => Err(CandidateServiceError::NotFound(id)),
            Err(err) => Err(err.into()),
        }
    }
}

/// Deferred row source for a candidate export; invoked on the export worker.
fn candidate_source<R>(
    repository: Arc<R>,
    scope: ExportScope,
    locale: Locale,
) -> impl FnOnce() -> Result<CandidateSource, ExportError> + Send + 'static
where
    R: CandidateRepository + 'static,
{
    move || {
        let columns = export_columns();
        let source: CandidateSource = match scope {
            ExportScope::All => {
                let rows = repository
                    .all()
                    .map_err(SourceError::from)?
                    .iter()
                    .map(|candidate| CandidateView::new(candidate, locale))
                    .collect();
                Box::new(ListRowSource::new(rows, columns))
            }
            ExportScope::Page(window) => {
                let fetch = window_fetch(window, move |offset, limit| {
                    let page = repository.slice(offset, limit)?;
                    Ok(Page {
                        rows: page
                            .rows
                            .iter()
                            .map(|candidate| CandidateView::new(candidate, locale))
                            .collect(),
                        total_elements: page.total_elements,
                    })
                });
                Box::new(PagedRowSource::new(fetch, columns))
            }
        };
        Ok(source)
    }
}

/// Error raised by the candidate service.
#[derive(Debug, thiserror::Error)]
pub enum CandidateServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationErrors),
    #[error("candidate {0} not found")]
    NotFound(CandidateId),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Export(#[from] ExportError),
}
