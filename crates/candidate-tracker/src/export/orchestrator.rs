//! Runs exports: limit check, encoder selection, encoding, registration.
//!
//! [`ExportOrchestrator::run`] does the work on the calling thread and hands the
//! artifact back directly. [`ExportOrchestrator::submit`] records a pending job,
//! returns its id at once and encodes on the blocking pool; at most
//! `max_concurrent_exports` encodes run at the same time, further submissions
//! wait for a permit. Callers poll [`ExportOrchestrator::status`] afterwards.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::encoders::{Encoder, FormatEncoder};
use super::error::ExportError;
use super::format::{ExportFormat, FormatLimits};
use super::source::{PageRequest, RowSource};
use super::store::{ExportArtifact, ExportId, ResultStore};

const FILENAME_STEM: &str = "exported-data";
const DEFAULT_PAGE_SIZE: usize = 100;

/// Which rows of the relation an export covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum ExportScope {
    All,
    Page(PageRequest),
}

impl ExportScope {
    /// Resolve the `export_all` / `page` / `size` triple accepted by the API.
    pub fn from_parts(
        export_all: bool,
        page: Option<usize>,
        size: Option<usize>,
    ) -> Result<Self, ExportError> {
        if export_all {
            return Ok(ExportScope::All);
        }
        let request = PageRequest::new(page.unwrap_or(0), size.unwrap_or(DEFAULT_PAGE_SIZE));
        let scope = ExportScope::Page(request);
        scope.validate()?;
        Ok(scope)
    }

    pub fn validate(&self) -> Result<(), ExportError> {
        match self {
            ExportScope::Page(request) if request.size == 0 => Err(ExportError::InvalidScope(
                "page size must be at least 1".to_string(),
            )),
            _ => Ok(()),
        }
    }
}

/// Handle returned by [`ExportOrchestrator::submit`].
#[derive(Debug)]
pub struct ExportTicket {
    pub id: ExportId,
    pub handle: JoinHandle<Result<ExportId, ExportError>>,
}

/// What a poller learns about an export id.
#[derive(Debug, Clone, PartialEq)]
pub enum ExportStatus {
    Pending,
    Ready {
        artifact: Arc<ExportArtifact>,
        expires_at: DateTime<Utc>,
    },
    Failed(ExportError),
    Expired,
    Unknown,
}

impl ExportStatus {
    pub fn code(&self) -> &'static str {
        match self {
            ExportStatus::Pending => "PENDING",
            ExportStatus::Ready { .. } => "READY",
            ExportStatus::Failed(_) => "FAILED",
            ExportStatus::Expired => "EXPIRED",
            ExportStatus::Unknown => "UNKNOWN",
        }
    }
}

/// Entries removed by one [`ExportOrchestrator::sweep`] pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub artifacts: usize,
    pub jobs: usize,
}

#[derive(Debug, Clone)]
enum JobState {
    Pending,
    Completed,
    Failed(ExportError),
}

#[derive(Debug, Clone)]
struct JobRecord {
    state: JobState,
    /// Settled records are dropped after this instant; pending ones never are.
    forget_at: Option<DateTime<Utc>>,
}

struct Shared {
    store: Arc<ResultStore>,
    jobs: DashMap<ExportId, JobRecord>,
    limits: FormatLimits,
    workers: Arc<Semaphore>,
}

/// Entry point of the export subsystem. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct ExportOrchestrator {
    shared: Arc<Shared>,
}

impl ExportOrchestrator {
    pub fn new(store: Arc<ResultStore>, limits: FormatLimits, max_concurrent: usize) -> Self {
        Self {
            shared: Arc::new(Shared {
                store,
                jobs: DashMap::new(),
                limits,
                workers: Arc::new(Semaphore::new(max_concurrent.max(1))),
            }),
        }
    }

    pub fn limits(&self) -> FormatLimits {
        self.shared.limits
    }

    pub fn store(&self) -> &Arc<ResultStore> {
        &self.shared.store
    }

    /// Build the source, check the ceiling and encode, all on the calling thread.
    /// Nothing is registered in the store.
    pub fn run<T, S, B>(&self, format: ExportFormat, build: B) -> Result<ExportArtifact, ExportError>
    where
        T: Clone,
        S: RowSource<T>,
        B: FnOnce() -> Result<S, ExportError>,
    {
        let source = build()?;
        encode_artifact(self.shared.limits, format, &source)
    }

    /// Queue an export and return its id immediately.
    ///
    /// The job is visible as [`ExportStatus::Pending`] as soon as this returns.
    /// The handle resolves to the same id once the artifact is stored, or to
    /// the error that stopped it; the error is also kept for [`Self::status`].
    /// Must be called from within a tokio runtime.
    pub fn submit<T, S, B>(&self, format: ExportFormat, build: B) -> ExportTicket
    where
        T: Clone + 'static,
        S: RowSource<T> + 'static,
        B: FnOnce() -> Result<S, ExportError> + Send + 'static,
    {
        let id = ExportId::new();
        self.shared.jobs.insert(
            id,
            JobRecord {
                state: JobState::Pending,
                forget_at: None,
            },
        );
        debug!(export_id = %id, %format, "export queued");

        let shared = Arc::clone(&self.shared);
        let handle = tokio::spawn(async move {
            let outcome = match Arc::clone(&shared.workers).acquire_owned().await {
                Ok(permit) => {
                    let limits = shared.limits;
                    let encoded = tokio::task::spawn_blocking(move || {
                        let _permit = permit;
                        let source = build()?;
                        encode_artifact(limits, format, &source)
                    })
                    .await;
                    encoded.unwrap_or_else(|err| Err(ExportError::Worker(err.to_string())))
                }
                Err(err) => Err(ExportError::Worker(err.to_string())),
            };
            shared.settle(id, format, outcome)
        });

        ExportTicket { id, handle }
    }

    pub fn status(&self, id: &ExportId) -> ExportStatus {
        let now = self.shared.store.now();
        let Some(record) = self.shared.jobs.get(id).map(|entry| entry.value().clone()) else {
            return ExportStatus::Unknown;
        };
        if record.forget_at.is_some_and(|forget_at| now >= forget_at) {
            return ExportStatus::Unknown;
        }

        match record.state {
            JobState::Pending => ExportStatus::Pending,
            JobState::Failed(err) => ExportStatus::Failed(err),
            JobState::Completed => match self.shared.store.entry(id) {
                Some(stored) => ExportStatus::Ready {
                    artifact: stored.artifact,
                    expires_at: stored.expires_at,
                },
                None => ExportStatus::Expired,
            },
        }
    }

    /// Download path: the artifact if it is stored and live, otherwise nothing.
    pub fn artifact(&self, id: &ExportId) -> Option<Arc<ExportArtifact>> {
        self.shared.store.get(id)
    }

    pub fn sweep(&self) -> SweepReport {
        let now = self.shared.store.now();
        let artifacts = self.shared.store.sweep_expired();

        let before = self.shared.jobs.len();
        self.shared
            .jobs
            .retain(|_, record| record.forget_at.map_or(true, |forget_at| now < forget_at));
        let jobs = before.saturating_sub(self.shared.jobs.len());

        SweepReport { artifacts, jobs }
    }

    /// Spawn the periodic eviction task. Dropping the handle leaves it running;
    /// abort it to stop sweeping.
    pub fn spawn_sweeper(&self, every: StdDuration) -> JoinHandle<()> {
        let orchestrator = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            loop {
                interval.tick().await;
                let report = orchestrator.sweep();
                if report.artifacts > 0 || report.jobs > 0 {
                    debug!(
                        artifacts = report.artifacts,
                        jobs = report.jobs,
                        "export sweep completed"
                    );
                }
            }
        })
    }

    pub fn pending_jobs(&self) -> usize {
        self.shared
            .jobs
            .iter()
            .filter(|entry| matches!(entry.value().state, JobState::Pending))
            .count()
    }
}

impl Shared {
    fn settle(
        &self,
        id: ExportId,
        format: ExportFormat,
        outcome: Result<ExportArtifact, ExportError>,
    ) -> Result<ExportId, ExportError> {
        let ttl = self.store.ttl();
        match outcome {
            Ok(artifact) => {
                let rows = artifact.rows;
                let sections = artifact.sections.len();
                let bytes = artifact.size();
                let stored = self.store.put(id, artifact);
                self.jobs.insert(
                    id,
                    JobRecord {
                        state: JobState::Completed,
                        forget_at: Some(stored.expires_at + ttl),
                    },
                );
                info!(
                    export_id = %id,
                    %format,
                    rows,
                    sections,
                    bytes,
                    expires_at = %stored.expires_at,
                    "export ready"
                );
                Ok(id)
            }
            Err(err) => {
                if err.is_client_error() {
                    warn!(export_id = %id, %format, error = %err, "export rejected");
                } else {
                    error!(export_id = %id, %format, error = %err, "export failed");
                }
                self.jobs.insert(
                    id,
                    JobRecord {
                        state: JobState::Failed(err.clone()),
                        forget_at: Some(self.store.now() + ttl),
                    },
                );
                Err(err)
            }
        }
    }
}

impl std::fmt::Debug for ExportOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExportOrchestrator")
            .field("limits", &self.shared.limits)
            .field("jobs", &self.shared.jobs.len())
            .field("store", &self.shared.store)
            .finish()
    }
}

fn encode_artifact<T: Clone>(
    limits: FormatLimits,
    format: ExportFormat,
    source: &dyn RowSource<T>,
) -> Result<ExportArtifact, ExportError> {
    let total = source.total_count()?;
    limits.check(format, total)?;

    let encoder = Encoder::for_format(format);
    let output = encoder.encode(source)?;
    Ok(ExportArtifact {
        bytes: output.bytes,
        filename: format!("{FILENAME_STEM}.{}", encoder.file_extension()),
        content_type: encoder.mime_type(),
        format,
        rows: output.rows,
        sections: output.sections,
    })
}
