use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::{NaiveDate, TimeZone, Utc};
use serde_json::Value;

use crate::candidates::domain::{
    Candidate, CandidateDraft, CandidateId, CandidateProfile, DocumentType, EducationLevel,
    Gender, NewCandidate,
};
use crate::candidates::repository::{CandidateRepository, RepositoryError};
use crate::candidates::{candidate_router, CandidateService};
use crate::export::{ExportOrchestrator, FormatLimits, ManualClock, Page, ResultStore};

pub(super) fn limits() -> FormatLimits {
    FormatLimits {
        csv_max: 50,
        excel_max: 50,
        pdf_max: 3,
        expiration_minutes: 1,
    }
}

pub(super) fn clock() -> Arc<ManualClock> {
    let start = Utc
        .with_ymd_and_hms(2025, 6, 1, 12, 0, 0)
        .single()
        .expect("valid instant");
    Arc::new(ManualClock::new(start))
}

pub(super) fn profile(n: u32) -> CandidateProfile {
    CandidateProfile {
        full_name: format!("Candidata Numero {}", letters(n)),
        email: format!("candidate{n}@example.com"),
        phone: format!("+57300{n:07}"),
        document_type: DocumentType::NationalId,
        document_number: format!("{:08}", 10_000_000 + n),
        country: "Colombia".to_string(),
        city: "Bogota".to_string(),
        birth_date: NaiveDate::from_ymd_opt(1992, 4, 18).expect("valid date"),
        gender: Gender::Female,
        education_level: EducationLevel::University,
        linkedin_url: Some(format!("https://linkedin.com/in/candidate-{n}")),
    }
}

/// Names only accept letters, so spell the sequence number out.
fn letters(n: u32) -> String {
    n.to_string()
        .chars()
        .map(|digit| (b'a' + digit.to_digit(10).unwrap_or(0) as u8) as char)
        .collect()
}

pub(super) fn new_candidate(n: u32) -> NewCandidate {
    NewCandidate {
        profile: profile(n),
        status: None,
        registered_on: None,
    }
}

pub(super) fn build_service() -> (
    CandidateService<MemoryRepository>,
    Arc<MemoryRepository>,
    Arc<ManualClock>,
) {
    let repository = Arc::new(MemoryRepository::default());
    let clock = clock();
    let store = Arc::new(ResultStore::with_clock(limits().expiration(), clock.clone()));
    let exports = ExportOrchestrator::new(store, limits(), 2);
    let service = CandidateService::with_clock(repository.clone(), exports, clock.clone());
    (service, repository, clock)
}

pub(super) fn seeded_service(
    count: u32,
) -> (
    CandidateService<MemoryRepository>,
    Arc<MemoryRepository>,
    Arc<ManualClock>,
) {
    let (service, repository, clock) = build_service();
    for n in 1..=count {
        service
            .create(new_candidate(n), Default::default())
            .expect("seed candidate");
    }
    (service, repository, clock)
}

pub(super) fn router_with_service(service: CandidateService<MemoryRepository>) -> axum::Router {
    candidate_router(Arc::new(service))
}

#[derive(Default)]
pub(super) struct MemoryRepository {
    records: Mutex<BTreeMap<CandidateId, Candidate>>,
    sequence: AtomicU64,
}

impl MemoryRepository {
    fn conflict(
        records: &BTreeMap<CandidateId, Candidate>,
        candidate: &CandidateProfile,
        skip: Option<CandidateId>,
    ) -> Option<&'static str> {
        records
            .values()
            .filter(|existing| Some(existing.id) != skip)
            .find_map(|existing| {
                if existing.profile.email == candidate.email {
                    Some("email")
                } else if existing.profile.document_number == candidate.document_number {
                    Some("document number")
                } else {
                    None
                }
            })
    }
}

impl CandidateRepository for MemoryRepository {
    fn insert(&self, draft: CandidateDraft) -> Result<Candidate, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if let Some(field) = Self::conflict(&guard, &draft.profile, None) {
            return Err(RepositoryError::Conflict(field));
        }
        let id = CandidateId(self.sequence.fetch_add(1, Ordering::Relaxed) + 1);
        let candidate = Candidate::from_draft(id, draft);
        guard.insert(id, candidate.clone());
        Ok(candidate)
    }

    fn update(&self, candidate: Candidate) -> Result<Candidate, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if !guard.contains_key(&candidate.id) {
            return Err(RepositoryError::NotFound);
        }
        if let Some(field) = Self::conflict(&guard, &candidate.profile, Some(candidate.id)) {
            return Err(RepositoryError::Conflict(field));
        }
        guard.insert(candidate.id, candidate.clone());
        Ok(candidate)
    }

    fn fetch(&self, id: CandidateId) -> Result<Option<Candidate>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.get(&id).cloned())
    }

    fn delete(&self, id: CandidateId) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        guard.remove(&id).map(|_| ()).ok_or(RepositoryError::NotFound)
    }

    fn slice(&self, offset: usize, limit: usize) -> Result<Page<Candidate>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(Page {
            rows: guard.values().skip(offset).take(limit).cloned().collect(),
            total_elements: guard.len(),
        })
    }

    fn all(&self) -> Result<Vec<Candidate>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.values().cloned().collect())
    }
}

pub(super) struct UnavailableRepository;

impl CandidateRepository for UnavailableRepository {
    fn insert(&self, _draft: CandidateDraft) -> Result<Candidate, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn update(&self, _candidate: Candidate) -> Result<Candidate, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch(&self, _id: CandidateId) -> Result<Option<Candidate>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn delete(&self, _id: CandidateId) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn slice(&self, _offset: usize, _limit: usize) -> Result<Page<Candidate>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn all(&self) -> Result<Vec<Candidate>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

pub(super) fn unavailable_service() -> CandidateService<UnavailableRepository> {
    let clock = clock();
    let store = Arc::new(ResultStore::with_clock(limits().expiration(), clock.clone()));
    CandidateService::with_clock(
        Arc::new(UnavailableRepository),
        ExportOrchestrator::new(store, limits(), 1),
        clock,
    )
}

pub(super) async fn read_body(response: Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), 4 * 1024 * 1024)
        .await
        .expect("read body")
        .to_vec()
}

pub(super) async fn read_json_body(response: Response) -> Value {
    serde_json::from_slice(&read_body(response).await).expect("json payload")
}
