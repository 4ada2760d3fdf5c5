use candidate_tracker::candidates::{
    Candidate, CandidateDraft, CandidateId, CandidateProfile, CandidateRepository, DocumentType,
    EducationLevel, Gender, NewCandidate, RepositoryError,
};
use candidate_tracker::export::Page;
use chrono::NaiveDate;
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::BTreeMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default)]
struct CandidateTable {
    rows: BTreeMap<CandidateId, Candidate>,
    last_id: u64,
}

impl CandidateTable {
    fn conflicting_field(
        &self,
        profile: &CandidateProfile,
        skip: Option<CandidateId>,
    ) -> Option<&'static str> {
        self.rows
            .values()
            .filter(|existing| Some(existing.id) != skip)
            .find_map(|existing| {
                if existing.profile.email.eq_ignore_ascii_case(&profile.email) {
                    Some("email")
                } else if existing.profile.document_number == profile.document_number {
                    Some("document number")
                } else {
                    None
                }
            })
    }
}

/// Process-local candidate storage used by the HTTP service and the CLI.
#[derive(Default, Clone)]
pub(crate) struct InMemoryCandidateRepository {
    table: Arc<Mutex<CandidateTable>>,
}

impl CandidateRepository for InMemoryCandidateRepository {
    fn insert(&self, draft: CandidateDraft) -> Result<Candidate, RepositoryError> {
        let mut guard = self.table.lock().expect("repository mutex poisoned");
        if let Some(field) = guard.conflicting_field(&draft.profile, None) {
            return Err(RepositoryError::Conflict(field));
        }
        guard.last_id += 1;
        let id = CandidateId(guard.last_id);
        let candidate = Candidate::from_draft(id, draft);
        guard.rows.insert(id, candidate.clone());
        Ok(candidate)
    }

    fn update(&self, candidate: Candidate) -> Result<Candidate, RepositoryError> {
        let mut guard = self.table.lock().expect("repository mutex poisoned");
        if !guard.rows.contains_key(&candidate.id) {
            return Err(RepositoryError::NotFound);
        }
        if let Some(field) = guard.conflicting_field(&candidate.profile, Some(candidate.id)) {
            return Err(RepositoryError::Conflict(field));
        }
        guard.rows.insert(candidate.id, candidate.clone());
        Ok(candidate)
    }

    fn fetch(&self, id: CandidateId) -> Result<Option<Candidate>, RepositoryError> {
        let guard = self.table.lock().expect("repository mutex poisoned");
        Ok(guard.rows.get(&id).cloned())
    }

    fn delete(&self, id: CandidateId) -> Result<(), RepositoryError> {
        let mut guard = self.table.lock().expect("repository mutex poisoned");
        guard
            .rows
            .remove(&id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }

    fn slice(&self, offset: usize, limit: usize) -> Result<Page<Candidate>, RepositoryError> {
        let guard = self.table.lock().expect("repository mutex poisoned");
        Ok(Page {
            rows: guard
                .rows
                .values()
                .skip(offset)
                .take(limit)
                .cloned()
                .collect(),
            total_elements: guard.rows.len(),
        })
    }

    fn all(&self) -> Result<Vec<Candidate>, RepositoryError> {
        let guard = self.table.lock().expect("repository mutex poisoned");
        Ok(guard.rows.values().cloned().collect())
    }
}

const FIRST_NAMES: &[&str] = &[
    "Ana", "Luis", "Camila", "Jorge", "Valentina", "Mateo", "Sofia", "Andres", "Lucia", "Diego",
];
const LAST_NAMES: &[&str] = &[
    "Gomez", "Rodriguez", "Martinez", "Lopez", "Hernandez", "Diaz", "Torres", "Ramirez",
];
const CITIES: &[(&str, &str)] = &[
    ("Colombia", "Bogota"),
    ("Colombia", "Medellin"),
    ("Peru", "Lima"),
    ("Chile", "Santiago"),
    ("Mexico", "Monterrey"),
];

/// Deterministic candidate number `n`, valid under the registration rules.
pub(crate) fn synthetic_candidate(n: usize) -> NewCandidate {
    let first = FIRST_NAMES[n % FIRST_NAMES.len()];
    let last = LAST_NAMES[(n / FIRST_NAMES.len()) % LAST_NAMES.len()];
    let (country, city) = CITIES[n % CITIES.len()];
    let birth_year = 1975 + (n % 25) as i32;
    let birth_date = NaiveDate::from_ymd_opt(birth_year, (n % 12) as u32 + 1, (n % 28) as u32 + 1)
        .unwrap_or_default();

    NewCandidate {
        profile: CandidateProfile {
            full_name: format!("{first} {last}"),
            email: format!("{}.{}{n}@example.com", first.to_lowercase(), last.to_lowercase()),
            phone: format!("+57{:010}", 3_000_000_000u64 + n as u64),
            document_type: DocumentType::ALL[n % DocumentType::ALL.len()],
            document_number: format!("{:010}", 1_000_000_000u64 + n as u64),
            country: country.to_string(),
            city: city.to_string(),
            birth_date,
            gender: Gender::ALL[n % Gender::ALL.len()],
            education_level: EducationLevel::ALL[n % EducationLevel::ALL.len()],
            linkedin_url: (n % 3 == 0).then(|| format!("https://www.linkedin.com/in/candidate-{n}")),
        },
        status: None,
        registered_on: None,
    }
}

pub(crate) fn parse_positive(raw: &str) -> Result<usize, String> {
    match raw.trim().parse::<usize>() {
        Ok(value) if value > 0 => Ok(value),
        _ => Err(format!("expected a positive integer, got '{raw}'")),
    }
}
