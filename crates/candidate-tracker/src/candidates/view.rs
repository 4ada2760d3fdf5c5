use std::sync::Arc;

use serde::Serialize;

use crate::export::{Columns, ExportValue, Page, PageRequest};

use super::domain::{Candidate, CandidateId, Labeled};
use super::labels::Locale;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Response shape for a candidate: technical enum codes side by side with
/// their localized labels. Also the row type of candidate exports.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateView {
    pub id: CandidateId,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub document_type: &'static str,
    pub document_type_label: String,
    pub document_number: String,
    pub country: String,
    pub city: String,
    pub birth_date: chrono::NaiveDate,
    pub gender: &'static str,
    pub gender_label: String,
    pub education_level: &'static str,
    pub education_level_label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub linkedin_url: Option<String>,
    pub status: &'static str,
    pub status_label: String,
    pub registered_on: chrono::NaiveDate,
    pub created_by: String,
    pub created_at: String,
    pub modified_by: Option<String>,
    pub modified_at: Option<String>,
}

impl CandidateView {
    pub fn new(candidate: &Candidate, locale: Locale) -> Self {
        let profile = &candidate.profile;
        let audit = &candidate.audit;
        Self {
            id: candidate.id,
            full_name: profile.full_name.clone(),
            email: profile.email.clone(),
            phone: profile.phone.clone(),
            document_type: profile.document_type.code(),
            document_type_label: locale.label(profile.document_type),
            document_number: profile.document_number.clone(),
            country: profile.country.clone(),
            city: profile.city.clone(),
            birth_date: profile.birth_date,
            gender: profile.gender.code(),
            gender_label: locale.label(profile.gender),
            education_level: profile.education_level.code(),
            education_level_label: locale.label(profile.education_level),
            linkedin_url: profile.linkedin_url.clone(),
            status: candidate.status.code(),
            status_label: locale.label(candidate.status),
            registered_on: candidate.registered_on,
            created_by: audit.created_by.clone(),
            created_at: audit.created_at.format(TIMESTAMP_FORMAT).to_string(),
            modified_by: audit.modified_by.clone(),
            modified_at: audit
                .modified_at
                .map(|at| at.format(TIMESTAMP_FORMAT).to_string()),
        }
    }
}

/// Columns of a candidate export, in output order.
pub fn export_columns() -> Arc<Columns<CandidateView>> {
    Arc::new(
        Columns::new()
            .column("ID", |row: &CandidateView| ExportValue::from(row.id.0))
            .column("Name", |row: &CandidateView| {
                ExportValue::from(row.full_name.as_str())
            })
            .column("Email", |row: &CandidateView| ExportValue::from(row.email.as_str()))
            .column("Phone", |row: &CandidateView| ExportValue::from(row.phone.as_str()))
            .column("Status", |row: &CandidateView| {
                ExportValue::from(row.status_label.as_str())
            })
            .column("Registered On", |row: &CandidateView| {
                ExportValue::from(row.registered_on)
            }),
    )
}

/// One page of a listing, with enough metadata to walk the rest.
#[derive(Debug, Clone, Serialize)]
pub struct PagedResponse<T> {
    pub content: Vec<T>,
    pub page: usize,
    pub size: usize,
    pub total_elements: usize,
    pub total_pages: usize,
    pub last: bool,
}

impl<T> PagedResponse<T> {
    pub fn from_page(page: Page<T>, request: PageRequest) -> Self {
        let total_pages = if request.size == 0 {
            0
        } else {
            page.total_elements.div_ceil(request.size)
        };
        Self {
            content: page.rows,
            page: request.page,
            size: request.size,
            total_elements: page.total_elements,
            total_pages,
            last: request.page.saturating_add(1) >= total_pages,
        }
    }
}
