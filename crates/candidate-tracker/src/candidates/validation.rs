//! Field rules applied to create, replace and patch bodies.
//!
//! Violations are collected rather than short-circuited so clients see every
//! problem with a payload at once.

use std::fmt;
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::Serialize;

use super::domain::{CandidatePatch, CandidateProfile};

const NAME_MAX: usize = 100;
const EMAIL_MAX: usize = 100;
const PLACE_MAX: usize = 50;
const LINKEDIN_MAX: usize = 255;

static LETTERS_AND_SPACES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\p{L}\s]+$").expect("letters pattern compiles"));
static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9\-]+(\.[A-Za-z0-9\-]+)*\.[A-Za-z]{2,}$")
        .expect("email pattern compiles")
});
static PHONE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?[0-9]{7,15}$").expect("phone pattern compiles"));
static DOCUMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{5,20}$").expect("document pattern compiles"));
static LINKEDIN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(https?://)?(www\.)?linkedin\.com/(in|pub)/[a-zA-Z0-9\-_%]+/?$")
        .expect("linkedin pattern compiles")
});

/// One violated rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

/// Every rule a payload violated, in field order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
    pub fn single(field: &'static str, message: impl Into<String>) -> Self {
        let mut errors = Self::default();
        errors.push(field, message);
        errors
    }

    pub fn fields(&self) -> &[FieldError] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.iter().any(|error| error.field == field)
    }

    fn push(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.push(FieldError {
            field,
            message: message.into(),
        });
    }

    fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let summary: Vec<String> = self
            .0
            .iter()
            .map(|error| format!("{}: {}", error.field, error.message))
            .collect();
        write!(f, "invalid candidate: {}", summary.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

/// Validate a complete profile, as sent on create and replace.
pub fn validate_profile(profile: &CandidateProfile, today: NaiveDate) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::default();
    check_letters(&mut errors, "full_name", &profile.full_name, NAME_MAX);
    check_email(&mut errors, &profile.email);
    check_phone(&mut errors, &profile.phone);
    check_document(&mut errors, &profile.document_number);
    check_letters(&mut errors, "country", &profile.country, PLACE_MAX);
    check_letters(&mut errors, "city", &profile.city, PLACE_MAX);
    check_birth_date(&mut errors, profile.birth_date, today);
    if let Some(url) = &profile.linkedin_url {
        check_linkedin(&mut errors, url);
    }
    errors.into_result()
}

/// Validate only the fields a patch carries.
pub fn validate_patch(patch: &CandidatePatch, today: NaiveDate) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::default();
    if let Some(name) = &patch.full_name {
        check_letters(&mut errors, "full_name", name, NAME_MAX);
    }
    if let Some(email) = &patch.email {
        check_email(&mut errors, email);
    }
    if let Some(phone) = &patch.phone {
        check_phone(&mut errors, phone);
    }
    if let Some(document) = &patch.document_number {
        check_document(&mut errors, document);
    }
    if let Some(country) = &patch.country {
        check_letters(&mut errors, "country", country, PLACE_MAX);
    }
    if let Some(city) = &patch.city {
        check_letters(&mut errors, "city", city, PLACE_MAX);
    }
    if let Some(birth_date) = patch.birth_date {
        check_birth_date(&mut errors, birth_date, today);
    }
    if let Some(url) = &patch.linkedin_url {
        check_linkedin(&mut errors, url);
    }
    errors.into_result()
}

fn check_letters(errors: &mut ValidationErrors, field: &'static str, value: &str, max: usize) {
    if value.trim().is_empty() {
        errors.push(field, "is required");
    } else if value.chars().count() > max {
        errors.push(field, format!("must not exceed {max} characters"));
    } else if !LETTERS_AND_SPACES.is_match(value) {
        errors.push(field, "must contain only letters and spaces");
    }
}

fn check_email(errors: &mut ValidationErrors, value: &str) {
    if value.trim().is_empty() {
        errors.push("email", "is required");
    } else if value.chars().count() > EMAIL_MAX {
        errors.push("email", format!("must not exceed {EMAIL_MAX} characters"));
    } else if !EMAIL.is_match(value) {
        errors.push("email", "must be a valid email address");
    }
}

fn check_phone(errors: &mut ValidationErrors, value: &str) {
    if !PHONE.is_match(value) {
        errors.push("phone", "must have 7 to 15 digits and may start with '+'");
    }
}

fn check_document(errors: &mut ValidationErrors, value: &str) {
    if !DOCUMENT.is_match(value) {
        errors.push("document_number", "must contain 5 to 20 digits");
    }
}

fn check_birth_date(errors: &mut ValidationErrors, value: NaiveDate, today: NaiveDate) {
    if value >= today {
        errors.push("birth_date", "must be in the past");
    }
}

fn check_linkedin(errors: &mut ValidationErrors, value: &str) {
    if value.chars().count() > LINKEDIN_MAX {
        errors.push("linkedin_url", format!("must not exceed {LINKEDIN_MAX} characters"));
    } else if !LINKEDIN.is_match(value) {
        errors.push("linkedin_url", "must be a LinkedIn profile URL");
    }
}
