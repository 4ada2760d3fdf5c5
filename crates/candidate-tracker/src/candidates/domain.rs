use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Numeric identifier assigned by the repository on insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CandidateId(pub u64);

impl fmt::Display for CandidateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Enumerations rendered to people through the message catalog.
pub trait Labeled: Copy {
    /// Stable technical value, as stored and sent over the wire.
    fn code(self) -> &'static str;

    fn label_key(self) -> &'static str;
}

macro_rules! labeled_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $($variant:ident => ($code:literal, $key:literal)),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $code)]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];
        }

        impl Labeled for $name {
            fn code(self) -> &'static str {
                match self {
                    $($name::$variant => $code,)+
                }
            }

            fn label_key(self) -> &'static str {
                match self {
                    $($name::$variant => $key,)+
                }
            }
        }
    };
}

labeled_enum! {
    /// Where a candidate stands in the selection process.
    CandidateStatus {
        Active => ("ACTIVE", "candidate_status.active"),
        Inactive => ("INACTIVE", "candidate_status.inactive"),
        Blocked => ("BLOCKED", "candidate_status.blocked"),
    }
}

impl Default for CandidateStatus {
    fn default() -> Self {
        CandidateStatus::Active
    }
}

labeled_enum! {
    Gender {
        Male => ("MALE", "gender.male"),
        Female => ("FEMALE", "gender.female"),
        Other => ("OTHER", "gender.other"),
        Undisclosed => ("UNDISCLOSED", "gender.undisclosed"),
    }
}

labeled_enum! {
    /// Highest education level reached.
    EducationLevel {
        Primary => ("PRIMARY", "education_level.primary"),
        Secondary => ("SECONDARY", "education_level.secondary"),
        Technical => ("TECHNICAL", "education_level.technical"),
        University => ("UNIVERSITY", "education_level.university"),
        Postgraduate => ("POSTGRADUATE", "education_level.postgraduate"),
        Doctorate => ("DOCTORATE", "education_level.doctorate"),
    }
}

labeled_enum! {
    /// Identity document kinds accepted at registration.
    DocumentType {
        NationalId => ("NATIONAL_ID", "document_type.national_id"),
        ForeignerId => ("FOREIGNER_ID", "document_type.foreigner_id"),
        Passport => ("PASSPORT", "document_type.passport"),
        Dni => ("DNI", "document_type.dni"),
        DriverLicense => ("DRIVER_LICENSE", "document_type.driver_license"),
        Other => ("OTHER", "document_type.other"),
    }
}

/// Personal, contact and education data supplied by clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateProfile {
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub document_type: DocumentType,
    pub document_number: String,
    pub country: String,
    pub city: String,
    pub birth_date: NaiveDate,
    pub gender: Gender,
    pub education_level: EducationLevel,
    #[serde(default)]
    pub linkedin_url: Option<String>,
}

/// Who touched a record and when.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditTrail {
    pub created_by: String,
    pub created_at: NaiveDateTime,
    pub modified_by: Option<String>,
    pub modified_at: Option<NaiveDateTime>,
}

impl AuditTrail {
    pub fn created(by: &str, at: NaiveDateTime) -> Self {
        Self {
            created_by: by.to_string(),
            created_at: at,
            modified_by: None,
            modified_at: None,
        }
    }

    pub fn touch(&mut self, by: &str, at: NaiveDateTime) {
        self.modified_by = Some(by.to_string());
        self.modified_at = Some(at);
    }
}

/// A candidate before the repository has assigned an id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateDraft {
    pub profile: CandidateProfile,
    pub status: CandidateStatus,
    pub registered_on: NaiveDate,
    pub audit: AuditTrail,
}

/// Persisted candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: CandidateId,
    #[serde(flatten)]
    pub profile: CandidateProfile,
    pub status: CandidateStatus,
    pub registered_on: NaiveDate,
    pub audit: AuditTrail,
}

impl Candidate {
    pub fn from_draft(id: CandidateId, draft: CandidateDraft) -> Self {
        Self {
            id,
            profile: draft.profile,
            status: draft.status,
            registered_on: draft.registered_on,
            audit: draft.audit,
        }
    }
}

/// Body of a create request. Status and registration date fall back to
/// `Active` and today when omitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCandidate {
    #[serde(flatten)]
    pub profile: CandidateProfile,
    #[serde(default)]
    pub status: Option<CandidateStatus>,
    #[serde(default)]
    pub registered_on: Option<NaiveDate>,
}

/// Body of a full replacement; every field is required, status included.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateUpdate {
    #[serde(flatten)]
    pub profile: CandidateProfile,
    pub status: CandidateStatus,
}

/// Partial update; absent fields keep their stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CandidatePatch {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub document_type: Option<DocumentType>,
    pub document_number: Option<String>,
    pub country: Option<String>,
    pub city: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub gender: Option<Gender>,
    pub education_level: Option<EducationLevel>,
    pub linkedin_url: Option<String>,
    pub status: Option<CandidateStatus>,
}

impl CandidatePatch {
    pub fn is_empty(&self) -> bool {
        self == &CandidatePatch::default()
    }

    /// Copy every present field onto `candidate`.
    pub fn apply(self, candidate: &mut Candidate) {
        let profile = &mut candidate.profile;
        if let Some(value) = self.full_name {
            profile.full_name = value;
        }
        if let Some(value) = self.email {
            profile.email = value;
        }
        if let Some(value) = self.phone {
            profile.phone = value;
        }
        if let Some(value) = self.document_type {
            profile.document_type = value;
        }
        if let Some(value) = self.document_number {
            profile.document_number = value;
        }
        if let Some(value) = self.country {
            profile.country = value;
        }
        if let Some(value) = self.city {
            profile.city = value;
        }
        if let Some(value) = self.birth_date {
            profile.birth_date = value;
        }
        if let Some(value) = self.gender {
            profile.gender = value;
        }
        if let Some(value) = self.education_level {
            profile.education_level = value;
        }
        if let Some(value) = self.linkedin_url {
            profile.linkedin_url = Some(value);
        }
        if let Some(value) = self.status {
            candidate.status = value;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enums_use_their_codes_on_the_wire() {
        let json = serde_json::to_string(&DocumentType::DriverLicense).unwrap();
        assert_eq!(json, "\"DRIVER_LICENSE\"");
        let parsed: CandidateStatus = serde_json::from_str("\"BLOCKED\"").unwrap();
        assert_eq!(parsed, CandidateStatus::Blocked);
        assert!(serde_json::from_str::<Gender>("\"male\"").is_err());
    }

    #[test]
    fn codes_and_keys_cover_every_variant() {
        for level in EducationLevel::ALL {
            assert!(level.label_key().starts_with("education_level."));
            assert_eq!(level.code(), level.code().to_ascii_uppercase());
        }
        assert_eq!(CandidateStatus::default(), CandidateStatus::Active);
    }

    #[test]
    fn patch_only_touches_present_fields() {
        let mut candidate = Candidate {
            id: CandidateId(1),
            profile: CandidateProfile {
                full_name: "Ana Gomez".to_string(),
                email: "ana@example.com".to_string(),
                phone: "+573001112233".to_string(),
                document_type: DocumentType::NationalId,
                document_number: "10203040".to_string(),
                country: "Colombia".to_string(),
                city: "Medellin".to_string(),
                birth_date: NaiveDate::from_ymd_opt(1994, 3, 2).expect("valid date"),
                gender: Gender::Female,
                education_level: EducationLevel::University,
                linkedin_url: None,
            },
            status: CandidateStatus::Active,
            registered_on: NaiveDate::from_ymd_opt(2024, 1, 10).expect("valid date"),
            audit: AuditTrail::created(
                "system",
                NaiveDate::from_ymd_opt(2024, 1, 10)
                    .and_then(|date| date.and_hms_opt(8, 0, 0))
                    .expect("valid datetime"),
            ),
        };

        let patch = CandidatePatch {
            city: Some("Bogota".to_string()),
            status: Some(CandidateStatus::Inactive),
            ..CandidatePatch::default()
        };
        assert!(!patch.is_empty());
        patch.apply(&mut candidate);

        assert_eq!(candidate.profile.city, "Bogota");
        assert_eq!(candidate.status, CandidateStatus::Inactive);
        assert_eq!(candidate.profile.full_name, "Ana Gomez");
        assert!(CandidatePatch::default().is_empty());
    }
}
