//! Static message catalog for enum labels.

use axum::http::{header, HeaderMap};
use serde::{Deserialize, Serialize};

use super::domain::Labeled;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    Es,
    En,
}

impl Locale {
    /// Pick the locale from an `Accept-Language` value. Anything that does not
    /// start with `en` is served in Spanish.
    pub fn from_accept_language(value: &str) -> Self {
        let primary = value.trim().get(..2).unwrap_or_default();
        if primary.eq_ignore_ascii_case("en") {
            Locale::En
        } else {
            Locale::Es
        }
    }

    pub fn from_headers(headers: &HeaderMap) -> Self {
        headers
            .get(header::ACCEPT_LANGUAGE)
            .and_then(|value| value.to_str().ok())
            .map(Self::from_accept_language)
            .unwrap_or_default()
    }

    pub fn message(self, key: &str) -> Option<&'static str> {
        let (es, en) = lookup(key)?;
        Some(match self {
            Locale::Es => es,
            Locale::En => en,
        })
    }

    /// Localized label for `value`, or its code when the catalog has no entry.
    pub fn label<L: Labeled>(self, value: L) -> String {
        self.message(value.label_key())
            .unwrap_or_else(|| value.code())
            .to_string()
    }
}

fn lookup(key: &str) -> Option<(&'static str, &'static str)> {
    let pair = match key {
        "candidate_status.active" => ("Activo", "Active"),
        "candidate_status.inactive" => ("Inactivo", "Inactive"),
        "candidate_status.blocked" => ("Bloqueado", "Blocked"),

        "gender.male" => ("Masculino", "Male"),
        "gender.female" => ("Femenino", "Female"),
        "gender.other" => ("Otro", "Other"),
        "gender.undisclosed" => ("No declarado", "Undisclosed"),

        "education_level.primary" => ("Primaria", "Primary school"),
        "education_level.secondary" => ("Secundaria", "Secondary school"),
        "education_level.technical" => ("Técnico / Tecnólogo", "Technical degree"),
        "education_level.university" => ("Universitario", "University degree"),
        "education_level.postgraduate" => ("Posgrado", "Postgraduate"),
        "education_level.doctorate" => ("Doctorado", "Doctorate"),

        "document_type.national_id" => ("Cédula de ciudadanía", "National ID card"),
        "document_type.foreigner_id" => ("Cédula de extranjería", "Foreigner ID card"),
        "document_type.passport" => ("Pasaporte", "Passport"),
        "document_type.dni" => ("DNI", "DNI"),
        "document_type.driver_license" => ("Licencia de conducción", "Driver license"),
        "document_type.other" => ("Otro", "Other"),

        "export_format.csv" => ("CSV", "CSV"),
        "export_format.excel" => ("Excel", "Excel"),
        "export_format.pdf" => ("PDF", "PDF"),

        "export.accepted" => ("Exportación en proceso", "Export in progress"),
        "export.not_found" => (
            "Exportación no encontrada o aún en proceso",
            "Export not found or still in progress",
        ),
        "error.validation" => ("Error de validación", "Validation error"),
        "error.not_found" => ("Recurso no encontrado", "Resource not found"),
        "error.conflict" => ("El recurso ya existe", "Resource already exists"),
        "error.bad_request" => ("Solicitud inválida", "Bad request"),
        "error.export_limit" => (
            "Límite de exportación excedido",
            "Export limit exceeded",
        ),
        "error.internal" => ("Error interno del servidor", "Internal server error"),
        _ => return None,
    };
    Some(pair)
}
