use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::error::ExportError;

/// Output formats supported by the export subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExportFormat {
    Csv,
    Excel,
    Pdf,
}

impl ExportFormat {
    pub const ALL: [ExportFormat; 3] = [ExportFormat::Csv, ExportFormat::Excel, ExportFormat::Pdf];

    pub const fn code(self) -> &'static str {
        match self {
            ExportFormat::Csv => "CSV",
            ExportFormat::Excel => "EXCEL",
            ExportFormat::Pdf => "PDF",
        }
    }

    /// Message catalog key used when rendering the format for people.
    pub const fn label_key(self) -> &'static str {
        match self {
            ExportFormat::Csv => "export_format.csv",
            ExportFormat::Excel => "export_format.excel",
            ExportFormat::Pdf => "export_format.pdf",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "excel" | "xlsx" => Ok(ExportFormat::Excel),
            "pdf" => Ok(ExportFormat::Pdf),
            _ => Err(ExportError::UnsupportedFormat(value.to_string())),
        }
    }
}

impl Serialize for ExportFormat {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.code())
    }
}

impl<'de> Deserialize<'de> for ExportFormat {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Process-wide ceilings per format plus the lifetime of finished artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatLimits {
    pub csv_max: usize,
    pub excel_max: usize,
    pub pdf_max: usize,
    pub expiration_minutes: u32,
}

impl FormatLimits {
    pub fn ceiling(&self, format: ExportFormat) -> usize {
        match format {
            ExportFormat::Csv => self.csv_max,
            ExportFormat::Excel => self.excel_max,
            ExportFormat::Pdf => self.pdf_max,
        }
    }

    pub fn expiration(&self) -> chrono::Duration {
        chrono::Duration::minutes(i64::from(self.expiration_minutes))
    }

    /// Fails with [`ExportError::LimitExceeded`] when `requested` is above the format ceiling.
    pub fn check(&self, format: ExportFormat, requested: usize) -> Result<(), ExportError> {
        let ceiling = self.ceiling(format);
        if requested > ceiling {
            return Err(ExportError::LimitExceeded {
                format,
                ceiling,
                requested,
            });
        }
        Ok(())
    }
}
