//! Format encoders turning a [`RowSource`] into the bytes of one output format.
//!
//! Every encoder walks its source in fixed-size chunks (`fetch(offset, chunk)`
//! until `offset >= total_count`) so memory stays bounded by the chunk rather
//! than by the size of the export.

pub mod csv;
pub mod document;
pub mod spreadsheet;

use super::error::ExportError;
use super::format::ExportFormat;
use super::source::RowSource;

pub use self::csv::CsvEncoder;
pub use document::DocumentEncoder;
pub use spreadsheet::SpreadsheetEncoder;

/// Bytes produced by an encoder plus a summary of what went into them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedOutput {
    pub bytes: Vec<u8>,
    /// Data rows written, headers excluded.
    pub rows: usize,
    /// Data rows per sheet or page; a single entry for formats without sections.
    pub sections: Vec<usize>,
}

/// Contract shared by the concrete encoders.
pub trait FormatEncoder {
    fn format(&self) -> ExportFormat;

    fn file_extension(&self) -> &'static str;

    fn mime_type(&self) -> String;

    fn encode<T: Clone>(&self, source: &dyn RowSource<T>) -> Result<EncodedOutput, ExportError>;
}

/// Closed set of encoders, selected by [`ExportFormat`].
#[derive(Debug, Clone)]
pub enum Encoder {
    Csv(CsvEncoder),
    Spreadsheet(SpreadsheetEncoder),
    Document(DocumentEncoder),
}

impl Encoder {
    pub fn for_format(format: ExportFormat) -> Self {
        match format {
            ExportFormat::Csv => Encoder::Csv(CsvEncoder::default()),
            ExportFormat::Excel => Encoder::Spreadsheet(SpreadsheetEncoder::default()),
            ExportFormat::Pdf => Encoder::Document(DocumentEncoder::default()),
        }
    }
}

impl FormatEncoder for Encoder {
    fn format(&self) -> ExportFormat {
        match self {
            Encoder::Csv(encoder) => encoder.format(),
            Encoder::Spreadsheet(encoder) => encoder.format(),
            Encoder::Document(encoder) => encoder.format(),
        }
    }

    fn file_extension(&self) -> &'static str {
        match self {
            Encoder::Csv(encoder) => encoder.file_extension(),
            Encoder::Spreadsheet(encoder) => encoder.file_extension(),
            Encoder::Document(encoder) => encoder.file_extension(),
        }
    }

    fn mime_type(&self) -> String {
        match self {
            Encoder::Csv(encoder) => encoder.mime_type(),
            Encoder::Spreadsheet(encoder) => encoder.mime_type(),
            Encoder::Document(encoder) => encoder.mime_type(),
        }
    }

    fn encode<T: Clone>(&self, source: &dyn RowSource<T>) -> Result<EncodedOutput, ExportError> {
        match self {
            Encoder::Csv(encoder) => encoder.encode(source),
            Encoder::Spreadsheet(encoder) => encoder.encode(source),
            Encoder::Document(encoder) => encoder.encode(source),
        }
    }
}
