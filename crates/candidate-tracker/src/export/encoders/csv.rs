use ::csv::{QuoteStyle, Terminator, WriterBuilder};
use tracing::debug;

use super::{EncodedOutput, FormatEncoder};
use crate::export::error::ExportError;
use crate::export::format::ExportFormat;
use crate::export::source::RowSource;

/// Comma separated values with a header row.
///
/// A field is quoted only when it contains a comma, a double quote or a line
/// break; embedded quotes are doubled. Nulls become empty fields, except that a
/// record made of a single empty field is written as `""` so it still reads
/// back as one row instead of a blank line.
#[derive(Debug, Clone)]
pub struct CsvEncoder {
    chunk_size: usize,
}

impl CsvEncoder {
    pub const CHUNK_SIZE: usize = 500;

    pub fn with_chunk_size(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
        }
    }
}

impl Default for CsvEncoder {
    fn default() -> Self {
        Self::with_chunk_size(Self::CHUNK_SIZE)
    }
}

impl FormatEncoder for CsvEncoder {
    fn format(&self) -> ExportFormat {
        ExportFormat::Csv
    }

    fn file_extension(&self) -> &'static str {
        "csv"
    }

    fn mime_type(&self) -> String {
        mime::TEXT_CSV.to_string()
    }

    fn encode<T: Clone>(&self, source: &dyn RowSource<T>) -> Result<EncodedOutput, ExportError> {
        let fail = |err: ::csv::Error| ExportError::encode(ExportFormat::Csv, err);
        let columns = source.columns();
        let total = source.total_count()?;

        let mut writer = WriterBuilder::new()
            .quote_style(QuoteStyle::Necessary)
            .terminator(Terminator::Any(b'\n'))
            .from_writer(Vec::new());
        writer.write_record(columns.headers()).map_err(fail)?;

        let mut offset = 0;
        let mut written = 0;
        while offset < total {
            let rows = source.fetch(offset, self.chunk_size)?;
            if rows.is_empty() {
                break;
            }

            for row in rows.iter() {
                let record = columns.extract(row);
                writer
                    .write_record(record.iter().map(|value| value.to_text()))
                    .map_err(fail)?;
            }

            written += rows.len();
            offset += self.chunk_size;
            debug!(written, total, "csv chunk encoded");
        }

        let bytes = writer
            .into_inner()
            .map_err(|err| ExportError::encode(ExportFormat::Csv, err.error()))?;

        Ok(EncodedOutput {
            bytes,
            rows: written,
            sections: vec![written],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::source::{Columns, ListRowSource, Page, PageRequest, PagedRowSource};
    use crate::export::value::ExportValue;
    use std::sync::Arc;

    #[derive(Debug, Clone)]
    struct Row {
        id: u32,
        note: Option<String>,
    }

    fn columns() -> Arc<Columns<Row>> {
        Arc::new(
            Columns::new()
                .column("ID", |row: &Row| ExportValue::from(row.id))
                .column("Note", |row: &Row| ExportValue::from(row.note.clone())),
        )
    }

    fn rows(count: u32) -> Vec<Row> {
        (1..=count)
            .map(|id| Row {
                id,
                note: Some(format!("note {id}")),
            })
            .collect()
    }

    fn encode(rows: Vec<Row>) -> EncodedOutput {
        let source = ListRowSource::new(rows, columns());
        CsvEncoder::default().encode(&source).expect("csv encodes")
    }

    #[test]
    fn writes_header_then_rows() {
        let output = encode(rows(2));
        let text = String::from_utf8(output.bytes).expect("utf-8");
        assert_eq!(text, "ID,Note\n1,note 1\n2,note 2\n");
        assert_eq!(output.rows, 2);
    }

    #[test]
    fn escapes_commas_quotes_and_newlines() {
        let output = encode(vec![
            Row {
                id: 1,
                note: Some("a,b\"c".to_string()),
            },
            Row {
                id: 2,
                note: Some("first\nsecond".to_string()),
            },
            Row { id: 3, note: None },
        ]);
        let text = String::from_utf8(output.bytes).expect("utf-8");
        assert_eq!(
            text,
            "ID,Note\n1,\"a,b\"\"c\"\n2,\"first\nsecond\"\n3,\n"
        );
    }

    #[test]
    fn escaped_fields_parse_back_to_the_original() {
        let original = "a,b\"c";
        let output = encode(vec![Row {
            id: 7,
            note: Some(original.to_string()),
        }]);

        let mut reader = ::csv::Reader::from_reader(output.bytes.as_slice());
        let records: Vec<::csv::StringRecord> =
            reader.records().collect::<Result<_, _>>().expect("parses");
        assert_eq!(records.len(), 1);
        assert_eq!(&records[0][1], original);
    }

    #[test]
    fn walks_sources_larger_than_one_chunk() {
        let output = encode(rows(1_234));
        let mut reader = ::csv::Reader::from_reader(output.bytes.as_slice());
        assert_eq!(reader.records().count(), 1_234);
        assert_eq!(output.rows, 1_234);
        assert_eq!(output.sections, vec![1_234]);
    }

    #[test]
    fn paged_sources_are_requested_with_a_stable_chunk() {
        let data = Arc::new(rows(1_130));
        let source = PagedRowSource::new(
            move |request: PageRequest| {
                let start = request.offset().min(data.len());
                let end = (start + request.size).min(data.len());
                Ok(Page {
                    rows: data[start..end].to_vec(),
                    total_elements: data.len(),
                })
            },
            columns(),
        );

        let output = CsvEncoder::default().encode(&source).expect("csv encodes");
        assert_eq!(output.rows, 1_130);
        let text = String::from_utf8(output.bytes).expect("utf-8");
        assert!(text.ends_with("1130,note 1130\n"));
    }

    #[test]
    fn lone_null_field_is_quoted_so_the_row_survives() {
        let columns = Arc::new(
            Columns::new().column("Note", |row: &Row| ExportValue::from(row.note.clone())),
        );
        let source = ListRowSource::new(vec![Row { id: 1, note: None }], columns);
        let output = CsvEncoder::default().encode(&source).expect("csv encodes");
        assert_eq!(output.bytes, b"Note\n\"\"\n");

        let mut reader = ::csv::Reader::from_reader(output.bytes.as_slice());
        let records: Vec<::csv::StringRecord> =
            reader.records().collect::<Result<_, _>>().expect("parses");
        assert_eq!(records.len(), 1);
        assert_eq!(&records[0][0], "");
    }

    #[test]
    fn empty_source_still_has_headers() {
        let output = encode(Vec::new());
        assert_eq!(output.bytes, b"ID,Note\n");
        assert_eq!(output.rows, 0);
    }
}
