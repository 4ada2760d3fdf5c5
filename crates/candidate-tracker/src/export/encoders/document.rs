use printpdf::{BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfLayerReference};
use tracing::debug;

use super::{EncodedOutput, FormatEncoder};
use crate::export::error::ExportError;
use crate::export::format::ExportFormat;
use crate::export::source::RowSource;

const PAGE_WIDTH_MM: f32 = 297.0;
const PAGE_HEIGHT_MM: f32 = 210.0;
const MARGIN_MM: f32 = 12.0;
const ROW_HEIGHT_MM: f32 = 4.2;
const FONT_SIZE_PT: f32 = 7.0;
const PT_TO_MM: f32 = 0.3528;
// Helvetica averages roughly half an em per glyph.
const GLYPH_WIDTH_EM: f32 = 0.5;

/// Paginated document: one table per A4 landscape page, headers repeated on each page.
#[derive(Debug, Clone)]
pub struct DocumentEncoder {
    rows_per_page: usize,
    title: String,
}

impl DocumentEncoder {
    pub const ROWS_PER_PAGE: usize = 40;

    pub fn new(rows_per_page: usize) -> Self {
        Self {
            rows_per_page: rows_per_page.max(1),
            title: "Exported data".to_string(),
        }
    }
}

impl Default for DocumentEncoder {
    fn default() -> Self {
        Self::new(Self::ROWS_PER_PAGE)
    }
}

struct TableLayout {
    column_width: f32,
    max_chars: usize,
}

impl TableLayout {
    fn new(columns: usize) -> Self {
        let usable = PAGE_WIDTH_MM - 2.0 * MARGIN_MM;
        let column_width = usable / columns.max(1) as f32;
        let glyph = FONT_SIZE_PT * PT_TO_MM * GLYPH_WIDTH_EM;
        let max_chars = ((column_width - 1.0) / glyph).floor().max(1.0) as usize;
        Self {
            column_width,
            max_chars,
        }
    }

    fn x(&self, col: usize) -> Mm {
        Mm(MARGIN_MM + self.column_width * col as f32)
    }

    fn y(&self, line: usize) -> Mm {
        Mm(PAGE_HEIGHT_MM - MARGIN_MM - ROW_HEIGHT_MM * (line as f32 + 1.0))
    }

    fn fit(&self, text: &str) -> String {
        let single_line = text.replace(['\r', '\n'], " ");
        if single_line.chars().count() <= self.max_chars {
            return single_line;
        }
        let keep = self.max_chars.saturating_sub(3);
        let mut clipped: String = single_line.chars().take(keep).collect();
        clipped.push_str("...");
        clipped
    }

    fn write_line<'a>(
        &self,
        layer: &PdfLayerReference,
        line: usize,
        cells: impl IntoIterator<Item = &'a str>,
        font: &IndirectFontRef,
    ) {
        for (col, text) in cells.into_iter().enumerate() {
            layer.use_text(self.fit(text), FONT_SIZE_PT, self.x(col), self.y(line), font);
        }
    }
}

impl FormatEncoder for DocumentEncoder {
    fn format(&self) -> ExportFormat {
        ExportFormat::Pdf
    }

    fn file_extension(&self) -> &'static str {
        "pdf"
    }

    fn mime_type(&self) -> String {
        mime::APPLICATION_PDF.to_string()
    }

    fn encode<T: Clone>(&self, source: &dyn RowSource<T>) -> Result<EncodedOutput, ExportError> {
        let columns = source.columns();
        let headers = columns.headers();
        let total = source.total_count()?;
        let layout = TableLayout::new(headers.len());

        let (document, first_page, first_layer) = PdfDocument::new(
            self.title.as_str(),
            Mm(PAGE_WIDTH_MM),
            Mm(PAGE_HEIGHT_MM),
            "Table",
        );
        let regular = document
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|err| ExportError::encode(ExportFormat::Pdf, err))?;
        let bold = document
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|err| ExportError::encode(ExportFormat::Pdf, err))?;

        let mut layer = document.get_page(first_page).get_layer(first_layer);
        let mut sections = Vec::new();
        let mut offset = 0;

        loop {
            let rows = if offset < total {
                source.fetch(offset, self.rows_per_page)?
            } else {
                Default::default()
            };
            if rows.is_empty() && !sections.is_empty() {
                break;
            }

            if !sections.is_empty() {
                let (page, page_layer) =
                    document.add_page(Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "Table");
                layer = document.get_page(page).get_layer(page_layer);
            }

            layout.write_line(&layer, 0, headers.iter().map(String::as_str), &bold);
            for (line, row) in rows.iter().enumerate() {
                let texts: Vec<String> = columns
                    .extract(row)
                    .iter()
                    .map(|value| value.to_text())
                    .collect();
                layout.write_line(&layer, line + 1, texts.iter().map(String::as_str), &regular);
            }

            sections.push(rows.len());
            offset += self.rows_per_page;
            if offset >= total {
                break;
            }
        }

        let bytes = document
            .save_to_bytes()
            .map_err(|err| ExportError::encode(ExportFormat::Pdf, err))?;
        let rows = sections.iter().sum();
        debug!(rows, pages = sections.len(), "document encoded");

        Ok(EncodedOutput {
            bytes,
            rows,
            sections,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::source::{Columns, ListRowSource};
    use crate::export::value::ExportValue;
    use chrono::NaiveDate;
    use std::sync::Arc;

    fn columns() -> Arc<Columns<u32>> {
        Arc::new(
            Columns::new()
                .column("ID", |row: &u32| ExportValue::from(*row))
                .column("Registered On", |row: &u32| {
                    let base = NaiveDate::from_ymd_opt(2024, 5, 1).expect("valid date");
                    ExportValue::from(base + chrono::Duration::days(i64::from(*row)))
                }),
        )
    }

    fn encode(count: u32) -> EncodedOutput {
        let source = ListRowSource::new((1..=count).collect(), columns());
        DocumentEncoder::default()
            .encode(&source)
            .expect("document encodes")
    }

    #[test]
    fn paginates_forty_rows_per_page() {
        let output = encode(81);
        assert_eq!(output.sections, vec![40, 40, 1]);
        assert_eq!(output.rows, 81);
        assert!(output.bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn exact_multiple_does_not_add_a_trailing_page() {
        let output = encode(80);
        assert_eq!(output.sections, vec![40, 40]);
    }

    #[test]
    fn empty_source_renders_a_header_only_page() {
        let output = encode(0);
        assert_eq!(output.sections, vec![0]);
        assert!(output.bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn long_cells_are_clipped_to_the_column() {
        let layout = TableLayout::new(2);
        let long = "x".repeat(layout.max_chars * 2);
        let fitted = layout.fit(&long);
        assert_eq!(fitted.chars().count(), layout.max_chars);
        assert!(fitted.ends_with("..."));
        assert_eq!(layout.fit("line\nbreak"), "line break");
    }
}
