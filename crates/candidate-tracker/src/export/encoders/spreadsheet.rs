use rust_xlsxwriter::{Format, Workbook, Worksheet, XlsxError};
use tracing::debug;

use super::{EncodedOutput, FormatEncoder};
use crate::export::error::ExportError;
use crate::export::format::ExportFormat;
use crate::export::source::RowSource;
use crate::export::value::ExportValue;

const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Largest magnitude an Excel number cell (an f64) holds without rounding.
const MAX_EXACT_INTEGER: u128 = 1 << 53;

/// Office Open XML workbook with a bold header row on every sheet.
///
/// Worksheets are created in constant-memory mode so rows are flushed to disk
/// as they are written. Once a sheet holds `sheet_capacity` data rows a new
/// sheet (`Data_2`, `Data_3`, ...) is opened with its own header row.
#[derive(Debug, Clone)]
pub struct SpreadsheetEncoder {
    chunk_size: usize,
    sheet_capacity: usize,
}

impl SpreadsheetEncoder {
    pub const CHUNK_SIZE: usize = 500;
    pub const ROWS_PER_SHEET: usize = 50_000;

    pub fn new(chunk_size: usize, sheet_capacity: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
            sheet_capacity: sheet_capacity.max(1),
        }
    }
}

impl Default for SpreadsheetEncoder {
    fn default() -> Self {
        Self::new(Self::CHUNK_SIZE, Self::ROWS_PER_SHEET)
    }
}

struct CellStyles {
    header: Format,
    date: Format,
    datetime: Format,
}

impl CellStyles {
    fn new() -> Self {
        Self {
            header: Format::new().set_bold(),
            date: Format::new().set_num_format("yyyy-mm-dd"),
            datetime: Format::new().set_num_format("yyyy-mm-dd hh:mm:ss"),
        }
    }
}

fn open_sheet(
    workbook: &mut Workbook,
    number: usize,
    headers: &[String],
    styles: &CellStyles,
) -> Result<(), XlsxError> {
    let sheet = workbook.add_worksheet_with_constant_memory();
    sheet.set_name(format!("Data_{number}"))?;
    for (col, header) in headers.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, header, &styles.header)?;
    }
    Ok(())
}

fn write_cell(
    sheet: &mut Worksheet,
    row: u32,
    col: u16,
    value: &ExportValue,
    styles: &CellStyles,
) -> Result<(), XlsxError> {
    match value {
        ExportValue::Null => {}
        ExportValue::Integer(number) if number.unsigned_abs() <= MAX_EXACT_INTEGER => {
            sheet.write_number(row, col, *number as f64)?;
        }
        ExportValue::Integer(number) => {
            sheet.write_string(row, col, number.to_string())?;
        }
        ExportValue::Number(number) => {
            sheet.write_number(row, col, *number)?;
        }
        ExportValue::Bool(flag) => {
            sheet.write_boolean(row, col, *flag)?;
        }
        ExportValue::Date(date) => {
            sheet.write_datetime_with_format(row, col, date, &styles.date)?;
        }
        ExportValue::DateTime(datetime) => {
            sheet.write_datetime_with_format(row, col, datetime, &styles.datetime)?;
        }
        ExportValue::Text(text) => {
            sheet.write_string(row, col, text)?;
        }
    }
    Ok(())
}

impl FormatEncoder for SpreadsheetEncoder {
    fn format(&self) -> ExportFormat {
        ExportFormat::Excel
    }

    fn file_extension(&self) -> &'static str {
        "xlsx"
    }

    fn mime_type(&self) -> String {
        XLSX_MIME.to_string()
    }

    fn encode<T: Clone>(&self, source: &dyn RowSource<T>) -> Result<EncodedOutput, ExportError> {
        let fail = |err: XlsxError| ExportError::encode(ExportFormat::Excel, err);
        let columns = source.columns();
        let headers = columns.headers();
        let total = source.total_count()?;
        let styles = CellStyles::new();

        let mut workbook = Workbook::new();
        let mut sections: Vec<usize> = vec![0];
        open_sheet(&mut workbook, 1, headers, &styles).map_err(fail)?;

        let mut offset = 0;
        while offset < total {
            let rows = source.fetch(offset, self.chunk_size)?;
            if rows.is_empty() {
                break;
            }

            for row in rows.iter() {
                if sections.last().copied().unwrap_or_default() >= self.sheet_capacity {
                    sections.push(0);
                    open_sheet(&mut workbook, sections.len(), headers, &styles).map_err(fail)?;
                }

                let index = sections.len() - 1;
                let sheet_rows = &mut sections[index];
                let sheet = workbook.worksheet_from_index(index).map_err(fail)?;
                let excel_row = (*sheet_rows + 1) as u32;
                for (col, value) in columns.extract(row).iter().enumerate() {
                    write_cell(sheet, excel_row, col as u16, value, &styles).map_err(fail)?;
                }
                *sheet_rows += 1;
            }

            offset += self.chunk_size;
        }

        let bytes = workbook.save_to_buffer().map_err(fail)?;
        let rows = sections.iter().sum();
        debug!(rows, sheets = sections.len(), "workbook encoded");

        Ok(EncodedOutput {
            bytes,
            rows,
            sections,
        })
    }
}
