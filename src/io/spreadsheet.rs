use std::path::Path;

use calamine::{DataType, Range, Reader, open_workbook_auto};
use tracing::debug;

use crate::error::{Result, ToolError};
use crate::io::extension;
use crate::io::spreadsheet_write;
use crate::model::{CellValue, Chord, FIELD_COUNT, FIELD_NAMES};

const KIND: &str = "spreadsheet";

/// Spreadsheet document flavours the adapter can persist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpreadsheetKind {
    /// OpenDocument spreadsheet (`.ods`).
    Ods,
    /// Office Open XML workbook (`.xlsx`).
    Xlsx,
}

impl SpreadsheetKind {
    /// Infers the document flavour from the file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        match extension(path)?.as_str() {
            "ods" => Some(SpreadsheetKind::Ods),
            "xlsx" => Some(SpreadsheetKind::Xlsx),
            _ => None,
        }
    }
}

/// Chord dictionary held as the data rows of a spreadsheet's first sheet.
///
/// The header row is validated on load and regenerated on save, so only the
/// data rows are kept in memory.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Spreadsheet {
    rows: Vec<Vec<CellValue>>,
}

impl Spreadsheet {
    /// Creates an empty in-memory document for writing.
    pub fn blank() -> Self {
        Self::default()
    }

    /// Loads the first sheet of an existing `.ods` or `.xlsx` document.
    pub fn open(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(ToolError::file_format(KIND, path, "file does not exist"));
        }
        let mut workbook = open_workbook_auto(path)
            .map_err(|err| ToolError::file_format(KIND, path, err.to_string()))?;
        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| ToolError::file_format(KIND, path, "workbook has no sheets"))??;

        let rows = read_rows(path, &range)?;
        debug!(row_count = rows.len(), path = %path.display(), "loaded spreadsheet rows");
        Ok(Self { rows })
    }

    /// Number of data rows, excluding the header.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Iterates the data rows as chords, in sheet order.
    pub fn chords(&self) -> impl Iterator<Item = Result<Chord>> + '_ {
        self.rows.iter().cloned().map(Chord::from_row)
    }

    /// Appends one chord as a new data row.
    pub fn append(&mut self, chord: &Chord) {
        self.rows.push(chord.to_row());
    }

    pub(crate) fn rows(&self) -> &[Vec<CellValue>] {
        &self.rows
    }

    /// Writes the header followed by every data row to `path`; the flavour is
    /// chosen from the extension.
    pub fn save(&self, path: &Path) -> Result<()> {
        match SpreadsheetKind::from_path(path) {
            Some(SpreadsheetKind::Ods) => spreadsheet_write::write_ods(path, self),
            Some(SpreadsheetKind::Xlsx) => spreadsheet_write::write_xlsx(path, self),
            None => Err(ToolError::file_format(
                KIND,
                path,
                "expected an .ods or .xlsx extension",
            )),
        }
    }
}

fn read_rows(path: &Path, range: &Range<DataType>) -> Result<Vec<Vec<CellValue>>> {
    let mut rows = range.rows();
    let header = rows
        .next()
        .ok_or_else(|| ToolError::file_format(KIND, path, "missing header row"))?;
    validate_header(path, header)?;

    let mut records = Vec::new();
    for row in rows {
        let mut values: Vec<CellValue> = row.iter().map(cell_to_value).collect();
        if values.iter().all(|value| *value == CellValue::Null) {
            continue;
        }
        while values.len() > FIELD_COUNT && values.last() == Some(&CellValue::Null) {
            values.pop();
        }
        records.push(values);
    }
    Ok(records)
}

fn validate_header(path: &Path, header: &[DataType]) -> Result<()> {
    let names: Vec<String> = header
        .iter()
        .map(|cell| cell_to_string(Some(cell)).trim().to_string())
        .collect();

    for (index, expected) in FIELD_NAMES.iter().enumerate() {
        let found = names.get(index).map(String::as_str).unwrap_or_default();
        if !found.eq_ignore_ascii_case(expected) {
            return Err(ToolError::file_format(
                KIND,
                path,
                format!("header column {} is '{found}', expected '{expected}'", index + 1),
            ));
        }
    }
    if let Some(extra) = names.iter().skip(FIELD_COUNT).find(|name| !name.is_empty()) {
        return Err(ToolError::file_format(
            KIND,
            path,
            format!("unexpected header column '{extra}'"),
        ));
    }
    Ok(())
}

fn cell_to_value(cell: &DataType) -> CellValue {
    match cell {
        DataType::Int(value) => CellValue::Integer(*value),
        DataType::Float(value) => CellValue::Real(*value),
        DataType::Bool(value) => CellValue::Boolean(*value),
        DataType::String(value) if value.is_empty() => CellValue::Null,
        DataType::Empty => CellValue::Null,
        other => CellValue::Text(cell_to_string(Some(other))),
    }
}

fn cell_to_string(cell: Option<&DataType>) -> String {
    match cell {
        Some(DataType::String(value)) => value.clone(),
        Some(DataType::Float(value)) => value.to_string(),
        Some(DataType::Int(value)) => value.to_string(),
        Some(DataType::Bool(value)) => value.to_string(),
        Some(DataType::Empty) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_xlsxwriter::Workbook;
    use tempfile::tempdir;

    #[test]
    fn missing_file_is_a_format_error() {
        let temp_dir = tempdir().expect("temporary directory");
        let error = Spreadsheet::open(&temp_dir.path().join("absent.ods")).unwrap_err();
        assert!(matches!(error, ToolError::FileFormat { .. }));
    }

    #[test]
    fn rejects_unexpected_header() {
        let temp_dir = tempdir().expect("temporary directory");
        let path = temp_dir.path().join("wrong.xlsx");
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet.write_string(0, 0, "chord_id").expect("cell written");
        worksheet.write_string(0, 1, "name").expect("cell written");
        workbook.save(&path).expect("workbook saved");

        let error = Spreadsheet::open(&path).unwrap_err();
        match error {
            ToolError::FileFormat { reason, .. } => assert!(reason.contains("chord_id")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn skips_blank_rows_and_reads_numbers() {
        let temp_dir = tempdir().expect("temporary directory");
        let path = temp_dir.path().join("dictionary.xlsx");
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        for (col, name) in FIELD_NAMES.iter().enumerate() {
            worksheet
                .write_string(0, col as u16, *name)
                .expect("header written");
        }
        let values = [
            (0, "1"),
            (1, "Major"),
            (3, "maj"),
            (4, "M"),
            (5, "c"),
        ];
        for (col, value) in values {
            worksheet.write_string(2, col, value).expect("cell written");
        }
        worksheet.write_number(2, 18, 1.0).expect("cell written");
        workbook.save(&path).expect("workbook saved");

        let sheet = Spreadsheet::open(&path).expect("spreadsheet loaded");
        assert_eq!(sheet.len(), 1);
        let chords: Vec<Chord> = sheet
            .chords()
            .collect::<Result<_>>()
            .expect("chords parsed");
        assert_eq!(chords[0].id, Some(1));
        assert_eq!(chords[0].root_note.as_str(), "C");
        assert!(chords[0].bimanual);
        assert!(!chords[0].rootless);
    }

    #[test]
    fn infers_kind_from_extension() {
        assert_eq!(
            SpreadsheetKind::from_path(Path::new("a/B.ODS")),
            Some(SpreadsheetKind::Ods)
        );
        assert_eq!(
            SpreadsheetKind::from_path(Path::new("b.xlsx")),
            Some(SpreadsheetKind::Xlsx)
        );
        assert_eq!(SpreadsheetKind::from_path(Path::new("c.csv")), None);
    }
}
