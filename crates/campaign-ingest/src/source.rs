//! Materialised row sources built from uploaded tabular files.
//!
//! Only the first sheet of a workbook is read. The first non-empty row names
//! the columns and every later row becomes a [`CustomerRecord`] keyed by it.

use std::collections::BTreeMap;
use std::io::{Cursor, Read};
use std::path::Path;

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use campaign_core::{CustomerRecord, FieldValue};

use crate::error::{IngestError, Result};

/// Kinds of file the ingester understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Csv,
    Workbook,
}

impl SourceFormat {
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "csv" => Some(SourceFormat::Csv),
            "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => Some(SourceFormat::Workbook),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }
}

/// An ordered, finite, restartable sequence of customer records.
#[derive(Debug, Clone, PartialEq)]
pub struct RowSource {
    name: String,
    columns: Vec<String>,
    rows: Vec<CustomerRecord>,
}

impl RowSource {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let format = SourceFormat::from_path(path)
            .ok_or_else(|| IngestError::UnsupportedFormat(path.display().to_string()))?;
        let bytes = std::fs::read(path).map_err(|source| IngestError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self::from_bytes(name, format, bytes)
    }

    pub fn from_bytes(name: impl Into<String>, format: SourceFormat, bytes: Vec<u8>) -> Result<Self> {
        match format {
            SourceFormat::Csv => Self::from_csv_reader(name, Cursor::new(bytes)),
            SourceFormat::Workbook => Self::from_workbook_bytes(name, bytes),
        }
    }

    pub fn from_csv_reader<R: Read>(name: impl Into<String>, reader: R) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut grid = Vec::new();
        for record in csv_reader.records() {
            let record = record?;
            grid.push(
                record
                    .iter()
                    .map(|cell| (!cell.is_empty()).then(|| FieldValue::infer(cell)))
                    .collect(),
            );
        }
        Self::from_grid(name.into(), grid)
    }

    pub fn from_workbook_bytes(name: impl Into<String>, bytes: Vec<u8>) -> Result<Self> {
        let name = name.into();
        let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))?;
        let first_sheet = workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or(IngestError::NoSheets)?;
        log::debug!("Reading sheet '{}' of {}", first_sheet, name);

        let range = workbook.worksheet_range(&first_sheet)?;
        let grid = range
            .rows()
            .map(|row| row.iter().map(cell_value).collect())
            .collect();
        Self::from_grid(name, grid)
    }

    fn from_grid(name: String, grid: Vec<Vec<Option<FieldValue>>>) -> Result<Self> {
        let mut rows_iter = grid
            .into_iter()
            .filter(|row| row.iter().any(|cell| cell.as_ref().is_some_and(|v| !v.is_blank())));

        let header = rows_iter
            .next()
            .ok_or_else(|| IngestError::Empty(name.clone()))?;
        let columns = header_columns(&header);

        let rows: Vec<CustomerRecord> = rows_iter
            .enumerate()
            .map(|(index, cells)| {
                let fields: BTreeMap<String, FieldValue> = columns
                    .iter()
                    .zip(cells)
                    .filter_map(|(column, cell)| {
                        cell.filter(|v| !v.is_blank()).map(|v| (column.clone(), v))
                    })
                    .collect();
                CustomerRecord::new(index + 1, fields)
            })
            .collect();

        if rows.is_empty() {
            return Err(IngestError::Empty(name));
        }

        log::info!(
            "Ingested {} rows with {} columns from {}",
            rows.len(),
            columns.len(),
            name
        );
        Ok(Self {
            name,
            columns,
            rows,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[CustomerRecord] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

fn header_columns(header: &[Option<FieldValue>]) -> Vec<String> {
    let mut columns: Vec<String> = Vec::with_capacity(header.len());
    for (index, cell) in header.iter().enumerate() {
        let base = match cell {
            Some(value) if !value.is_blank() => value.to_string(),
            _ => format!("column_{}", index + 1),
        };
        let mut name = base.clone();
        let mut suffix = 1;
        while columns.contains(&name) {
            name = format!("{base}_{suffix}");
            suffix += 1;
        }
        columns.push(name);
    }
    columns
}

fn cell_value(cell: &Data) -> Option<FieldValue> {
    match cell {
        Data::Empty => None,
        Data::Int(value) => Some(FieldValue::Integer(*value)),
        Data::Float(value) if value.fract() == 0.0 && value.abs() < 9.0e15 => {
            Some(FieldValue::Integer(*value as i64))
        }
        Data::Float(value) => Some(FieldValue::Float(*value)),
        Data::Bool(value) => Some(FieldValue::Bool(*value)),
        Data::String(text) => {
            let trimmed = text.trim();
            (!trimmed.is_empty()).then(|| FieldValue::Text(trimmed.to_string()))
        }
        other => Some(FieldValue::Text(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(csv: &str) -> Result<RowSource> {
        RowSource::from_csv_reader("upload.csv", csv.as_bytes())
    }

    #[test]
    fn header_row_keys_every_record() {
        let source = parse("customerId,name,balance\nC1,Asha,1200.50\nC2,Ben,300\n").unwrap();
        assert_eq!(source.columns(), ["customerId", "name", "balance"]);
        assert_eq!(source.len(), 2);

        let first = &source.rows()[0];
        assert_eq!(first.id(), "C1");
        assert_eq!(first.display_name(), "Asha");
        assert_eq!(first.row_number(), 1);
        assert_eq!(first.get("balance"), Some(&FieldValue::Float(1200.5)));
        assert_eq!(source.rows()[1].get("balance"), Some(&FieldValue::Integer(300)));
    }

    #[test]
    fn blank_rows_are_skipped_and_positions_stay_dense() {
        let source = parse("email\n\n a@x.com \n,\nb@x.com\n").unwrap();
        assert_eq!(source.len(), 2);
        assert_eq!(source.rows()[1].row_number(), 2);
        assert_eq!(source.rows()[1].id(), "ROW_2");
        assert_eq!(
            source.rows()[0].get("email"),
            Some(&FieldValue::Text("a@x.com".to_string()))
        );
    }

    #[test]
    fn empty_cells_are_omitted() {
        let source = parse("id,name,segment\nC1,,gold\n").unwrap();
        let record = &source.rows()[0];
        assert!(record.get("name").is_none());
        assert_eq!(record.display_name(), "Customer 1");
    }

    #[test]
    fn blank_and_duplicate_headers_are_named() {
        let source = parse("name,,name\nA,B,C\n").unwrap();
        assert_eq!(source.columns(), ["name", "column_2", "name_1"]);
    }

    #[test]
    fn short_rows_are_accepted() {
        let source = parse("id,name,segment\nC1\n").unwrap();
        assert_eq!(source.rows()[0].fields().len(), 1);
    }

    #[test]
    fn header_only_file_is_empty() {
        assert!(matches!(parse("id,name\n"), Err(IngestError::Empty(_))));
        assert!(matches!(parse(""), Err(IngestError::Empty(_))));
    }

    #[test]
    fn rereading_yields_same_sequence() {
        let csv = "id,name\nC1,A\nC2,B\n";
        assert_eq!(parse(csv).unwrap(), parse(csv).unwrap());
    }

    #[test]
    fn format_detection_by_extension() {
        assert_eq!(SourceFormat::from_extension("CSV"), Some(SourceFormat::Csv));
        assert_eq!(SourceFormat::from_extension("xlsx"), Some(SourceFormat::Workbook));
        assert_eq!(SourceFormat::from_extension("pdf"), None);
    }

    #[test]
    fn corrupt_workbook_is_rejected() {
        let result = RowSource::from_workbook_bytes("broken.xlsx", b"not a zip archive".to_vec());
        assert!(matches!(result, Err(IngestError::Workbook(_))));
    }

    #[test]
    fn workbook_cells_map_to_field_values() {
        assert_eq!(cell_value(&Data::Float(1042.0)), Some(FieldValue::Integer(1042)));
        assert_eq!(cell_value(&Data::Float(2.5)), Some(FieldValue::Float(2.5)));
        assert_eq!(cell_value(&Data::String("  ".to_string())), None);
        assert_eq!(cell_value(&Data::Empty), None);
        assert_eq!(cell_value(&Data::Bool(true)), Some(FieldValue::Bool(true)));
    }
}
