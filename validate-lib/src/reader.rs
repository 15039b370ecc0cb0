use calamine::{Data, Reader, Xlsx, open_workbook};
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::{ValidateError, ValidateResult};
use crate::finding::format_number;
use crate::utils::{excel_serial_to_chrono, format_sheet_datetime, normalize_string};

/// A data row with its 1-based row number in the source file.
pub type NumberedRow = (usize, Vec<String>);

/// Header row and non-empty data rows of a CSV or XLSX file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TabularFile {
    pub headers: Vec<String>,
    pub rows: Vec<NumberedRow>,
}

/// Read `path` as XLSX when the extension says so, as CSV otherwise.
pub fn read_table(path: &Path, sheet_name: Option<&str>) -> ValidateResult<TabularFile> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();

    let table = match extension.as_str() {
        "xlsx" | "xlsm" => read_workbook(path, sheet_name)?,
        _ => read_csv(path)?,
    };
    check_header_duplicates(&table.headers)?;

    tracing::debug!(path = %path.display(), rows = table.rows.len(), "input file read");
    Ok(table)
}

fn is_blank_row(cells: &[String]) -> bool {
    cells.iter().all(|cell| cell.trim().is_empty())
}

pub fn read_csv(path: &Path) -> ValidateResult<TabularFile> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)?;

    let mut table = TabularFile::default();
    for (row_index, record) in reader.records().enumerate() {
        let cells: Vec<String> = record?.iter().map(str::to_string).collect();
        if row_index == 0 {
            table.headers = cells.iter().map(|cell| normalize_string(cell)).collect();
            continue;
        }
        if is_blank_row(&cells) {
            continue;
        }
        table.rows.push((row_index + 1, cells));
    }
    Ok(table)
}

pub fn read_workbook(path: &Path, sheet_name: Option<&str>) -> ValidateResult<TabularFile> {
    let mut workbook: Xlsx<_> =
        open_workbook(path).map_err(|e| ValidateError::Workbook(format!("{}", e)))?;

    let sheet_name = match sheet_name {
        Some(name) => name.to_string(),
        None => workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| ValidateError::Workbook("the workbook has no sheets".to_string()))?,
    };
    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| {
            ValidateError::Workbook(format!("Error reading sheet '{}': {}", sheet_name, e))
        })?;

    let mut table = TabularFile::default();
    for (row_index, row) in range.rows().enumerate() {
        let cells: Vec<String> = row.iter().map(cell_to_string).collect();
        if row_index == 0 {
            table.headers = cells.iter().map(|cell| normalize_string(cell)).collect();
            continue;
        }
        if is_blank_row(&cells) {
            continue;
        }
        table.rows.push((row_index + 1, cells));
    }
    Ok(table)
}

/// Render a cell as the text the rules are written against.
pub fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty | Data::Error(_) => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(f) => format_number(*f),
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => excel_serial_to_chrono(dt.as_f64())
            .map(|datetime| format_sheet_datetime(&datetime))
            .unwrap_or_else(|| format_number(dt.as_f64())),
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
    }
}

fn check_header_duplicates(headers: &[String]) -> ValidateResult<()> {
    let mut positions: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for (index, header) in headers.iter().enumerate() {
        if !header.is_empty() {
            positions.entry(header.as_str()).or_default().push(index + 1);
        }
    }

    let duplicates: Vec<String> = positions
        .into_iter()
        .filter(|(_, columns)| columns.len() > 1)
        .map(|(header, columns)| {
            let columns = columns
                .iter()
                .map(|column| format!("column {}", column))
                .collect::<Vec<_>>()
                .join(", ");
            format!("'{}' ({})", header, columns)
        })
        .collect();

    if duplicates.is_empty() {
        Ok(())
    } else {
        Err(ValidateError::DuplicateHeaders {
            headers: duplicates,
        })
    }
}
