//! Source table readers (`.xlsx` workbooks and `.json` row arrays)

use crate::error::ExtractorError;
use calamine::{DataType, Reader, Xlsx};
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime};
use papergraph_domain::SourceRecord;
use serde_json::Value;
use std::fs;
use std::io::Cursor;
use std::path::Path;
use tracing::{debug, warn};

/// Header aliases for the publication date, highest priority first
const DATE_COLUMNS: [&str; 3] = ["paper date", "log date", "date"];
const DESCRIPTION_COLUMNS: [&str; 5] = ["description", "summary", "abstract", "body", "content"];
const LINK_COLUMNS: [&str; 2] = ["link", "url"];

/// A single cell, independent of the source format
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Cell {
    Empty,
    Text(String),
    Number(f64),
    Date(NaiveDate),
}

impl Cell {
    fn is_empty(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(text) => text.trim().is_empty(),
            _ => false,
        }
    }

    fn as_text(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Text(text) => text.trim().to_string(),
            Cell::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => format!("{}", *n as i64),
            Cell::Number(n) => n.to_string(),
            Cell::Date(date) => date.format("%Y-%m-%d").to_string(),
        }
    }

    fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Cell::Empty => None,
            Cell::Date(date) => Some(*date),
            Cell::Number(serial) => excel_serial_to_date(*serial),
            Cell::Text(text) => parse_date(text),
        }
    }
}

/// Read every record of a source table, choosing the reader by extension.
///
/// Rows without a title are skipped with a warning.
pub fn load_records(path: impl AsRef<Path>) -> Result<Vec<SourceRecord>, ExtractorError> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();

    let rows = match extension.as_str() {
        "xlsx" | "xlsm" => {
            let bytes = fs::read(path).map_err(|e| ExtractorError::source_file(path, e))?;
            read_xlsx(&bytes).map_err(|e| ExtractorError::source_file(path, e))?
        }
        "json" => {
            let content =
                fs::read_to_string(path).map_err(|e| ExtractorError::source_file(path, e))?;
            read_json(&content).map_err(|e| ExtractorError::source_file(path, e))?
        }
        other => {
            return Err(ExtractorError::source_file(
                path,
                format!("unsupported source format '{}' (expected .xlsx or .json)", other),
            ))
        }
    };

    let total = rows.len();
    let records: Vec<SourceRecord> = rows
        .into_iter()
        .enumerate()
        .filter_map(|(i, row)| {
            let record = record_from_row(row);
            if record.is_none() {
                warn!("Skipping source row {}: no title", i + 1);
            }
            record
        })
        .collect();

    debug!("Read {} records ({} rows) from {}", records.len(), total, path.display());
    Ok(records)
}

/// Rows of the first worksheet, keyed by the header row
pub(crate) fn read_xlsx(bytes: &[u8]) -> Result<Vec<Vec<(String, Cell)>>, String> {
    let mut workbook = Xlsx::new(Cursor::new(bytes))
        .map_err(|err| format!("failed to read xlsx workbook: {err}"))?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| "workbook has no sheets".to_string())?;

    let range = match workbook.worksheet_range(&sheet_name) {
        Some(Ok(range)) => range,
        Some(Err(err)) => return Err(format!("failed to read sheet '{sheet_name}': {err}")),
        None => return Err(format!("sheet '{sheet_name}' not found")),
    };

    let mut rows = range.rows();
    let headers: Vec<String> = match rows.next() {
        Some(header_row) => header_row.iter().map(|c| cell_from_xlsx(c).as_text()).collect(),
        None => return Ok(Vec::new()),
    };

    Ok(rows
        .map(|row| {
            headers
                .iter()
                .zip(row.iter())
                .filter(|(header, _)| !header.is_empty())
                .map(|(header, cell)| (header.clone(), cell_from_xlsx(cell)))
                .collect()
        })
        .collect())
}

/// Rows of a JSON array of objects
pub(crate) fn read_json(content: &str) -> Result<Vec<Vec<(String, Cell)>>, String> {
    let value: Value =
        serde_json::from_str(content).map_err(|e| format!("invalid JSON: {}", e))?;
    let rows = value
        .as_array()
        .ok_or_else(|| "expected a JSON array of row objects".to_string())?;

    rows.iter()
        .enumerate()
        .map(|(i, row)| {
            let obj = row
                .as_object()
                .ok_or_else(|| format!("row {} is not a JSON object", i + 1))?;
            Ok(obj
                .iter()
                .map(|(key, value)| (key.clone(), cell_from_json(value)))
                .collect())
        })
        .collect()
}

fn cell_from_xlsx(cell: &DataType) -> Cell {
    match cell {
        DataType::String(s) => Cell::Text(s.clone()),
        DataType::Float(v) => Cell::Number(*v),
        DataType::Int(v) => Cell::Number(*v as f64),
        DataType::Bool(b) => Cell::Text(b.to_string()),
        DataType::DateTime(serial) => excel_serial_to_date(*serial)
            .map(Cell::Date)
            .unwrap_or(Cell::Empty),
        DataType::DateTimeIso(s) => parse_date(s).map(Cell::Date).unwrap_or(Cell::Text(s.clone())),
        DataType::Duration(v) => Cell::Number(*v),
        DataType::DurationIso(s) => Cell::Text(s.clone()),
        DataType::Error(_) | DataType::Empty => Cell::Empty,
    }
}

fn cell_from_json(value: &Value) -> Cell {
    match value {
        Value::Null => Cell::Empty,
        Value::String(s) => Cell::Text(s.clone()),
        Value::Number(n) => n.as_f64().map(Cell::Number).unwrap_or(Cell::Empty),
        Value::Bool(b) => Cell::Text(b.to_string()),
        other => Cell::Text(other.to_string()),
    }
}

/// Map a header-keyed row onto a record; `None` when there is no title
pub(crate) fn record_from_row(row: Vec<(String, Cell)>) -> Option<SourceRecord> {
    let find = |aliases: &[&str]| find_cell(&row, aliases);

    let title = find(&["title"])?.as_text();
    let mut record = SourceRecord::new(title);
    record.date = DATE_COLUMNS
        .iter()
        .find_map(|alias| find(&[*alias]).and_then(Cell::as_date));
    record.category = find(&["category"]).map(Cell::as_text).unwrap_or_default();
    record.description = find(&DESCRIPTION_COLUMNS).map(Cell::as_text).unwrap_or_default();
    record.impact = find(&["impact"]).map(Cell::as_text);
    record.enhancement = find(&["enhancement"]).map(Cell::as_text);
    record.link = find(&LINK_COLUMNS).map(Cell::as_text).unwrap_or_default();

    for (header, cell) in &row {
        if is_mapped(header) || cell.is_empty() {
            continue;
        }
        record.extra.insert(header.trim().to_string(), cell.as_text());
    }

    Some(record)
}

/// First non-empty cell under any of the aliases, in alias order
fn find_cell<'r>(row: &'r [(String, Cell)], aliases: &[&str]) -> Option<&'r Cell> {
    aliases.iter().find_map(|alias| {
        row.iter()
            .find(|(header, cell)| fold(header) == *alias && !cell.is_empty())
            .map(|(_, cell)| cell)
    })
}

fn is_mapped(header: &str) -> bool {
    let header = fold(header);
    ["title", "category", "impact", "enhancement"].contains(&header.as_str())
        || DATE_COLUMNS.contains(&header.as_str())
        || DESCRIPTION_COLUMNS.contains(&header.as_str())
        || LINK_COLUMNS.contains(&header.as_str())
}

fn fold(header: &str) -> String {
    header.trim().to_lowercase()
}

/// Convert an Excel serial day number (1900 date system) to a date
pub(crate) fn excel_serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 1.0 {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    epoch.checked_add_signed(Duration::days(serial.trunc() as i64))
}

/// Parse the date formats seen in tracker sheets
pub(crate) fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(datetime) = DateTime::parse_from_rfc3339(raw) {
        return Some(datetime.date_naive());
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(datetime) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(datetime.date());
        }
    }
    const FORMATS: [&str; 7] = [
        "%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d %B %Y", "%B %d, %Y", "%d %b %Y", "%b %d, %Y",
    ];
    for format in FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(raw, format) {
            return Some(date);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_excel_serial_dates() {
        assert_eq!(excel_serial_to_date(45_000.0), Some(date(2023, 3, 15)));
        assert_eq!(excel_serial_to_date(45_000.75), Some(date(2023, 3, 15)));
        assert_eq!(excel_serial_to_date(0.0), None);
    }

    #[test]
    fn test_parse_date_formats() {
        assert_eq!(parse_date("2025-08-07"), Some(date(2025, 8, 7)));
        assert_eq!(parse_date("2025-08-07 00:00:00"), Some(date(2025, 8, 7)));
        assert_eq!(parse_date("2025-08-07T10:30:00Z"), Some(date(2025, 8, 7)));
        assert_eq!(parse_date("08/07/2025"), Some(date(2025, 8, 7)));
        assert_eq!(parse_date("7 August 2025"), Some(date(2025, 8, 7)));
        assert_eq!(parse_date("sometime"), None);
    }

    #[test]
    fn test_record_from_row_uses_aliases() {
        let row = vec![
            ("Title".to_string(), Cell::Text(" GPT-5 ".to_string())),
            ("Log Date".to_string(), Cell::Text("2025-08-01".to_string())),
            ("Paper Date".to_string(), Cell::Number(45_876.0)),
            ("Summary".to_string(), Cell::Text("Unified model".to_string())),
            ("URL".to_string(), Cell::Text("https://openai.com".to_string())),
            ("Impact".to_string(), Cell::Empty),
            ("Stars".to_string(), Cell::Number(5.0)),
        ];

        let record = record_from_row(row).unwrap();
        assert_eq!(record.title, "GPT-5");
        assert_eq!(record.date, Some(date(2025, 8, 7)));
        assert_eq!(record.description, "Unified model");
        assert_eq!(record.link, "https://openai.com");
        assert_eq!(record.impact, None);
        assert_eq!(record.extra.get("Stars").map(String::as_str), Some("5"));
        assert!(!record.extra.contains_key("Log Date"));
    }

    #[test]
    fn test_row_without_title_is_rejected() {
        let row = vec![("Title".to_string(), Cell::Text("   ".to_string()))];
        assert!(record_from_row(row).is_none());
    }

    #[test]
    fn test_load_json_records() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tracker.json");
        fs::write(
            &path,
            r#"[
                {"Title": "Paper A", "Paper Date": "2026-02-16", "Category": "Agents", "Description": "A", "Link": null},
                {"Title": null, "Description": "orphan"},
                {"Title": "Paper B", "Date": "2026-02-17", "Abstract": "B"}
            ]"#,
        )
        .unwrap();

        let records = load_records(&path).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].key().as_str(), "Paper A::2026-02-16");
        assert_eq!(records[0].category, "Agents");
        assert_eq!(records[1].description, "B");
    }

    #[test]
    fn test_unsupported_extension() {
        let result = load_records("tracker.csv");
        assert!(matches!(result, Err(ExtractorError::Source { .. })));
    }

    #[test]
    fn test_invalid_xlsx_bytes() {
        assert!(read_xlsx(b"not a zip archive").is_err());
    }
}
