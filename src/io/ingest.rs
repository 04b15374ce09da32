//! Wide CSV ingest.
//!
//! Input tables have one row per day and one column per area:
//!
//! ```text
//! date,Area A,Area B,...
//! 2020-03-01,0,12
//! 2020-03-02,1,15
//! ```
//!
//! Rules:
//! - the `date` column is required and dates must be strictly consecutive
//! - blank cells before an area's first value read as 0
//! - later blanks repeat the previous value (the repairer handles real defects)
//! - duplicate area names are rejected

use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::NaiveDate;
use csv::StringRecord;
use log::debug;

use crate::domain::{DateTable, shift_days};
use crate::error::AppError;

/// Read a wide cumulative-count CSV file into a `DateTable`.
pub fn read_wide_csv(path: &Path) -> Result<DateTable, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::input(format!("Failed to open CSV '{}': {e}", path.display())))?;
    let table = read_wide_from(file)
        .map_err(|e| AppError::input(format!("{}: {}", path.display(), e.message())))?;
    debug!(
        "read '{}': {} areas x {} days",
        path.display(),
        table.columns.len(),
        table.len
    );
    Ok(table)
}

/// Parse wide CSV from any reader (see module docs for the format).
pub fn read_wide_from<R: Read>(reader: R) -> Result<DateTable, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader
        .headers()
        .map_err(|e| AppError::input(format!("Failed to read CSV headers: {e}")))?
        .clone();
    let (date_idx, areas) = parse_headers(&headers)?;

    let mut start: Option<NaiveDate> = None;
    let mut columns: Vec<Vec<f64>> = vec![Vec::new(); areas.len()];
    let mut previous: Vec<Option<f64>> = vec![None; areas.len()];
    let mut days = 0usize;

    for (idx, result) in reader.records().enumerate() {
        let line = idx + 2;
        let record = result.map_err(|e| AppError::input(format!("line {line}: CSV parse error: {e}")))?;

        let raw_date = record.get(date_idx).unwrap_or("");
        let date = parse_date(raw_date).map_err(|e| AppError::input(format!("line {line}: {e}")))?;
        match start {
            None => start = Some(date),
            Some(first) => {
                let expected = shift_days(first, days as i64);
                if date != expected {
                    return Err(AppError::input(format!(
                        "line {line}: expected date {expected}, found {date} (dates must be consecutive)."
                    )));
                }
            }
        }

        for (slot, (col_idx, _)) in areas.iter().enumerate() {
            let cell = record.get(*col_idx).unwrap_or("");
            let value = if cell.is_empty() {
                previous[slot].unwrap_or(0.0)
            } else {
                parse_count(cell).map_err(|e| AppError::input(format!("line {line}: {e}")))?
            };
            if value.is_finite() {
                previous[slot] = Some(value);
            }
            columns[slot].push(value);
        }
        days += 1;
    }

    let Some(start) = start else {
        return Err(AppError::input("CSV has no data rows."));
    };

    let mut table = DateTable::new(start, days);
    for ((_, name), values) in areas.into_iter().zip(columns) {
        table.insert(name, values)?;
    }
    Ok(table)
}

/// Locate the `date` column and the area columns.
fn parse_headers(headers: &StringRecord) -> Result<(usize, Vec<(usize, String)>), AppError> {
    let mut date_idx = None;
    let mut areas = Vec::new();
    let mut seen = HashSet::new();

    for (idx, raw) in headers.iter().enumerate() {
        // Spreadsheet exports sometimes prefix the first header with a BOM.
        let name = raw.trim().trim_start_matches('\u{feff}');
        if date_idx.is_none() && name.eq_ignore_ascii_case("date") {
            date_idx = Some(idx);
            continue;
        }
        if name.is_empty() {
            return Err(AppError::input(format!("Column {} has an empty header.", idx + 1)));
        }
        if !seen.insert(name.to_string()) {
            return Err(AppError::input(format!("Duplicate area column: `{name}`")));
        }
        areas.push((idx, name.to_string()));
    }

    let date_idx = date_idx.ok_or_else(|| AppError::input("Missing required column: `date`"))?;
    Ok((date_idx, areas))
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    const FMTS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];
    for fmt in FMTS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Ok(d);
        }
    }
    Err(format!(
        "Invalid date '{s}'. Expected one of: YYYY-MM-DD, YYYY/MM/DD, MM/DD/YYYY."
    ))
}

/// Parse a cumulative count; `nan` is accepted and left for the repairer.
fn parse_count(s: &str) -> Result<f64, String> {
    let v = s
        .parse::<f64>()
        .map_err(|_| format!("Invalid count '{s}'."))?;
    if v.is_infinite() {
        return Err(format!("Invalid count '{s}'."));
    }
    Ok(v)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, m, day).unwrap()
    }

    #[test]
    fn reads_wide_table() {
        let csv = "date,B,A\n2020-03-01,1,0\n2020-03-02,3,2\n2020-03-03,4,5\n";
        let t = read_wide_from(csv.as_bytes()).unwrap();
        assert_eq!(t.start, d(3, 1));
        assert_eq!(t.len, 3);
        assert_eq!(t.areas().collect::<Vec<_>>(), vec!["A", "B"]);
        assert_eq!(t.get("B").unwrap(), &[1.0, 3.0, 4.0]);
    }

    #[test]
    fn blanks_are_zero_then_carried_forward() {
        let csv = "date,A\n2020-03-01,\n2020-03-02,4\n2020-03-03,\n2020-03-04,6\n";
        let t = read_wide_from(csv.as_bytes()).unwrap();
        assert_eq!(t.get("A").unwrap(), &[0.0, 4.0, 4.0, 6.0]);
    }

    #[test]
    fn nan_cells_are_kept_for_repair() {
        let csv = "date,A\n2020-03-01,1\n2020-03-02,nan\n2020-03-03,3\n";
        let t = read_wide_from(csv.as_bytes()).unwrap();
        assert!(t.get("A").unwrap()[1].is_nan());
    }

    #[test]
    fn gap_in_dates_is_fatal() {
        let csv = "date,A\n2020-03-01,1\n2020-03-03,2\n";
        let err = read_wide_from(csv.as_bytes()).unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(err.message().contains("consecutive"));
    }

    #[test]
    fn missing_date_column_is_fatal() {
        let err = read_wide_from("day,A\n2020-03-01,1\n".as_bytes()).unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(err.message().contains("`date`"));
    }

    #[test]
    fn duplicate_area_is_fatal() {
        let err = read_wide_from("date,A,A\n2020-03-01,1,2\n".as_bytes()).unwrap_err();
        assert!(err.message().contains("Duplicate"));
    }

    #[test]
    fn bom_prefixed_date_header_is_accepted() {
        let t = read_wide_from("\u{feff}date,A\n2020-03-01,1\n".as_bytes()).unwrap();
        assert_eq!(t.len, 1);
    }
}
