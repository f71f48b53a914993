//! Reads the daily challan CSV into a [`Dataset`].
//!
//! Headers are matched by name, so column order does not matter and extra
//! columns are ignored. Required headers:
//!
//! ```csv
//! date,totalChallan,disposedChallan,pendingChallan,totalAmount,disposedAmount,pendingAmount
//! 2024-01-01,10,8,2,5000,4000,1000
//! ```
//!
//! Dates must be year-first. Forms like `03/04/2024` are rejected rather
//! than guessed.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{NaiveDate, NaiveDateTime};
use csv::{ReaderBuilder, StringRecord, Trim};
use once_cell::sync::Lazy;
use tracing::{debug, info, warn};

use crate::error::{DashboardError, Result};
use crate::model::{Column, Dataset, Row};

const DATE_HEADER: &str = "date";
const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%Y/%m/%d"];
const DATETIME_FORMATS: [&str; 3] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y/%m/%d %H:%M:%S",
];
const AMBIGUOUS_FORMATS: [&str; 4] = ["%d/%m/%Y", "%m/%d/%Y", "%d-%m-%Y", "%m-%d-%Y"];
/// Largest accepted count. Keeps sums far from `u64` overflow and counts exact as `f64`.
pub const MAX_COUNT: u64 = u32::MAX as u64;

// One parsed dataset per source path for the lifetime of the process.
static DATASET_CACHE: Lazy<Mutex<HashMap<PathBuf, Arc<Dataset>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

/// Header positions resolved once per file.
struct ColumnIndex {
    date: usize,
    numeric: [(Column, usize); 6],
}

impl ColumnIndex {
    fn resolve(headers: &StringRecord) -> Result<Self> {
        let position = |name: &str| {
            headers.iter().position(|h| h == name).ok_or_else(|| {
                DashboardError::malformed(1, format!("missing required column `{}`", name))
            })
        };

        let date = position(DATE_HEADER)?;
        let mut numeric = [(Column::TotalChallan, 0); 6];
        for (slot, column) in numeric.iter_mut().zip(Column::ALL) {
            *slot = (column, position(column.name())?);
        }
        Ok(Self { date, numeric })
    }

    fn cell<'r>(&self, record: &'r StringRecord, idx: usize) -> &'r str {
        record.get(idx).unwrap_or("")
    }
}

/// Loads the file at `path`. No caching; see [`load_cached`].
pub fn load(path: impl AsRef<Path>) -> Result<Dataset> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let dataset = load_from_reader(file)?;
    info!(
        path = %path.display(),
        rows = dataset.len(),
        warnings = dataset.warnings().len(),
        "dataset loaded"
    );
    Ok(dataset)
}

/// Parses CSV from any reader. The whole source is rejected on the first bad
/// row; no partial dataset is returned.
pub fn load_from_reader<R: Read>(reader: R) -> Result<Dataset> {
    let mut rdr = ReaderBuilder::new().trim(Trim::All).from_reader(reader);
    let headers = rdr.headers()?.clone();
    let index = ColumnIndex::resolve(&headers)?;

    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result.map_err(malformed_record)?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        rows.push(parse_row(&index, &record, line)?);
    }

    let dataset = Dataset::from_rows(rows);
    for warning in dataset.warnings() {
        warn!(%warning, "data quality");
    }
    Ok(dataset)
}

/// Memoized [`load`]. Repeated calls for the same file return the same
/// `Arc` without re-reading it.
pub fn load_cached(path: impl AsRef<Path>) -> Result<Arc<Dataset>> {
    let key = cache_key(path.as_ref());
    {
        let cache = DATASET_CACHE.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(hit) = cache.get(&key) {
            debug!(path = %key.display(), "dataset cache hit");
            return Ok(Arc::clone(hit));
        }
    }

    debug!(path = %key.display(), "dataset cache miss");
    let dataset = Arc::new(load(&key)?);
    let mut cache = DATASET_CACHE.lock().unwrap_or_else(|e| e.into_inner());
    let entry = cache.entry(key).or_insert(dataset);
    Ok(Arc::clone(entry))
}

/// Forgets every cached dataset so the next [`load_cached`] re-reads from disk.
pub fn clear_cache() {
    DATASET_CACHE
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .clear();
}

fn cache_key(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

/// Ragged rows and bad encoding are input problems, reported with their line.
fn malformed_record(err: csv::Error) -> DashboardError {
    let line = err.position().map(|p| p.line()).unwrap_or(0);
    let reason = match err.kind() {
        csv::ErrorKind::UnequalLengths {
            expected_len, len, ..
        } => Some(format!("expected {} fields, found {}", expected_len, len)),
        csv::ErrorKind::Utf8 { err: utf8, .. } => Some(format!("invalid UTF-8: {}", utf8)),
        _ => None,
    };
    match reason {
        Some(reason) => DashboardError::malformed(line, reason),
        None => DashboardError::Csv(err),
    }
}

fn parse_row(index: &ColumnIndex, record: &StringRecord, line: u64) -> Result<Row> {
    let date = parse_date(index.cell(record, index.date))
        .map_err(|reason| DashboardError::malformed(line, reason))?;

    let mut counts = [0u64; 3];
    let mut amounts = [0f64; 3];
    for (column, idx) in index.numeric {
        let raw = index.cell(record, idx);
        match column {
            Column::TotalChallan => counts[0] = parse_count(column, raw, line)?,
            Column::DisposedChallan => counts[1] = parse_count(column, raw, line)?,
            Column::PendingChallan => counts[2] = parse_count(column, raw, line)?,
            Column::TotalAmount => amounts[0] = parse_amount(column, raw, line)?,
            Column::DisposedAmount => amounts[1] = parse_amount(column, raw, line)?,
            Column::PendingAmount => amounts[2] = parse_amount(column, raw, line)?,
        }
    }

    Ok(Row::new(date, counts, amounts))
}

/// Accepts year-first dates, with or without a time part.
pub fn parse_date(raw: &str) -> std::result::Result<NaiveDate, String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err("empty date".to_string());
    }
    if has_four_digit_year(raw) {
        if let Some(date) = DATE_FORMATS
            .iter()
            .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        {
            return Ok(date);
        }
        if let Some(dt) = DATETIME_FORMATS
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        {
            return Ok(dt.date());
        }
    }
    if AMBIGUOUS_FORMATS
        .iter()
        .any(|fmt| NaiveDate::parse_from_str(raw, fmt).is_ok())
    {
        return Err(format!(
            "ambiguous date `{}`: day/month order cannot be inferred, use YYYY-MM-DD",
            raw
        ));
    }
    Err(format!("unparseable date `{}`", raw))
}

// chrono's `%Y` takes any digit count, so `01-02-24` would otherwise read as year 1.
fn has_four_digit_year(raw: &str) -> bool {
    raw.split(['-', '/'])
        .next()
        .is_some_and(|y| y.len() == 4 && y.bytes().all(|b| b.is_ascii_digit()))
}

fn parse_count(column: Column, raw: &str, line: u64) -> Result<u64> {
    let parsed = match raw.parse::<u64>() {
        Ok(v) => Some(v),
        // Exported spreadsheets often write integer counts as `12.0`.
        Err(_) => match raw.parse::<f64>() {
            Ok(v) if v.is_finite() && v >= 0.0 && v.fract() == 0.0 && v <= u64::MAX as f64 => {
                Some(v as u64)
            }
            _ => None,
        },
    };
    match parsed {
        Some(v) if v <= MAX_COUNT => Ok(v),
        Some(_) => Err(DashboardError::malformed(
            line,
            format!("`{}` in {} exceeds the largest count {}", raw, column, MAX_COUNT),
        )),
        None => Err(DashboardError::malformed(
            line,
            format!("`{}` is not a non-negative integer in {}", raw, column),
        )),
    }
}

fn parse_amount(column: Column, raw: &str, line: u64) -> Result<f64> {
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() && v >= 0.0 => Ok(v),
        _ => Err(DashboardError::malformed(
            line,
            format!("`{}` is not a non-negative amount in {}", raw, column),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Warning;

    const HEADER: &str = "date,totalChallan,disposedChallan,pendingChallan,\
                          totalAmount,disposedAmount,pendingAmount\n";

    fn load_str(body: &str) -> Result<Dataset> {
        load_from_reader(format!("{}{}", HEADER, body).as_bytes())
    }

    #[test]
    fn loads_rows_and_derives_fields() {
        let ds = load_str("2024-01-02,20,15,5,2000.5,1500,500.5\n2024-01-01,10,8,2,1000,800,200\n")
            .unwrap();
        assert_eq!(ds.len(), 2);
        let first = &ds.rows()[0];
        assert_eq!(first.date, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(first.month_key, "2024-01");
        assert_eq!(ds.rows()[1].total_amount, 2000.5);
    }

    #[test]
    fn column_order_is_irrelevant() {
        let csv = "pendingAmount,note,date,pendingChallan,\
                   disposedChallan,totalChallan,disposedAmount,totalAmount\n\
                   1,x,2024-03-01,2,3,5,4,5\n";
        let ds = load_from_reader(csv.as_bytes()).unwrap();
        let row = &ds.rows()[0];
        assert_eq!((row.total_challan, row.disposed_challan, row.pending_challan), (5, 3, 2));
        assert_eq!(row.pending_amount, 1.0);
    }

    #[test]
    fn missing_column_is_malformed() {
        let csv = "date,totalChallan\n2024-01-01,4\n";
        let err = load_from_reader(csv.as_bytes()).unwrap_err();
        match err {
            DashboardError::MalformedInput { reason, .. } => {
                assert!(reason.contains("disposedChallan"))
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn non_numeric_value_reports_line() {
        let err =
            load_str("2024-01-01,10,8,2,100,80,20\n2024-01-02,ten,8,2,100,80,20\n").unwrap_err();
        match err {
            DashboardError::MalformedInput { line, reason } => {
                assert_eq!(line, 3);
                assert!(reason.contains("totalChallan"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn negative_and_blank_numbers_are_rejected() {
        assert!(load_str("2024-01-01,-1,0,0,0,0,0\n").is_err());
        assert!(load_str("2024-01-01,1,0,0,,0,0\n").is_err());
        assert!(load_str("2024-01-01,1,0,0,-5.0,0,0\n").is_err());
    }

    #[test]
    fn integral_float_counts_are_accepted() {
        let ds = load_str("2024-01-01,12.0,2,10,0,0,0\n").unwrap();
        assert_eq!(ds.rows()[0].total_challan, 12);
        assert!(load_str("2024-01-01,12.5,2,10,0,0,0\n").is_err());
    }

    #[test]
    fn date_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 5, 6).unwrap();
        assert_eq!(parse_date("2024-05-06").unwrap(), expected);
        assert_eq!(parse_date("2024/05/06").unwrap(), expected);
        assert_eq!(parse_date("2024-05-06 13:45:00").unwrap(), expected);
        assert_eq!(parse_date("2024-05-06T00:00:00").unwrap(), expected);
        assert!(parse_date("05/06/2024").unwrap_err().contains("ambiguous"));
        assert!(parse_date("yesterday").unwrap_err().contains("unparseable"));
        assert!(parse_date("01-02-24").unwrap_err().contains("ambiguous"));
        assert!(parse_date("12/01/05").unwrap_err().contains("ambiguous"));
        assert!(parse_date("24-01-02").is_err());
        assert!(parse_date("02024-01-02").is_err());
        assert!(parse_date("").is_err());
    }

    #[test]
    fn counts_above_the_cap_are_rejected() {
        let ds = load_str("2024-01-01,4294967295,0,0,0,0,0\n").unwrap();
        assert_eq!(ds.rows()[0].total_challan, MAX_COUNT);

        for body in [
            "2024-01-01,4294967296,0,0,0,0,0\n",
            "2024-01-01,10000000000000000000,0,0,0,0,0\n",
            "2024-01-01,4294967296.0,0,0,0,0,0\n",
        ] {
            match load_str(body).unwrap_err() {
                DashboardError::MalformedInput { line, reason } => {
                    assert_eq!(line, 2);
                    assert!(reason.contains("exceeds"), "{reason}");
                }
                other => panic!("unexpected error: {other:?}"),
            }
        }
    }

    #[test]
    fn ragged_row_reports_line() {
        let err = load_str("2024-01-01,10,8,2,100,80,20\n2024-01-02,1,1\n").unwrap_err();
        match err {
            DashboardError::MalformedInput { line, reason } => {
                assert_eq!(line, 3);
                assert!(reason.contains("fields"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn invalid_utf8_reports_line() {
        let mut bytes = HEADER.as_bytes().to_vec();
        bytes.extend_from_slice(b"2024-01-01,10,8,2,100,80,\xff20\n");
        match load_from_reader(bytes.as_slice()).unwrap_err() {
            DashboardError::MalformedInput { line, reason } => {
                assert_eq!(line, 2);
                assert!(reason.contains("UTF-8"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn header_only_file_is_empty_dataset() {
        let ds = load_str("").unwrap();
        assert!(ds.is_empty());
    }

    #[test]
    fn inconsistent_rows_are_flagged_not_fixed() {
        let ds = load_str("2024-01-01,5,4,4,0,0,0\n").unwrap();
        assert_eq!(ds.rows()[0].pending_challan, 4);
        assert_eq!(
            ds.warnings(),
            &[Warning::InconsistentCounts {
                date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
            }]
        );
    }
}
