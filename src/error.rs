use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;

/// Failures surfaced by the loader, the engines and the export boundary.
#[derive(Debug, Error)]
pub enum DashboardError {
    #[error("malformed input at line {line}: {reason}")]
    MalformedInput { line: u64, reason: String },
    #[error("invalid date range: start {start} is after end {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },
    #[error("unrecognized column `{0}`")]
    InvalidColumn(String),
    #[error("inconsistent report input: {0}")]
    InconsistentReport(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DashboardError {
    pub(crate) fn malformed(line: u64, reason: impl Into<String>) -> Self {
        DashboardError::MalformedInput {
            line,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, DashboardError>;

/// Conditions worth telling the user about that never stop a computation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Warning {
    /// The selected range matched no rows.
    EmptyResult { start: NaiveDate, end: NaiveDate },
    /// `disposedChallan + pendingChallan` exceeds `totalChallan`. Passed through as-is.
    InconsistentCounts { date: NaiveDate },
    /// More than one row carries this date.
    DuplicateDate { date: NaiveDate },
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Warning::EmptyResult { start, end } => {
                write!(f, "no rows between {} and {}", start, end)
            }
            Warning::InconsistentCounts { date } => {
                write!(f, "{}: disposed + pending challans exceed total", date)
            }
            Warning::DuplicateDate { date } => write!(f, "{}: date appears more than once", date),
        }
    }
}
