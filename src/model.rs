use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::error::{DashboardError, Result, Warning};

/// One calendar day of challan counts and amounts, with calendar fields
/// derived once at load time.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Row {
    pub date: NaiveDate,
    pub total_challan: u64,
    pub disposed_challan: u64,
    pub pending_challan: u64,
    pub total_amount: f64,
    pub disposed_amount: f64,
    pub pending_amount: f64,
    pub year: i32,
    /// `YYYY-MM`, sorts chronologically.
    pub month_key: String,
    pub month_name: String,
    pub day: u32,
}

impl Row {
    pub fn new(date: NaiveDate, counts: [u64; 3], amounts: [f64; 3]) -> Self {
        let [total_challan, disposed_challan, pending_challan] = counts;
        let [total_amount, disposed_amount, pending_amount] = amounts;
        Self {
            date,
            total_challan,
            disposed_challan,
            pending_challan,
            total_amount,
            disposed_amount,
            pending_amount,
            year: date.year(),
            month_key: date.format("%Y-%m").to_string(),
            month_name: date.format("%B").to_string(),
            day: date.day(),
        }
    }

    pub fn value(&self, column: Column) -> f64 {
        match column {
            Column::TotalChallan => self.total_challan as f64,
            Column::DisposedChallan => self.disposed_challan as f64,
            Column::PendingChallan => self.pending_challan as f64,
            Column::TotalAmount => self.total_amount,
            Column::DisposedAmount => self.disposed_amount,
            Column::PendingAmount => self.pending_amount,
        }
    }

    /// True when the resolved counts exceed the total. Such rows are kept untouched.
    pub fn has_inconsistent_counts(&self) -> bool {
        self.disposed_challan.saturating_add(self.pending_challan) > self.total_challan
    }
}

/// The numeric columns of the input file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Column {
    TotalChallan,
    DisposedChallan,
    PendingChallan,
    TotalAmount,
    DisposedAmount,
    PendingAmount,
}

impl Column {
    pub const ALL: [Column; 6] = [
        Column::TotalChallan,
        Column::DisposedChallan,
        Column::PendingChallan,
        Column::TotalAmount,
        Column::DisposedAmount,
        Column::PendingAmount,
    ];

    /// Header name as it appears in the CSV.
    pub fn name(self) -> &'static str {
        match self {
            Column::TotalChallan => "totalChallan",
            Column::DisposedChallan => "disposedChallan",
            Column::PendingChallan => "pendingChallan",
            Column::TotalAmount => "totalAmount",
            Column::DisposedAmount => "disposedAmount",
            Column::PendingAmount => "pendingAmount",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Column::TotalChallan => "Total Challans",
            Column::DisposedChallan => "Disposed Challans",
            Column::PendingChallan => "Pending Challans",
            Column::TotalAmount => "Total Amount",
            Column::DisposedAmount => "Disposed Amount",
            Column::PendingAmount => "Pending Amount",
        }
    }

    pub fn is_amount(self) -> bool {
        matches!(
            self,
            Column::TotalAmount | Column::DisposedAmount | Column::PendingAmount
        )
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Column {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim();
        Column::ALL
            .into_iter()
            .find(|c| c.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| DashboardError::InvalidColumn(s.to_string()))
    }
}

/// Inclusive date range. Construction rejects `start > end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(DashboardError::InvalidRange { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} to {}", self.start, self.end)
    }
}

/// The loaded table: rows in ascending date order plus load-time warnings.
/// Immutable once built.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    rows: Vec<Row>,
    warnings: Vec<Warning>,
}

impl Dataset {
    /// Builds a dataset, stably sorting rows by date and recording
    /// duplicate dates and inconsistent counts as warnings.
    pub fn from_rows(mut rows: Vec<Row>) -> Self {
        rows.sort_by_key(|r| r.date);

        let mut warnings = Vec::new();
        for pair in rows.windows(2) {
            if pair[0].date == pair[1].date {
                let w = Warning::DuplicateDate { date: pair[1].date };
                if !warnings.contains(&w) {
                    warnings.push(w);
                }
            }
        }
        warnings.extend(
            rows.iter()
                .filter(|r| r.has_inconsistent_counts())
                .map(|r| Warning::InconsistentCounts { date: r.date }),
        );

        Self { rows, warnings }
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Earliest and latest dates, the default filter selection.
    pub fn bounds(&self) -> Option<DateRange> {
        let first = self.rows.first()?;
        let last = self.rows.last()?;
        Some(DateRange {
            start: first.date,
            end: last.date,
        })
    }
}
