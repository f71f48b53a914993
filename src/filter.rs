use chrono::NaiveDate;

use crate::error::{Result, Warning};
use crate::model::{Dataset, DateRange, Row};

/// The rows of a dataset that fall inside a [`DateRange`], in date order.
/// Borrows from the dataset; never copies rows.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilteredView<'a> {
    range: DateRange,
    rows: &'a [Row],
}

impl<'a> FilteredView<'a> {
    pub fn range(&self) -> DateRange {
        self.range
    }

    pub fn rows(&self) -> &'a [Row] {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Narrows this view further. Re-applying the same range returns an
    /// identical view.
    pub fn refine(&self, range: DateRange) -> FilteredView<'a> {
        FilteredView {
            range,
            rows: slice_in_range(self.rows, range),
        }
    }

    /// [`Warning::EmptyResult`] when nothing matched.
    pub fn warning(&self) -> Option<Warning> {
        self.is_empty().then(|| Warning::EmptyResult {
            start: self.range.start(),
            end: self.range.end(),
        })
    }
}

/// Selects rows with `start <= date <= end`. Fails with
/// [`DashboardError::InvalidRange`](crate::error::DashboardError::InvalidRange)
/// when `start > end`; an empty match is not an error.
pub fn filter(dataset: &Dataset, start: NaiveDate, end: NaiveDate) -> Result<FilteredView<'_>> {
    Ok(filter_range(dataset, DateRange::new(start, end)?))
}

pub fn filter_range(dataset: &Dataset, range: DateRange) -> FilteredView<'_> {
    FilteredView {
        range,
        rows: slice_in_range(dataset.rows(), range),
    }
}

// `rows` is sorted by date, so the match is one contiguous run.
fn slice_in_range(rows: &[Row], range: DateRange) -> &[Row] {
    let lo = rows.partition_point(|r| r.date < range.start());
    let hi = rows.partition_point(|r| r.date <= range.end());
    &rows[lo..hi.max(lo)]
}
