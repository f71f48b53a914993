//! Cross-tabulation for the heatmap: one axis per calendar field, cells
//! summing a numeric column.

use std::collections::BTreeMap;
use std::fmt;

use chrono::Datelike;
use serde::Serialize;

use crate::error::Result;
use crate::model::{Column, Row};

/// Calendar field used as a pivot axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PivotAxis {
    /// Day of month, 1..=31.
    Day,
    /// `YYYY-MM`.
    Month,
    Year,
    MonthName,
}

impl PivotAxis {
    fn key(self, row: &Row) -> AxisKey {
        match self {
            PivotAxis::Day => AxisKey {
                order: row.day as i64,
                label: row.day.to_string(),
            },
            PivotAxis::Month => AxisKey {
                order: row.year as i64 * 100 + row.date.month() as i64,
                label: row.month_key.clone(),
            },
            PivotAxis::Year => AxisKey {
                order: row.year as i64,
                label: row.year.to_string(),
            },
            PivotAxis::MonthName => AxisKey {
                order: row.date.month() as i64,
                label: row.month_name.clone(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct AxisKey {
    order: i64,
    label: String,
}

impl fmt::Display for AxisKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}

/// Sparse sums keyed by (row label, column label). Axis labels come only from
/// values present in the input, in calendar order.
#[derive(Debug, Clone, PartialEq)]
pub struct PivotMatrix {
    pub value: Column,
    pub row_labels: Vec<String>,
    pub col_labels: Vec<String>,
    cells: BTreeMap<(usize, usize), f64>,
}

/// Dense, serializable form of a [`PivotMatrix`] for heatmap renderers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeatmapGrid {
    pub value: Column,
    pub row_labels: Vec<String>,
    pub col_labels: Vec<String>,
    pub cells: Vec<Vec<f64>>,
}

impl PivotMatrix {
    /// `None` for combinations with no data.
    pub fn get(&self, row: &str, col: &str) -> Option<f64> {
        let r = self.row_labels.iter().position(|l| l == row)?;
        let c = self.col_labels.iter().position(|l| l == col)?;
        self.cells.get(&(r, c)).copied()
    }

    /// Row-major matrix with missing cells as `0.0`.
    pub fn dense(&self) -> Vec<Vec<f64>> {
        (0..self.row_labels.len())
            .map(|r| {
                (0..self.col_labels.len())
                    .map(|c| self.cells.get(&(r, c)).copied().unwrap_or(0.0))
                    .collect()
            })
            .collect()
    }

    pub fn grid(&self) -> HeatmapGrid {
        HeatmapGrid {
            value: self.value,
            row_labels: self.row_labels.clone(),
            col_labels: self.col_labels.clone(),
            cells: self.dense(),
        }
    }

    pub fn total(&self) -> f64 {
        self.cells.values().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

pub fn pivot(
    rows: &[Row],
    row_axis: PivotAxis,
    col_axis: PivotAxis,
    value: Column,
) -> PivotMatrix {
    pivot_by_fn(rows, |r| row_axis.key(r), |r| col_axis.key(r), value)
}

/// Pivots on arbitrary key functions. Axes are ordered by each key's `Ord`
/// and labelled with its `Display`.
pub fn pivot_by_fn<R, C, FR, FC>(
    rows: &[Row],
    row_key: FR,
    col_key: FC,
    value: Column,
) -> PivotMatrix
where
    R: Ord + fmt::Display,
    C: Ord + fmt::Display,
    FR: Fn(&Row) -> R,
    FC: Fn(&Row) -> C,
{
    let mut sums: BTreeMap<(R, C), f64> = BTreeMap::new();
    for row in rows {
        *sums.entry((row_key(row), col_key(row))).or_default() += row.value(value);
    }

    let mut row_keys: Vec<&R> = sums.keys().map(|(r, _)| r).collect();
    row_keys.dedup();
    let mut col_keys: Vec<&C> = sums.keys().map(|(_, c)| c).collect();
    col_keys.sort();
    col_keys.dedup();

    let mut cells = BTreeMap::new();
    for ((r, c), v) in &sums {
        // Both lists are sorted and contain every key.
        if let (Ok(ri), Ok(ci)) = (row_keys.binary_search(&r), col_keys.binary_search(&c)) {
            cells.insert((ri, ci), *v);
        }
    }

    PivotMatrix {
        value,
        row_labels: row_keys.iter().map(|k| k.to_string()).collect(),
        col_labels: col_keys.iter().map(|k| k.to_string()).collect(),
        cells,
    }
}

/// Day-of-month against `YYYY-MM`, the heatmap layout.
pub fn day_by_month(rows: &[Row], value: Column) -> PivotMatrix {
    pivot(rows, PivotAxis::Day, PivotAxis::Month, value)
}

/// [`pivot`] with the value column named as in the CSV header.
pub fn pivot_by_name(
    rows: &[Row],
    row_axis: PivotAxis,
    col_axis: PivotAxis,
    value: &str,
) -> Result<PivotMatrix> {
    Ok(pivot(rows, row_axis, col_axis, value.parse()?))
}
