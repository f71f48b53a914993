use std::collections::BTreeMap;
use std::fmt;

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::model::Row;

/// Headline totals over a set of rows. All zero for an empty set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KpiSummary {
    pub total_challan: u64,
    pub disposed_challan: u64,
    pub pending_challan: u64,
    pub total_amount: f64,
}

pub fn summarize(rows: &[Row]) -> KpiSummary {
    rows.iter().fold(KpiSummary::default(), |mut acc, r| {
        acc.total_challan += r.total_challan;
        acc.disposed_challan += r.disposed_challan;
        acc.pending_challan += r.pending_challan;
        acc.total_amount += r.total_amount;
        acc
    })
}

/// Period used to bucket rows in a [`Rollup`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RollupKey {
    Year,
    /// Calendar month within a year (`YYYY-MM`).
    Month,
    /// Calendar month name only. Januaries of different years share a bucket.
    MonthName,
}

impl RollupKey {
    fn order(self, row: &Row) -> (i32, u32) {
        match self {
            RollupKey::Year => (row.year, 0),
            RollupKey::Month => (row.year, row.date.month()),
            RollupKey::MonthName => (0, row.date.month()),
        }
    }

    fn label(self, row: &Row) -> String {
        match self {
            RollupKey::Year => row.year.to_string(),
            RollupKey::Month => row.month_key.clone(),
            RollupKey::MonthName => row.month_name.clone(),
        }
    }
}

impl fmt::Display for RollupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RollupKey::Year => "year",
            RollupKey::Month => "month",
            RollupKey::MonthName => "month name",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RollupBucket {
    pub label: String,
    pub total_challan: u64,
}

/// `totalChallan` summed per period, buckets in calendar order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rollup {
    pub key: RollupKey,
    pub buckets: Vec<RollupBucket>,
}

impl Rollup {
    pub fn total(&self) -> u64 {
        self.buckets.iter().map(|b| b.total_challan).sum()
    }

    pub fn get(&self, label: &str) -> Option<u64> {
        self.buckets
            .iter()
            .find(|b| b.label == label)
            .map(|b| b.total_challan)
    }
}

pub fn rollup_by(rows: &[Row], key: RollupKey) -> Rollup {
    let buckets = rollup_by_fn(rows, |r| (key.order(r), key.label(r)))
        .into_iter()
        .map(|((_, label), total_challan)| RollupBucket {
            label,
            total_challan,
        })
        .collect();
    Rollup { key, buckets }
}

/// Groups by an arbitrary key and sums `totalChallan`. Output is ordered by
/// the key, so callers choose the iteration order through the key's `Ord`.
pub fn rollup_by_fn<K, F>(rows: &[Row], key_fn: F) -> Vec<(K, u64)>
where
    K: Ord,
    F: Fn(&Row) -> K,
{
    let mut groups: BTreeMap<K, u64> = BTreeMap::new();
    for row in rows {
        *groups.entry(key_fn(row)).or_default() += row.total_challan;
    }
    groups.into_iter().collect()
}

/// One point of the daily trend lines.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendPoint {
    pub date: NaiveDate,
    pub total_challan: u64,
    pub disposed_challan: u64,
    pub pending_challan: u64,
}

pub fn trend_series(rows: &[Row]) -> Vec<TrendPoint> {
    rows.iter()
        .map(|r| TrendPoint {
            date: r.date,
            total_challan: r.total_challan,
            disposed_challan: r.disposed_challan,
            pending_challan: r.pending_challan,
        })
        .collect()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AmountComparison {
    pub pending_amount: f64,
    pub disposed_amount: f64,
}

pub fn amount_comparison(rows: &[Row]) -> AmountComparison {
    rows.iter()
        .fold(AmountComparison::default(), |mut acc, r| {
            acc.pending_amount += r.pending_amount;
            acc.disposed_amount += r.disposed_amount;
            acc
        })
}

/// Disposed vs pending as percentages of their combined count.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DisposalShare {
    pub disposed_pct: f64,
    pub pending_pct: f64,
}

pub fn disposal_share(kpi: &KpiSummary) -> DisposalShare {
    let resolved = kpi.disposed_challan + kpi.pending_challan;
    if resolved == 0 {
        return DisposalShare::default();
    }
    let whole = resolved as f64;
    DisposalShare {
        disposed_pct: kpi.disposed_challan as f64 * 100.0 / whole,
        pending_pct: kpi.pending_challan as f64 * 100.0 / whole,
    }
}

/// Dates whose disposed + pending counts exceed the total.
pub fn consistency_issues(rows: &[Row]) -> Vec<NaiveDate> {
    rows.iter()
        .filter(|r| r.has_inconsistent_counts())
        .map(|r| r.date)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(y: i32, m: u32, d: u32, counts: [u64; 3]) -> Row {
        let date = NaiveDate::from_ymd_opt(y, m, d).unwrap();
        Row::new(date, counts, counts.map(|c| c as f64 * 100.0))
    }

    #[test]
    fn summarize_sums_the_four_kpis() {
        let rows = vec![
            row(2024, 1, 1, [10, 8, 2]),
            row(2024, 1, 2, [20, 15, 5]),
            row(2024, 1, 3, [15, 10, 5]),
        ];
        let kpi = summarize(&rows);
        assert_eq!(kpi.total_challan, 45);
        assert_eq!(kpi.disposed_challan, 33);
        assert_eq!(kpi.pending_challan, 12);
        assert_eq!(kpi.total_amount, 4500.0);
    }

    #[test]
    fn empty_input_is_all_zero() {
        assert_eq!(summarize(&[]), KpiSummary::default());
        assert_eq!(amount_comparison(&[]), AmountComparison::default());
        let share = disposal_share(&KpiSummary::default());
        assert_eq!((share.disposed_pct, share.pending_pct), (0.0, 0.0));
        assert!(rollup_by(&[], RollupKey::Year).buckets.is_empty());
    }

    #[test]
    fn monthly_rollup_is_chronological_across_years() {
        let rows = vec![
            row(2023, 12, 30, [4, 0, 0]),
            row(2024, 1, 2, [1, 0, 0]),
            row(2024, 1, 9, [2, 0, 0]),
            row(2024, 2, 1, [8, 0, 0]),
        ];
        let labels: Vec<_> = rollup_by(&rows, RollupKey::Month)
            .buckets
            .into_iter()
            .map(|b| (b.label, b.total_challan))
            .collect();
        assert_eq!(
            labels,
            vec![
                ("2023-12".to_string(), 4),
                ("2024-01".to_string(), 3),
                ("2024-02".to_string(), 8)
            ]
        );
    }

    #[test]
    fn month_name_rollup_uses_calendar_order_not_alphabetical() {
        let rows = vec![
            row(2023, 1, 5, [1, 0, 0]),
            row(2023, 4, 5, [2, 0, 0]),
            row(2024, 1, 5, [10, 0, 0]),
            row(2024, 8, 5, [3, 0, 0]),
        ];
        let rollup = rollup_by(&rows, RollupKey::MonthName);
        let labels: Vec<_> = rollup.buckets.iter().map(|b| b.label.as_str()).collect();
        assert_eq!(labels, vec!["January", "April", "August"]);
        assert_eq!(rollup.get("January"), Some(11));
        assert_eq!(rollup.total(), 16);
    }

    #[test]
    fn rollup_keys_read_as_words() {
        assert_eq!(RollupKey::Year.to_string(), "year");
        assert_eq!(RollupKey::MonthName.to_string(), "month name");
    }

    #[test]
    fn yearly_rollup() {
        let rows = vec![row(2023, 6, 1, [5, 0, 0]), row(2024, 6, 1, [7, 0, 0])];
        let rollup = rollup_by(&rows, RollupKey::Year);
        assert_eq!(rollup.get("2023"), Some(5));
        assert_eq!(rollup.get("2024"), Some(7));
    }

    #[test]
    fn custom_key_orders_by_key() {
        let rows = vec![
            row(2024, 1, 1, [3, 0, 0]),
            row(2024, 1, 8, [4, 0, 0]),
            row(2024, 1, 2, [5, 0, 0]),
        ];
        let by_weekday = rollup_by_fn(&rows, |r| r.date.weekday().num_days_from_monday());
        assert_eq!(by_weekday, vec![(0, 7), (1, 5)]);
    }

    #[test]
    fn share_and_amounts() {
        let rows = vec![row(2024, 1, 1, [10, 3, 1])];
        let share = disposal_share(&summarize(&rows));
        assert_eq!(share.disposed_pct, 75.0);
        assert_eq!(share.pending_pct, 25.0);

        let amounts = amount_comparison(&rows);
        assert_eq!(amounts.disposed_amount, 300.0);
        assert_eq!(amounts.pending_amount, 100.0);
    }

    #[test]
    fn flags_inconsistent_days() {
        let rows = vec![row(2024, 1, 1, [5, 3, 2]), row(2024, 1, 2, [5, 4, 2])];
        assert_eq!(
            consistency_issues(&rows),
            vec![NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()]
        );
    }

    #[test]
    fn trend_follows_input_order() {
        let rows = vec![row(2024, 1, 1, [1, 1, 0]), row(2024, 1, 2, [2, 1, 1])];
        let series = trend_series(&rows);
        assert_eq!(series.len(), 2);
        assert_eq!(series[1].pending_challan, 1);
    }
}
