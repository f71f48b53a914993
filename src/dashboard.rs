use std::path::Path;
use std::sync::Arc;

use crate::aggregate::{
    self, AmountComparison, DisposalShare, KpiSummary, Rollup, RollupKey, TrendPoint,
};
use crate::error::Result;
use crate::filter::{self, FilteredView};
use crate::loader;
use crate::model::{Column, Dataset, DateRange, Row};
use crate::pivot::{self, PivotMatrix};
use crate::ranking;
use crate::report::{self, Ranking, ReportPayload};

/// Read-only queries over one loaded dataset. Every call filters afresh and
/// returns owned results; nothing is retained between calls.
#[derive(Debug, Clone)]
pub struct Dashboard {
    dataset: Arc<Dataset>,
}

impl Dashboard {
    pub fn new(dataset: Arc<Dataset>) -> Self {
        Self { dataset }
    }

    /// Opens `path` through the session load cache.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(loader::load_cached(path)?))
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    /// Full extent of the data, `None` when it has no rows.
    pub fn default_range(&self) -> Option<DateRange> {
        self.dataset.bounds()
    }

    pub fn view(&self, range: DateRange) -> FilteredView<'_> {
        filter::filter_range(&self.dataset, range)
    }

    pub fn kpi_summary(&self, range: DateRange) -> KpiSummary {
        aggregate::summarize(self.view(range).rows())
    }

    pub fn trend_series(&self, range: DateRange) -> Vec<TrendPoint> {
        aggregate::trend_series(self.view(range).rows())
    }

    pub fn rollup(&self, range: DateRange, key: RollupKey) -> Rollup {
        aggregate::rollup_by(self.view(range).rows(), key)
    }

    pub fn amount_comparison(&self, range: DateRange) -> AmountComparison {
        aggregate::amount_comparison(self.view(range).rows())
    }

    pub fn disposal_share(&self, range: DateRange) -> DisposalShare {
        aggregate::disposal_share(&self.kpi_summary(range))
    }

    pub fn top_n(&self, range: DateRange, column: &str, n: usize) -> Result<Vec<Row>> {
        ranking::top_n_by_name(self.view(range).rows(), column, n)
    }

    /// Day-of-month by month heatmap of `totalChallan`.
    pub fn pivot(&self, range: DateRange) -> PivotMatrix {
        self.pivot_of(range, Column::TotalChallan)
    }

    pub fn pivot_of(&self, range: DateRange, value: Column) -> PivotMatrix {
        pivot::day_by_month(self.view(range).rows(), value)
    }

    /// First `n` rows of the range, for a preview table.
    pub fn preview(&self, range: DateRange, n: usize) -> Vec<Row> {
        self.view(range).rows().iter().take(n).cloned().collect()
    }

    /// Export payload: KPIs, yearly and monthly rollups, and top-`n`
    /// rankings by total and pending challans.
    pub fn report(&self, range: DateRange, n: usize) -> Result<ReportPayload> {
        let view = self.view(range);
        let rows = view.rows();
        let kpi = aggregate::summarize(rows);
        let rollups = vec![
            aggregate::rollup_by(rows, RollupKey::Year),
            aggregate::rollup_by(rows, RollupKey::Month),
        ];
        let rankings = [Column::TotalChallan, Column::PendingChallan]
            .into_iter()
            .map(|column| Ranking {
                column,
                rows: ranking::top_n(rows, column, n),
            })
            .collect();
        report::assemble(&view, &kpi, rollups, rankings)
    }
}
