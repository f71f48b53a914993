//! Aggregation core for the daily eChallan (traffic citation) dashboard:
//! load the CSV once, filter by date range, then derive KPIs, rollups,
//! rankings and the day-by-month heatmap, and package them for export.

pub mod aggregate;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod filter;
pub mod format;
pub mod loader;
pub mod logging;
pub mod model;
pub mod pivot;
pub mod ranking;
pub mod report;

pub use aggregate::{KpiSummary, Rollup, RollupKey, summarize};
pub use config::Config;
pub use dashboard::Dashboard;
pub use error::{DashboardError, Result, Warning};
pub use filter::{FilteredView, filter};
pub use model::{Column, Dataset, DateRange, Row};
pub use pivot::{PivotAxis, PivotMatrix};
pub use report::{ReportExporter, ReportPayload};
