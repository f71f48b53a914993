//! Packages computed results for exporters and renderers.
//!
//! [`assemble`] only checks that its inputs describe the same view; all
//! numbers come from the engines. The exporters here write the payload as a
//! sheet (CSV), a plain-text document and JSON.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::info;

use crate::aggregate::{KpiSummary, Rollup};
use crate::error::{DashboardError, Result, Warning};
use crate::filter::FilteredView;
use crate::format::{format_amount, format_count};
use crate::model::{Column, DateRange, Row};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum KpiValue {
    Count(u64),
    Amount(f64),
}

impl KpiValue {
    pub fn display(&self) -> String {
        match self {
            KpiValue::Count(v) => format_count(*v),
            KpiValue::Amount(v) => format_amount(*v),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KpiField {
    pub key: Column,
    pub label: &'static str,
    pub value: KpiValue,
}

/// Top rows for one column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ranking {
    pub column: Column,
    pub rows: Vec<Row>,
}

/// Everything an exporter needs, already in output order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportPayload {
    pub range: DateRange,
    pub kpis: Vec<KpiField>,
    pub rollups: Vec<Rollup>,
    pub rankings: Vec<Ranking>,
    pub rows: Vec<Row>,
    pub warnings: Vec<Warning>,
}

impl ReportPayload {
    /// Reads the four KPI scalars back out of the field list.
    pub fn kpi_summary(&self) -> KpiSummary {
        let mut kpi = KpiSummary::default();
        for field in &self.kpis {
            match (field.key, field.value) {
                (Column::TotalChallan, KpiValue::Count(v)) => kpi.total_challan = v,
                (Column::DisposedChallan, KpiValue::Count(v)) => kpi.disposed_challan = v,
                (Column::PendingChallan, KpiValue::Count(v)) => kpi.pending_challan = v,
                (Column::TotalAmount, KpiValue::Amount(v)) => kpi.total_amount = v,
                _ => {}
            }
        }
        kpi
    }
}

pub fn kpi_fields(kpi: &KpiSummary) -> Vec<KpiField> {
    let field = |key: Column, value| KpiField {
        key,
        label: key.label(),
        value,
    };
    vec![
        field(Column::TotalChallan, KpiValue::Count(kpi.total_challan)),
        field(Column::DisposedChallan, KpiValue::Count(kpi.disposed_challan)),
        field(Column::PendingChallan, KpiValue::Count(kpi.pending_challan)),
        field(Column::TotalAmount, KpiValue::Amount(kpi.total_amount)),
    ]
}

/// Bundles engine outputs for one view. Fails with
/// [`DashboardError::InconsistentReport`] when a rollup or ranking could not
/// have come from `view`.
pub fn assemble(
    view: &FilteredView<'_>,
    kpi: &KpiSummary,
    rollups: Vec<Rollup>,
    rankings: Vec<Ranking>,
) -> Result<ReportPayload> {
    for rollup in &rollups {
        if rollup.total() != kpi.total_challan {
            return Err(DashboardError::InconsistentReport(format!(
                "{} rollup sums to {} but the view has {} challans",
                rollup.key,
                rollup.total(),
                kpi.total_challan
            )));
        }
    }

    let range = view.range();
    for ranking in &rankings {
        if ranking.rows.len() > view.len() {
            return Err(DashboardError::InconsistentReport(format!(
                "{} ranking has {} rows but the view has {}",
                ranking.column,
                ranking.rows.len(),
                view.len()
            )));
        }
        if let Some(stray) = ranking.rows.iter().find(|r| !range.contains(r.date)) {
            return Err(DashboardError::InconsistentReport(format!(
                "{} ranking includes {} outside {}",
                ranking.column, stray.date, range
            )));
        }
    }

    Ok(ReportPayload {
        range,
        kpis: kpi_fields(kpi),
        rollups,
        rankings,
        rows: view.rows().to_vec(),
        warnings: view.warning().into_iter().collect(),
    })
}

/// A writer for one output format.
pub trait ReportExporter {
    fn file_name(&self) -> &'static str;
    fn export(&self, payload: &ReportPayload, out: &mut dyn Write) -> Result<()>;
}

/// KPI block followed by the filtered rows.
pub struct SheetExporter;

impl ReportExporter for SheetExporter {
    fn file_name(&self) -> &'static str {
        "echallan_report.csv"
    }

    fn export(&self, payload: &ReportPayload, out: &mut dyn Write) -> Result<()> {
        let mut wtr = csv::WriterBuilder::new().flexible(true).from_writer(out);
        wtr.write_record(["Metric", "Value"])?;
        for field in &payload.kpis {
            let value = match field.value {
                KpiValue::Count(v) => v.to_string(),
                KpiValue::Amount(v) => format!("{:.2}", v),
            };
            wtr.write_record([field.label, value.as_str()])?;
        }

        let mut header = vec!["date"];
        header.extend(Column::ALL.iter().map(|c| c.name()));
        wtr.write_record(&header)?;
        for row in &payload.rows {
            let mut record = vec![row.date.to_string()];
            record.extend(Column::ALL.iter().map(|&c| {
                if c.is_amount() {
                    format!("{:.2}", row.value(c))
                } else {
                    row.value(c).to_string()
                }
            }));
            wtr.write_record(&record)?;
        }
        wtr.flush()?;
        Ok(())
    }
}

/// Human-readable summary: title, range, one paragraph per KPI.
pub struct DocumentExporter;

impl ReportExporter for DocumentExporter {
    fn file_name(&self) -> &'static str {
        "echallan_report.txt"
    }

    fn export(&self, payload: &ReportPayload, out: &mut dyn Write) -> Result<()> {
        writeln!(out, "eChallan Dashboard Report")?;
        writeln!(out, "Period: {}", payload.range)?;
        writeln!(out)?;
        for field in &payload.kpis {
            writeln!(out, "{}: {}", field.label, field.value.display())?;
        }
        for rollup in &payload.rollups {
            writeln!(out)?;
            writeln!(out, "Challans by {}", rollup.key)?;
            for bucket in &rollup.buckets {
                writeln!(out, "  {}: {}", bucket.label, format_count(bucket.total_challan))?;
            }
        }
        for warning in &payload.warnings {
            writeln!(out)?;
            writeln!(out, "Note: {}", warning)?;
        }
        Ok(())
    }
}

pub struct JsonExporter;

impl ReportExporter for JsonExporter {
    fn file_name(&self) -> &'static str {
        "echallan_report.json"
    }

    fn export(&self, payload: &ReportPayload, out: &mut dyn Write) -> Result<()> {
        serde_json::to_writer_pretty(&mut *out, payload)?;
        writeln!(out)?;
        Ok(())
    }
}

/// Writes every format into `dir`, returning the created paths.
pub fn export_to_dir(payload: &ReportPayload, dir: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
    let exporters: [&dyn ReportExporter; 3] = [&SheetExporter, &DocumentExporter, &JsonExporter];
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir)?;

    let mut written = Vec::with_capacity(exporters.len());
    for exporter in exporters {
        let path = dir.join(exporter.file_name());
        let mut out = BufWriter::new(File::create(&path)?);
        exporter.export(payload, &mut out)?;
        out.flush()?;
        info!(path = %path.display(), "report exported");
        written.push(path);
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::{RollupKey, rollup_by, summarize};
    use crate::filter::filter_range;
    use crate::model::Dataset;
    use crate::ranking::top_n;
    use chrono::NaiveDate;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn dataset() -> Dataset {
        Dataset::from_rows(vec![
            Row::new(date(1), [10, 8, 2], [1000.0, 800.0, 200.0]),
            Row::new(date(2), [20, 15, 5], [2000.0, 1500.0, 500.0]),
            Row::new(date(3), [15, 10, 5], [1500.25, 1000.0, 500.25]),
        ])
    }

    fn payload(ds: &Dataset) -> ReportPayload {
        let view = filter_range(ds, ds.bounds().unwrap());
        let kpi = summarize(view.rows());
        let rollups = vec![rollup_by(view.rows(), RollupKey::Month)];
        let rankings = vec![Ranking {
            column: Column::TotalChallan,
            rows: top_n(view.rows(), Column::TotalChallan, 2),
        }];
        assemble(&view, &kpi, rollups, rankings).unwrap()
    }

    #[test]
    fn kpi_fields_are_ordered() {
        let ds = dataset();
        let p = payload(&ds);
        let keys: Vec<Column> = p.kpis.iter().map(|f| f.key).collect();
        assert_eq!(
            keys,
            vec![
                Column::TotalChallan,
                Column::DisposedChallan,
                Column::PendingChallan,
                Column::TotalAmount
            ]
        );
        assert_eq!(p.rows.len(), 3);
        assert!(p.warnings.is_empty());
    }

    #[test]
    fn rejects_rollup_from_another_view() {
        let ds = dataset();
        let view = filter_range(&ds, ds.bounds().unwrap());
        let kpi = summarize(view.rows());
        let partial = rollup_by(&view.rows()[..1], RollupKey::Year);
        let err = assemble(&view, &kpi, vec![partial], vec![]).unwrap_err();
        assert!(matches!(err, DashboardError::InconsistentReport(_)));
    }

    #[test]
    fn rejects_ranking_outside_range() {
        let ds = dataset();
        let narrow = DateRange::new(date(1), date(2)).unwrap();
        let view = filter_range(&ds, narrow);
        let kpi = summarize(view.rows());
        let ranking = Ranking {
            column: Column::PendingChallan,
            rows: vec![ds.rows()[2].clone()],
        };
        let err = assemble(&view, &kpi, vec![], vec![ranking]).unwrap_err();
        assert!(matches!(err, DashboardError::InconsistentReport(_)));
    }

    #[test]
    fn sheet_has_kpis_then_rows() {
        let ds = dataset();
        let mut buf = Vec::new();
        SheetExporter.export(&payload(&ds), &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Metric,Value");
        assert_eq!(lines[1], "Total Challans,45");
        assert_eq!(lines[4], "Total Amount,4500.25");
        assert!(lines[5].starts_with("date,totalChallan"));
        assert_eq!(lines[8], "2024-01-03,15,10,5,1500.25,1000.00,500.25");
    }

    #[test]
    fn document_formats_numbers() {
        let ds = dataset();
        let mut buf = Vec::new();
        DocumentExporter.export(&payload(&ds), &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("Period: 2024-01-01 to 2024-01-03"));
        assert!(text.contains("Total Amount: 4,500.25"));
        assert!(text.contains("2024-01: 45"));
        assert!(text.contains("Challans by month\n"));
        assert!(!text.contains("Challans by Month"));
    }

    #[test]
    fn json_carries_kpis_and_rows() {
        let ds = dataset();
        let mut buf = Vec::new();
        JsonExporter.export(&payload(&ds), &mut buf).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(value["kpis"][0]["value"], 45);
        assert_eq!(value["rows"][1]["totalChallan"], 20);
        assert_eq!(value["rankings"][0]["rows"][0]["date"], "2024-01-02");
    }

    #[test]
    fn export_to_dir_writes_all_formats() {
        let ds = dataset();
        let dir = tempfile::TempDir::new().unwrap();
        let written = export_to_dir(&payload(&ds), dir.path().join("out")).unwrap();
        assert_eq!(written.len(), 3);
        assert!(written.iter().all(|p| p.exists()));
    }
}
