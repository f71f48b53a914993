use std::error::Error;
use std::io::{self, Write};
use std::path::PathBuf;

use chrono::NaiveDate;
use echallan_dashboard::aggregate::RollupKey;
use echallan_dashboard::config::{Config, DEFAULT_CONFIG_FILE};
use echallan_dashboard::format::{format_amount, format_count, format_pct};
use echallan_dashboard::{Column, Dashboard, DateRange, loader, logging, report};
use tracing::error;

/// What the menu loop remembers between choices.
struct Session {
    config: Config,
    dashboard: Option<Dashboard>,
    range: Option<DateRange>,
}

fn main() -> Result<(), Box<dyn Error>> {
    logging::init();
    let config = Config::load(DEFAULT_CONFIG_FILE)?;
    let mut session = Session {
        config,
        dashboard: None,
        range: None,
    };

    loop {
        println!("eChallan Daily Dashboard");
        println!("[1] Load the file");
        println!("[2] Set date range");
        println!("[3] Show dashboard");
        println!("[4] Export reports");
        println!("[5] Exit");
        let choice = prompt("Enter Choice: ")?;

        let outcome = match choice.as_str() {
            "1" => load_file(&mut session),
            "2" => set_range(&mut session),
            "3" => show_dashboard(&session),
            "4" => export_reports(&session),
            "5" => return Ok(()),
            _ => {
                println!("Invalid choice. Please try again.");
                Ok(())
            }
        };
        if let Err(e) = outcome {
            error!(error = %e, "command failed");
            println!("Error: {}", e);
        }
        println!();
    }
}

fn prompt(label: &str) -> io::Result<String> {
    print!("{}", label);
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

fn load_file(session: &mut Session) -> Result<(), Box<dyn Error>> {
    let default = session.config.data_path.display().to_string();
    let input = prompt(&format!("Enter CSV filename [{}]: ", default))?;
    let path = if input.is_empty() {
        session.config.data_path.clone()
    } else {
        PathBuf::from(input)
    };

    let dashboard = Dashboard::open(&path)?;
    let dataset = dashboard.dataset();
    println!("Loaded {} rows from {}", dataset.len(), path.display());
    for warning in dataset.warnings() {
        println!("Warning: {}", warning);
    }
    session.range = dashboard.default_range();
    if let Some(range) = session.range {
        println!("Date range set to {}", range);
    }
    session.dashboard = Some(dashboard);
    Ok(())
}

fn set_range(session: &mut Session) -> Result<(), Box<dyn Error>> {
    let Some(dashboard) = &session.dashboard else {
        println!("No data loaded. Please choose [1] Load the file first.");
        return Ok(());
    };
    let Some(current) = session.range.or_else(|| dashboard.default_range()) else {
        println!("The loaded file has no rows.");
        return Ok(());
    };

    let start = read_date("Start Date", current.start())?;
    let end = read_date("End Date", current.end())?;
    let range = DateRange::new(start, end)?;
    println!("Date range set to {}", range);
    session.range = Some(range);
    Ok(())
}

fn read_date(label: &str, default: NaiveDate) -> Result<NaiveDate, Box<dyn Error>> {
    let input = prompt(&format!("{} [{}]: ", label, default))?;
    if input.is_empty() {
        return Ok(default);
    }
    loader::parse_date(&input).map_err(Into::into)
}

fn active(session: &Session) -> Option<(&Dashboard, DateRange)> {
    let dashboard = session.dashboard.as_ref()?;
    let range = session.range.or_else(|| dashboard.default_range())?;
    Some((dashboard, range))
}

fn show_dashboard(session: &Session) -> Result<(), Box<dyn Error>> {
    let Some((dashboard, range)) = active(session) else {
        println!("No data loaded. Please choose [1] Load the file first.");
        return Ok(());
    };
    let view = dashboard.view(range);
    if let Some(warning) = view.warning() {
        println!("Warning: {}", warning);
    }

    let kpi = dashboard.kpi_summary(range);
    println!("Period: {}", range);
    println!(
        "| {:>16} | {:>17} | {:>16} | {:>20} |",
        "Total Challans", "Disposed Challans", "Pending Challans", "Total Amount (Rs)"
    );
    println!(
        "| {:>16} | {:>17} | {:>16} | {:>20} |",
        format_count(kpi.total_challan),
        format_count(kpi.disposed_challan),
        format_count(kpi.pending_challan),
        format_amount(kpi.total_amount)
    );

    let amounts = dashboard.amount_comparison(range);
    let share = dashboard.disposal_share(range);
    println!();
    println!(
        "Amounts: disposed {} / pending {}",
        format_amount(amounts.disposed_amount),
        format_amount(amounts.pending_amount)
    );
    println!(
        "Challans: disposed {} / pending {}",
        format_pct(share.disposed_pct),
        format_pct(share.pending_pct)
    );

    println!();
    println!("Challans by month");
    for bucket in dashboard.rollup(range, RollupKey::Month).buckets {
        println!("  {:<8} {:>12}", bucket.label, format_count(bucket.total_challan));
    }

    let n = session.config.top_n;
    println!();
    println!("Top {} days by total challans", n);
    for row in dashboard.top_n(range, Column::TotalChallan.name(), n)? {
        println!("  {}  {:>12}", row.date, format_count(row.total_challan));
    }

    let heatmap = dashboard.pivot_of(range, session.config.pivot_column()?);
    println!();
    println!(
        "Heatmap ({}): {} days x {} months, total {}",
        heatmap.value,
        heatmap.row_labels.len(),
        heatmap.col_labels.len(),
        format_amount(heatmap.total())
    );

    println!();
    println!("{:<12} {:>10} {:>10} {:>10}", "Date", "Total", "Disposed", "Pending");
    for row in dashboard.preview(range, session.config.preview_rows) {
        println!(
            "{:<12} {:>10} {:>10} {:>10}",
            row.date.to_string(),
            row.total_challan,
            row.disposed_challan,
            row.pending_challan
        );
    }
    Ok(())
}

fn export_reports(session: &Session) -> Result<(), Box<dyn Error>> {
    let Some((dashboard, range)) = active(session) else {
        println!("No data loaded. Please choose [1] Load the file first.");
        return Ok(());
    };
    let payload = dashboard.report(range, session.config.top_n)?;
    for path in report::export_to_dir(&payload, &session.config.export_dir)? {
        println!("Exported {}", path.display());
    }
    Ok(())
}
