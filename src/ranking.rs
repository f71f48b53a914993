use crate::error::Result;
use crate::model::{Column, Row};

/// The `n` rows with the largest `column` values, highest first. Equal values
/// keep their date order. Returns everything when fewer than `n` rows exist.
pub fn top_n(rows: &[Row], column: Column, n: usize) -> Vec<Row> {
    let mut ranked: Vec<&Row> = rows.iter().collect();
    // `sort_by` is stable, so ties stay in input order.
    ranked.sort_by(|a, b| b.value(column).total_cmp(&a.value(column)));
    ranked.into_iter().take(n).cloned().collect()
}

/// [`top_n`] with the column named as in the CSV header.
pub fn top_n_by_name(rows: &[Row], column: &str, n: usize) -> Result<Vec<Row>> {
    Ok(top_n(rows, column.parse()?, n))
}
