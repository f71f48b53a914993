use num_format::{Locale, ToFormattedString};

/// `1234567` -> `1,234,567`
pub fn format_count(value: u64) -> String {
    value.to_formatted_string(&Locale::en)
}

/// Comma-grouped with two decimals, `1234.5` -> `1,234.50`.
pub fn format_amount(value: f64) -> String {
    let cents = (value * 100.0).round() as i64;
    let sign = if cents < 0 { "-" } else { "" };
    let cents = cents.unsigned_abs();
    format!(
        "{}{}.{:02}",
        sign,
        (cents / 100).to_formatted_string(&Locale::en),
        cents % 100
    )
}

pub fn format_pct(value: f64) -> String {
    format!("{:.1}%", value)
}
