use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::billing::PeriodLabel;

pub use crate::database::models::{fmt_money, iso};

pub fn parse_money(s: &str) -> Option<Decimal> {
    Decimal::from_str_exact(s.trim()).ok()
}

pub fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(s.trim(), "%Y/%m/%d"))
        .ok()
}

/// Calendar date on the local clock; billing periods follow the wall calendar.
pub fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

/// "for month 01-2024" when the description is a period label, else as-is.
pub fn describe_period(description: &str) -> String {
    match description.parse::<PeriodLabel>() {
        Ok(label) => format!("for month {}", label.numeric()),
        Err(_) => description.to_string(),
    }
}

/// Canonical period label for "january-2024" or "01-2024"; anything else
/// is passed through trimmed, since descriptions are free text.
pub fn normalize_period(s: &str) -> String {
    let s = s.trim();
    if let Ok(label) = s.parse::<PeriodLabel>() {
        return label.to_string();
    }
    let numeric = s
        .split_once('-')
        .and_then(|(m, y)| Some((m.parse::<u32>().ok()?, y.parse::<i32>().ok()?)))
        .and_then(|(m, y)| PeriodLabel::new(y, m));
    match numeric {
        Some(label) => label.to_string(),
        None => s.to_string(),
    }
}
