use chrono::{Datelike, NaiveDate};
use std::fmt;
use std::str::FromStr;

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// Billing-cycle key, rendered `"<FullMonthName>-<FourDigitYear>"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PeriodLabel {
    year: i32,
    month: u32,
}

impl PeriodLabel {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        (1..=12).contains(&month).then_some(Self { year, month })
    }

    pub fn for_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn month_name(&self) -> &'static str {
        MONTH_NAMES[(self.month - 1) as usize]
    }

    /// The twelve labels of a year, January first; the choices offered
    /// by the payment form.
    pub fn year_options(year: i32) -> Vec<PeriodLabel> {
        (1..=12).map(|month| PeriodLabel { year, month }).collect()
    }

    /// `MM-YYYY`, the short form shown to residents on the lookup screen.
    pub fn numeric(&self) -> String {
        format!("{:02}-{:04}", self.month, self.year)
    }
}

impl fmt::Display for PeriodLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{:04}", self.month_name(), self.year)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidPeriod(pub String);

impl fmt::Display for InvalidPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "`{}` is not a Month-Year period label", self.0)
    }
}

impl std::error::Error for InvalidPeriod {}

impl FromStr for PeriodLabel {
    type Err = InvalidPeriod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || InvalidPeriod(s.to_string());
        let (name, year) = s.trim().split_once('-').ok_or_else(invalid)?;
        let month = MONTH_NAMES
            .iter()
            .position(|m| m.eq_ignore_ascii_case(name.trim()))
            .ok_or_else(invalid)? as u32
            + 1;
        let year: i32 = year.trim().parse().map_err(|_| invalid())?;
        Ok(Self { year, month })
    }
}
