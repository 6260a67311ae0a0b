pub mod expense;
pub mod payment;
pub mod status;

pub use expense::{Expense, NewExpense};
pub use payment::{NewPayment, Payment, PaymentPatch};
pub use status::RecordStatus;

use chrono::NaiveDate;
use rust_decimal::Decimal;

/// Money as shown on screens and invoices: at most two decimals.
pub fn fmt_money(d: &Decimal) -> String {
    d.round_dp(2).to_string()
}

/// `YYYY-MM-DD`, the form dates are stored and typed in.
pub fn iso(d: &NaiveDate) -> String {
    d.format("%Y-%m-%d").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn money_keeps_at_most_two_decimals() {
        assert_eq!(fmt_money(&Decimal::new(12550, 2)), "125.50");
        assert_eq!(fmt_money(&Decimal::new(1005, 3)), "1.00");
        assert_eq!(fmt_money(&Decimal::from(100)), "100");
    }

    #[test]
    fn dates_are_iso_formatted() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
        assert_eq!(iso(&date), "2024-03-07");
    }
}
