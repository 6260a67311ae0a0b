use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::RecordStatus;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub id: i64,
    pub apartment: String,          // label as printed on the door, e.g. "101"
    pub amount: Decimal,
    pub date: NaiveDate,
    pub description: String,        // conventionally a period label: "January-2024"
    pub status: RecordStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPayment {
    pub apartment: String,
    pub amount: Decimal,
    pub date: NaiveDate,
    pub description: String,
    pub status: RecordStatus,
}

/// Partial update; `None` leaves the column untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentPatch {
    #[serde(default)]
    pub apartment: Option<String>,
    #[serde(default)]
    pub amount: Option<Decimal>,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Option<RecordStatus>,
}

impl PaymentPatch {
    pub fn is_empty(&self) -> bool {
        self.apartment.is_none()
            && self.amount.is_none()
            && self.date.is_none()
            && self.description.is_none()
            && self.status.is_none()
    }

    /// Patch that rewrites every column to the values in `new`.
    pub fn replace_with(new: &NewPayment) -> Self {
        Self {
            apartment: Some(new.apartment.clone()),
            amount: Some(new.amount),
            date: Some(new.date),
            description: Some(new.description.clone()),
            status: Some(new.status),
        }
    }
}
