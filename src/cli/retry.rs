use chrono::NaiveDate;

use crate::database::models::{NewExpense, NewPayment, Payment, PaymentPatch};
use crate::search::RecordFilter;

/// A store or document request issued from a screen, kept with its
/// parameters so a failed one can be issued again unchanged.
#[derive(Debug, Clone, PartialEq)]
pub enum RetryableAction {
    LookupPayments { apartment: String },
    FindInvoice { apartment: String, period: String },
    RefreshPayments { filter: RecordFilter },
    RefreshExpenses,
    InsertPayment(NewPayment),
    UpdatePayment { id: i64, patch: PaymentPatch },
    DeletePayment { id: i64 },
    GenerateBatch { today: NaiveDate },
    InsertExpense(NewExpense),
    DeleteExpense { id: i64 },
    DownloadInvoice(Payment),
}

impl RetryableAction {
    pub fn describe(&self) -> String {
        match self {
            Self::LookupPayments { apartment } => format!("Lookup for apartment {apartment}"),
            Self::FindInvoice { apartment, period } => {
                format!("Invoice lookup for {apartment} / {period}")
            }
            Self::RefreshPayments { .. } => "Loading payments".into(),
            Self::RefreshExpenses => "Loading expenses".into(),
            Self::InsertPayment(p) => format!("Saving payment for {}", p.apartment),
            Self::UpdatePayment { id, .. } => format!("Updating payment #{id}"),
            Self::DeletePayment { id } => format!("Deleting payment #{id}"),
            Self::GenerateBatch { .. } => "Monthly invoice generation".into(),
            Self::InsertExpense(e) => format!("Saving expense {}", e.description),
            Self::DeleteExpense { id } => format!("Deleting expense #{id}"),
            Self::DownloadInvoice(p) => format!("Invoice for {} {}", p.apartment, p.description),
        }
    }

    /// Actions that need a signed-in admin.
    pub fn is_protected(&self) -> bool {
        !matches!(
            self,
            Self::LookupPayments { .. } | Self::FindInvoice { .. } | Self::DownloadInvoice(_)
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FailedAction {
    pub action: RetryableAction,
    pub error: String,
}
