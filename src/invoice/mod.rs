//! Payment invoices as downloadable PDF documents.
//!
//! [`InvoiceLayout::for_payment`] places every piece of text and rule on an
//! A4 page; [`render::render_pdf`] turns that layout into bytes. Both stages
//! depend only on the payment record.

pub mod layout;
pub mod render;

use thiserror::Error;
use tracing::{debug, error};

use crate::database::models::Payment;

pub use layout::{Element, FontFace, InvoiceLayout, Rgb8, TextAlign, TextStyle};

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("pdf rendering failed: {0}")]
    Render(String),
    #[error("invalid document date: {0}")]
    Date(String),
    #[error("could not write invoice: {0}")]
    Io(#[from] std::io::Error),
}

/// A generated invoice, ready to hand to whoever downloads it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvoiceFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl InvoiceFile {
    pub const CONTENT_TYPE: &'static str = "application/pdf";
}

/// `invoice-<apartment>-<date>.pdf`. Always keyed on the payment date so a
/// regenerated invoice lands on the same name.
pub fn file_name(payment: &Payment) -> String {
    let apartment: String = payment
        .apartment
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    format!("invoice-{}-{}.pdf", apartment, payment.date.format("%Y-%m-%d"))
}

pub fn generate_invoice(payment: &Payment) -> Result<InvoiceFile, DocumentError> {
    let layout = InvoiceLayout::for_payment(payment);
    let bytes = render::render_pdf(&layout, payment).map_err(|e| {
        error!(payment_id = payment.id, error = %e, "invoice generation failed");
        e
    })?;
    debug!(payment_id = payment.id, size = bytes.len(), "invoice rendered");
    Ok(InvoiceFile {
        file_name: file_name(payment),
        bytes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::RecordStatus;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    fn payment() -> Payment {
        Payment {
            id: 7,
            apartment: "101".into(),
            amount: Decimal::from(100),
            date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            description: "January-2024".into(),
            status: RecordStatus::Paid,
        }
    }

    #[test]
    fn file_name_uses_apartment_and_date() {
        assert_eq!(file_name(&payment()), "invoice-101-2024-01-01.pdf");

        let mut odd = payment();
        odd.apartment = "B/2".into();
        assert_eq!(file_name(&odd), "invoice-B_2-2024-01-01.pdf");
    }

    #[test]
    fn generates_a_pdf_file() {
        let file = generate_invoice(&payment()).unwrap();
        assert_eq!(file.file_name, "invoice-101-2024-01-01.pdf");
        assert!(file.bytes.starts_with(b"%PDF-"));
    }

    #[test]
    fn regenerating_gives_the_same_file() {
        let p = payment();
        let first = generate_invoice(&p).unwrap();
        let again = generate_invoice(&p).unwrap();
        assert_eq!(first, again);
    }
}
