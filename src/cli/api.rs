use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::NaiveDate;
use tracing::info;

use crate::auth::AuthGate;
use crate::billing::{BatchOutcome, MonthlyBatchGenerator};
use crate::database::models::{Expense, NewExpense, NewPayment, Payment, PaymentPatch};
use crate::database::{Collection, Order, RecordStore};
use crate::invoice;
use crate::search::RecordFilter;

/// Everything the screens talk to: the record store, the auth gate and the
/// folder downloaded invoices are written to.
#[derive(Clone)]
pub struct Client {
    store: RecordStore,
    gate: AuthGate,
    batches: MonthlyBatchGenerator,
    invoice_dir: PathBuf,
}

impl Client {
    pub fn new(store: RecordStore, gate: AuthGate, invoice_dir: impl Into<PathBuf>) -> Self {
        let batches = MonthlyBatchGenerator::new(store.clone());
        Self {
            store,
            gate,
            batches,
            invoice_dir: invoice_dir.into(),
        }
    }

    pub fn gate(&self) -> &AuthGate {
        &self.gate
    }

    pub fn invoice_dir(&self) -> &Path {
        &self.invoice_dir
    }

    // ============= Payments =============

    /// Newest first. Equality constraints go to the store, free text is
    /// applied to what comes back.
    pub async fn list_payments(&self, filter: &RecordFilter) -> Result<Vec<Payment>> {
        let fetched = match filter.payment_query() {
            Some(query) => self.store.list_payments_filtered(&query, Order::IdDescending).await?,
            None => self.store.list_payments(Order::IdDescending).await?,
        };
        Ok(fetched)
    }

    pub async fn payments_for_apartment(&self, apartment: &str) -> Result<Vec<Payment>> {
        let filter = RecordFilter {
            apartment: Some(apartment.to_string()),
            ..Default::default()
        };
        self.list_payments(&filter).await
    }

    pub async fn find_invoice(&self, apartment: &str, period: &str) -> Result<Option<Payment>> {
        Ok(self.store.find_payment(apartment, period).await?)
    }

    pub async fn create_payment(&self, new: &NewPayment) -> Result<Payment> {
        Ok(self.store.insert_payment(new).await?)
    }

    pub async fn update_payment(&self, id: i64, patch: &PaymentPatch) -> Result<Payment> {
        Ok(self.store.update_payment(id, patch).await?)
    }

    pub async fn delete_payment(&self, id: i64) -> Result<()> {
        Ok(self.store.delete(Collection::Payments, id).await?)
    }

    pub async fn generate_batch(&self, today: NaiveDate) -> Result<BatchOutcome> {
        Ok(self.batches.generate(today).await?)
    }

    // ============= Expenses =============

    pub async fn list_expenses(&self) -> Result<Vec<Expense>> {
        Ok(self.store.list_expenses(Order::IdDescending).await?)
    }

    pub async fn create_expense(&self, new: &NewExpense) -> Result<Expense> {
        Ok(self.store.insert_expense(new).await?)
    }

    pub async fn delete_expense(&self, id: i64) -> Result<()> {
        Ok(self.store.delete(Collection::Expenses, id).await?)
    }

    // ============= Invoices =============

    /// Renders the invoice and writes it under the invoice folder,
    /// replacing an earlier download of the same payment.
    pub async fn download_invoice(&self, payment: &Payment) -> Result<PathBuf> {
        let file = invoice::generate_invoice(payment)?;
        tokio::fs::create_dir_all(&self.invoice_dir).await?;
        let path = self.invoice_dir.join(&file.file_name);
        tokio::fs::write(&path, &file.bytes).await?;
        info!(payment_id = payment.id, path = %path.display(), "invoice saved");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{MemoryTokenStore, SqlIdentityProvider};
    use crate::database::db::{connection, migrate};
    use crate::database::models::RecordStatus;
    use rust_decimal::Decimal;
    use std::sync::Arc;

    async fn client(dir: &Path) -> Client {
        let pool = connection::in_memory_pool().await.unwrap();
        migrate::run_migrations(&pool).await.unwrap();
        let gate = AuthGate::new(
            Arc::new(SqlIdentityProvider::new(pool.clone())),
            Arc::new(MemoryTokenStore::default()),
        );
        Client::new(RecordStore::new(pool), gate, dir.join("invoices"))
    }

    fn new_payment(apartment: &str) -> NewPayment {
        NewPayment {
            apartment: apartment.into(),
            amount: Decimal::from(100),
            date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            description: "January-2024".into(),
            status: RecordStatus::Unpaid,
        }
    }

    #[tokio::test]
    async fn apartment_lookup_is_exact() {
        let dir = tempfile::tempdir().unwrap();
        let client = client(dir.path()).await;
        client.create_payment(&new_payment("101")).await.unwrap();
        client.create_payment(&new_payment("1010")).await.unwrap();

        let found = client.payments_for_apartment("101").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].apartment, "101");
    }

    #[tokio::test]
    async fn download_writes_the_named_file() {
        let dir = tempfile::tempdir().unwrap();
        let client = client(dir.path()).await;
        let payment = client.create_payment(&new_payment("202")).await.unwrap();

        let path = client.download_invoice(&payment).await.unwrap();
        assert!(path.ends_with("invoice-202-2024-01-01.pdf"));
        let bytes = std::fs::read(&path).unwrap();
        assert!(bytes.starts_with(b"%PDF-"));
    }
}
