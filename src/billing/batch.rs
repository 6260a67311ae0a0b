use chrono::NaiveDate;
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{info, warn};

use crate::billing::PeriodLabel;
use crate::database::db::store::{Order, PaymentQuery, RecordStore};
use crate::database::models::{NewPayment, RecordStatus};
use crate::database::StoreError;

/// Apartments billed every month. Has to be kept in step with the building
/// by hand.
pub const DEFAULT_ROSTER: [&str; 16] = [
    "101", "102", "103", "104", //
    "201", "202", "203", "204", //
    "301", "302", "303", "304", //
    "401", "402", "403", "404",
];

/// Monthly fee charged to every apartment on the roster.
pub const DEFAULT_AMOUNT: i64 = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchPlan {
    pub roster: Vec<String>,
    pub amount: Decimal,
}

impl Default for BatchPlan {
    fn default() -> Self {
        Self {
            roster: DEFAULT_ROSTER.iter().map(|a| a.to_string()).collect(),
            amount: Decimal::from(DEFAULT_AMOUNT),
        }
    }
}

impl BatchPlan {
    /// One unpaid payment per apartment, dated `today`.
    pub fn records_for(&self, today: NaiveDate) -> Vec<NewPayment> {
        let period = PeriodLabel::for_date(today).to_string();
        self.roster
            .iter()
            .map(|apartment| NewPayment {
                apartment: apartment.clone(),
                amount: self.amount,
                date: today,
                description: period.clone(),
                status: RecordStatus::Unpaid,
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOutcome {
    Created { period: PeriodLabel, count: usize },
    AlreadyExists { period: PeriodLabel, existing: usize },
}

impl BatchOutcome {
    pub fn inserted(&self) -> usize {
        match self {
            Self::Created { count, .. } => *count,
            Self::AlreadyExists { .. } => 0,
        }
    }

    pub fn message(&self) -> String {
        match self {
            Self::Created { period, count } => {
                format!("Generated {count} invoices for {period}")
            }
            Self::AlreadyExists { period, .. } => {
                format!("Invoices for {period} already exist")
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum BatchError {
    #[error("batch generation failed: {0}")]
    Store(#[from] StoreError),
}

/// Creates the month's invoices once per period.
#[derive(Clone)]
pub struct MonthlyBatchGenerator {
    store: RecordStore,
    plan: BatchPlan,
}

impl MonthlyBatchGenerator {
    pub fn new(store: RecordStore) -> Self {
        Self::with_plan(store, BatchPlan::default())
    }

    pub fn with_plan(store: RecordStore, plan: BatchPlan) -> Self {
        Self { store, plan }
    }

    pub async fn generate(&self, today: NaiveDate) -> Result<BatchOutcome, BatchError> {
        let period = PeriodLabel::for_date(today);

        let query = PaymentQuery {
            apartment: None,
            description: Some(period.to_string()),
        };
        let existing = self
            .store
            .list_payments_filtered(&query, Order::StoreDefined)
            .await?;
        if !existing.is_empty() {
            info!(%period, existing = existing.len(), "invoices already generated");
            return Ok(BatchOutcome::AlreadyExists {
                period,
                existing: existing.len(),
            });
        }

        let records = self.plan.records_for(today);
        match self.store.insert_payments(&records).await {
            Ok(stored) => {
                info!(%period, count = stored.len(), "generated monthly invoices");
                Ok(BatchOutcome::Created {
                    period,
                    count: stored.len(),
                })
            }
            Err(e) => {
                warn!(%period, error = %e, "monthly invoice batch failed");
                Err(e.into())
            }
        }
    }
}
