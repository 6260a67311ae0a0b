use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::sqlite::SqliteRow;
use sqlx::{Pool, QueryBuilder, Row, Sqlite};
use std::fmt;
use tracing::{debug, warn};

use crate::database::models::{
    iso, Expense, NewExpense, NewPayment, Payment, PaymentPatch, RecordStatus,
};
use crate::database::StoreError;

/*
Record store client: one method per round trip to the `payments` and
`expenses` tables. Rows are decoded into typed records here, so nothing
untyped leaks past this file.
 */

const PAYMENT_COLUMNS: &str = "id, apartment, amount, date, description, status";
const EXPENSE_COLUMNS: &str = "id, amount, date, description, category, status";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    Payments,
    Expenses,
}

impl Collection {
    pub fn table(&self) -> &'static str {
        match self {
            Self::Payments => "payments",
            Self::Expenses => "expenses",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table())
    }
}

/// Only `IdDescending` is a guarantee; callers must not rely on the
/// order of `StoreDefined` results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Order {
    #[default]
    StoreDefined,
    IdDescending,
}

impl Order {
    fn sql(&self) -> &'static str {
        match self {
            Self::StoreDefined => "",
            Self::IdDescending => " ORDER BY id DESC",
        }
    }
}

/// Equality constraints on the payments table. Empty fields are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaymentQuery {
    pub apartment: Option<String>,
    pub description: Option<String>,
}

impl PaymentQuery {
    fn equalities(&self) -> Vec<(&'static str, String)> {
        let mut out = Vec::new();
        if let Some(apartment) = non_empty(&self.apartment) {
            out.push(("apartment", apartment));
        }
        if let Some(description) = non_empty(&self.description) {
            out.push(("description", description));
        }
        out
    }

    pub fn is_empty(&self) -> bool {
        self.equalities().is_empty()
    }
}

/// Equality constraints on the expenses table. Empty fields are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpenseQuery {
    pub category: Option<String>,
    pub description: Option<String>,
}

impl ExpenseQuery {
    fn equalities(&self) -> Vec<(&'static str, String)> {
        let mut out = Vec::new();
        if let Some(category) = non_empty(&self.category) {
            out.push(("category", category));
        }
        if let Some(description) = non_empty(&self.description) {
            out.push(("description", description));
        }
        out
    }

    pub fn is_empty(&self) -> bool {
        self.equalities().is_empty()
    }
}

#[derive(Clone)]
pub struct RecordStore {
    pool: Pool<Sqlite>,
}

impl RecordStore {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    // ============= Payments =============

    pub async fn list_payments(&self, order: Order) -> Result<Vec<Payment>, StoreError> {
        self.list_payments_filtered(&PaymentQuery::default(), order).await
    }

    pub async fn list_payments_filtered(
        &self,
        query: &PaymentQuery,
        order: Order,
    ) -> Result<Vec<Payment>, StoreError> {
        let mut qb = QueryBuilder::<Sqlite>::new(format!("SELECT {PAYMENT_COLUMNS} FROM payments"));
        push_equalities(&mut qb, query.equalities());
        qb.push(order.sql());

        let rows = qb.build().fetch_all(&self.pool).await?;
        debug!(count = rows.len(), ?query, "fetched payments");
        rows.iter().map(payment_from_row).collect()
    }

    /// First payment (lowest id) recorded for an apartment and period label.
    pub async fn find_payment(
        &self,
        apartment: &str,
        description: &str,
    ) -> Result<Option<Payment>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments \
             WHERE apartment = ? AND description = ? ORDER BY id ASC LIMIT 1"
        ))
        .bind(apartment.trim())
        .bind(description.trim())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(payment_from_row).transpose()
    }

    pub async fn get_payment(&self, id: i64) -> Result<Payment, StoreError> {
        let row = sqlx::query(&format!("SELECT {PAYMENT_COLUMNS} FROM payments WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound {
                collection: Collection::Payments.table(),
                id,
            })?;
        payment_from_row(&row)
    }

    pub async fn insert_payment(&self, new: &NewPayment) -> Result<Payment, StoreError> {
        let row = bind_new_payment(sqlx::query(&insert_payment_sql()), new)
            .fetch_one(&self.pool)
            .await?;
        payment_from_row(&row)
    }

    /// Inserts every record or none: the batch runs in one transaction.
    pub async fn insert_payments(&self, batch: &[NewPayment]) -> Result<Vec<Payment>, StoreError> {
        if batch.is_empty() {
            return Ok(Vec::new());
        }

        let sql = insert_payment_sql();
        let mut tx = self.pool.begin().await?;
        let mut stored = Vec::with_capacity(batch.len());
        for new in batch {
            let row = bind_new_payment(sqlx::query(&sql), new)
                .fetch_one(&mut *tx)
                .await?;
            stored.push(payment_from_row(&row)?);
        }
        tx.commit().await?;

        debug!(count = stored.len(), "inserted payment batch");
        Ok(stored)
    }

    pub async fn update_payment(&self, id: i64, patch: &PaymentPatch) -> Result<Payment, StoreError> {
        if patch.is_empty() {
            return self.get_payment(id).await;
        }

        let mut qb = QueryBuilder::<Sqlite>::new("UPDATE payments SET ");
        let mut set = qb.separated(", ");
        if let Some(apartment) = &patch.apartment {
            set.push("apartment = ");
            set.push_bind_unseparated(apartment.trim().to_string());
        }
        if let Some(amount) = &patch.amount {
            set.push("amount = ");
            set.push_bind_unseparated(amount.to_string());
        }
        if let Some(date) = &patch.date {
            set.push("date = ");
            set.push_bind_unseparated(iso(date));
        }
        if let Some(description) = &patch.description {
            set.push("description = ");
            set.push_bind_unseparated(description.trim().to_string());
        }
        if let Some(status) = &patch.status {
            set.push("status = ");
            set.push_bind_unseparated(status.as_str());
        }
        qb.push(" WHERE id = ");
        qb.push_bind(id);
        qb.push(format!(" RETURNING {PAYMENT_COLUMNS}"));

        let row = qb
            .build()
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound {
                collection: Collection::Payments.table(),
                id,
            })?;
        payment_from_row(&row)
    }

    // ============= Expenses =============

    pub async fn list_expenses(&self, order: Order) -> Result<Vec<Expense>, StoreError> {
        self.list_expenses_filtered(&ExpenseQuery::default(), order).await
    }

    pub async fn list_expenses_filtered(
        &self,
        query: &ExpenseQuery,
        order: Order,
    ) -> Result<Vec<Expense>, StoreError> {
        let mut qb = QueryBuilder::<Sqlite>::new(format!("SELECT {EXPENSE_COLUMNS} FROM expenses"));
        push_equalities(&mut qb, query.equalities());
        qb.push(order.sql());

        let rows = qb.build().fetch_all(&self.pool).await?;
        debug!(count = rows.len(), ?query, "fetched expenses");
        rows.iter().map(expense_from_row).collect()
    }

    pub async fn insert_expense(&self, new: &NewExpense) -> Result<Expense, StoreError> {
        let row = sqlx::query(&format!(
            "INSERT INTO expenses (amount, date, description, category, status) \
             VALUES (?, ?, ?, ?, ?) RETURNING {EXPENSE_COLUMNS}"
        ))
        .bind(new.amount.to_string())
        .bind(iso(&new.date))
        .bind(new.description.trim())
        .bind(new.category.trim())
        .bind(new.status.as_str())
        .fetch_one(&self.pool)
        .await?;
        expense_from_row(&row)
    }

    // ============= Shared =============

    pub async fn delete(&self, collection: Collection, id: i64) -> Result<(), StoreError> {
        let result = sqlx::query(&format!("DELETE FROM {} WHERE id = ?", collection.table()))
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            warn!(%collection, id, "delete matched no row");
            return Err(StoreError::NotFound {
                collection: collection.table(),
                id,
            });
        }
        Ok(())
    }
}

/* ========== row decoding ========== */

fn insert_payment_sql() -> String {
    format!(
        "INSERT INTO payments (apartment, amount, date, description, status) \
         VALUES (?, ?, ?, ?, ?) RETURNING {PAYMENT_COLUMNS}"
    )
}

fn bind_new_payment<'q>(
    query: sqlx::query::Query<'q, Sqlite, sqlx::sqlite::SqliteArguments<'q>>,
    new: &NewPayment,
) -> sqlx::query::Query<'q, Sqlite, sqlx::sqlite::SqliteArguments<'q>> {
    query
        .bind(new.apartment.trim().to_string())
        .bind(new.amount.to_string())
        .bind(iso(&new.date))
        .bind(new.description.trim().to_string())
        .bind(new.status.as_str())
}

fn push_equalities(qb: &mut QueryBuilder<'_, Sqlite>, equalities: Vec<(&'static str, String)>) {
    for (i, (column, value)) in equalities.into_iter().enumerate() {
        qb.push(if i == 0 { " WHERE " } else { " AND " });
        qb.push(column);
        qb.push(" = ");
        qb.push_bind(value);
    }
}

fn payment_from_row(row: &SqliteRow) -> Result<Payment, StoreError> {
    const TABLE: &str = "payments";
    Ok(Payment {
        id: row.try_get("id")?,
        apartment: row.try_get("apartment")?,
        amount: parse_amount(TABLE, &row.try_get::<String, _>("amount")?)?,
        date: parse_date(TABLE, &row.try_get::<String, _>("date")?)?,
        description: row.try_get("description")?,
        status: parse_status(TABLE, &row.try_get::<String, _>("status")?)?,
    })
}

fn expense_from_row(row: &SqliteRow) -> Result<Expense, StoreError> {
    const TABLE: &str = "expenses";
    Ok(Expense {
        id: row.try_get("id")?,
        amount: parse_amount(TABLE, &row.try_get::<String, _>("amount")?)?,
        date: parse_date(TABLE, &row.try_get::<String, _>("date")?)?,
        description: row.try_get("description")?,
        category: row.try_get("category")?,
        status: parse_status(TABLE, &row.try_get::<String, _>("status")?)?,
    })
}

fn parse_amount(table: &'static str, raw: &str) -> Result<Decimal, StoreError> {
    Decimal::from_str_exact(raw.trim())
        .map_err(|e| StoreError::malformed(table, format!("amount `{raw}`: {e}")))
}

fn parse_date(table: &'static str, raw: &str) -> Result<NaiveDate, StoreError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|e| StoreError::malformed(table, format!("date `{raw}`: {e}")))
}

fn parse_status(table: &'static str, raw: &str) -> Result<RecordStatus, StoreError> {
    raw.parse()
        .map_err(|e: crate::database::models::status::UnknownStatus| {
            StoreError::malformed(table, e.to_string())
        })
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::db::{connection, migrate};
    use std::str::FromStr;

    async fn store() -> RecordStore {
        let pool = connection::in_memory_pool().await.unwrap();
        migrate::run_migrations(&pool).await.unwrap();
        RecordStore::new(pool)
    }

    fn payment(apartment: &str, description: &str) -> NewPayment {
        NewPayment {
            apartment: apartment.into(),
            amount: Decimal::from(100),
            date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            description: description.into(),
            status: RecordStatus::Unpaid,
        }
    }

    #[tokio::test]
    async fn insert_assigns_id_and_lists_once() {
        let store = store().await;
        let stored = store.insert_payment(&payment("101", "January-2024")).await.unwrap();
        assert!(stored.id > 0);

        let all = store.list_payments(Order::StoreDefined).await.unwrap();
        let matching: Vec<_> = all
            .iter()
            .filter(|p| {
                p.apartment == "101"
                    && p.amount == Decimal::from(100)
                    && p.date == NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
                    && p.description == "January-2024"
                    && p.status == RecordStatus::Unpaid
            })
            .collect();
        assert_eq!(matching.len(), 1);
        assert_eq!(matching[0].id, stored.id);
    }

    #[tokio::test]
    async fn id_descending_is_honoured() {
        let store = store().await;
        for apt in ["101", "102", "103"] {
            store.insert_payment(&payment(apt, "January-2024")).await.unwrap();
        }
        let ids: Vec<i64> = store
            .list_payments(Order::IdDescending)
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.id)
            .collect();
        let mut sorted = ids.clone();
        sorted.sort_unstable_by(|a, b| b.cmp(a));
        assert_eq!(ids, sorted);
    }

    #[tokio::test]
    async fn equality_filter_applies_every_non_empty_field() {
        let store = store().await;
        store.insert_payment(&payment("101", "January-2024")).await.unwrap();
        store.insert_payment(&payment("101", "February-2024")).await.unwrap();
        store.insert_payment(&payment("102", "January-2024")).await.unwrap();

        let by_apartment = PaymentQuery {
            apartment: Some("101".into()),
            description: Some("  ".into()),
        };
        assert_eq!(store.list_payments_filtered(&by_apartment, Order::IdDescending).await.unwrap().len(), 2);

        let both = PaymentQuery {
            apartment: Some("101".into()),
            description: Some("January-2024".into()),
        };
        let hits = store.list_payments_filtered(&both, Order::IdDescending).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].description, "January-2024");
    }

    #[tokio::test]
    async fn partial_update_touches_only_given_fields() {
        let store = store().await;
        let stored = store.insert_payment(&payment("101", "January-2024")).await.unwrap();

        let patch = PaymentPatch {
            status: Some(RecordStatus::Paid),
            amount: Some(Decimal::from_str("120.50").unwrap()),
            ..Default::default()
        };
        let updated = store.update_payment(stored.id, &patch).await.unwrap();
        assert_eq!(updated.status, RecordStatus::Paid);
        assert_eq!(updated.amount, Decimal::from_str("120.50").unwrap());
        assert_eq!(updated.apartment, "101");
        assert_eq!(updated.description, "January-2024");
    }

    #[tokio::test]
    async fn update_of_missing_row_is_not_found() {
        let store = store().await;
        let patch = PaymentPatch {
            status: Some(RecordStatus::Paid),
            ..Default::default()
        };
        let err = store.update_payment(999, &patch).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { id: 999, .. }));
    }

    #[tokio::test]
    async fn delete_removes_record_from_later_lists() {
        let store = store().await;
        let kept = store.insert_payment(&payment("101", "January-2024")).await.unwrap();
        let gone = store.insert_payment(&payment("102", "January-2024")).await.unwrap();

        store.delete(Collection::Payments, gone.id).await.unwrap();

        let ids: Vec<i64> = store
            .list_payments(Order::StoreDefined)
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(ids, vec![kept.id]);
        assert!(matches!(
            store.delete(Collection::Payments, gone.id).await,
            Err(StoreError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn malformed_rows_become_typed_errors() {
        let store = store().await;
        sqlx::query(
            "INSERT INTO payments (apartment, amount, date, description, status) \
             VALUES ('101', 'lots', '2024-01-01', 'January-2024', 'unpaid')",
        )
        .execute(store.pool())
        .await
        .unwrap();

        let err = store.list_payments(Order::StoreDefined).await.unwrap_err();
        assert!(matches!(err, StoreError::Malformed { collection: "payments", .. }));
    }

    #[tokio::test]
    async fn expenses_round_through_the_store() {
        let store = store().await;
        let new = NewExpense {
            amount: Decimal::from_str("45.90").unwrap(),
            date: NaiveDate::from_ymd_opt(2024, 3, 5).unwrap(),
            description: "Stairwell bulbs".into(),
            category: "Electricity".into(),
            status: RecordStatus::Paid,
        };
        let stored = store.insert_expense(&new).await.unwrap();

        let by_category = ExpenseQuery {
            category: Some("Electricity".into()),
            ..Default::default()
        };
        let hits = store.list_expenses_filtered(&by_category, Order::IdDescending).await.unwrap();
        assert_eq!(hits, vec![stored.clone()]);

        store.delete(Collection::Expenses, stored.id).await.unwrap();
        assert!(store.list_expenses(Order::StoreDefined).await.unwrap().is_empty());
    }
}
