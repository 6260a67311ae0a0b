// src/backend/handlers.rs
use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::auth::Session;
use crate::backend::auth::extract_bearer;
use crate::backend::auth::MaybeAdmin;
use crate::backend::{ApiError, AppState, RequireAdmin};
use crate::billing::BatchOutcome;
use crate::database::db::store::ExpenseQuery;
use crate::database::models::{Expense, NewExpense, NewPayment, Payment, PaymentPatch};
use crate::database::{Collection, Order};
use crate::invoice::{self, InvoiceFile};
use crate::search::{filter_records, RecordFilter};

#[derive(Debug, Default, Deserialize)]
pub struct PaymentSearch {
    pub apartment: Option<String>,
    pub description: Option<String>,
    pub q: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ExpenseSearch {
    pub category: Option<String>,
    pub q: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BatchResponse {
    pub outcome: String,
    pub period: String,
    pub inserted: usize,
    pub message: String,
}

// ============= Session =============

pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<Session>, ApiError> {
    let session = state.identity.sign_in(&payload.email, &payload.password).await?;
    Ok(Json(session))
}

pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Result<StatusCode, ApiError> {
    if let Some(token) = extract_bearer(&headers) {
        state.identity.sign_out(&token).await?;
    }
    Ok(StatusCode::NO_CONTENT)
}

// ============= Payments =============

/// Anonymous callers may only look up one apartment; everything else needs
/// an admin session.
pub async fn list_payments(
    MaybeAdmin(ctx): MaybeAdmin,
    State(state): State<AppState>,
    Query(search): Query<PaymentSearch>,
) -> Result<Json<Vec<Payment>>, ApiError> {
    let apartment_given = search
        .apartment
        .as_deref()
        .is_some_and(|apartment| !apartment.trim().is_empty());
    if ctx.is_none() && !apartment_given {
        return Err(ApiError::unauthorized());
    }
    let filter = RecordFilter {
        apartment: search.apartment,
        description: search.description,
        text: search.q,
    };
    let fetched = match filter.payment_query() {
        Some(query) => state.store.list_payments_filtered(&query, Order::IdDescending).await?,
        None => state.store.list_payments(Order::IdDescending).await?,
    };
    Ok(Json(filter.apply(&fetched)))
}

pub async fn create_payment(
    RequireAdmin(_ctx): RequireAdmin,
    State(state): State<AppState>,
    Json(payload): Json<NewPayment>,
) -> Result<(StatusCode, Json<Payment>), ApiError> {
    let stored = state.store.insert_payment(&payload).await?;
    info!(id = stored.id, apartment = %stored.apartment, "payment recorded");
    Ok((StatusCode::CREATED, Json(stored)))
}

pub async fn update_payment(
    RequireAdmin(_ctx): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(patch): Json<PaymentPatch>,
) -> Result<Json<Payment>, ApiError> {
    let updated = state.store.update_payment(id, &patch).await?;
    info!(id, "payment updated");
    Ok(Json(updated))
}

pub async fn delete_payment(
    RequireAdmin(_ctx): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.store.delete(Collection::Payments, id).await?;
    info!(id, "payment deleted");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn generate_batch(
    RequireAdmin(_ctx): RequireAdmin,
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<BatchResponse>), ApiError> {
    let today = chrono::Local::now().date_naive();
    let outcome = state.batches.generate(today).await?;

    let (status, label, period) = match &outcome {
        BatchOutcome::Created { period, .. } => (StatusCode::CREATED, "created", period),
        BatchOutcome::AlreadyExists { period, .. } => (StatusCode::OK, "already_exists", period),
    };
    Ok((
        status,
        Json(BatchResponse {
            outcome: label.to_string(),
            period: period.to_string(),
            inserted: outcome.inserted(),
            message: outcome.message(),
        }),
    ))
}

// ============= Invoices =============

pub async fn payment_invoice(
    RequireAdmin(_ctx): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Response, ApiError> {
    let payment = state.store.get_payment(id).await?;
    Ok(pdf_response(invoice::generate_invoice(&payment)?))
}

pub async fn invoice_for_period(
    State(state): State<AppState>,
    Path((apartment, description)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    let payment = state
        .store
        .find_payment(&apartment, &description)
        .await?
        .ok_or_else(|| {
            ApiError::not_found(format!("no invoice for apartment {apartment} and {description}"))
        })?;
    Ok(pdf_response(invoice::generate_invoice(&payment)?))
}

fn pdf_response(file: InvoiceFile) -> Response {
    (
        [
            (header::CONTENT_TYPE, InvoiceFile::CONTENT_TYPE.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", file.file_name),
            ),
        ],
        file.bytes,
    )
        .into_response()
}

// ============= Expenses =============

pub async fn list_expenses(
    RequireAdmin(_ctx): RequireAdmin,
    State(state): State<AppState>,
    Query(search): Query<ExpenseSearch>,
) -> Result<Json<Vec<Expense>>, ApiError> {
    let query = ExpenseQuery {
        category: search.category,
        description: None,
    };
    let fetched = if query.is_empty() {
        state.store.list_expenses(Order::IdDescending).await?
    } else {
        state.store.list_expenses_filtered(&query, Order::IdDescending).await?
    };
    Ok(Json(filter_records(&fetched, search.q.as_deref().unwrap_or(""))))
}

pub async fn create_expense(
    RequireAdmin(_ctx): RequireAdmin,
    State(state): State<AppState>,
    Json(payload): Json<NewExpense>,
) -> Result<(StatusCode, Json<Expense>), ApiError> {
    let stored = state.store.insert_expense(&payload).await?;
    info!(id = stored.id, category = %stored.category, "expense recorded");
    Ok((StatusCode::CREATED, Json(stored)))
}

pub async fn delete_expense(
    RequireAdmin(_ctx): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.store.delete(Collection::Expenses, id).await?;
    info!(id, "expense deleted");
    Ok(StatusCode::NO_CONTENT)
}
