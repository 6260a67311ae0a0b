use axum::{
    routing::{delete, get, patch, post},
    Router,
};
use crate::backend::{handlers, AppState};

pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(handlers::login))
        .route("/logout", post(handlers::logout))
        .route("/payments", get(handlers::list_payments).post(handlers::create_payment))
        .route("/payments/generate", post(handlers::generate_batch))
        .route("/payments/:id", patch(handlers::update_payment).delete(handlers::delete_payment))
        .route("/payments/:id/invoice", get(handlers::payment_invoice))
        .route("/invoice/:apartment/:description", get(handlers::invoice_for_period))
        .route("/expenses", get(handlers::list_expenses))
        .route("/expenses/:id", delete(handlers::delete_expense))
        .route("/expense", post(handlers::create_expense))
}
