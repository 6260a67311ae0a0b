mod auth;
mod error;
mod handlers;
mod routes;

use axum::{routing::get, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

use crate::auth::IdentityProvider;
use crate::billing::MonthlyBatchGenerator;
use crate::database::RecordStore;

pub use auth::RequireAdmin;
pub use error::ApiError;

#[derive(Clone)]
pub struct AppState {
    pub store: RecordStore,
    pub identity: Arc<dyn IdentityProvider>,
    pub batches: MonthlyBatchGenerator,
}

impl AppState {
    pub fn new(store: RecordStore, identity: Arc<dyn IdentityProvider>) -> Self {
        let batches = MonthlyBatchGenerator::new(store.clone());
        Self {
            store,
            identity,
            batches,
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "Backend is running" }))
        .merge(routes::api_routes())
        .with_state(state)
}

pub async fn run_server(state: AppState, addr: SocketAddr) -> anyhow::Result<()> {
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("server listening on http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
