use crate::metrics::handler;
use axum::{
    routing::get,
    Router,
};
use exporter_merger::Merger;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub merger: Arc<Merger>,
}

pub fn create_router(merger: Merger) -> Router {
    let state = AppState {
        merger: Arc::new(merger),
    };

    Router::new()
        .route("/healthz", get(healthz))
        .route("/metrics", get(handler))
        .with_state(state)
}

async fn healthz() -> &'static str {
    "OK"
}
