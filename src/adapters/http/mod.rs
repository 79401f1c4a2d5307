pub mod routes;
pub mod state;
pub mod ws;

use axum::extract::DefaultBodyLimit;
use axum::{routing::{get, post}, Router};
use crate::adapters::http::state::HttpState;
use crate::adapters::http::ws::ws_handler;

pub fn router(state: HttpState) -> Router {
    Router::new()
        .route("/start-counting", post(routes::start_counting))
        .route("/stop-counting", post(routes::stop_counting))
        .route("/upload/disease", post(routes::upload_disease))
        .route("/upload/maturity", post(routes::upload_maturity))
        .route("/ws", get(ws_handler))
        // Las fotos de móvil superan de largo el límite de 2 MB por defecto
        .layer(DefaultBodyLimit::max(16 * 1024 * 1024))
        .with_state(state)
}
