pub mod error;
pub mod handlers;

use axum::{
    Router,
    routing::{get, post},
};

use crate::infra::http::HttpState;

pub fn build_api_router() -> Router<HttpState> {
    Router::new()
        .route("/deployHtml", post(handlers::deploy_html))
        .route("/health", get(handlers::health))
}
