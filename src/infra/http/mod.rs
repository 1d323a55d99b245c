pub mod api;
pub mod mcp;
mod middleware;

use axum::{Router, extract::DefaultBodyLimit, middleware as axum_middleware};

use crate::application::deploy::DeployService;

use mcp::sse::SessionRegistry;
use middleware::{log_responses, set_request_context};

#[derive(Clone)]
pub struct HttpState {
    pub deploy: DeployService,
    pub mcp_sessions: SessionRegistry,
}

impl HttpState {
    pub fn new(deploy: DeployService) -> Self {
        Self {
            deploy,
            mcp_sessions: SessionRegistry::new(),
        }
    }
}

/// Assemble the public router: the JSON deployment API, the tool bridge and health.
pub fn build_router(state: HttpState, body_limit: usize) -> Router {
    Router::new()
        .merge(api::build_api_router())
        .merge(mcp::build_mcp_router())
        .with_state(state)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(axum_middleware::from_fn(log_responses))
        .layer(axum_middleware::from_fn(set_request_context))
}
