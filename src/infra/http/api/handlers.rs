//! Deployment handlers

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;

use crate::domain::deploy::DeployResult;
use crate::domain::submission::Submission;
use crate::infra::http::HttpState;

use super::error::ApiError;

pub async fn deploy_html(
    State(state): State<HttpState>,
    payload: Result<Json<Submission>, JsonRejection>,
) -> Result<Json<DeployResult>, ApiError> {
    let Json(submission) = payload?;
    let result = state.deploy.deploy(submission).await?;
    Ok(Json(result))
}

pub async fn health() -> StatusCode {
    StatusCode::NO_CONTENT
}
