use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use std::sync::Arc;

use crate::links::{LinkError, LinkStore};
use crate::models::{CreateUrlRequest, LinkResponse};

pub struct AppState {
    pub links: Arc<LinkStore>,
    pub base_url: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub detail: String,
}

#[derive(Debug, Serialize)]
pub struct ClearResponse {
    pub message: String,
    pub deleted: u64,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);

/// Map a link error kind onto its HTTP status and `{ "detail": ... }` body
pub fn error_response(err: LinkError) -> ApiError {
    let status = match &err {
        LinkError::InvalidUrl(_) => StatusCode::BAD_REQUEST,
        LinkError::NotFound(_) => StatusCode::NOT_FOUND,
        LinkError::AllocationExhausted { .. } | LinkError::StorageUnavailable(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    (
        status,
        Json(ErrorResponse {
            detail: err.to_string(),
        }),
    )
}

/// Create a new shortened URL
pub async fn create_url(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CreateUrlRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<LinkResponse>), ApiError> {
    let Json(payload) = payload.map_err(|rejection| {
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                detail: rejection.body_text(),
            }),
        )
    })?;

    let record = state
        .links
        .create(&payload.url)
        .await
        .map_err(error_response)?;

    Ok((
        StatusCode::CREATED,
        Json(LinkResponse::from_record(record, &state.base_url)),
    ))
}

/// List all shortened URLs, newest first
pub async fn list_urls(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<LinkResponse>>, ApiError> {
    let records = state.links.list().await.map_err(error_response)?;

    Ok(Json(
        records
            .into_iter()
            .map(|record| LinkResponse::from_record(record, &state.base_url))
            .collect(),
    ))
}

/// Delete every shortened URL
pub async fn delete_urls(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ClearResponse>, ApiError> {
    let deleted = state.links.clear_all().await.map_err(error_response)?;

    Ok(Json(ClearResponse {
        message: "All URLs deleted".to_string(),
        deleted,
    }))
}

/// Get a shortened URL by code
pub async fn get_url(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> Result<Json<LinkResponse>, ApiError> {
    let record = state.links.lookup(&code).await.map_err(error_response)?;

    Ok(Json(LinkResponse::from_record(record, &state.base_url)))
}

/// Health check endpoint
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse { status: "healthy" })
}
