use axum::{
    extract::{Path, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;

use crate::api::{error_response, ErrorResponse};
use crate::config::RedirectMode;
use crate::links::LinkStore;

pub struct RedirectState {
    pub links: Arc<LinkStore>,
    pub redirect_status: RedirectMode,
}

/// `Location` header for a stored URL.
///
/// Stored URLs keep the caller's spelling, which may hold characters a header
/// should not carry; those fall back to the parsed, percent-encoded form.
fn location_header(original_url: &str) -> Option<HeaderValue> {
    if original_url.is_ascii() {
        if let Ok(value) = HeaderValue::from_str(original_url) {
            return Some(value);
        }
    }

    let parsed = url::Url::parse(original_url).ok()?;
    HeaderValue::from_str(parsed.as_str()).ok()
}

/// Redirect to original URL
pub async fn redirect_url(
    State(state): State<Arc<RedirectState>>,
    Path(code): Path<String>,
) -> Response {
    let record = match state.links.lookup(&code).await {
        Ok(record) => record,
        Err(err) => return error_response(err).into_response(),
    };

    match location_header(&record.original_url) {
        Some(location) => (
            state.redirect_status.status_code(),
            [(header::LOCATION, location)],
        )
            .into_response(),
        None => {
            tracing::error!(short_code = %code, "stored URL cannot be used as a Location header");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    detail: "stored URL is not a valid redirect target".to_string(),
                }),
            )
                .into_response()
        }
    }
}
