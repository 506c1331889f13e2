use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::links::LinkStore;

use super::handlers::{create_url, delete_urls, get_url, health_check, list_urls, AppState};

pub fn create_api_router(links: Arc<LinkStore>, base_url: String) -> Router {
    let state = Arc::new(AppState { links, base_url });

    Router::new()
        .route("/health", get(health_check))
        .route("/shorten", post(create_url))
        .route("/urls", get(list_urls).delete(delete_urls))
        .route("/urls/{code}", get(get_url))
        .with_state(state)
}
