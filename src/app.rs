use axum::Router;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::api::create_api_router;
use crate::config::Config;
use crate::links::LinkStore;
use crate::redirect::create_redirect_router;

/// Full HTTP surface: JSON API plus the catch-all redirect route.
pub fn create_app(links: Arc<LinkStore>, config: &Config) -> Router {
    create_api_router(Arc::clone(&links), config.base_url.clone())
        .merge(create_redirect_router(links, config.redirect_status))
        .layer(TraceLayer::new_for_http())
}
