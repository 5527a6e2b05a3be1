use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, patch, post, put},
    Router,
};
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, services::ServeDir, trace::TraceLayer,
};

use crate::config::Config;
use crate::guard::edit_guard;
use crate::handlers::{pages as page_handlers, public as public_handlers};
use crate::store::PageStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn PageStore>,
    pub config: Config,
}

pub fn create_router(store: Arc<dyn PageStore>, config: Config) -> Router {
    let state = AppState {
        store,
        config: config.clone(),
    };

    // Editing surface, gated by the edit token when one is configured
    let page_routes = Router::new()
        .route("/", get(page_handlers::list_pages))
        .route("/", post(page_handlers::create_page))
        .route("/:id", get(page_handlers::get_page))
        .route("/:id", put(page_handlers::save_page))
        .route("/:id", patch(page_handlers::rename_page))
        .route("/:id", delete(page_handlers::delete_page))
        .route("/:id/publish", post(page_handlers::publish_page))
        .route("/:id/revert", post(page_handlers::revert_page))
        .route("/:id/duplicate", post(page_handlers::duplicate_page))
        .layer(middleware::from_fn_with_state(state.clone(), edit_guard));

    // Published pages, readable by anyone
    let public_routes = Router::new().route("/pages/:slug", get(public_handlers::get_public_page));

    let mut router = Router::new()
        .route("/health", get(health_check))
        .nest("/api/pages", page_routes)
        .nest("/api/public", public_routes);

    // One process serves both the API and the built frontend assets
    if let Some(static_dir) = &config.static_dir {
        router = router.fallback_service(ServeDir::new(static_dir));
    }

    router
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}
