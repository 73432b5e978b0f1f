//! HTTP surface of the category tree service.

use application::CategoryApp;
use axum::{
    http::Uri,
    response::{IntoResponse, Json, Response},
    routing::{delete, get, patch, post},
    Router,
};
use domain::DomainError;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod error;
mod handlers;

pub use error::ApiError;

#[derive(Clone)]
pub struct AppState {
    pub app: Arc<CategoryApp>,
    /// Echo error kind and debug rendering in error bodies (off in production).
    pub expose_error_details: bool,
}

impl AppState {
    pub fn new(app: CategoryApp, expose_error_details: bool) -> Self {
        Self {
            app: Arc::new(app),
            expose_error_details,
        }
    }

    pub(crate) fn fail(&self, error: DomainError) -> ApiError {
        ApiError::new(error, self.expose_error_details)
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/createCategory", post(handlers::create_category))
        .route("/getParentById/:id", get(handlers::get_category))
        .route("/updateCategory/:id", patch(handlers::update_category))
        .route("/allCategories", get(handlers::list_categories))
        .route("/deleteCategoryById/:id", delete(handlers::delete_category))
        .route("/deleteCategoriesById", post(handlers::delete_categories))
        .route("/searchByChildName/:key", get(handlers::search_categories))
        .route("/health", get(health_check))
        .fallback(unknown_route)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

async fn unknown_route(
    axum::extract::State(state): axum::extract::State<AppState>,
    uri: Uri,
) -> Response {
    state
        .fail(DomainError::not_found(format!(
            "Can't find {} on this server!",
            uri.path()
        )))
        .into_response()
}
