//! API Routes
//!
//! Configures the Axum router with all cache facade endpoints.

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    clear_handler, delete_by_tag_handler, delete_handler, get_handler, has_handler,
    health_handler, keys_handler, set_handler, stats_handler, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `PUT /set` - Store a JSON value
/// - `GET /get/:key` - Retrieve a value by key
/// - `GET /has/:key` - Check for a live key
/// - `DELETE /del/:key` - Delete a key
/// - `DELETE /tag/:tag` - Delete every key carrying a tag
/// - `POST /clear` - Drop all items
/// - `GET /keys` - List keys and total stored size
/// - `GET /stats` - Get cache statistics
/// - `GET /health` - Health check endpoint
///
/// # Middleware
/// - CORS: Allows any origin
/// - Tracing: Logs all requests
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/set", put(set_handler))
        .route("/get/:key", get(get_handler))
        .route("/has/:key", get(has_handler))
        .route("/del/:key", delete(delete_handler))
        .route("/tag/:tag", delete(delete_by_tag_handler))
        .route("/clear", post(clear_handler))
        .route("/keys", get(keys_handler))
        .route("/stats", get(stats_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
