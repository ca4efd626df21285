pub mod health;
pub mod scripts;

use axum::Router;
use tower_http::timeout::TimeoutLayer;

use crate::state::AppState;

/// Build the script route tree.
///
/// Route hierarchy (each path also accepts a trailing slash):
///
/// ```text
/// /scripts                 list (GET, filtered by tags/not_tags/any_tags)
/// /scripts/{name}          details (GET), run (POST, PUT, DELETE)
/// /reload                  rescan the script directory (POST)
/// ```
///
/// `timeout` bounds every route except the script runs.
pub fn api_routes(timeout: TimeoutLayer) -> Router<AppState> {
    Router::new().merge(scripts::router(timeout))
}
