//! Route definitions for script endpoints.

use std::convert::Infallible;

use axum::routing::{get, post, MethodRouter};
use axum::Router;
use tower_http::timeout::TimeoutLayer;

use crate::handlers::scripts;
use crate::state::AppState;

/// ```text
/// GET    /scripts[/]                -> list_scripts
/// GET    /scripts/{name}[/]         -> get_script
/// POST   /scripts/{name}[/]         -> run_script
/// PUT    /scripts/{name}[/]         -> run_script
/// DELETE /scripts/{name}[/]         -> run_script
/// POST   /reload[/]                 -> reload
/// ```
///
/// `run_script` sits outside `timeout`; a run lasts as long as the script
/// does.
pub fn router(timeout: TimeoutLayer) -> Router<AppState> {
    let list: MethodRouter<AppState> =
        get(scripts::list_scripts).layer::<_, Infallible>(timeout.clone());
    let script: MethodRouter<AppState> = get(scripts::get_script)
        .layer::<_, Infallible>(timeout.clone())
        .post(scripts::run_script)
        .put(scripts::run_script)
        .delete(scripts::run_script);
    let reload: MethodRouter<AppState> = post(scripts::reload).layer::<_, Infallible>(timeout);

    Router::new()
        .route("/scripts", list.clone())
        .route("/scripts/", list)
        .route("/scripts/{name}", script.clone())
        .route("/scripts/{name}/", script)
        .route("/reload", reload.clone())
        .route("/reload/", reload)
}
