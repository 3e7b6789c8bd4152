use axum::routing::get;
use axum::Router;

use crate::handlers::tasks;
use crate::state::AppState;

/// ```text
/// GET /status/{task_id}    -> status
/// GET /result/{task_id}    -> result
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/status/{task_id}", get(tasks::status))
        .route("/result/{task_id}", get(tasks::result))
}
