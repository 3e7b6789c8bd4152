pub mod health;
pub mod synthesis;
pub mod system;
pub mod tasks;

use axum::Router;

use crate::state::AppState;

/// Build the route tree.
///
/// ```text
/// POST /transform              queue a still-image transform
/// POST /animate                queue a clip animation
/// POST /analyze                subject analysis (synchronous)
/// GET  /status/{task_id}       job state and progress
/// GET  /result/{task_id}       job output
/// POST /system/unlock          force-release the accelerator lock
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(synthesis::router())
        .merge(tasks::router())
        .nest("/system", system::router())
}
