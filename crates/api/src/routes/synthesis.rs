use axum::routing::post;
use axum::Router;

use crate::handlers::{analyze, dispatch};
use crate::state::AppState;

/// ```text
/// POST /transform    -> transform
/// POST /animate      -> animate
/// POST /analyze      -> analyze
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/transform", post(dispatch::transform))
        .route("/animate", post(dispatch::animate))
        .route("/analyze", post(analyze::analyze))
}
