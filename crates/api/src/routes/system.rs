use axum::routing::post;
use axum::Router;

use crate::handlers::system;
use crate::state::AppState;

/// Routes mounted at `/system`.
pub fn router() -> Router<AppState> {
    Router::new().route("/unlock", post(system::unlock))
}
