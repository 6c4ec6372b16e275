use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// API Router Module
///
/// JSON endpoints for the post-hydration path. Their paths are unregistered in
/// the policy table, so the gate middleware lets them through unresolved:
/// `/api/gate` is how a client asks for a decision.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // GET /api/gate?path=/admin
        .route("/api/gate", get(handlers::gate_check))
        // GET /api/session
        .route("/api/session", get(handlers::get_session))
}
