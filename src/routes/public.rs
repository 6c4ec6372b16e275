use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Pages that are open to every visitor. They still pass through the gate
/// middleware, which finds an open policy for them and skips resolution.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe for monitoring and load balancers.
        .route("/health", get(|| async { "ok" }))
        .route("/", get(handlers::home))
        // GET /restricted
        // Status terminal view for suspended and banned accounts.
        .route("/restricted", get(handlers::restricted_page))
        .route("/forbidden", get(handlers::forbidden_page))
        // POST /sign-out
        // Clears the session cookie. The only action a terminal view offers.
        .route("/sign-out", post(handlers::sign_out))
}
