use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Protected Router Module
///
/// Pages rendered only after the gate middleware has allowed the request.
/// Which actors get through is decided by the policy table alone; nothing
/// here repeats a role or status check. Handlers receive the allowed
/// `Identity` through a request extension.
pub fn protected_routes() -> Router<AppState> {
    Router::new()
        // Member class: any active account.
        .route("/me", get(handlers::account_page))
        .route("/settings", get(handlers::settings_page))
        // Writer class: writers, moderators, admins.
        .route("/write", get(handlers::editor_page))
        // Admin class: moderators and admins.
        .route("/admin", get(handlers::admin_page))
}
