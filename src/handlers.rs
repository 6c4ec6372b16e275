use crate::{
    AppState,
    auth::{Credential, ResolvedSession, check_access},
    config::{AppConfig, SIGN_OUT_PATH},
    models::{GateResponse, Identity, Session, SessionView},
    status::{self, TerminalView},
};
use axum::{
    Extension, Json,
    extract::{Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{Html, IntoResponse, Redirect, Response},
};
use chrono::Utc;
use serde::Deserialize;

// --- Filter Structs ---

/// GateQuery
///
/// Query parameters of `GET /api/gate`.
#[derive(Deserialize, utoipa::IntoParams)]
pub struct GateQuery {
    /// The path (and optional query) the client runtime is about to show.
    /// Must be a local path starting with a single `/`.
    pub path: String,
}

fn page(title: &str, body: &str) -> Html<String> {
    Html(format!(
        r#"<!doctype html>
<html lang="en">
<head><meta charset="utf-8"><title>{title}</title></head>
<body>
{body}
</body>
</html>"#
    ))
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn display_name(identity: &Identity) -> String {
    escape(identity.email.as_deref().unwrap_or("your account"))
}

// --- Public Pages ---

/// home
///
/// [Public Route] Landing page.
pub async fn home() -> Html<String> {
    page(
        "Portal",
        r#"<main><h1>Portal</h1><nav><a href="/me">My account</a> <a href="/write">Write</a> <a href="/admin">Admin</a></nav></main>"#,
    )
}

/// forbidden_page
///
/// [Public Route] Target of `RedirectToForbidden`. Carries no return path:
/// the denial is final for the current role.
pub async fn forbidden_page() -> impl IntoResponse {
    (
        StatusCode::FORBIDDEN,
        page(
            "Not allowed",
            r#"<main><h1>Not allowed</h1><p>Your role does not give access to this area.</p><a href="/">Back to the portal</a></main>"#,
        ),
    )
}

/// restricted_page
///
/// [Public Route] The status terminal view, target of `RedirectToRestricted`.
///
/// Resolves the session itself, since non-active actors can never pass the
/// gate. Active and anonymous visitors have nothing to see here and are sent
/// home; a failed resolution shows a neutral page that still offers sign-out.
pub async fn restricted_page(ResolvedSession(resolution): ResolvedSession) -> Response {
    match resolution {
        Ok(Session::Authenticated(identity)) => match TerminalView::for_status(identity.status) {
            Some(view) => Html(view.render(SIGN_OUT_PATH)).into_response(),
            None => Redirect::to("/").into_response(),
        },
        Ok(Session::Anonymous) => Redirect::to("/").into_response(),
        Err(failure) => {
            tracing::warn!(error = %failure, "could not verify account status for terminal view");
            Html(status::render_unverified(SIGN_OUT_PATH)).into_response()
        }
    }
}

/// sign_out
///
/// [Public Route] The only state-changing action of the terminal view.
/// Expires the session cookie; the next resolution is anonymous.
pub async fn sign_out(State(config): State<AppConfig>) -> Response {
    let expired = format!(
        "{}=; Path=/; Max-Age=0; HttpOnly; SameSite=Lax",
        config.session_cookie
    );

    ([(header::SET_COOKIE, expired)], Redirect::to("/")).into_response()
}

// --- Gated Pages ---
// Only reachable through the gate middleware, which inserts the identity on Allow.

/// account_page
///
/// [Member Route] The signed-in actor's account overview.
pub async fn account_page(Extension(identity): Extension<Identity>) -> Html<String> {
    page(
        "My account",
        &format!(
            r#"<main><h1>My account</h1><p>Signed in as {} ({}).</p></main>"#,
            display_name(&identity),
            identity.role
        ),
    )
}

/// settings_page
///
/// [Member Route] Account settings.
pub async fn settings_page(Extension(identity): Extension<Identity>) -> Html<String> {
    page(
        "Settings",
        &format!(
            r#"<main><h1>Settings</h1><p>Settings for {}.</p></main>"#,
            display_name(&identity)
        ),
    )
}

/// editor_page
///
/// [Writer Route] The article editor.
pub async fn editor_page(Extension(identity): Extension<Identity>) -> Html<String> {
    page(
        "Write",
        &format!(
            r#"<main><h1>Editor</h1><p>Drafting as {}.</p><form method="post"><textarea name="body"></textarea></form></main>"#,
            display_name(&identity)
        ),
    )
}

/// admin_page
///
/// [Admin Route] Moderation dashboard for moderators and admins.
pub async fn admin_page(Extension(identity): Extension<Identity>) -> Html<String> {
    page(
        "Admin",
        &format!(
            r#"<main><h1>Moderation</h1><p>Signed in as {} ({}).</p></main>"#,
            display_name(&identity),
            identity.role
        ),
    )
}

// --- Gate API ---

/// gate_check
///
/// [API Route] Post-hydration decision for `path`. Runs the same policy
/// lookup, resolver and evaluator as the pre-render middleware, so both
/// paths agree for the same session and route.
#[utoipa::path(
    get,
    path = "/api/gate",
    params(GateQuery),
    responses(
        (status = 200, description = "Decision for the path", body = GateResponse),
        (status = 400, description = "Path is not a local path")
    )
)]
pub async fn gate_check(
    State(state): State<AppState>,
    Query(query): Query<GateQuery>,
    headers: HeaderMap,
) -> Result<Json<GateResponse>, StatusCode> {
    // Only local paths: the value ends up in the login `returnPath`.
    if !query.path.starts_with('/') || query.path.starts_with("//") {
        return Err(StatusCode::BAD_REQUEST);
    }

    // Browsers never send the fragment, so the pre-render gate never sees it.
    let path = query.path.split('#').next().unwrap_or(&query.path);

    let (class, policy) = state.policies.policy_for(path);
    let credential = Credential::from_headers(&headers, &state.config.session_cookie);

    let check = check_access(
        state.resolver.as_ref(),
        credential.as_ref(),
        policy,
        path,
    )
    .await;

    tracing::debug!(%path, %class, outcome = ?check.decision.outcome(), "gate check");

    Ok(Json(GateResponse {
        outcome: check.decision.outcome(),
        location: check.decision.location(&state.config.redirects),
        evaluated_at: Utc::now(),
    }))
}

/// get_session
///
/// [API Route] The caller's resolved session, for display. A resolution
/// failure is reported as 503, never as an anonymous session.
#[utoipa::path(
    get,
    path = "/api/session",
    responses(
        (status = 200, description = "Resolved session", body = SessionView),
        (status = 503, description = "Identity service unavailable")
    )
)]
pub async fn get_session(
    ResolvedSession(resolution): ResolvedSession,
) -> Result<Json<SessionView>, StatusCode> {
    match resolution {
        Ok(session) => Ok(Json(SessionView::from(&session))),
        Err(failure) => {
            tracing::warn!(error = %failure, "session lookup failed");
            Err(StatusCode::SERVICE_UNAVAILABLE)
        }
    }
}
