use axum::{
    Router,
    extract::{FromRef, Request, State},
    http::HeaderName,
    middleware::{self, Next},
    response::{IntoResponse, Redirect, Response},
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Gating core.
pub mod gate;
pub mod models;
pub mod policy;
pub mod status;

// Session resolution and the invocation sites built on it.
pub mod auth;
pub mod hydration;
pub mod resolver;

pub mod config;
pub mod handlers;

// Module for routing segregation (Public, Protected, API).
pub mod routes;
use auth::{Credential, check_access};
use routes::{api, protected, public};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use gate::{GateDecision, decide, evaluate};
pub use policy::{AccessPolicy, ConfigurationError, PolicyState, PolicyTable, RouteClass};
pub use resolver::{ResolutionFailure, ResolverState, SessionResolver};

/// ApiDoc
///
/// OpenAPI document for the JSON surface used by the client runtime, served
/// at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(handlers::gate_check, handlers::get_session),
    components(
        schemas(
            models::GateResponse, models::GateOutcome, models::SessionView,
            models::Identity, models::Role, models::AccountStatus,
        )
    ),
    tags(
        (name = "portal-gate", description = "Content portal access gate")
    )
)]
struct ApiDoc;

/// AppState
///
/// Shared, immutable container for everything a request needs. Holds no
/// per-actor data: sessions are resolved per request and passed explicitly.
#[derive(Clone)]
pub struct AppState {
    /// Session Resolver: the identity provider boundary.
    pub resolver: ResolverState,
    /// Route policy table, built once at startup.
    pub policies: PolicyState,
    /// Configuration: the loaded, immutable environment configuration.
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for ResolverState {
    fn from_ref(app_state: &AppState) -> ResolverState {
        app_state.resolver.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// gate_middleware
///
/// The pre-render invocation site. Runs before every handler, the fallback
/// included: looks up the policy for the request path, resolves the session
/// and decides. A denial answers with a `303 See Other` to its target, so the
/// handler (and any protected markup) never runs. On `Allow` the resolved
/// identity is handed to the handler as a request extension.
async fn gate_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    let return_path = request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| path.clone());

    let (class, policy) = state.policies.policy_for(&path);
    let credential = Credential::from_headers(request.headers(), &state.config.session_cookie);

    let check = check_access(
        state.resolver.as_ref(),
        credential.as_ref(),
        policy,
        &return_path,
    )
    .await;

    match check.decision.location(&state.config.redirects) {
        None => {
            if let Some(identity) = check.identity {
                tracing::debug!(%path, %class, user_id = %identity.id, "gate allowed");
                request.extensions_mut().insert(identity);
            }
            next.run(request).await
        }
        Some(location) => {
            tracing::info!(%path, %class, outcome = ?check.decision.outcome(), "gate denied");
            Redirect::to(&location).into_response()
        }
    }
}

/// create_router
///
/// Assembles the routing structure, applies the gate and the observability
/// layers, and registers the application state.
pub fn create_router(state: AppState) -> Router {
    // 1. CORS Configuration
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    // Header name constant for Request Correlation.
    let x_request_id = HeaderName::from_static("x-request-id");

    // 2. Base Router Assembly
    // The gate wraps the fallback too, so an unrouted path under a protected
    // prefix is denied like the prefix itself. API and docs paths are
    // unregistered and fall under the open public policy.
    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .merge(protected::protected_routes())
        .merge(api::api_routes())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            gate_middleware,
        ))
        .with_state(state);

    // 3. Observability and Correlation Layers
    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Builds the per-request span, tagged with the `x-request-id` so every log
/// line of one request (gate decisions included) can be correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = %request.uri().path(),
        req_id = %request_id,
    )
}
