use portal_gate::{
    AppState,
    config::{AppConfig, Env},
    create_router,
    policy::PolicyTable,
    resolver::build_resolver,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// Entry point: loads configuration, initializes logging, builds the policy
/// table and session resolver, then serves HTTP.
#[tokio::main]
async fn main() {
    // 1. Configuration & Environment Loading (Fail-Fast)
    dotenv::dotenv().ok();
    let config = AppConfig::load();

    // 2. Logging Filter Setup
    // RUST_LOG wins; otherwise verbose defaults for local development.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "portal_gate=debug,tower_http=info,axum=trace".into());

    // 3. Initialize Logging based on Environment
    match config.env {
        Env::Local => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            // JSON lines for log aggregation.
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Application starting in {:?} mode", config.env);

    // 4. Policy Table (Fail-Fast)
    // A misdeclared policy is a startup failure, never a request-time one.
    let policies = match PolicyTable::standard() {
        Ok(table) => Arc::new(table),
        Err(e) => {
            tracing::error!(error = %e, "invalid route policy table");
            panic!("FATAL: invalid route policy table: {e}");
        }
    };

    // 5. Session Resolver
    let resolver = build_resolver(&config).expect("FATAL: Failed to build the identity client.");
    match &config.identity_service_url {
        Some(url) => tracing::info!(%url, "resolving sessions through the identity service"),
        None => tracing::info!("resolving sessions from signed session tokens"),
    }

    // 6. Unified State Assembly
    let bind_addr = config.bind_addr.clone();
    let app_state = AppState {
        resolver,
        policies,
        config,
    };

    // 7. Router and Server Startup
    let app = create_router(app_state);

    let listener = TcpListener::bind(&bind_addr)
        .await
        .expect("FATAL: Failed to bind the HTTP listener. Check BIND_ADDR.");

    tracing::info!("Listening on {}", bind_addr);
    tracing::info!("API Documentation (Swagger UI) available at /swagger-ui");

    axum::serve(listener, app)
        .await
        .expect("FATAL: HTTP server terminated unexpectedly.");
}
