use std::{env, time::Duration};

use crate::gate::RedirectTargets;

/// Path of the sign-out endpoint, the only action offered by terminal views.
pub const SIGN_OUT_PATH: &str = "/sign-out";

const LOCAL_JWT_SECRET: &str = "super-secure-test-secret-value-local";
const DEFAULT_IDENTITY_TIMEOUT_MS: u64 = 3000;

/// AppConfig
///
/// Holds the application's configuration. Immutable once loaded and pulled
/// into handlers and extractors via FromRef.
#[derive(Clone)]
pub struct AppConfig {
    // Runtime environment marker. Controls log format and secret requirements.
    pub env: Env,
    // Address the HTTP server binds to.
    pub bind_addr: String,
    // Base URL of the external identity service. When absent, sessions are
    // resolved from signed session tokens instead.
    pub identity_service_url: Option<String>,
    // Upper bound on one identity service round trip.
    pub identity_timeout: Duration,
    // Secret used to verify signed session tokens.
    pub jwt_secret: String,
    // Name of the cookie carrying the session credential.
    pub session_cookie: String,
    // Where denials navigate to.
    pub redirects: RedirectTargets,
}

/// Env
///
/// Defines the runtime context.
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

impl Default for AppConfig {
    /// Safe, non-panicking values for tests.
    fn default() -> Self {
        Self {
            env: Env::Local,
            bind_addr: "127.0.0.1:3000".to_string(),
            identity_service_url: None,
            identity_timeout: Duration::from_millis(DEFAULT_IDENTITY_TIMEOUT_MS),
            jwt_secret: LOCAL_JWT_SECRET.to_string(),
            session_cookie: "portal_session".to_string(),
            redirects: RedirectTargets::default(),
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads the configuration from environment variables.
    ///
    /// # Panics
    /// Panics at startup when production is missing the secret it needs: a
    /// `SESSION_JWT_SECRET` is mandatory unless `IDENTITY_SERVICE_URL` is set.
    /// Also panics on an unparsable `IDENTITY_TIMEOUT_MS`.
    pub fn load() -> Self {
        let env = match env::var("APP_ENV").as_deref() {
            Ok("production") => Env::Production,
            _ => Env::Local,
        };

        let identity_service_url = env::var("IDENTITY_SERVICE_URL")
            .ok()
            .filter(|url| !url.trim().is_empty());

        let jwt_secret = match (&env, &identity_service_url) {
            (Env::Production, None) => env::var("SESSION_JWT_SECRET").expect(
                "FATAL: SESSION_JWT_SECRET must be set in production when IDENTITY_SERVICE_URL is not.",
            ),
            _ => env::var("SESSION_JWT_SECRET").unwrap_or_else(|_| LOCAL_JWT_SECRET.to_string()),
        };

        let identity_timeout = match env::var("IDENTITY_TIMEOUT_MS") {
            Ok(raw) => Duration::from_millis(
                raw.parse()
                    .expect("FATAL: IDENTITY_TIMEOUT_MS must be a whole number of milliseconds."),
            ),
            Err(_) => Duration::from_millis(DEFAULT_IDENTITY_TIMEOUT_MS),
        };

        let defaults = RedirectTargets::default();
        let redirects = RedirectTargets {
            login: env::var("LOGIN_PATH").unwrap_or(defaults.login),
            ..defaults
        };

        Self {
            env,
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
            identity_service_url,
            identity_timeout,
            jwt_secret,
            session_cookie: env::var("SESSION_COOKIE")
                .unwrap_or_else(|_| "portal_session".to_string()),
            redirects,
        }
    }
}
