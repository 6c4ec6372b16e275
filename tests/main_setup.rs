use portal_gate::{AppConfig, config::Env, resolver::build_resolver};
use serial_test::serial;
use std::{env, panic, time::Duration};

// Every variable AppConfig::load reads.
const CONFIG_VARS: [&str; 7] = [
    "APP_ENV",
    "IDENTITY_SERVICE_URL",
    "SESSION_JWT_SECRET",
    "IDENTITY_TIMEOUT_MS",
    "SESSION_COOKIE",
    "LOGIN_PATH",
    "BIND_ADDR",
];

// --- Setup/Teardown Utilities ---

/// Runs `test` with exactly `vars` set (all other config variables cleared),
/// then restores the original environment.
fn run_with_env<T, R>(vars: &[(&str, &str)], test: T) -> R
where
    T: FnOnce() -> R + panic::UnwindSafe,
{
    let originals: Vec<(&str, Option<String>)> = CONFIG_VARS
        .iter()
        .map(|&var| (var, env::var(var).ok()))
        .collect();

    unsafe {
        for var in CONFIG_VARS {
            env::remove_var(var);
        }
        for (key, value) in vars {
            env::set_var(key, value);
        }
    }

    let result = panic::catch_unwind(test);

    for (key, original_value) in originals {
        unsafe {
            match original_value {
                Some(val) => env::set_var(key, val),
                None => env::remove_var(key),
            }
        }
    }

    match result {
        Ok(value) => value,
        Err(e) => panic::resume_unwind(e),
    }
}

// --- Tests ---

#[test]
#[serial]
fn test_local_env_defaults() {
    let config = run_with_env(&[], AppConfig::load);

    assert_eq!(config.env, Env::Local);
    assert_eq!(config.bind_addr, "0.0.0.0:3000");
    assert!(config.identity_service_url.is_none());
    assert_eq!(config.identity_timeout, Duration::from_millis(3000));
    assert_eq!(config.jwt_secret, "super-secure-test-secret-value-local");
    assert_eq!(config.session_cookie, "portal_session");
    assert_eq!(config.redirects.login, "/login");
    assert_eq!(config.redirects.restricted, "/restricted");
    assert_eq!(config.redirects.forbidden, "/forbidden");
}

#[test]
#[serial]
fn test_overrides_are_read() {
    let config = run_with_env(
        &[
            ("IDENTITY_SERVICE_URL", "http://identity.internal"),
            ("IDENTITY_TIMEOUT_MS", "750"),
            ("SESSION_COOKIE", "sid"),
            ("LOGIN_PATH", "/auth/sign-in"),
            ("BIND_ADDR", "127.0.0.1:8080"),
        ],
        AppConfig::load,
    );

    assert_eq!(
        config.identity_service_url.as_deref(),
        Some("http://identity.internal")
    );
    assert_eq!(config.identity_timeout, Duration::from_millis(750));
    assert_eq!(config.session_cookie, "sid");
    assert_eq!(config.redirects.login, "/auth/sign-in");
    assert_eq!(config.bind_addr, "127.0.0.1:8080");
}

#[test]
#[serial]
fn test_production_fail_fast_without_secret() {
    let result = panic::catch_unwind(|| {
        run_with_env(&[("APP_ENV", "production")], AppConfig::load)
    });

    assert!(
        result.is_err(),
        "Production config loading should panic without SESSION_JWT_SECRET"
    );
}

#[test]
#[serial]
fn test_production_with_identity_service_needs_no_secret() {
    let config = run_with_env(
        &[
            ("APP_ENV", "production"),
            ("IDENTITY_SERVICE_URL", "https://identity.portal.test"),
        ],
        AppConfig::load,
    );

    assert_eq!(config.env, Env::Production);
    assert!(build_resolver(&config).is_ok());
}

#[test]
#[serial]
fn test_invalid_timeout_fails_fast() {
    let result = panic::catch_unwind(|| {
        run_with_env(&[("IDENTITY_TIMEOUT_MS", "soon")], AppConfig::load)
    });
    assert!(result.is_err());
}

#[test]
fn test_default_config_builds_token_resolver() {
    let config = AppConfig::default();
    assert!(config.identity_service_url.is_none());
    assert!(build_resolver(&config).is_ok());
}
