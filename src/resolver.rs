use crate::{
    auth::Credential,
    config::AppConfig,
    models::{AccountStatus, Identity, Role, Session},
};
use async_trait::async_trait;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, decode_header, errors::ErrorKind};
use reqwest::{StatusCode, header};
use serde::{Deserialize, Serialize};
use std::{sync::Arc, time::Duration};
use thiserror::Error;
use uuid::Uuid;

/// ResolutionFailure
///
/// Transport or infrastructure failure while resolving a session. Distinct
/// from "no identity": callers must deny on it, never fall back to anonymous.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolutionFailure {
    #[error("identity service timed out")]
    Timeout,
    #[error("identity service unreachable: {0}")]
    Transport(String),
    #[error("identity service answered with status {status}")]
    Upstream { status: u16 },
    #[error("malformed identity response: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for ResolutionFailure {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ResolutionFailure::Timeout
        } else if err.is_decode() {
            ResolutionFailure::Malformed(err.to_string())
        } else {
            ResolutionFailure::Transport(err.to_string())
        }
    }
}

/// SessionResolver Trait
///
/// The I/O boundary between the gate and the identity provider. One call per
/// resolution attempt; nothing is cached between calls.
///
/// A missing credential and a credential the provider does not recognise both
/// resolve to `Session::Anonymous`. Only transport problems are errors.
#[async_trait]
pub trait SessionResolver: Send + Sync {
    async fn resolve(&self, credential: Option<&Credential>) -> Result<Session, ResolutionFailure>;
}

/// ResolverState
///
/// The trait object shared through the application state.
pub type ResolverState = Arc<dyn SessionResolver>;

/// Picks the resolver the configuration asks for: the remote identity service
/// when `IDENTITY_SERVICE_URL` is set, locally verified session tokens otherwise.
pub fn build_resolver(config: &AppConfig) -> Result<ResolverState, reqwest::Error> {
    match &config.identity_service_url {
        Some(url) => Ok(Arc::new(IdentityServiceResolver::new(
            url,
            &config.session_cookie,
            config.identity_timeout,
        )?)),
        None => Ok(Arc::new(TokenSessionResolver::new(&config.jwt_secret))),
    }
}

// --- Identity Service ---

/// Wire shape of `GET {identity}/session`.
#[derive(Debug, Deserialize)]
struct IdentityResponse {
    user: Option<IdentityRecord>,
}

#[derive(Debug, Deserialize)]
struct IdentityRecord {
    id: Uuid,
    role: Role,
    status: AccountStatus,
    #[serde(default)]
    email: Option<String>,
}

impl From<IdentityRecord> for Identity {
    fn from(record: IdentityRecord) -> Self {
        Identity {
            id: record.id,
            role: record.role,
            status: record.status,
            email: record.email,
        }
    }
}

/// IdentityServiceResolver
///
/// Asks the external identity service who owns the credential. The credential
/// is forwarded as the session cookie, exactly as the browser sent it.
///
/// Response handling:
/// - `200 {"user": {...}}`: authenticated.
/// - `200 {"user": null}` or `401`: anonymous.
/// - any other status, a timeout, or an undecodable body (including unknown
///   role or status strings): `ResolutionFailure`.
#[derive(Clone)]
pub struct IdentityServiceResolver {
    client: reqwest::Client,
    session_url: String,
    cookie_name: String,
}

impl IdentityServiceResolver {
    pub fn new(base_url: &str, cookie_name: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            session_url: format!("{}/session", base_url.trim_end_matches('/')),
            cookie_name: cookie_name.to_string(),
        })
    }
}

#[async_trait]
impl SessionResolver for IdentityServiceResolver {
    async fn resolve(&self, credential: Option<&Credential>) -> Result<Session, ResolutionFailure> {
        let Some(credential) = credential else {
            return Ok(Session::Anonymous);
        };

        // Forwarded verbatim as a cookie value: anything that could smuggle
        // extra cookies is not a credential the service could have issued.
        if !credential.is_cookie_safe() {
            tracing::debug!("credential is not cookie-safe, not forwarding");
            return Ok(Session::Anonymous);
        }

        let response = self
            .client
            .get(&self.session_url)
            .header(
                header::COOKIE,
                format!("{}={}", self.cookie_name, credential.as_str()),
            )
            .send()
            .await?;

        match response.status() {
            StatusCode::UNAUTHORIZED => return Ok(Session::Anonymous),
            status if status.is_success() => {}
            status => {
                return Err(ResolutionFailure::Upstream {
                    status: status.as_u16(),
                });
            }
        }

        let body: IdentityResponse = response.json().await?;

        Ok(match body.user {
            Some(record) => Session::Authenticated(record.into()),
            None => Session::Anonymous,
        })
    }
}

// --- Signed Session Tokens ---

/// SessionClaims
///
/// Payload of a self-contained session token signed (HS256) by the identity
/// provider with the shared `SESSION_JWT_SECRET`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject (sub): the identity's UUID.
    pub sub: Uuid,
    pub role: Role,
    pub status: AccountStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Expiration Time (exp): the token is rejected afterwards.
    pub exp: usize,
    /// Issued At (iat).
    pub iat: usize,
}

/// TokenSessionResolver
///
/// Verifies session tokens locally, so there is no transport to fail.
/// Expired or badly signed tokens carry no identity and resolve to anonymous.
/// A correctly signed token whose claims cannot be read is malformed
/// upstream data and is reported as a failure.
pub struct TokenSessionResolver {
    key: DecodingKey,
    validation: Validation,
}

impl TokenSessionResolver {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;

        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }
}

#[async_trait]
impl SessionResolver for TokenSessionResolver {
    async fn resolve(&self, credential: Option<&Credential>) -> Result<Session, ResolutionFailure> {
        let Some(credential) = credential else {
            return Ok(Session::Anonymous);
        };

        // An unreadable header means this is not a session token at all.
        if let Err(e) = decode_header(credential.as_str()) {
            tracing::debug!(error = %e, "credential is not a session token");
            return Ok(Session::Anonymous);
        }

        // With the header readable, a JSON error can only come from claims
        // that passed signature verification.
        match decode::<SessionClaims>(credential.as_str(), &self.key, &self.validation) {
            Ok(data) => {
                let claims = data.claims;
                Ok(Session::Authenticated(Identity {
                    id: claims.sub,
                    role: claims.role,
                    status: claims.status,
                    email: claims.email,
                }))
            }
            Err(e) => match e.kind() {
                ErrorKind::ExpiredSignature => {
                    tracing::debug!("session token expired");
                    Ok(Session::Anonymous)
                }
                ErrorKind::Json(_) => Err(ResolutionFailure::Malformed(e.to_string())),
                _ => {
                    tracing::debug!(error = %e, "session token rejected");
                    Ok(Session::Anonymous)
                }
            },
        }
    }
}
