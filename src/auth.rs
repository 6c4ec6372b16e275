use axum::{
    extract::{FromRef, FromRequestParts},
    http::{HeaderMap, header, request::Parts},
};
use std::{convert::Infallible, fmt};

use crate::{
    config::AppConfig,
    gate::{self, GateDecision},
    models::{Identity, Session},
    policy::AccessPolicy,
    resolver::{ResolutionFailure, ResolverState, SessionResolver},
};

/// Credential
///
/// The opaque session credential sent by the browser. It is only ever
/// forwarded to the resolver; `Debug` never prints it.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when the value can travel as a single cookie value: non-empty,
    /// with no `;` and no whitespace.
    pub fn is_cookie_safe(&self) -> bool {
        !self.0.is_empty() && !self.0.contains(|c: char| c == ';' || c.is_whitespace())
    }

    /// Reads the credential from the session cookie, falling back to an
    /// `Authorization: Bearer` header (scheme matched case-insensitively).
    /// Empty values and values that are not cookie-safe count as absent.
    pub fn from_headers(headers: &HeaderMap, cookie_name: &str) -> Option<Self> {
        let from_cookie = headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, value)| *name == cookie_name && !value.is_empty())
            .map(|(_, value)| Credential::new(value));

        from_cookie
            .or_else(|| {
                headers
                    .get(header::AUTHORIZATION)
                    .and_then(|value| value.to_str().ok())
                    .and_then(|value| value.trim().split_once(' '))
                    .filter(|(scheme, _)| scheme.eq_ignore_ascii_case("bearer"))
                    .map(|(_, token)| Credential::new(token.trim()))
            })
            .filter(Credential::is_cookie_safe)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

/// ResolvedSession Extractor
///
/// Resolves the caller's session for handlers that need to know who is asking
/// without being gated themselves (the terminal view, the JSON gate API).
/// The resolver result is handed over untouched, failure included, so each
/// handler decides how to deny. It never rejects.
pub struct ResolvedSession(pub Result<Session, ResolutionFailure>);

impl<S> FromRequestParts<S> for ResolvedSession
where
    S: Send + Sync,
    ResolverState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let resolver = ResolverState::from_ref(state);
        let config = AppConfig::from_ref(state);

        let credential = Credential::from_headers(&parts.headers, &config.session_cookie);

        Ok(ResolvedSession(resolver.resolve(credential.as_ref()).await))
    }
}

/// AccessCheck
///
/// Result of `check_access`: the decision plus, on `Allow`, the identity the
/// protected content may be rendered for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessCheck {
    pub decision: GateDecision,
    pub identity: Option<Identity>,
}

/// check_access
///
/// Resolve-then-evaluate, shared by every invocation site (pre-render
/// middleware, the JSON gate endpoint, the hydration gate) so that they all
/// reach the same decision for the same inputs.
///
/// Open policies skip resolution entirely: their outcome does not depend on
/// the session. Evaluation only runs once resolution has completed.
pub async fn check_access(
    resolver: &dyn SessionResolver,
    credential: Option<&Credential>,
    policy: &AccessPolicy,
    path: &str,
) -> AccessCheck {
    if policy.is_open() {
        return AccessCheck {
            decision: GateDecision::Allow,
            identity: None,
        };
    }

    let resolution = resolver.resolve(credential).await;
    let decision = gate::decide(&resolution, policy, path);

    let identity = match (&decision, resolution) {
        (GateDecision::Allow, Ok(Session::Authenticated(identity))) => Some(identity),
        _ => None,
    };

    AccessCheck { decision, identity }
}
