use crate::{
    models::{AccountStatus, GateOutcome, Session},
    policy::AccessPolicy,
    resolver::ResolutionFailure,
};
use url::form_urlencoded;

/// GateDecision
///
/// The single outcome of one evaluation. Denials are ordinary navigations,
/// not errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Allow,
    /// Carries the originally requested path so navigation can resume after sign-in.
    RedirectToLogin { return_path: String },
    RedirectToRestricted,
    RedirectToForbidden,
}

impl GateDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, GateDecision::Allow)
    }

    pub fn outcome(&self) -> GateOutcome {
        match self {
            GateDecision::Allow => GateOutcome::Allow,
            GateDecision::RedirectToLogin { .. } => GateOutcome::RedirectToLogin,
            GateDecision::RedirectToRestricted => GateOutcome::RedirectToRestricted,
            GateDecision::RedirectToForbidden => GateOutcome::RedirectToForbidden,
        }
    }

    /// Where the actor must be sent, or `None` for `Allow`.
    pub fn location(&self, targets: &RedirectTargets) -> Option<String> {
        match self {
            GateDecision::Allow => None,
            GateDecision::RedirectToLogin { return_path } => Some(targets.login_url(return_path)),
            GateDecision::RedirectToRestricted => Some(targets.restricted.clone()),
            GateDecision::RedirectToForbidden => Some(targets.forbidden.clone()),
        }
    }
}

/// RedirectTargets
///
/// Paths of the pages a denial navigates to. Only the login target takes a
/// `returnPath`; restricted and forbidden deny outright.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectTargets {
    pub login: String,
    pub restricted: String,
    pub forbidden: String,
}

impl Default for RedirectTargets {
    fn default() -> Self {
        Self {
            login: "/login".to_string(),
            restricted: "/restricted".to_string(),
            forbidden: "/forbidden".to_string(),
        }
    }
}

impl RedirectTargets {
    pub fn login_url(&self, return_path: &str) -> String {
        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair("returnPath", return_path)
            .finish();
        let separator = if self.login.contains('?') { '&' } else { '?' };
        format!("{}{}{}", self.login, separator, query)
    }
}

/// evaluate
///
/// Pure decision function. Rules apply in order and the first match wins:
/// 1. identity required but absent: login, carrying `path`.
/// 2. identity present, not active, active status required: restricted.
///    This precedes the role check, so a banned admin is still restricted.
/// 3. role set non-empty and role not a member: forbidden.
/// 4. allow.
///
/// Anonymous sessions never reach rule 3: `AccessPolicy::new` refuses role
/// sets on policies that do not require an identity.
pub fn evaluate(session: &Session, policy: &AccessPolicy, path: &str) -> GateDecision {
    let identity = match session {
        Session::Anonymous if policy.requires_identity() => {
            return GateDecision::RedirectToLogin {
                return_path: path.to_string(),
            };
        }
        Session::Anonymous => return GateDecision::Allow,
        Session::Authenticated(identity) => identity,
    };

    if policy.requires_active_status() {
        match identity.status {
            AccountStatus::Active => {}
            AccountStatus::Suspended | AccountStatus::Banned => {
                return GateDecision::RedirectToRestricted;
            }
        }
    }

    if !policy.allows_role(identity.role) {
        return GateDecision::RedirectToForbidden;
    }

    GateDecision::Allow
}

/// decide
///
/// Folds a resolver result into a decision. A failed resolution is never
/// read as anonymous: unless the policy is open (its outcome cannot depend
/// on the session) the actor is sent to sign in.
pub fn decide(
    resolution: &Result<Session, ResolutionFailure>,
    policy: &AccessPolicy,
    path: &str,
) -> GateDecision {
    match resolution {
        Ok(session) => evaluate(session, policy, path),
        Err(_) if policy.is_open() => GateDecision::Allow,
        Err(failure) => {
            tracing::warn!(error = %failure, path, "session resolution failed, denying");
            GateDecision::RedirectToLogin {
                return_path: path.to_string(),
            }
        }
    }
}
