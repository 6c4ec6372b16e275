use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

// --- Identity Schemas ---

/// Role
///
/// The closed set of roles an identity can hold. Gating checks roles by set
/// membership only: there is no rank ordering between them, so `moderator` and
/// `admin` can share the admin area while `writer` does not.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, TS, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Role {
    User,
    Writer,
    Moderator,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Writer => "writer",
            Role::Moderator => "moderator",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// AccountStatus
///
/// The single current status of an account. Transitions between statuses are
/// defined in `status.rs`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum AccountStatus {
    Active,
    Suspended,
    Banned,
}

impl AccountStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountStatus::Active => "active",
            AccountStatus::Suspended => "suspended",
            AccountStatus::Banned => "banned",
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, AccountStatus::Active)
    }
}

impl fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity
///
/// A resolved actor. Only exists inside `Session::Authenticated`, so role and
/// status can never be attached to an anonymous session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct Identity {
    pub id: Uuid,
    pub role: Role,
    pub status: AccountStatus,
    // Display only; never used for gating.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Session
///
/// Outcome of one successful resolution attempt. Built fresh for every request
/// and passed explicitly to the evaluator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Session {
    Anonymous,
    Authenticated(Identity),
}

impl Session {
    pub fn identity(&self) -> Option<&Identity> {
        match self {
            Session::Anonymous => None,
            Session::Authenticated(identity) => Some(identity),
        }
    }

    pub fn is_anonymous(&self) -> bool {
        matches!(self, Session::Anonymous)
    }
}

// --- API Schemas (Output) ---

/// SessionView
///
/// Output schema for `GET /api/session`. Lets a client runtime show who is
/// signed in; it carries no gating authority of its own.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct SessionView {
    pub authenticated: bool,
    pub user: Option<Identity>,
}

impl From<&Session> for SessionView {
    fn from(session: &Session) -> Self {
        Self {
            authenticated: !session.is_anonymous(),
            user: session.identity().cloned(),
        }
    }
}

/// GateOutcome
///
/// Wire form of a gate decision, without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum GateOutcome {
    Allow,
    RedirectToLogin,
    RedirectToRestricted,
    RedirectToForbidden,
}

/// GateResponse
///
/// Output schema for `GET /api/gate`, consumed by the post-hydration path.
/// `location` is set for every outcome except `allow`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct GateResponse {
    pub outcome: GateOutcome,
    pub location: Option<String>,
    #[ts(type = "string")]
    pub evaluated_at: DateTime<Utc>,
}
