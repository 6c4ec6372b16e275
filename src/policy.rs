use crate::models::Role;
use std::{
    collections::{BTreeSet, HashMap},
    fmt,
    sync::Arc,
};
use thiserror::Error;

/// ConfigurationError
///
/// Raised while building policies or the route table. These are startup
/// failures: a table that cannot be built must stop the process before it
/// serves any traffic.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("policy allows roles {roles:?} but does not require an identity")]
    RolesWithoutIdentity { roles: Vec<Role> },
    #[error("route class '{0}' declared more than once")]
    DuplicateClass(RouteClass),
    #[error("route '{0}' registered more than once")]
    DuplicateRoute(String),
    #[error("route '{0}' must start with '/' and must not end with '/'")]
    InvalidRoute(String),
    #[error("route '{route}' points at undeclared class '{class}'")]
    UndeclaredClass { route: String, class: RouteClass },
}

/// AccessPolicy
///
/// Requirement declaration for one route class. Fields are private so that
/// every instance has gone through `AccessPolicy::new` and its validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessPolicy {
    requires_identity: bool,
    allowed_roles: BTreeSet<Role>,
    requires_active_status: bool,
}

impl AccessPolicy {
    /// Builds a policy, rejecting role requirements on routes that do not
    /// require an identity (role access for anonymous actors is undefined).
    pub fn new(
        requires_identity: bool,
        allowed_roles: impl IntoIterator<Item = Role>,
        requires_active_status: bool,
    ) -> Result<Self, ConfigurationError> {
        let allowed_roles: BTreeSet<Role> = allowed_roles.into_iter().collect();

        if !requires_identity && !allowed_roles.is_empty() {
            return Err(ConfigurationError::RolesWithoutIdentity {
                roles: allowed_roles.into_iter().collect(),
            });
        }

        Ok(Self {
            requires_identity,
            allowed_roles,
            requires_active_status,
        })
    }

    /// No requirement at all.
    pub fn public() -> Self {
        Self {
            requires_identity: false,
            allowed_roles: BTreeSet::new(),
            requires_active_status: false,
        }
    }

    /// Any active identity, whatever its role.
    pub fn member() -> Self {
        Self {
            requires_identity: true,
            allowed_roles: BTreeSet::new(),
            requires_active_status: true,
        }
    }

    /// Active identity holding one of `roles`.
    pub fn restricted_to(roles: impl IntoIterator<Item = Role>) -> Self {
        Self {
            requires_identity: true,
            allowed_roles: roles.into_iter().collect(),
            requires_active_status: true,
        }
    }

    pub fn requires_identity(&self) -> bool {
        self.requires_identity
    }

    pub fn allowed_roles(&self) -> &BTreeSet<Role> {
        &self.allowed_roles
    }

    pub fn requires_active_status(&self) -> bool {
        self.requires_active_status
    }

    /// An empty role set accepts every role.
    pub fn allows_role(&self, role: Role) -> bool {
        self.allowed_roles.is_empty() || self.allowed_roles.contains(&role)
    }

    /// True when the decision cannot depend on who is asking.
    pub fn is_open(&self) -> bool {
        !self.requires_identity && !self.requires_active_status && self.allowed_roles.is_empty()
    }
}

/// RouteClass
///
/// The protected areas of the portal. Each class owns exactly one policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteClass {
    /// Landing pages, terminal views and anything not registered.
    Public,
    /// Account pages for any signed-in, active user.
    Member,
    /// The editor.
    Writer,
    /// Moderation and administration.
    Admin,
}

impl RouteClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteClass::Public => "public",
            RouteClass::Member => "member",
            RouteClass::Writer => "writer",
            RouteClass::Admin => "admin",
        }
    }
}

impl fmt::Display for RouteClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// PolicyTable
///
/// The single place where routes are mapped to requirements. A path belongs
/// to the class of its longest registered prefix (matched on a segment
/// boundary); paths with no registered prefix belong to `RouteClass::Public`.
#[derive(Debug, Clone)]
pub struct PolicyTable {
    classes: HashMap<RouteClass, AccessPolicy>,
    // Sorted longest prefix first.
    routes: Vec<(String, RouteClass)>,
}

/// PolicyState
///
/// Shared, immutable handle to the table held in the application state.
pub type PolicyState = Arc<PolicyTable>;

impl PolicyTable {
    pub fn builder() -> PolicyTableBuilder {
        PolicyTableBuilder::default()
    }

    /// standard
    ///
    /// The portal's route table:
    /// - `/me`, `/settings`: any active member.
    /// - `/write`: writers, moderators and admins.
    /// - `/admin`: moderators and admins.
    pub fn standard() -> Result<Self, ConfigurationError> {
        PolicyTable::builder()
            .class(RouteClass::Public, AccessPolicy::public())?
            .class(RouteClass::Member, AccessPolicy::member())?
            .class(
                RouteClass::Writer,
                AccessPolicy::new(true, [Role::Writer, Role::Moderator, Role::Admin], true)?,
            )?
            .class(
                RouteClass::Admin,
                AccessPolicy::new(true, [Role::Moderator, Role::Admin], true)?,
            )?
            .route("/me", RouteClass::Member)?
            .route("/settings", RouteClass::Member)?
            .route("/write", RouteClass::Writer)?
            .route("/admin", RouteClass::Admin)?
            .build()
    }

    /// Returns the class and policy governing `path`. Any query string or
    /// fragment is ignored.
    pub fn policy_for(&self, path: &str) -> (RouteClass, &AccessPolicy) {
        let path = path.split(['?', '#']).next().unwrap_or(path);

        let class = self
            .routes
            .iter()
            .find(|(prefix, _)| matches_prefix(path, prefix))
            .map(|(_, class)| *class)
            .unwrap_or(RouteClass::Public);

        (class, self.policy(class))
    }

    /// Policy declared for `class`. `build` guarantees every routed class and
    /// `Public` are declared; anything else falls back to the open policy.
    pub fn policy(&self, class: RouteClass) -> &AccessPolicy {
        self.classes
            .get(&class)
            .or_else(|| self.classes.get(&RouteClass::Public))
            .unwrap_or(&OPEN_POLICY)
    }

    pub fn routes(&self) -> impl Iterator<Item = (&str, RouteClass)> {
        self.routes.iter().map(|(prefix, class)| (prefix.as_str(), *class))
    }
}

static OPEN_POLICY: AccessPolicy = AccessPolicy {
    requires_identity: false,
    allowed_roles: BTreeSet::new(),
    requires_active_status: false,
};

fn matches_prefix(path: &str, prefix: &str) -> bool {
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

/// PolicyTableBuilder
///
/// Every step validates immediately so a bad table fails at the line that
/// declared it.
#[derive(Debug, Default)]
pub struct PolicyTableBuilder {
    classes: HashMap<RouteClass, AccessPolicy>,
    routes: Vec<(String, RouteClass)>,
}

impl PolicyTableBuilder {
    pub fn class(
        mut self,
        class: RouteClass,
        policy: AccessPolicy,
    ) -> Result<Self, ConfigurationError> {
        if self.classes.contains_key(&class) {
            return Err(ConfigurationError::DuplicateClass(class));
        }
        self.classes.insert(class, policy);
        Ok(self)
    }

    pub fn route(mut self, prefix: &str, class: RouteClass) -> Result<Self, ConfigurationError> {
        // The root is the fallback, so it cannot be registered as a prefix.
        if !prefix.starts_with('/') || prefix.ends_with('/') || prefix.contains('?') {
            return Err(ConfigurationError::InvalidRoute(prefix.to_string()));
        }
        if self.routes.iter().any(|(existing, _)| existing == prefix) {
            return Err(ConfigurationError::DuplicateRoute(prefix.to_string()));
        }
        self.routes.push((prefix.to_string(), class));
        Ok(self)
    }

    pub fn build(mut self) -> Result<PolicyTable, ConfigurationError> {
        for (route, class) in &self.routes {
            if !self.classes.contains_key(class) {
                return Err(ConfigurationError::UndeclaredClass {
                    route: route.clone(),
                    class: *class,
                });
            }
        }

        self.classes
            .entry(RouteClass::Public)
            .or_insert_with(AccessPolicy::public);
        self.routes
            .sort_by(|(a, _), (b, _)| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));

        Ok(PolicyTable {
            classes: self.classes,
            routes: self.routes,
        })
    }
}
