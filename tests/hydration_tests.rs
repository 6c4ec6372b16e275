use async_trait::async_trait;
use portal_gate::{
    AccessPolicy, GateDecision, ResolutionFailure, SessionResolver,
    auth::Credential,
    gate::RedirectTargets,
    hydration::{HydrationGate, Hydrated, Navigation, PLACEHOLDER_HTML, Settled},
    models::{AccountStatus, Identity, Role, Session},
    policy::PolicyTable,
};
use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::Duration,
};

// --- Mock Resolver ---

struct MockResolver {
    result: Result<Session, ResolutionFailure>,
    delay: Duration,
    calls: AtomicUsize,
}

impl MockResolver {
    fn new(result: Result<Session, ResolutionFailure>) -> Self {
        Self {
            result,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    fn slow(result: Result<Session, ResolutionFailure>, delay: Duration) -> Self {
        Self {
            delay,
            ..Self::new(result)
        }
    }
}

#[async_trait]
impl SessionResolver for MockResolver {
    async fn resolve(&self, _credential: Option<&Credential>) -> Result<Session, ResolutionFailure> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.result.clone()
    }
}

fn identity(role: Role, status: AccountStatus) -> Identity {
    Identity {
        id: uuid::Uuid::from_u128(9),
        role,
        status,
        email: None,
    }
}

fn admin_policy() -> AccessPolicy {
    PolicyTable::standard()
        .unwrap()
        .policy_for("/admin")
        .1
        .clone()
}

// --- Tests ---

#[test]
fn test_placeholder_carries_no_content() {
    let resolver = MockResolver::new(Ok(Session::Anonymous));
    let policy = admin_policy();
    let targets = RedirectTargets::default();
    let gate = HydrationGate::new(&resolver, &policy, &targets, "/admin", None);

    assert_eq!(gate.placeholder(), PLACEHOLDER_HTML);
    assert!(gate.placeholder().contains("aria-busy"));
    // Nothing is resolved until the gate is settled.
    assert_eq!(resolver.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_allow_loads_content_with_identity() {
    let admin = identity(Role::Admin, AccountStatus::Active);
    let resolver = MockResolver::new(Ok(Session::Authenticated(admin.clone())));
    let policy = admin_policy();
    let targets = RedirectTargets::default();

    let gate = HydrationGate::new(
        &resolver,
        &policy,
        &targets,
        "/admin",
        Some(Credential::new("token")),
    );
    let hydrated = gate
        .settle(|identity| async move { identity.map(|i| i.role) })
        .await;

    assert_eq!(hydrated, Hydrated::Content(Some(Role::Admin)));
}

#[tokio::test]
async fn test_denial_never_invokes_loader() {
    let cases = [
        (
            Ok(Session::Anonymous),
            "/login?returnPath=%2Fadmin",
            GateDecision::RedirectToLogin {
                return_path: "/admin".to_string(),
            },
        ),
        (
            Ok(Session::Authenticated(identity(
                Role::Admin,
                AccountStatus::Banned,
            ))),
            "/restricted",
            GateDecision::RedirectToRestricted,
        ),
        (
            Ok(Session::Authenticated(identity(
                Role::Writer,
                AccountStatus::Active,
            ))),
            "/forbidden",
            GateDecision::RedirectToForbidden,
        ),
        (
            Err(ResolutionFailure::Timeout),
            "/login?returnPath=%2Fadmin",
            GateDecision::RedirectToLogin {
                return_path: "/admin".to_string(),
            },
        ),
    ];

    for (resolution, location, decision) in cases {
        let resolver = MockResolver::new(resolution);
        let policy = admin_policy();
        let targets = RedirectTargets::default();
        let loaded = Arc::new(AtomicBool::new(false));

        let gate = HydrationGate::new(
            &resolver,
            &policy,
            &targets,
            "/admin",
            Some(Credential::new("token")),
        );
        let flag = loaded.clone();
        let hydrated = gate
            .settle(|_| async move {
                flag.store(true, Ordering::SeqCst);
                "protected payload"
            })
            .await;

        assert_eq!(
            hydrated,
            Hydrated::Navigate(Navigation {
                location: location.to_string(),
                decision,
            })
        );
        assert!(!loaded.load(Ordering::SeqCst), "loader ran for {location}");
    }
}

#[tokio::test]
async fn test_open_policy_skips_resolution() {
    let resolver = MockResolver::new(Err(ResolutionFailure::Timeout));
    let policy = AccessPolicy::public();
    let targets = RedirectTargets::default();

    let gate = HydrationGate::new(&resolver, &policy, &targets, "/", None);
    let hydrated = gate.settle(|identity| async move { identity.is_none() }).await;

    assert_eq!(hydrated, Hydrated::Content(true));
    assert_eq!(resolver.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_abandoned_navigation_fires_nothing() {
    let resolver = MockResolver::slow(Ok(Session::Anonymous), Duration::from_millis(500));
    let policy = admin_policy();
    let targets = RedirectTargets::default();
    let loaded = Arc::new(AtomicBool::new(false));

    let gate = HydrationGate::new(
        &resolver,
        &policy,
        &targets,
        "/admin",
        Some(Credential::new("token")),
    );
    let flag = loaded.clone();
    let settled = gate
        .settle_or_abandon(
            |_| async move {
                flag.store(true, Ordering::SeqCst);
            },
            tokio::time::sleep(Duration::from_millis(20)),
        )
        .await;

    assert_eq!(settled, Settled::Abandoned);
    assert!(!loaded.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_settles_when_not_abandoned() {
    let resolver = MockResolver::new(Ok(Session::Anonymous));
    let policy = admin_policy();
    let targets = RedirectTargets::default();

    let gate = HydrationGate::new(&resolver, &policy, &targets, "/admin?tab=queue", None);
    let settled = gate
        .settle_or_abandon(|_| async {}, std::future::pending::<()>())
        .await;

    assert_eq!(
        settled,
        Settled::Done(Hydrated::Navigate(Navigation {
            location: "/login?returnPath=%2Fadmin%3Ftab%3Dqueue".to_string(),
            decision: GateDecision::RedirectToLogin {
                return_path: "/admin?tab=queue".to_string()
            },
        }))
    );
}
