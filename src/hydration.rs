//! Post-hydration gating.
//!
//! Used where protection is only discovered after a view has started
//! rendering. The view goes through two phases: it shows a neutral
//! placeholder, then `settle` resolves the session, applies the same decision
//! as the pre-render path, and either loads the protected payload or hands
//! back a navigation. The loader is only reachable through an `Allow`, so
//! nothing protected is fetched or rendered while the decision is pending.

use std::future::Future;

use crate::{
    auth::{Credential, check_access},
    gate::{GateDecision, RedirectTargets},
    models::Identity,
    policy::AccessPolicy,
    resolver::SessionResolver,
};

/// Markup rendered while the decision is pending. Carries no protected data.
pub const PLACEHOLDER_HTML: &str = r#"<div class="gate-placeholder" aria-busy="true"></div>"#;

/// Navigation
///
/// An imperative redirect the client runtime must perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Navigation {
    pub location: String,
    pub decision: GateDecision,
}

/// Hydrated
///
/// Final state of a settled view: the protected payload, or a navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Hydrated<T> {
    Content(T),
    Navigate(Navigation),
}

/// Settled
///
/// `Abandoned` means the actor left before the decision was known; no
/// decision was applied and no navigation must fire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Settled<T> {
    Done(Hydrated<T>),
    Abandoned,
}

pub struct HydrationGate<'a> {
    resolver: &'a dyn SessionResolver,
    policy: &'a AccessPolicy,
    targets: &'a RedirectTargets,
    path: String,
    credential: Option<Credential>,
}

impl<'a> HydrationGate<'a> {
    pub fn new(
        resolver: &'a dyn SessionResolver,
        policy: &'a AccessPolicy,
        targets: &'a RedirectTargets,
        path: impl Into<String>,
        credential: Option<Credential>,
    ) -> Self {
        Self {
            resolver,
            policy,
            targets,
            path: path.into(),
            credential,
        }
    }

    /// What to render until `settle` completes.
    pub fn placeholder(&self) -> &'static str {
        PLACEHOLDER_HTML
    }

    /// settle
    ///
    /// Resolves, decides, then either calls `load` with the allowed identity
    /// (`None` on open policies, which are never resolved) or returns the
    /// navigation for the denial. `load` is not called on denial.
    pub async fn settle<F, Fut, T>(self, load: F) -> Hydrated<T>
    where
        F: FnOnce(Option<Identity>) -> Fut,
        Fut: Future<Output = T>,
    {
        let check = check_access(
            self.resolver,
            self.credential.as_ref(),
            self.policy,
            &self.path,
        )
        .await;

        match check.decision.location(self.targets) {
            None => Hydrated::Content(load(check.identity).await),
            Some(location) => {
                tracing::debug!(path = %self.path, %location, "hydrated view denied");
                Hydrated::Navigate(Navigation {
                    location,
                    decision: check.decision,
                })
            }
        }
    }

    /// settle_or_abandon
    ///
    /// Like `settle`, but drops the in-flight work as soon as `abandon`
    /// completes (the actor navigated away).
    pub async fn settle_or_abandon<F, Fut, T, A>(self, load: F, abandon: A) -> Settled<T>
    where
        F: FnOnce(Option<Identity>) -> Fut,
        Fut: Future<Output = T>,
        A: Future<Output = ()>,
    {
        let path = self.path.clone();

        tokio::select! {
            biased;
            _ = abandon => {
                tracing::debug!(%path, "hydration abandoned before decision");
                Settled::Abandoned
            }
            hydrated = self.settle(load) => Settled::Done(hydrated),
        }
    }
}
