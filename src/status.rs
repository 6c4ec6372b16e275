use crate::models::AccountStatus;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("account status cannot move from {from} to {to}")]
pub struct StatusTransitionError {
    pub from: AccountStatus,
    pub to: AccountStatus,
}

impl AccountStatus {
    /// transition
    ///
    /// Accepts only the forward edges `active -> suspended`,
    /// `suspended -> banned` and `active -> banned`. Suspended and banned are
    /// terminal here; reinstatement is an administrative action elsewhere and
    /// shows up as a fresh session on the next resolution.
    pub fn transition(self, to: AccountStatus) -> Result<AccountStatus, StatusTransitionError> {
        match (self, to) {
            (AccountStatus::Active, AccountStatus::Suspended)
            | (AccountStatus::Active, AccountStatus::Banned)
            | (AccountStatus::Suspended, AccountStatus::Banned) => Ok(to),
            (from, to) => Err(StatusTransitionError { from, to }),
        }
    }

    pub fn is_terminal(&self) -> bool {
        match self {
            AccountStatus::Active => false,
            AccountStatus::Suspended | AccountStatus::Banned => true,
        }
    }
}

/// TerminalView
///
/// The fixed page shown to a signed-in actor whose account is not active.
/// Suspended and banned gate identically; only the copy differs. The page
/// offers nothing but sign-out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminalView {
    pub status: AccountStatus,
    pub title: &'static str,
    pub message: &'static str,
    /// Permanent framing (banned) versus temporary framing (suspended).
    pub permanent: bool,
}

impl TerminalView {
    /// `None` for active accounts, which never see a terminal view.
    pub fn for_status(status: AccountStatus) -> Option<Self> {
        match status {
            AccountStatus::Active => None,
            AccountStatus::Suspended => Some(Self {
                status,
                title: "Account suspended",
                message: "Your account has been temporarily suspended. \
                          Protected areas are unavailable until the suspension is lifted.",
                permanent: false,
            }),
            AccountStatus::Banned => Some(Self {
                status,
                title: "Account banned",
                message: "Your account has been permanently banned. \
                          Protected areas of the platform are no longer available to you.",
                permanent: true,
            }),
        }
    }

    pub fn render(&self, sign_out_path: &str) -> String {
        terminal_page(self.status.as_str(), self.title, self.message, sign_out_path)
    }
}

/// Shown when the account status could not be verified. Still only offers sign-out.
pub fn render_unverified(sign_out_path: &str) -> String {
    terminal_page(
        "unverified",
        "Unable to verify your account",
        "We could not confirm your account status right now. Please try again later.",
        sign_out_path,
    )
}

fn terminal_page(kind: &str, title: &str, message: &str, sign_out_path: &str) -> String {
    format!(
        r#"<!doctype html>
<html lang="en">
<head><meta charset="utf-8"><title>{title}</title></head>
<body>
<main class="terminal-status" data-status="{kind}">
<h1>{title}</h1>
<p>{message}</p>
<form method="post" action="{sign_out_path}"><button type="submit">Sign out</button></form>
</main>
</body>
</html>"#
    )
}
