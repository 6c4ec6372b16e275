use portal_gate::{
    models::AccountStatus,
    status::{StatusTransitionError, TerminalView, render_unverified},
};

const ALL: [AccountStatus; 3] = [
    AccountStatus::Active,
    AccountStatus::Suspended,
    AccountStatus::Banned,
];

#[test]
fn test_forward_transitions_accepted() {
    assert_eq!(
        AccountStatus::Active.transition(AccountStatus::Suspended),
        Ok(AccountStatus::Suspended)
    );
    assert_eq!(
        AccountStatus::Suspended.transition(AccountStatus::Banned),
        Ok(AccountStatus::Banned)
    );
    // Suspension is not required before a ban.
    assert_eq!(
        AccountStatus::Active.transition(AccountStatus::Banned),
        Ok(AccountStatus::Banned)
    );
}

#[test]
fn test_every_other_transition_rejected() {
    let allowed = [
        (AccountStatus::Active, AccountStatus::Suspended),
        (AccountStatus::Active, AccountStatus::Banned),
        (AccountStatus::Suspended, AccountStatus::Banned),
    ];

    for from in ALL {
        for to in ALL {
            if allowed.contains(&(from, to)) {
                continue;
            }
            assert_eq!(
                from.transition(to),
                Err(StatusTransitionError { from, to }),
                "{from} -> {to}"
            );
        }
    }
}

#[test]
fn test_no_automatic_reinstatement() {
    assert!(AccountStatus::Suspended.transition(AccountStatus::Active).is_err());
    assert!(AccountStatus::Banned.transition(AccountStatus::Active).is_err());
    assert!(AccountStatus::Banned.transition(AccountStatus::Suspended).is_err());
}

#[test]
fn test_terminal_statuses() {
    assert!(!AccountStatus::Active.is_terminal());
    assert!(AccountStatus::Suspended.is_terminal());
    assert!(AccountStatus::Banned.is_terminal());
}

#[test]
fn test_no_terminal_view_for_active() {
    assert!(TerminalView::for_status(AccountStatus::Active).is_none());
}

#[test]
fn test_suspended_and_banned_framing_differs() {
    let suspended = TerminalView::for_status(AccountStatus::Suspended).unwrap();
    let banned = TerminalView::for_status(AccountStatus::Banned).unwrap();

    assert!(!suspended.permanent);
    assert!(suspended.message.contains("temporarily"));
    assert!(banned.permanent);
    assert!(banned.message.contains("permanently"));
    assert_ne!(suspended.title, banned.title);
}

#[test]
fn test_terminal_view_offers_only_sign_out() {
    for status in [AccountStatus::Suspended, AccountStatus::Banned] {
        let html = TerminalView::for_status(status).unwrap().render("/sign-out");

        assert!(html.contains(r#"action="/sign-out""#));
        assert!(html.contains(&format!(r#"data-status="{status}""#)));
        assert_eq!(html.matches("<form").count(), 1);
        assert!(!html.contains("<a "));
    }
}

#[test]
fn test_unverified_view_offers_sign_out() {
    let html = render_unverified("/sign-out");
    assert!(html.contains(r#"data-status="unverified""#));
    assert!(html.contains(r#"action="/sign-out""#));
}

#[test]
fn test_transition_error_message() {
    let err = AccountStatus::Banned
        .transition(AccountStatus::Active)
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "account status cannot move from banned to active"
    );
}
