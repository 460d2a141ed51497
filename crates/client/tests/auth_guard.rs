//! Route gating and auth replies

mod common;

use airshipui_client::config::AuthConfig;
use airshipui_client::{
    AuthGuard, AuthState, CachedToken, Level, MemoryTokenStore, NavigationEvent, Navigator, Receiver,
    SessionState, TokenStore,
};
use airshipui_common::{component, now_millis, sub, Channel, Envelope};
use common::{RecordingNavigator, RecordingNotifier, RecordingOutbox};
use std::sync::Arc;

struct Fixture {
    guard: Arc<AuthGuard>,
    outbox: Arc<RecordingOutbox>,
    navigator: Arc<RecordingNavigator>,
    notifier: Arc<RecordingNotifier>,
    session: Arc<SessionState>,
    store: Arc<MemoryTokenStore>,
}

fn fixture(token: Option<CachedToken>, route: &str) -> Fixture {
    let store = Arc::new(match token {
        Some(t) => MemoryTokenStore::with_token(t),
        None => MemoryTokenStore::new(),
    });
    let session = SessionState::init(store.clone()).unwrap();
    let outbox = Arc::new(RecordingOutbox::default());
    let navigator = RecordingNavigator::at(route);
    let notifier = Arc::new(RecordingNotifier::default());
    let guard = AuthGuard::new(
        outbox.clone(),
        session.clone(),
        navigator.clone(),
        notifier.clone(),
        AuthConfig::default(),
    );
    Fixture {
        guard,
        outbox,
        navigator,
        notifier,
        session,
        store,
    }
}

fn token(expires_in_ms: i64) -> CachedToken {
    CachedToken {
        token: "tok".to_string(),
        refresh_token: Some("refresh".to_string()),
        date: now_millis() + expires_in_ms,
    }
}

fn auth_reply(sub: &str) -> Envelope {
    Envelope::request(Channel::Ui, component::AUTH, sub)
}

#[test]
fn expired_token_is_redirected_to_login() {
    let f = fixture(Some(token(-1)), "/");
    assert!(!f.guard.can_activate("/documents"));
    assert_eq!(f.navigator.history(), vec!["/", "/login"]);
    assert_eq!(f.guard.affordances().auth_button, "Login");
}

#[test]
fn valid_token_is_allowed_from_local_state() {
    let f = fixture(Some(token(60_000)), "/");
    assert!(f.guard.can_activate("/documents"));
    assert_eq!(f.navigator.navigations(), 0);
    assert_eq!(f.guard.state(), AuthState::PendingValidation);
    assert_eq!(f.guard.affordances().auth_button, "Logout");

    // validation is only queued, and only once
    assert!(f.guard.can_activate("/phases"));
    let sent = f.outbox.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].sub(), sub::VALIDATE);
    assert_eq!(sent[0].token.as_deref(), Some("tok"));
    assert_eq!(sent[0].refresh_token.as_deref(), Some("refresh"));
}

#[test]
fn no_token_sends_nothing() {
    let f = fixture(None, "/");
    assert!(!f.guard.can_activate("/history"));
    assert!(f.outbox.sent().is_empty());
    assert_eq!(f.guard.state(), AuthState::Unauthenticated);
}

#[test]
fn login_route_bounces_authenticated_users_home() {
    let f = fixture(Some(token(60_000)), "/login");
    assert!(!f.guard.can_activate("/login"));
    assert_eq!(f.navigator.history(), vec!["/login", "/"]);

    let g = fixture(None, "/");
    assert!(g.guard.can_activate("/login"));
    assert_eq!(g.navigator.navigations(), 0);
}

#[test]
fn redirect_waits_for_navigation_in_flight() {
    let f = fixture(None, "/");
    f.guard.on_navigation(&NavigationEvent::Start("/documents".to_string()));
    assert!(!f.guard.can_activate("/documents"));
    assert_eq!(f.navigator.navigations(), 0);

    f.guard.on_navigation(&NavigationEvent::End("/documents".to_string()));
    assert_eq!(f.navigator.history(), vec!["/", "/login"]);

    // replayed once only
    f.guard.on_navigation(&NavigationEvent::End("/login".to_string()));
    assert_eq!(f.navigator.navigations(), 1);
}

#[test]
fn approval_stores_token_and_leaves_login() {
    let f = fixture(None, "/login");
    let mut approved = auth_reply(sub::APPROVED);
    approved.token = Some("fresh".to_string());
    approved.refresh_token = Some("r2".to_string());
    f.guard.receive(&approved);

    assert_eq!(f.guard.state(), AuthState::Authenticated);
    assert_eq!(f.navigator.history(), vec!["/login", "/"]);
    let stored = f.store.load().unwrap().unwrap();
    assert_eq!(stored.token, "fresh");
    assert_eq!(stored.refresh_token.as_deref(), Some("r2"));
    assert!(stored.date > now_millis() + 3_500_000);
    assert!(f.guard.affordances().show_log_panel);
}

#[test]
fn denial_and_errors_log_out() {
    let f = fixture(Some(token(60_000)), "/documents");
    f.guard.receive(&auth_reply(sub::DENIED));
    assert_eq!(f.guard.state(), AuthState::Unauthenticated);
    assert!(f.session.token().is_none());
    assert!(f.store.load().unwrap().is_none());
    assert_eq!(f.navigator.current_route(), "/login");

    let g = fixture(Some(token(60_000)), "/documents");
    g.guard.receive(&auth_reply(sub::VALIDATE).with_error("token expired"));
    assert_eq!(g.notifier.at(Level::Error), vec!["token expired"]);
    assert!(g.session.token().is_none());
    assert_eq!(g.navigator.current_route(), "/login");
}

#[test]
fn denial_during_navigation_redirects_after_it_ends() {
    let f = fixture(Some(token(60_000)), "/");
    f.guard.on_navigation(&NavigationEvent::Start("/documents".to_string()));
    f.guard.receive(&auth_reply(sub::DENIED));
    assert_eq!(f.guard.state(), AuthState::Unauthenticated);
    assert!(f.session.token().is_none());
    assert_eq!(f.navigator.navigations(), 0);

    f.guard.on_navigation(&NavigationEvent::End("/documents".to_string()));
    assert_eq!(f.navigator.history(), vec!["/", "/login"]);
}

#[test]
fn refresh_only_replaces_refresh_token() {
    let f = fixture(Some(token(60_000)), "/");
    let mut refresh = auth_reply(sub::REFRESH);
    refresh.refresh_token = Some("rotated".to_string());
    f.guard.receive(&refresh);

    let cached = f.session.token().unwrap();
    assert_eq!(cached.token, "tok");
    assert_eq!(cached.refresh_token.as_deref(), Some("rotated"));
    assert_eq!(f.navigator.navigations(), 0);
}

#[test]
fn unknown_auth_message_logs_out() {
    let f = fixture(Some(token(60_000)), "/");
    f.guard.receive(&auth_reply("somethingNew"));
    assert_eq!(f.guard.state(), AuthState::Unauthenticated);
    assert_eq!(f.navigator.current_route(), "/login");
}
